//! Bidirectional path tracing.
//!
//! Every pixel sample traces one camera subpath and one light subpath, then
//! combines all their prefixes:
//! - `s` camera vertices and `t` light vertices form strategy (s, t)
//! - strategies with `s == 1` are light tracing and land on another pixel
//! - contributions are weighted with the balance heuristic, or uniformly
//!   by `1 / (s + t)` when MIS is off

mod connect;
mod subpath;
mod vertex;


pub use connect::{connect, mis_weight, Contribution};
pub use subpath::{build_camera_subpath, build_light_subpath, CameraSubpath};
pub use vertex::{Vertex, VertexKind};

use crate::{spectrum, Pixel, Sampler, Scene, Spectrum};
use bumpalo::Bump;
use lux_math::{Ray, Vec2};
use serde::{Deserialize, Serialize};

/// Bidirectional path tracing configuration.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BdptParams {
    /// Upper bound on camera subpath vertices, the camera included
    pub max_camera_vertices: usize,
    /// Upper bound on light subpath vertices, the light included
    pub max_light_vertices: usize,
    /// Bounces before Russian roulette kicks in
    pub min_depth: u32,
    /// Survival probability once Russian roulette is active
    pub cont_prob: f32,
    pub use_mis: bool,
}

impl Default for BdptParams {
    fn default() -> Self {
        Self {
            max_camera_vertices: 10,
            max_light_vertices: 10,
            min_depth: 3,
            cont_prob: 0.8,
            use_mis: true,
        }
    }
}

/// Combine two finished subpaths.
///
/// Returns the radiance for the pixel that generated `cam`. Light tracing
/// results are handed to `splat` with their film coordinates instead.
pub fn eval_bdpt_path<'a>(
    scene: &'a Scene,
    cam: &[Vertex<'a>],
    lig: &[Vertex<'a>],
    sampler: &mut Sampler,
    use_mis: bool,
    mut splat: impl FnMut(Vec2, Spectrum),
) -> Spectrum {
    let mut l = Spectrum::ZERO;
    for t in 0..=lig.len() {
        for s in 1..=cam.len() {
            // Only (2, 0) among paths with two vertices
            if s + t < 2 || (s == 1 && t == 1) {
                continue;
            }
            match connect(scene, cam, lig, s, t, sampler, use_mis) {
                Some(Contribution::Pixel(c)) => l += c,
                Some(Contribution::Splat(film, c)) => splat(film, c),
                None => {}
            }
        }
    }
    l
}

/// One bidirectional sample along the primary camera `ray`.
pub fn trace_bdpt(
    scene: &Scene,
    ray: Ray,
    sampler: &mut Sampler,
    arena: &Bump,
    params: &BdptParams,
    splat: impl FnMut(Vec2, Spectrum),
) -> Pixel {
    let cam = build_camera_subpath(params.max_camera_vertices, ray, scene, sampler, arena, params);
    let lig = build_light_subpath(params.max_light_vertices, scene, sampler, arena, params);

    let value = eval_bdpt_path(scene, &cam.vertices, &lig, sampler, params.use_mis, splat);
    Pixel {
        value: if spectrum::is_finite(value) {
            value
        } else {
            Spectrum::ZERO
        },
        albedo: cam.albedo,
        normal: cam.normal,
        denoise: cam.denoise,
    }
}

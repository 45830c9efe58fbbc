//! Unidirectional path tracing.
//!
//! [`trace_std`] combines light sampling and BSDF sampling with the balance
//! heuristic at every non-delta vertex. [`trace_nomis`] follows BSDF samples
//! only and picks up emission when a path happens to hit a light.

use crate::bsdf::{Bsdf, TransportMode};
use crate::light::{self, LightRef};
use crate::medium::Medium;
use crate::{spectrum, Pixel, Sampler, Scene, Spectrum};
use bumpalo::Bump;
use lux_math::sampling::UNIFORM_SPHERE_PDF;
use lux_math::{abs_dot, Ray, Vec3};
use serde::{Deserialize, Serialize};

/// Upper bound on invisible boundaries crossed between two scattering events.
const MAX_BOUNDARY_CROSSINGS: usize = 64;

/// Path tracing configuration.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TraceParams {
    /// Bounces before Russian roulette kicks in
    pub min_depth: u32,
    /// Maximum number of non-delta scattering events
    pub max_depth: u32,
    /// Survival probability once Russian roulette is active
    pub cont_prob: f32,
    /// Extra budget for delta scattering events
    pub specular_depth: u32,
    pub use_mis: bool,
}

impl Default for TraceParams {
    fn default() -> Self {
        Self {
            min_depth: 5,
            max_depth: 10,
            cont_prob: 0.9,
            specular_depth: 20,
            use_mis: true,
        }
    }
}

/// Path tracing with next event estimation.
pub fn trace_std(scene: &Scene, ray: Ray, sampler: &mut Sampler, arena: &Bump, params: &TraceParams) -> Pixel {
    trace_path(scene, ray, sampler, arena, params, true)
}

/// Path tracing with BSDF sampling only.
pub fn trace_nomis(scene: &Scene, ray: Ray, sampler: &mut Sampler, arena: &Bump, params: &TraceParams) -> Pixel {
    trace_path(scene, ray, sampler, arena, params, false)
}

#[inline]
fn balance(a: f32, b: f32) -> f32 {
    if a + b > 0.0 {
        a / (a + b)
    } else {
        0.0
    }
}

/// Light sampled from `pos`, weighted against BSDF sampling.
///
/// `normal` is `None` at medium points, where no cosine applies.
fn sample_direct<'a>(
    scene: &'a Scene,
    pos: Vec3,
    normal: Option<Vec3>,
    bsdf: &dyn Bsdf,
    wo: Vec3,
    medium_toward: impl Fn(Vec3) -> Option<&'a dyn Medium>,
    sampler: &mut Sampler,
) -> Spectrum {
    let Some((light, pdf_choice)) = scene.sample_light(sampler.sample1()) else {
        return Spectrum::ZERO;
    };
    let Some(ls) = light.sample_li(pos, sampler.sample2(), scene.world()) else {
        return Spectrum::ZERO;
    };
    if ls.pdf <= 0.0 || spectrum::is_black(ls.radiance) {
        return Spectrum::ZERO;
    }

    let cos = normal.map_or(1.0, |n| abs_dot(n, ls.wi));
    let f = bsdf.eval(ls.wi, wo, TransportMode::Radiance) * cos;
    if spectrum::is_black(f) {
        return Spectrum::ZERO;
    }
    let tr = scene.transmittance(pos, ls.wi, ls.dist, medium_toward(ls.wi));
    if spectrum::is_black(tr) {
        return Spectrum::ZERO;
    }

    let light_pdf = ls.pdf * pdf_choice;
    let weight = balance(light_pdf, bsdf.pdf(ls.wi, wo));
    f * tr * ls.radiance * weight / light_pdf
}

fn trace_path(
    scene: &Scene,
    mut ray: Ray,
    sampler: &mut Sampler,
    arena: &Bump,
    params: &TraceParams,
    use_mis: bool,
) -> Pixel {
    let mut pixel = Pixel::default();
    let mut aux_written = false;

    let mut l = Spectrum::ZERO;
    let mut beta = Spectrum::ONE;
    let mut medium = scene.camera_medium();

    let mut depth = 0;
    let mut specular_bounces = 0;
    let mut crossings = 0;

    // State of the last scattering event, for weighting emission hits
    let mut prev_pos = ray.origin;
    let mut prev_pdf = 0.0;
    let mut prev_delta = true;

    loop {
        let hit = scene.closest_intersection(&ray);
        let t_max = hit.map_or(f32::INFINITY, |h| h.t);

        let mut scattering = None;
        if let Some(m) = medium {
            let ms = m.sample_scattering(ray.origin, ray.direction, t_max, sampler, arena);
            beta *= ms.throughput;
            scattering = ms.scattering;
        }
        if spectrum::is_black(beta) {
            break;
        }

        let wo = -ray.direction;
        if let Some(ms) = scattering {
            depth += 1;
            if depth > params.max_depth {
                break;
            }
            if use_mis {
                let current = medium;
                l += beta * sample_direct(scene, ms.pos, None, ms.phase, wo, |_| current, sampler);
            }
            let Some(sample) = ms.phase.sample(wo, TransportMode::Radiance, sampler.sample3()) else {
                break;
            };
            if sample.pdf <= 0.0 {
                break;
            }
            beta *= sample.f / sample.pdf;
            prev_pos = ms.pos;
            prev_pdf = sample.pdf;
            prev_delta = false;
            crossings = 0;
            ray = Ray::spawn(ms.pos, sample.dir);
        } else {
            let Some(hit) = hit else {
                if let Some(env) = scene.environment() {
                    let weight = if !use_mis || prev_delta {
                        1.0
                    } else {
                        let light_pdf = scene.light_pdf(LightRef::Environment(env)) * UNIFORM_SPHERE_PDF;
                        balance(prev_pdf, light_pdf)
                    };
                    l += beta * env.radiance(ray.direction) * weight;
                }
                break;
            };

            let entity = hit.entity;
            if entity.material().is_pass_through() {
                crossings += 1;
                if crossings > MAX_BOUNDARY_CROSSINGS {
                    break;
                }
                medium = entity.media().toward(ray.direction, hit.normal);
                ray = Ray::spawn(hit.pos, ray.direction);
                continue;
            }
            crossings = 0;

            if entity.is_emissive() {
                let le = entity.emitted(hit.normal, wo);
                if !spectrum::is_black(le) {
                    let weight = if !use_mis || prev_delta {
                        1.0
                    } else {
                        let light_pdf = scene.light_pdf(LightRef::Area(entity))
                            * light::area_pdf_li(entity, prev_pos, hit.pos, hit.normal);
                        balance(prev_pdf, light_pdf)
                    };
                    l += beta * le * weight;
                }
            }

            let bsdf = entity.material().bsdf(&hit, arena);
            let is_delta = bsdf.is_delta();
            if !aux_written && !is_delta {
                pixel.albedo = bsdf.albedo();
                pixel.normal = hit.normal;
                pixel.denoise = if entity.no_denoise() { 0.0 } else { 1.0 };
                aux_written = true;
            }

            if is_delta {
                specular_bounces += 1;
                if specular_bounces > params.specular_depth {
                    break;
                }
            } else {
                depth += 1;
                if depth > params.max_depth {
                    break;
                }
                if use_mis {
                    let media = entity.media();
                    let normal = hit.normal;
                    l += beta
                        * sample_direct(
                            scene,
                            hit.pos,
                            Some(normal),
                            bsdf,
                            wo,
                            |w| media.toward(w, normal),
                            sampler,
                        );
                }
            }

            let Some(sample) = bsdf.sample(wo, TransportMode::Radiance, sampler.sample3()) else {
                break;
            };
            if sample.pdf <= 0.0 || spectrum::is_black(sample.f) {
                break;
            }
            beta *= sample.f * abs_dot(sample.dir, hit.normal) / sample.pdf;
            prev_pos = hit.pos;
            prev_pdf = sample.pdf;
            prev_delta = sample.is_delta;
            medium = entity.media().toward(sample.dir, hit.normal);
            ray = Ray::spawn(hit.pos, sample.dir);
        }

        if depth >= params.min_depth {
            if sampler.sample1() >= params.cont_prob {
                break;
            }
            beta /= params.cont_prob;
        }
    }

    pixel.value = if spectrum::is_finite(l) { l } else { Spectrum::ZERO };
    pixel
}

//! Preview integrators: ambient occlusion and first-hit surface attributes.

use crate::aggregate::HitRecord;
use crate::bsdf::TransportMode;
use crate::{Pixel, Sampler, Scene, Spectrum};
use bumpalo::Bump;
use lux_math::{sampling, Frame, Ray, Vec3, RAY_EPSILON};
use serde::{Deserialize, Serialize};

/// Upper bound on invisible boundaries skipped by a primary ray.
const MAX_BOUNDARY_CROSSINGS: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AoParams {
    /// Returned when the primary ray escapes
    pub background_color: Spectrum,
    /// Fully occluded points
    pub low_color: Spectrum,
    /// Fully open points
    pub high_color: Spectrum,
    pub ao_sample_count: u32,
    pub max_occlusion_distance: f32,
}

impl Default for AoParams {
    fn default() -> Self {
        Self {
            background_color: Spectrum::ZERO,
            low_color: Spectrum::ZERO,
            high_color: Spectrum::ONE,
            ao_sample_count: 4,
            max_occlusion_distance: 1.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AlbedoAoParams {
    pub ao_sample_count: u32,
    pub max_occlusion_distance: f32,
}

impl Default for AlbedoAoParams {
    fn default() -> Self {
        Self {
            ao_sample_count: 4,
            max_occlusion_distance: 1.0,
        }
    }
}

/// First visible surface along `ray`, skipping medium boundaries.
fn first_visible<'a>(scene: &'a Scene, mut ray: Ray) -> Option<HitRecord<'a>> {
    for _ in 0..MAX_BOUNDARY_CROSSINGS {
        let hit = scene.closest_intersection(&ray)?;
        if !hit.entity.material().is_pass_through() {
            return Some(hit);
        }
        ray = Ray::spawn(hit.pos, ray.direction);
    }
    None
}

/// Fraction of cosine-weighted directions on the viewer's side of `hit` that
/// stay unoccluded within `max_distance`.
fn unoccluded_fraction(
    scene: &Scene,
    hit: &HitRecord<'_>,
    view_dir: Vec3,
    sample_count: u32,
    max_distance: f32,
    sampler: &mut Sampler,
) -> f32 {
    if sample_count == 0 {
        return 1.0;
    }
    let normal = if hit.front_face(view_dir) {
        hit.normal
    } else {
        -hit.normal
    };
    let frame = Frame::from_normal(normal);

    let mut open = 0;
    for _ in 0..sample_count {
        let dir = frame.to_world(sampling::cosine_hemisphere(sampler.sample2()));
        let ray = Ray::with_range(hit.pos, dir, RAY_EPSILON, max_distance);
        if !scene.has_intersection(&ray) {
            open += 1;
        }
    }
    open as f32 / sample_count as f32
}

/// Ambient occlusion blended between `low_color` and `high_color`.
pub fn trace_ao(scene: &Scene, ray: Ray, sampler: &mut Sampler, params: &AoParams) -> Pixel {
    let Some(hit) = first_visible(scene, ray) else {
        return Pixel::from_value(params.background_color);
    };
    let ao = unoccluded_fraction(
        scene,
        &hit,
        ray.direction,
        params.ao_sample_count,
        params.max_occlusion_distance,
        sampler,
    );
    Pixel {
        value: params.low_color * (1.0 - ao) + params.high_color * ao,
        albedo: Spectrum::ZERO,
        normal: hit.normal,
        denoise: 0.0,
    }
}

/// First-hit albedo darkened by ambient occlusion.
pub fn trace_albedo_ao(
    scene: &Scene,
    ray: Ray,
    sampler: &mut Sampler,
    arena: &Bump,
    params: &AlbedoAoParams,
) -> Pixel {
    let Some(hit) = first_visible(scene, ray) else {
        return Pixel::default();
    };
    let albedo = hit.entity.material().bsdf(&hit, arena).albedo();
    let ao = unoccluded_fraction(
        scene,
        &hit,
        ray.direction,
        params.ao_sample_count,
        params.max_occlusion_distance,
        sampler,
    );
    Pixel {
        value: albedo * ao,
        albedo,
        normal: hit.normal,
        denoise: if hit.entity.no_denoise() { 0.0 } else { 1.0 },
    }
}

/// Which surface attribute [`trace_gbuffer`] writes into the pixel value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GBufferChannel {
    Albedo,
    Normal,
}

/// Albedo or normal of the first non-delta surface. Normals are stored
/// unmapped in [-1, 1].
pub fn trace_gbuffer(scene: &Scene, ray: Ray, arena: &Bump, channel: GBufferChannel) -> Pixel {
    let mut ray = ray;
    for _ in 0..MAX_BOUNDARY_CROSSINGS {
        let Some(hit) = first_visible(scene, ray) else {
            break;
        };
        let bsdf = hit.entity.material().bsdf(&hit, arena);
        if bsdf.is_delta() {
            // Follow mirrors to the surface they show
            let Some(sample) = bsdf.sample(-ray.direction, TransportMode::Radiance, Vec3::ZERO) else {
                break;
            };
            ray = Ray::spawn(hit.pos, sample.dir);
            continue;
        }
        let albedo = bsdf.albedo();
        let value = match channel {
            GBufferChannel::Albedo => albedo,
            GBufferChannel::Normal => hit.normal,
        };
        return Pixel {
            value,
            albedo,
            normal: hit.normal,
            denoise: if hit.entity.no_denoise() { 0.0 } else { 1.0 },
        };
    }
    Pixel::default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Entity, IdealDiffuse, IdealMirror, PerspectiveCamera, Quad, SceneBuilder};
    use lux_math::Vec2;
    use std::sync::Arc;

    fn camera() -> PerspectiveCamera {
        PerspectiveCamera::new()
            .with_resolution(4, 4)
            .with_position(Vec3::new(0.0, 0.0, 3.0), Vec3::ZERO, Vec3::Y)
            .with_fov(30.0)
    }

    fn floor(albedo: Spectrum) -> Entity {
        Entity::new(
            Quad::new(Vec3::new(-2.0, -2.0, 0.0), Vec3::X * 4.0, Vec3::Y * 4.0).unwrap(),
            Arc::new(IdealDiffuse::new(albedo)),
        )
    }

    fn center_ray(scene: &Scene) -> Ray {
        scene.camera().generate_ray(Vec2::splat(0.5))
    }

    #[test]
    fn test_ao_open_and_closed() {
        let params = AoParams {
            low_color: Spectrum::new(1.0, 0.0, 0.0),
            high_color: Spectrum::new(0.0, 1.0, 0.0),
            ao_sample_count: 16,
            max_occlusion_distance: 100.0,
            ..AoParams::default()
        };
        let mut sampler = Sampler::new(11);

        let open = SceneBuilder::new()
            .with_camera(camera())
            .add_entity(floor(Spectrum::ONE))
            .build()
            .unwrap();
        let pixel = trace_ao(&open, center_ray(&open), &mut sampler, &params);
        assert_eq!(pixel.value, params.high_color);

        // A lid hovering just above the floor blocks every occlusion ray
        let closed = SceneBuilder::new()
            .with_camera(camera())
            .add_entity(floor(Spectrum::ONE))
            .add_entity(Entity::new(
                Quad::new(Vec3::new(-50.0, -50.0, 0.02), Vec3::Y * 100.0, Vec3::X * 100.0).unwrap(),
                Arc::new(IdealDiffuse::new(Spectrum::ONE)),
            ))
            .build()
            .unwrap();
        let ray = Ray::new(Vec3::new(0.0, 0.0, 0.015), Vec3::new(0.0, 0.0, -1.0));
        let pixel = trace_ao(&closed, ray, &mut sampler, &params);
        assert_eq!(pixel.value, params.low_color);
    }

    #[test]
    fn test_ao_background() {
        let scene = SceneBuilder::new().with_camera(camera()).build().unwrap();
        let params = AoParams {
            background_color: Spectrum::splat(0.25),
            ..AoParams::default()
        };
        let mut sampler = Sampler::new(0);
        let pixel = trace_ao(&scene, center_ray(&scene), &mut sampler, &params);
        assert_eq!(pixel.value, Spectrum::splat(0.25));
    }

    #[test]
    fn test_albedo_ao_unoccluded() {
        let scene = SceneBuilder::new()
            .with_camera(camera())
            .add_entity(floor(Spectrum::new(0.3, 0.6, 0.9)))
            .build()
            .unwrap();
        let mut sampler = Sampler::new(5);
        let arena = Bump::new();
        let pixel = trace_albedo_ao(
            &scene,
            center_ray(&scene),
            &mut sampler,
            &arena,
            &AlbedoAoParams::default(),
        );
        assert_eq!(pixel.value, Spectrum::new(0.3, 0.6, 0.9));
        assert_eq!(pixel.denoise, 1.0);
    }

    #[test]
    fn test_gbuffer_follows_mirror() {
        let scene = SceneBuilder::new()
            .with_camera(camera())
            .add_entity(Entity::new(
                Quad::new(Vec3::new(-2.0, -2.0, 0.0), Vec3::X * 4.0, Vec3::Y * 4.0).unwrap(),
                Arc::new(IdealMirror::new(Spectrum::ONE)),
            ))
            .add_entity(Entity::new(
                Quad::new(Vec3::new(-5.0, -5.0, 4.0), Vec3::Y * 10.0, Vec3::X * 10.0).unwrap(),
                Arc::new(IdealDiffuse::new(Spectrum::new(0.2, 0.4, 0.6))),
            ))
            .build()
            .unwrap();
        let arena = Bump::new();
        let albedo = trace_gbuffer(&scene, center_ray(&scene), &arena, GBufferChannel::Albedo);
        assert!((albedo.value - Spectrum::new(0.2, 0.4, 0.6)).abs().max_element() < 1e-6);

        let normal = trace_gbuffer(&scene, center_ray(&scene), &arena, GBufferChannel::Normal);
        assert!((normal.value - Vec3::new(0.0, 0.0, -1.0)).abs().max_element() < 1e-5);
    }
}

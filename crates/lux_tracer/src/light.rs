//! Area and environment lights.
//!
//! Area lights are entities with emission; they radiate from the side their
//! outward normal points to. The environment surrounds the scene and is
//! sampled uniformly over the sphere of directions.

use crate::{spectrum, Entity, Spectrum};
use lux_math::sampling::{self, UNIFORM_SPHERE_PDF};
use lux_math::{Frame, Vec2, Vec3};
use std::f32::consts::{FRAC_1_PI, PI};

/// Bounding sphere of the scene, used to emit environment light.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WorldSphere {
    pub center: Vec3,
    pub radius: f32,
}

impl WorldSphere {
    pub fn disk_pdf(&self) -> f32 {
        1.0 / (PI * self.radius * self.radius)
    }
}

/// Light arriving from infinitely far away.
pub trait EnvironmentLight: Send + Sync {
    /// Radiance arriving from direction `dir` (pointing away from the scene).
    fn radiance(&self, dir: Vec3) -> Spectrum;

    /// Mean radiance over all directions, for light selection.
    fn mean_radiance(&self) -> Spectrum;
}

#[derive(Debug, Clone)]
pub struct ConstantEnvironment {
    radiance: Spectrum,
}

impl ConstantEnvironment {
    pub fn new(radiance: Spectrum) -> Self {
        Self { radiance }
    }
}

impl EnvironmentLight for ConstantEnvironment {
    fn radiance(&self, _dir: Vec3) -> Spectrum {
        self.radiance
    }

    fn mean_radiance(&self) -> Spectrum {
        self.radiance
    }
}

/// Blend from `horizon` straight down to `zenith` straight up.
#[derive(Debug, Clone)]
pub struct GradientSky {
    pub horizon: Spectrum,
    pub zenith: Spectrum,
    pub up: Vec3,
}

impl Default for GradientSky {
    fn default() -> Self {
        Self {
            horizon: Spectrum::new(1.0, 1.0, 1.0),
            zenith: Spectrum::new(0.5, 0.7, 1.0),
            up: Vec3::Y,
        }
    }
}

impl EnvironmentLight for GradientSky {
    fn radiance(&self, dir: Vec3) -> Spectrum {
        let a = 0.5 * (dir.normalize_or_zero().dot(self.up) + 1.0);
        self.horizon * (1.0 - a) + self.zenith * a
    }

    fn mean_radiance(&self) -> Spectrum {
        // Height along `up` is uniform for uniform directions
        0.5 * (self.horizon + self.zenith)
    }
}

/// A light picked from the scene.
#[derive(Clone, Copy)]
pub enum LightRef<'a> {
    Area(&'a Entity),
    Environment(&'a dyn EnvironmentLight),
}

/// Light sample seen from a shading point.
#[derive(Debug, Clone, Copy)]
pub struct LightLiSample {
    /// Unit direction from the shading point towards the light
    pub wi: Vec3,
    /// Distance to the light point, infinite for the environment
    pub dist: f32,
    pub pos: Vec3,
    pub normal: Vec3,
    pub radiance: Spectrum,
    /// Solid-angle density
    pub pdf: f32,
}

/// Emitted ray sampled from a light.
#[derive(Debug, Clone, Copy)]
pub struct LightLeSample {
    pub origin: Vec3,
    pub dir: Vec3,
    pub normal: Vec3,
    pub radiance: Spectrum,
    pub pdf_pos: f32,
    pub pdf_dir: f32,
}

/// Solid-angle density of hitting `light_pos` on an area light from `ref_pos`.
pub fn area_pdf_li(entity: &Entity, ref_pos: Vec3, light_pos: Vec3, light_normal: Vec3) -> f32 {
    let d = light_pos - ref_pos;
    let dist2 = d.length_squared();
    if dist2 == 0.0 {
        return 0.0;
    }
    let cos_l = light_normal.dot(-d) / dist2.sqrt();
    if cos_l <= 0.0 {
        return 0.0;
    }
    dist2 / (cos_l * entity.geometry().surface_area())
}

/// Position and direction densities of emitting along `w` from an area light.
pub fn area_pdf_le(entity: &Entity, normal: Vec3, w: Vec3) -> (f32, f32) {
    let pdf_pos = 1.0 / entity.geometry().surface_area();
    let cos = normal.dot(w);
    let pdf_dir = if cos > 0.0 { cos * FRAC_1_PI } else { 0.0 };
    (pdf_pos, pdf_dir)
}

/// Position and direction densities of environment emission.
pub fn environment_pdf_le(world: &WorldSphere) -> (f32, f32) {
    (world.disk_pdf(), UNIFORM_SPHERE_PDF)
}

impl<'a> LightRef<'a> {
    pub fn sample_li(&self, ref_pos: Vec3, u: Vec2, world: &WorldSphere) -> Option<LightLiSample> {
        match *self {
            LightRef::Area(entity) => {
                let le = entity.emission()?;
                let gs = entity.geometry().sample(u);
                let d = gs.pos - ref_pos;
                let dist = d.length();
                if dist == 0.0 {
                    return None;
                }
                let wi = d / dist;
                let cos_l = gs.normal.dot(-wi);
                if cos_l <= 0.0 {
                    return None;
                }
                Some(LightLiSample {
                    wi,
                    dist,
                    pos: gs.pos,
                    normal: gs.normal,
                    radiance: le,
                    pdf: gs.pdf_area * dist * dist / cos_l,
                })
            }
            LightRef::Environment(env) => {
                let wi = sampling::uniform_sphere(u);
                Some(LightLiSample {
                    wi,
                    dist: f32::INFINITY,
                    pos: ref_pos + wi * (2.0 * world.radius),
                    normal: -wi,
                    radiance: env.radiance(wi),
                    pdf: UNIFORM_SPHERE_PDF,
                })
            }
        }
    }

    pub fn sample_le(&self, u_pos: Vec2, u_dir: Vec2, world: &WorldSphere) -> Option<LightLeSample> {
        match *self {
            LightRef::Area(entity) => {
                let le = entity.emission()?;
                let gs = entity.geometry().sample(u_pos);
                let local = sampling::cosine_hemisphere(u_dir);
                Some(LightLeSample {
                    origin: gs.pos,
                    dir: Frame::from_normal(gs.normal).to_world(local),
                    normal: gs.normal,
                    radiance: le,
                    pdf_pos: gs.pdf_area,
                    pdf_dir: sampling::cosine_hemisphere_pdf(local.z),
                })
            }
            LightRef::Environment(env) => {
                // Direction towards the light, then a disk facing it
                let to_light = sampling::uniform_sphere(u_dir);
                let frame = Frame::from_normal(to_light);
                let disk = sampling::concentric_disk(u_pos);
                let origin = world.center
                    + world.radius * (to_light + disk.x * frame.s + disk.y * frame.t);
                let (pdf_pos, pdf_dir) = environment_pdf_le(world);
                Some(LightLeSample {
                    origin,
                    dir: -to_light,
                    normal: -to_light,
                    radiance: env.radiance(to_light),
                    pdf_pos,
                    pdf_dir,
                })
            }
        }
    }

    /// Luminance of emitted power, used to build the selection distribution.
    pub fn power(&self, world: &WorldSphere) -> f32 {
        match *self {
            LightRef::Area(entity) => entity.emission().map_or(0.0, |le| {
                spectrum::luminance(le) * entity.geometry().surface_area() * PI
            }),
            LightRef::Environment(env) => {
                spectrum::luminance(env.mean_radiance()) * PI * world.radius * world.radius
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{IdealDiffuse, Quad, Sampler};
    use std::sync::Arc;

    fn ceiling_light() -> Entity {
        // 1x1 quad at y = 1 facing down
        Entity::new(
            Quad::new(Vec3::new(-0.5, 1.0, -0.5), Vec3::X, Vec3::Z).unwrap(),
            Arc::new(IdealDiffuse::new(Spectrum::ZERO)),
        )
        .with_emission(Spectrum::splat(4.0))
        .unwrap()
    }

    fn world() -> WorldSphere {
        WorldSphere {
            center: Vec3::ZERO,
            radius: 2.0,
        }
    }

    #[test]
    fn test_area_sample_li_matches_pdf() {
        let light = ceiling_light();
        let lref = LightRef::Area(&light);
        let mut sampler = Sampler::new(42);

        for _ in 0..100 {
            let s = lref.sample_li(Vec3::ZERO, sampler.sample2(), &world()).unwrap();
            assert!(s.wi.y > 0.0);
            let pdf = area_pdf_li(&light, Vec3::ZERO, s.pos, s.normal);
            assert!((pdf - s.pdf).abs() < 1e-3 * s.pdf);
        }

        // Above the light sees its back
        assert!(lref.sample_li(Vec3::new(0.0, 2.0, 0.0), Vec2::splat(0.5), &world()).is_none());
    }

    #[test]
    fn test_area_sample_le_downwards() {
        let light = ceiling_light();
        let s = LightRef::Area(&light)
            .sample_le(Vec2::new(0.2, 0.9), Vec2::new(0.4, 0.4), &world())
            .unwrap();

        assert!(s.dir.y < 0.0);
        let (pdf_pos, pdf_dir) = area_pdf_le(&light, s.normal, s.dir);
        assert!((pdf_pos - s.pdf_pos).abs() < 1e-6);
        assert!((pdf_dir - s.pdf_dir).abs() < 1e-4);
    }

    #[test]
    fn test_environment_sample_le_enters_world() {
        let sky = GradientSky::default();
        let lref = LightRef::Environment(&sky);
        let mut sampler = Sampler::new(3);
        let w = world();

        for _ in 0..100 {
            let s = lref.sample_le(sampler.sample2(), sampler.sample2(), &w).unwrap();
            // Origin sits on the disk tangent to the bounding sphere
            let to_center = w.center - s.origin;
            assert!((to_center.dot(s.dir) - w.radius).abs() < 1e-3);
            assert!(to_center.length() <= w.radius * 2.0_f32.sqrt() + 1e-3);
        }
    }

    #[test]
    fn test_gradient_sky() {
        let sky = GradientSky::default();
        assert!(sky.radiance(Vec3::Y).x < sky.radiance(-Vec3::Y).x);
        assert_eq!(sky.radiance(-Vec3::Y), sky.horizon);
    }

    #[test]
    fn test_power() {
        let light = ceiling_light();
        let p = LightRef::Area(&light).power(&world());
        assert!((p - 4.0 * PI).abs() < 1e-3);
    }
}

//! Scattering interface shared by surfaces and media.
//!
//! All directions point away from the scattering point: `wo` towards where the
//! path came from, `wi` towards where it continues. Values returned by
//! [`Bsdf::eval`] exclude the cosine factor; surface vertices apply it.

use crate::Spectrum;
use lux_math::{sampling, Frame, Vec2, Vec3};
use std::f32::consts::{FRAC_1_PI, PI};

/// Which quantity a path carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportMode {
    /// Camera paths
    Radiance,
    /// Light paths
    Importance,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BsdfSample {
    pub dir: Vec3,
    pub f: Spectrum,
    /// Solid-angle density of `dir`
    pub pdf: f32,
    pub is_delta: bool,
}

/// Scattering function bound to one hit or medium point.
pub trait Bsdf {
    fn eval(&self, wi: Vec3, wo: Vec3, mode: TransportMode) -> Spectrum;

    /// Importance-sample `wi` given `wo`.
    fn sample(&self, wo: Vec3, mode: TransportMode, sam: Vec3) -> Option<BsdfSample>;

    /// Density of sampling `wi` given `wo`. Zero for delta lobes.
    fn pdf(&self, wi: Vec3, wo: Vec3) -> f32;

    /// Directional-hemispherical reflectance, used for auxiliary buffers.
    fn albedo(&self) -> Spectrum;

    fn is_delta(&self) -> bool;
}

/// Lambertian reflection on whichever side `wo` lies.
#[derive(Debug, Clone, Copy)]
pub struct LambertBsdf {
    pub albedo: Spectrum,
    pub normal: Vec3,
}

impl Bsdf for LambertBsdf {
    fn eval(&self, wi: Vec3, wo: Vec3, _mode: TransportMode) -> Spectrum {
        if wi.dot(self.normal) * wo.dot(self.normal) <= 0.0 {
            return Spectrum::ZERO;
        }
        self.albedo * FRAC_1_PI
    }

    fn sample(&self, wo: Vec3, _mode: TransportMode, sam: Vec3) -> Option<BsdfSample> {
        let cos_o = wo.dot(self.normal);
        if cos_o == 0.0 {
            return None;
        }
        let n = if cos_o > 0.0 { self.normal } else { -self.normal };
        let local = sampling::cosine_hemisphere(Vec2::new(sam.x, sam.y));
        let pdf = sampling::cosine_hemisphere_pdf(local.z);
        if pdf <= 0.0 {
            return None;
        }
        Some(BsdfSample {
            dir: Frame::from_normal(n).to_world(local),
            f: self.albedo * FRAC_1_PI,
            pdf,
            is_delta: false,
        })
    }

    fn pdf(&self, wi: Vec3, wo: Vec3) -> f32 {
        let cos_i = wi.dot(self.normal);
        if cos_i * wo.dot(self.normal) <= 0.0 {
            return 0.0;
        }
        sampling::cosine_hemisphere_pdf(cos_i.abs())
    }

    fn albedo(&self) -> Spectrum {
        self.albedo
    }

    fn is_delta(&self) -> bool {
        false
    }
}

/// Perfect specular reflection.
#[derive(Debug, Clone, Copy)]
pub struct MirrorBsdf {
    pub reflectance: Spectrum,
    pub normal: Vec3,
}

impl Bsdf for MirrorBsdf {
    fn eval(&self, _wi: Vec3, _wo: Vec3, _mode: TransportMode) -> Spectrum {
        Spectrum::ZERO
    }

    fn sample(&self, wo: Vec3, _mode: TransportMode, _sam: Vec3) -> Option<BsdfSample> {
        let cos_o = wo.dot(self.normal);
        if cos_o == 0.0 {
            return None;
        }
        Some(BsdfSample {
            dir: 2.0 * cos_o * self.normal - wo,
            f: self.reflectance / cos_o.abs(),
            pdf: 1.0,
            is_delta: true,
        })
    }

    fn pdf(&self, _wi: Vec3, _wo: Vec3) -> f32 {
        0.0
    }

    fn albedo(&self) -> Spectrum {
        self.reflectance
    }

    fn is_delta(&self) -> bool {
        true
    }
}

/// Lets paths continue straight through. Used for medium boundaries.
#[derive(Debug, Clone, Copy)]
pub struct PassThroughBsdf {
    pub normal: Vec3,
}

impl Bsdf for PassThroughBsdf {
    fn eval(&self, _wi: Vec3, _wo: Vec3, _mode: TransportMode) -> Spectrum {
        Spectrum::ZERO
    }

    fn sample(&self, wo: Vec3, _mode: TransportMode, _sam: Vec3) -> Option<BsdfSample> {
        let cos = wo.dot(self.normal).abs();
        if cos == 0.0 {
            return None;
        }
        Some(BsdfSample {
            dir: -wo,
            f: Spectrum::splat(1.0 / cos),
            pdf: 1.0,
            is_delta: true,
        })
    }

    fn pdf(&self, _wi: Vec3, _wo: Vec3) -> f32 {
        0.0
    }

    fn albedo(&self) -> Spectrum {
        Spectrum::ONE
    }

    fn is_delta(&self) -> bool {
        true
    }
}

/// Henyey-Greenstein phase function. Positive `g` scatters forward.
#[derive(Debug, Clone, Copy)]
pub struct HenyeyGreenstein {
    pub g: f32,
}

impl HenyeyGreenstein {
    /// Density for the cosine between the propagation directions.
    fn phase(&self, cos_theta: f32) -> f32 {
        let g = self.g;
        let denom = 1.0 + g * g - 2.0 * g * cos_theta;
        (1.0 - g * g) / (4.0 * PI * denom * denom.max(0.0).sqrt())
    }
}

impl Bsdf for HenyeyGreenstein {
    fn eval(&self, wi: Vec3, wo: Vec3, _mode: TransportMode) -> Spectrum {
        Spectrum::splat(self.phase((-wo).dot(wi)))
    }

    fn sample(&self, wo: Vec3, _mode: TransportMode, sam: Vec3) -> Option<BsdfSample> {
        let g = self.g;
        let cos_theta = if g.abs() < 1e-3 {
            1.0 - 2.0 * sam.x
        } else {
            let sqr = (1.0 - g * g) / (1.0 - g + 2.0 * g * sam.x);
            ((1.0 + g * g - sqr * sqr) / (2.0 * g)).clamp(-1.0, 1.0)
        };
        let sin_theta = (1.0 - cos_theta * cos_theta).max(0.0).sqrt();
        let phi = 2.0 * PI * sam.y;
        let local = Vec3::new(sin_theta * phi.cos(), sin_theta * phi.sin(), cos_theta);

        let dir = Frame::from_normal(-wo).to_world(local);
        let p = self.phase(cos_theta);
        Some(BsdfSample {
            dir,
            f: Spectrum::splat(p),
            pdf: p,
            is_delta: false,
        })
    }

    fn pdf(&self, wi: Vec3, wo: Vec3) -> f32 {
        self.phase((-wo).dot(wi))
    }

    fn albedo(&self) -> Spectrum {
        Spectrum::ONE
    }

    fn is_delta(&self) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Sampler;

    #[test]
    fn test_lambert_sample_matches_pdf() {
        let bsdf = LambertBsdf {
            albedo: Spectrum::splat(0.5),
            normal: Vec3::Y,
        };
        let mut sampler = Sampler::new(42);
        let wo = Vec3::new(0.3, -0.8, 0.1).normalize();

        for _ in 0..200 {
            let s = bsdf.sample(wo, TransportMode::Radiance, sampler.sample3()).unwrap();
            // Stays on the side of wo
            assert!(s.dir.dot(Vec3::Y) <= 0.0);
            assert!((bsdf.pdf(s.dir, wo) - s.pdf).abs() < 1e-4);
            assert!((bsdf.eval(s.dir, wo, TransportMode::Radiance) - s.f).length() < 1e-6);
        }
    }

    #[test]
    fn test_lambert_opposite_sides_black() {
        let bsdf = LambertBsdf {
            albedo: Spectrum::ONE,
            normal: Vec3::Z,
        };
        assert_eq!(bsdf.eval(Vec3::Z, -Vec3::Z, TransportMode::Radiance), Spectrum::ZERO);
        assert_eq!(bsdf.pdf(Vec3::Z, -Vec3::Z), 0.0);
    }

    #[test]
    fn test_mirror_reflects() {
        let bsdf = MirrorBsdf {
            reflectance: Spectrum::ONE,
            normal: Vec3::Y,
        };
        let wo = Vec3::new(1.0, 1.0, 0.0).normalize();
        let s = bsdf.sample(wo, TransportMode::Radiance, Vec3::ZERO).unwrap();

        assert!(s.is_delta);
        assert!((s.dir - Vec3::new(-1.0, 1.0, 0.0).normalize()).length() < 1e-5);
        assert_eq!(bsdf.pdf(s.dir, wo), 0.0);
    }

    #[test]
    fn test_pass_through_keeps_direction() {
        let bsdf = PassThroughBsdf { normal: Vec3::Z };
        let wo = Vec3::new(0.0, 0.6, 0.8);
        let s = bsdf.sample(wo, TransportMode::Importance, Vec3::ZERO).unwrap();

        assert_eq!(s.dir, -wo);
        // f * |cos| / pdf leaves throughput unchanged
        assert!((s.f.x * s.dir.dot(Vec3::Z).abs() - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_hg_mean_cosine_is_g() {
        let phase = HenyeyGreenstein { g: 0.6 };
        let mut sampler = Sampler::new(42);
        let wo = -Vec3::X;
        let n = 20_000;
        let mut mean = 0.0;
        for _ in 0..n {
            let s = phase.sample(wo, TransportMode::Radiance, sampler.sample3()).unwrap();
            assert!((phase.pdf(s.dir, wo) - s.pdf).abs() < 1e-3 * s.pdf.max(1.0));
            mean += s.dir.dot(-wo);
        }
        mean /= n as f32;
        assert!((mean - 0.6).abs() < 0.03, "mean cosine {mean}");
    }

    #[test]
    fn test_hg_isotropic_density() {
        let phase = HenyeyGreenstein { g: 0.0 };
        let p = phase.pdf(Vec3::X, Vec3::Y);
        assert!((p - 1.0 / (4.0 * PI)).abs() < 1e-6);
    }
}

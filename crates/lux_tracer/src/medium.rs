//! Participating media.

use crate::bsdf::{Bsdf, HenyeyGreenstein};
use crate::{Sampler, SceneError, Spectrum};
use bumpalo::Bump;
use lux_math::Vec3;

/// Scattering event sampled inside a medium.
pub struct MediumScattering<'a> {
    pub pos: Vec3,
    pub phase: &'a dyn Bsdf,
}

pub struct MediumSample<'a> {
    /// Throughput factor for the sampled segment, already divided by its pdf
    pub throughput: Spectrum,
    /// `None` when the path reaches the end of the segment
    pub scattering: Option<MediumScattering<'a>>,
}

pub trait Medium: Send + Sync {
    /// Transmittance between two points.
    fn tr(&self, a: Vec3, b: Vec3) -> Spectrum;

    /// Sample a scattering distance along `origin + t * dir` for `t` in
    /// `[0, t_max)`. `dir` must be unit length.
    fn sample_scattering<'a>(
        &self,
        origin: Vec3,
        dir: Vec3,
        t_max: f32,
        sampler: &mut Sampler,
        arena: &'a Bump,
    ) -> MediumSample<'a>;
}

/// `exp(-sigma * d)` per channel, with zero coefficients passing everything
/// even over infinite distances.
fn beer_lambert(sigma: Spectrum, d: f32) -> Spectrum {
    let channel = |s: f32| if s == 0.0 { 1.0 } else { (-s * d).exp() };
    Spectrum::new(channel(sigma.x), channel(sigma.y), channel(sigma.z))
}

fn check_coefficient(name: &str, value: Spectrum) -> Result<(), SceneError> {
    if !value.is_finite() || value.min_element() < 0.0 {
        return Err(SceneError::InvalidMedium(format!(
            "{name} must be finite and non-negative, got {value}"
        )));
    }
    Ok(())
}

/// Purely absorbing medium. Never scatters.
pub struct AbsorptionMedium {
    sigma_a: Spectrum,
}

impl AbsorptionMedium {
    pub fn new(sigma_a: Spectrum) -> Result<Self, SceneError> {
        check_coefficient("sigma_a", sigma_a)?;
        Ok(Self { sigma_a })
    }
}

impl Medium for AbsorptionMedium {
    fn tr(&self, a: Vec3, b: Vec3) -> Spectrum {
        beer_lambert(self.sigma_a, a.distance(b))
    }

    fn sample_scattering<'a>(
        &self,
        _origin: Vec3,
        _dir: Vec3,
        t_max: f32,
        _sampler: &mut Sampler,
        _arena: &'a Bump,
    ) -> MediumSample<'a> {
        MediumSample {
            throughput: beer_lambert(self.sigma_a, t_max),
            scattering: None,
        }
    }
}

/// Homogeneous medium with Henyey-Greenstein scattering.
pub struct HomogeneousMedium {
    sigma_s: Spectrum,
    sigma_t: Spectrum,
    g: f32,
}

impl HomogeneousMedium {
    /// Fails unless both coefficients are non-negative and `g` lies in (-1, 1).
    pub fn new(sigma_a: Spectrum, sigma_s: Spectrum, g: f32) -> Result<Self, SceneError> {
        check_coefficient("sigma_a", sigma_a)?;
        check_coefficient("sigma_s", sigma_s)?;
        if !(g > -1.0 && g < 1.0) {
            return Err(SceneError::InvalidMedium(format!(
                "asymmetry g must lie in (-1, 1), got {g}"
            )));
        }
        Ok(Self {
            sigma_s,
            sigma_t: sigma_a + sigma_s,
            g,
        })
    }
}

impl Medium for HomogeneousMedium {
    fn tr(&self, a: Vec3, b: Vec3) -> Spectrum {
        beer_lambert(self.sigma_t, a.distance(b))
    }

    fn sample_scattering<'a>(
        &self,
        origin: Vec3,
        dir: Vec3,
        t_max: f32,
        sampler: &mut Sampler,
        arena: &'a Bump,
    ) -> MediumSample<'a> {
        // Distance sampled from one channel, density averaged over all three
        let channel = ((sampler.sample1() * 3.0) as usize).min(2);
        let sigma_c = self.sigma_t[channel];
        let dist = if sigma_c > 0.0 {
            -(1.0 - sampler.sample1()).ln() / sigma_c
        } else {
            f32::INFINITY
        };

        let t = dist.min(t_max);
        let scattered = t < t_max;
        let tr = beer_lambert(self.sigma_t, t);
        let density = if scattered { self.sigma_t * tr } else { tr };
        let mut pdf = (density.x + density.y + density.z) / 3.0;
        if pdf == 0.0 {
            pdf = 1.0;
        }

        if scattered {
            let phase: &'a dyn Bsdf = arena.alloc(HenyeyGreenstein { g: self.g });
            MediumSample {
                throughput: tr * self.sigma_s / pdf,
                scattering: Some(MediumScattering {
                    pos: origin + dir * t,
                    phase,
                }),
            }
        } else {
            MediumSample {
                throughput: tr / pdf,
                scattering: None,
            }
        }
    }
}

//! Per-sample integrator output.

use crate::Spectrum;
use lux_math::Vec3;

/// Estimate for one film sample plus the denoiser's auxiliary channels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pixel {
    pub value: Spectrum,
    pub albedo: Spectrum,
    pub normal: Vec3,
    /// 1 when `albedo` and `normal` describe a surface the denoiser may use
    pub denoise: f32,
}

impl Pixel {
    pub fn from_value(value: Spectrum) -> Self {
        Self {
            value,
            ..Self::default()
        }
    }
}

impl Default for Pixel {
    fn default() -> Self {
        Self {
            value: Spectrum::ZERO,
            albedo: Spectrum::ZERO,
            normal: Vec3::ZERO,
            denoise: 0.0,
        }
    }
}

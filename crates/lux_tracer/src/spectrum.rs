//! RGB radiance values.

use lux_math::Vec3;

/// Linear RGB radiance, importance or throughput.
pub type Spectrum = Vec3;

/// True when every channel is zero.
#[inline]
pub fn is_black(s: Spectrum) -> bool {
    s.x == 0.0 && s.y == 0.0 && s.z == 0.0
}

/// True when no channel is NaN or infinite.
#[inline]
pub fn is_finite(s: Spectrum) -> bool {
    s.is_finite()
}

/// Usable as a contribution: finite and not black.
#[inline]
pub fn is_valid_contribution(s: Spectrum) -> bool {
    is_finite(s) && !is_black(s)
}

/// Rec. 709 luminance.
#[inline]
pub fn luminance(s: Spectrum) -> f32 {
    0.2126 * s.x + 0.7152 * s.y + 0.0722 * s.z
}

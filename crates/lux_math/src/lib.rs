// Re-export glam for convenience
pub use glam::*;

// Lux math types
mod aabb;
mod frame;
mod interval;
mod ray;
pub mod sampling;

pub use aabb::Aabb;
pub use frame::Frame;
pub use interval::Interval;
pub use ray::{Ray, RAY_EPSILON};
pub use sampling::Distribution1D;

/// Dot product clamped to its absolute value, the usual cosine factor.
#[inline]
pub fn abs_dot(a: Vec3, b: Vec3) -> f32 {
    a.dot(b).abs()
}

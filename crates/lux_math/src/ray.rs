use crate::{Interval, Vec3};

/// Offset used when spawning rays off a surface and when shortening shadow
/// segments so they do not re-hit their endpoints.
pub const RAY_EPSILON: f32 = 1e-4;

/// A ray with a parameter range `[t_min, t_max)`.
///
/// Directions are expected to be unit length wherever `t` is read as a
/// distance (media, shadow segments).
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Ray {
    pub origin: Vec3,
    pub direction: Vec3,
    pub t_min: f32,
    pub t_max: f32,
}

impl Ray {
    /// Ray over `[0, inf)`.
    pub fn new(origin: Vec3, direction: Vec3) -> Self {
        Self::with_range(origin, direction, 0.0, f32::INFINITY)
    }

    pub fn with_range(origin: Vec3, direction: Vec3, t_min: f32, t_max: f32) -> Self {
        Self {
            origin,
            direction,
            t_min,
            t_max,
        }
    }

    /// Ray leaving a surface point, skipping the surface itself.
    pub fn spawn(origin: Vec3, direction: Vec3) -> Self {
        Self::with_range(origin, direction, RAY_EPSILON, f32::INFINITY)
    }

    /// Shadow segment from `a` towards `b` that stops short of both ends.
    ///
    /// Returns the segment and its length.
    pub fn between(a: Vec3, b: Vec3) -> (Self, f32) {
        let d = b - a;
        let dist = d.length();
        let dir = if dist > 0.0 { d / dist } else { Vec3::Z };
        (
            Self::with_range(a, dir, RAY_EPSILON, dist - RAY_EPSILON),
            dist,
        )
    }

    /// Point along the ray at parameter t.
    pub fn at(&self, t: f32) -> Vec3 {
        self.origin + self.direction * t
    }

    pub fn range(&self) -> Interval {
        Interval::new(self.t_min, self.t_max)
    }
}

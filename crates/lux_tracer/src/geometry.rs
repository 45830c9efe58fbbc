//! Geometry trait for ray-shape intersection and area sampling.

use lux_math::{Aabb, Ray, Vec2, Vec3};

/// Intersection of a ray with a bare shape.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeometryHit {
    /// Ray parameter at the intersection
    pub t: f32,
    pub pos: Vec3,
    /// Outward geometric normal (unit length)
    pub normal: Vec3,
    pub uv: Vec2,
}

/// Point sampled uniformly by area on a shape.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeometrySample {
    pub pos: Vec3,
    pub normal: Vec3,
    /// Area-measure density
    pub pdf_area: f32,
}

/// A shape that rays can hit and lights can be sampled from.
pub trait Geometry: Send + Sync {
    /// Closest intersection with `t` in the ray's `[t_min, t_max)`.
    fn intersect(&self, ray: &Ray) -> Option<GeometryHit>;

    fn has_intersection(&self, ray: &Ray) -> bool {
        self.intersect(ray).is_some()
    }

    fn bounding_box(&self) -> Aabb;

    fn surface_area(&self) -> f32;

    /// Uniform-by-area point for `u` in [0, 1)^2.
    fn sample(&self, u: Vec2) -> GeometrySample;
}

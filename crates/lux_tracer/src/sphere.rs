//! Sphere primitive for ray tracing.

use crate::geometry::{Geometry, GeometryHit, GeometrySample};
use crate::SceneError;
use lux_math::{sampling, Aabb, Ray, Vec2, Vec3};
use std::f32::consts::PI;

pub struct Sphere {
    center: Vec3,
    radius: f32,
    bbox: Aabb,
}

impl Sphere {
    pub fn new(center: Vec3, radius: f32) -> Result<Self, SceneError> {
        if !(radius > 0.0) || !radius.is_finite() {
            return Err(SceneError::InvalidGeometry(format!(
                "sphere radius must be positive, got {radius}"
            )));
        }
        let rvec = Vec3::splat(radius);
        Ok(Self {
            center,
            radius,
            bbox: Aabb::from_points(center - rvec, center + rvec),
        })
    }

    /// UV coordinates for a point on the unit sphere.
    fn sphere_uv(p: Vec3) -> Vec2 {
        // theta: angle down from +Y, phi: angle around Y from +X
        let theta = (-p.y).clamp(-1.0, 1.0).acos();
        let phi = (-p.z).atan2(p.x) + PI;
        Vec2::new(phi / (2.0 * PI), theta / PI)
    }
}

impl Geometry for Sphere {
    fn intersect(&self, ray: &Ray) -> Option<GeometryHit> {
        let oc = self.center - ray.origin;
        let a = ray.direction.length_squared();
        let h = ray.direction.dot(oc);
        let c = oc.length_squared() - self.radius * self.radius;

        let discriminant = h * h - a * c;
        if discriminant < 0.0 {
            return None;
        }
        let sqrtd = discriminant.sqrt();

        // Nearest root in range
        let range = ray.range();
        let mut root = (h - sqrtd) / a;
        if !range.contains_half_open(root) {
            root = (h + sqrtd) / a;
            if !range.contains_half_open(root) {
                return None;
            }
        }

        let pos = ray.at(root);
        let normal = (pos - self.center) / self.radius;
        Some(GeometryHit {
            t: root,
            pos,
            normal,
            uv: Self::sphere_uv(normal),
        })
    }

    fn bounding_box(&self) -> Aabb {
        self.bbox
    }

    fn surface_area(&self) -> f32 {
        4.0 * PI * self.radius * self.radius
    }

    fn sample(&self, u: Vec2) -> GeometrySample {
        let n = sampling::uniform_sphere(u);
        GeometrySample {
            pos: self.center + self.radius * n,
            normal: n,
            pdf_area: 1.0 / self.surface_area(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sphere_hit_front() {
        let sphere = Sphere::new(Vec3::new(0.0, 0.0, -1.0), 0.5).unwrap();
        let hit = sphere.intersect(&Ray::new(Vec3::ZERO, -Vec3::Z)).unwrap();

        assert!((hit.t - 0.5).abs() < 1e-5);
        assert!((hit.normal - Vec3::Z).length() < 1e-5);
    }

    #[test]
    fn test_sphere_hit_from_inside() {
        let sphere = Sphere::new(Vec3::ZERO, 2.0).unwrap();
        let hit = sphere.intersect(&Ray::new(Vec3::ZERO, Vec3::X)).unwrap();

        assert!((hit.t - 2.0).abs() < 1e-5);
        // Normal stays outward
        assert!((hit.normal - Vec3::X).length() < 1e-5);
    }

    #[test]
    fn test_sphere_invalid_radius() {
        assert!(Sphere::new(Vec3::ZERO, 0.0).is_err());
        assert!(Sphere::new(Vec3::ZERO, f32::NAN).is_err());
    }

    #[test]
    fn test_sphere_sample() {
        let sphere = Sphere::new(Vec3::ONE, 2.0).unwrap();
        let s = sphere.sample(Vec2::new(0.2, 0.7));

        assert!(((s.pos - Vec3::ONE).length() - 2.0).abs() < 1e-4);
        assert!((s.pdf_area * sphere.surface_area() - 1.0).abs() < 1e-5);
    }
}

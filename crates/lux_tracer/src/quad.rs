//! Parallelogram primitive, the usual shape for area lights and walls.

use crate::geometry::{Geometry, GeometryHit, GeometrySample};
use crate::SceneError;
use lux_math::{Aabb, Ray, Vec2, Vec3};

/// Parallelogram `corner + a * edge_u + b * edge_v` for `a, b` in [0, 1].
/// The outward normal is `edge_u x edge_v`.
pub struct Quad {
    corner: Vec3,
    edge_u: Vec3,
    edge_v: Vec3,
    normal: Vec3,
    // Projects a plane offset onto (a, b)
    w: Vec3,
    area: f32,
    bbox: Aabb,
}

impl Quad {
    pub fn new(corner: Vec3, edge_u: Vec3, edge_v: Vec3) -> Result<Self, SceneError> {
        let n = edge_u.cross(edge_v);
        let area = n.length();
        if !(area > 0.0) || !area.is_finite() {
            return Err(SceneError::InvalidGeometry("quad has zero area".to_string()));
        }

        let bbox = Aabb::surrounding(
            &Aabb::from_points(corner, corner + edge_u + edge_v),
            &Aabb::from_points(corner + edge_u, corner + edge_v),
        );

        Ok(Self {
            corner,
            edge_u,
            edge_v,
            normal: n / area,
            w: n / n.dot(n),
            area,
            bbox,
        })
    }

    pub fn normal(&self) -> Vec3 {
        self.normal
    }
}

impl Geometry for Quad {
    fn intersect(&self, ray: &Ray) -> Option<GeometryHit> {
        let denom = self.normal.dot(ray.direction);
        if denom.abs() < 1e-8 {
            return None;
        }

        let t = (self.corner - ray.origin).dot(self.normal) / denom;
        if !ray.range().contains_half_open(t) {
            return None;
        }

        let pos = ray.at(t);
        let planar = pos - self.corner;
        let a = self.w.dot(planar.cross(self.edge_v));
        let b = self.w.dot(self.edge_u.cross(planar));
        if !(0.0..=1.0).contains(&a) || !(0.0..=1.0).contains(&b) {
            return None;
        }

        Some(GeometryHit {
            t,
            pos,
            normal: self.normal,
            uv: Vec2::new(a, b),
        })
    }

    fn bounding_box(&self) -> Aabb {
        self.bbox
    }

    fn surface_area(&self) -> f32 {
        self.area
    }

    fn sample(&self, u: Vec2) -> GeometrySample {
        GeometrySample {
            pos: self.corner + u.x * self.edge_u + u.y * self.edge_v,
            normal: self.normal,
            pdf_area: 1.0 / self.area,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn floor() -> Quad {
        // Normal points +Y
        Quad::new(Vec3::new(-1.0, 0.0, 1.0), Vec3::new(2.0, 0.0, 0.0), Vec3::new(0.0, 0.0, -2.0))
            .unwrap()
    }

    #[test]
    fn test_quad_normal_and_area() {
        let q = floor();
        assert!((q.normal() - Vec3::Y).length() < 1e-6);
        assert!((q.surface_area() - 4.0).abs() < 1e-6);
    }

    #[test]
    fn test_quad_hit_uv() {
        let q = floor();
        let hit = q.intersect(&Ray::new(Vec3::new(0.0, 2.0, 0.0), -Vec3::Y)).unwrap();

        assert!((hit.t - 2.0).abs() < 1e-5);
        assert!((hit.uv - Vec2::splat(0.5)).length() < 1e-5);
    }

    #[test]
    fn test_quad_miss_outside() {
        let q = floor();
        assert!(q.intersect(&Ray::new(Vec3::new(1.5, 2.0, 0.0), -Vec3::Y)).is_none());
        assert!(q.intersect(&Ray::new(Vec3::new(0.0, 2.0, 0.0), Vec3::X)).is_none());
    }

    #[test]
    fn test_quad_zero_area() {
        assert!(Quad::new(Vec3::ZERO, Vec3::X, Vec3::X * 3.0).is_err());
    }
}

//! Triangle primitive using the Möller-Trumbore intersection test.

use crate::geometry::{Geometry, GeometryHit, GeometrySample};
use crate::SceneError;
use lux_math::{sampling, Aabb, Ray, Vec2, Vec3};

pub struct Triangle {
    v0: Vec3,
    edge1: Vec3,
    edge2: Vec3,
    normal: Vec3,
    area: f32,
    bbox: Aabb,
}

impl Triangle {
    /// Triangle with counter-clockwise winding around its outward normal.
    pub fn new(v0: Vec3, v1: Vec3, v2: Vec3) -> Result<Self, SceneError> {
        let edge1 = v1 - v0;
        let edge2 = v2 - v0;
        let cross = edge1.cross(edge2);
        let area = 0.5 * cross.length();
        if !(area > 0.0) || !area.is_finite() {
            return Err(SceneError::InvalidGeometry(
                "triangle has zero area".to_string(),
            ));
        }

        let bbox = Aabb::surrounding(
            &Aabb::from_points(v0, v1),
            &Aabb::from_points(v0, v2),
        );

        Ok(Self {
            v0,
            edge1,
            edge2,
            normal: cross.normalize(),
            area,
            bbox,
        })
    }
}

impl Geometry for Triangle {
    fn intersect(&self, ray: &Ray) -> Option<GeometryHit> {
        let h = ray.direction.cross(self.edge2);
        let a = self.edge1.dot(h);

        // Ray is parallel to triangle
        if a.abs() < 1e-8 {
            return None;
        }

        let f = 1.0 / a;
        let s = ray.origin - self.v0;
        let u = f * s.dot(h);
        if !(0.0..=1.0).contains(&u) {
            return None;
        }

        let q = s.cross(self.edge1);
        let v = f * ray.direction.dot(q);
        if v < 0.0 || u + v > 1.0 {
            return None;
        }

        let t = f * self.edge2.dot(q);
        if !ray.range().contains_half_open(t) {
            return None;
        }

        Some(GeometryHit {
            t,
            pos: ray.at(t),
            normal: self.normal,
            uv: Vec2::new(u, v),
        })
    }

    fn bounding_box(&self) -> Aabb {
        self.bbox
    }

    fn surface_area(&self) -> f32 {
        self.area
    }

    fn sample(&self, u: Vec2) -> GeometrySample {
        let (b0, b1) = sampling::uniform_triangle(u);
        // b0 weights v1, b1 weights v2
        GeometrySample {
            pos: self.v0 + b0 * self.edge1 + b1 * self.edge2,
            normal: self.normal,
            pdf_area: 1.0 / self.area,
        }
    }
}

//! Pinhole camera with the importance function needed for light tracing.
//!
//! Film coordinates are in [0, 1)^2 with (0, 0) at the top-left corner.

use crate::{SceneError, Spectrum};
use lux_math::{Ray, Vec2, Vec3};

/// Camera seen from a scene point, for connecting light paths to the film.
#[derive(Debug, Clone, Copy)]
pub struct CameraWiSample {
    /// Unit direction from the reference point towards the camera
    pub wi: Vec3,
    pub dist: f32,
    /// Solid-angle density at the reference point
    pub pdf: f32,
    pub we: Spectrum,
    pub film: Vec2,
}

#[derive(Debug, Clone)]
pub struct PerspectiveCamera {
    pub image_width: u32,
    pub image_height: u32,

    look_from: Vec3,
    look_at: Vec3,
    vup: Vec3,
    /// Vertical field of view in degrees
    vfov: f32,

    // Cached computed values (set by initialize())
    u: Vec3,
    v: Vec3,
    w: Vec3,
    half_width: f32,
    half_height: f32,
    film_area: f32,
}

impl PerspectiveCamera {
    pub fn new() -> Self {
        Self {
            image_width: 800,
            image_height: 450,
            look_from: Vec3::ZERO,
            look_at: Vec3::new(0.0, 0.0, -1.0),
            vup: Vec3::Y,
            vfov: 90.0,
            u: Vec3::X,
            v: Vec3::Y,
            w: Vec3::Z,
            half_width: 1.0,
            half_height: 1.0,
            film_area: 4.0,
        }
    }

    pub fn with_resolution(mut self, width: u32, height: u32) -> Self {
        self.image_width = width;
        self.image_height = height;
        self
    }

    pub fn with_position(mut self, look_from: Vec3, look_at: Vec3, vup: Vec3) -> Self {
        self.look_from = look_from;
        self.look_at = look_at;
        self.vup = vup;
        self
    }

    pub fn with_fov(mut self, vfov: f32) -> Self {
        self.vfov = vfov;
        self
    }

    /// Compute the camera basis. Must be called before generating rays.
    pub fn initialize(&mut self) -> Result<(), SceneError> {
        if self.image_width == 0 || self.image_height == 0 {
            return Err(SceneError::InvalidCamera("resolution must be non-zero".to_string()));
        }
        if !(self.vfov > 0.0 && self.vfov < 180.0) {
            return Err(SceneError::InvalidCamera(format!(
                "vertical fov must lie in (0, 180), got {}",
                self.vfov
            )));
        }
        let forward = self.look_at - self.look_from;
        if forward.length_squared() == 0.0 || forward.cross(self.vup).length_squared() == 0.0 {
            return Err(SceneError::InvalidCamera(
                "view direction must be non-zero and not parallel to up".to_string(),
            ));
        }

        self.w = -forward.normalize();
        self.u = self.vup.cross(self.w).normalize();
        self.v = self.w.cross(self.u);

        self.half_height = (self.vfov.to_radians() / 2.0).tan();
        self.half_width =
            self.half_height * (self.image_width as f32 / self.image_height as f32);
        self.film_area = 4.0 * self.half_width * self.half_height;
        Ok(())
    }

    pub fn position(&self) -> Vec3 {
        self.look_from
    }

    pub fn forward(&self) -> Vec3 {
        -self.w
    }

    /// Primary ray through a film point, with unit direction.
    pub fn generate_ray(&self, film: Vec2) -> Ray {
        let x = (2.0 * film.x - 1.0) * self.half_width;
        let y = (1.0 - 2.0 * film.y) * self.half_height;
        let dir = (-self.w + x * self.u + y * self.v).normalize();
        Ray::new(self.look_from, dir)
    }

    /// Film point hit by a ray leaving the camera along unit `dir`.
    pub fn film_point(&self, dir: Vec3) -> Option<Vec2> {
        let cos = dir.dot(-self.w);
        if cos <= 0.0 {
            return None;
        }
        let p = dir / cos;
        let x = p.dot(self.u) / self.half_width;
        let y = p.dot(self.v) / self.half_height;
        let film = Vec2::new(0.5 * (x + 1.0), 0.5 * (1.0 - y));
        if film.x < 0.0 || film.x >= 1.0 || film.y < 0.0 || film.y >= 1.0 {
            return None;
        }
        Some(film)
    }

    /// Importance emitted along unit `dir`, and the film point it lands on.
    pub fn eval_we(&self, dir: Vec3) -> (Spectrum, Option<Vec2>) {
        match self.film_point(dir) {
            Some(film) => {
                let cos = dir.dot(-self.w);
                let cos2 = cos * cos;
                (Spectrum::splat(1.0 / (self.film_area * cos2 * cos2)), Some(film))
            }
            None => (Spectrum::ZERO, None),
        }
    }

    /// Position and direction densities of generating a ray along unit `dir`.
    pub fn pdf_we(&self, dir: Vec3) -> (f32, f32) {
        if self.film_point(dir).is_none() {
            return (0.0, 0.0);
        }
        let cos = dir.dot(-self.w);
        (1.0, 1.0 / (self.film_area * cos * cos * cos))
    }

    /// Connect a scene point to the camera.
    pub fn sample_wi(&self, ref_pos: Vec3) -> Option<CameraWiSample> {
        let d = self.look_from - ref_pos;
        let dist = d.length();
        if dist == 0.0 {
            return None;
        }
        let wi = d / dist;
        let (we, film) = self.eval_we(-wi);
        let film = film?;
        let cos = (-wi).dot(-self.w);
        Some(CameraWiSample {
            wi,
            dist,
            pdf: dist * dist / cos,
            we,
            film,
        })
    }
}

impl Default for PerspectiveCamera {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Sampler;
    use lux_math::sampling;
    use std::f32::consts::PI;

    fn camera() -> PerspectiveCamera {
        let mut camera = PerspectiveCamera::new()
            .with_resolution(200, 100)
            .with_position(Vec3::ZERO, Vec3::new(0.0, 0.0, -1.0), Vec3::Y)
            .with_fov(90.0);
        camera.initialize().unwrap();
        camera
    }

    #[test]
    fn test_camera_initialize() {
        let camera = camera();
        assert!((camera.forward() + Vec3::Z).length() < 1e-6);
        assert!((camera.half_width - 2.0).abs() < 1e-5);
    }

    #[test]
    fn test_camera_invalid() {
        let mut bad = PerspectiveCamera::new().with_fov(180.0);
        assert!(bad.initialize().is_err());
        let mut bad = PerspectiveCamera::new().with_resolution(0, 10);
        assert!(bad.initialize().is_err());
        let mut bad = PerspectiveCamera::new().with_position(Vec3::ZERO, Vec3::Y, Vec3::Y);
        assert!(bad.initialize().is_err());
    }

    #[test]
    fn test_film_orientation() {
        let camera = camera();
        // Top-left of the film looks up and to the left
        let ray = camera.generate_ray(Vec2::new(0.0, 0.0));
        assert!(ray.direction.x < 0.0 && ray.direction.y > 0.0 && ray.direction.z < 0.0);

        let film = Vec2::new(0.3, 0.8);
        let back = camera.film_point(camera.generate_ray(film).direction).unwrap();
        assert!((back - film).length() < 1e-5);
    }

    #[test]
    fn test_importance_integrates_to_one() {
        let camera = camera();
        let mut sampler = Sampler::new(42);
        let n = 200_000;
        let mut sum = 0.0;
        for _ in 0..n {
            let dir = sampling::uniform_sphere(sampler.sample2());
            let (we, _) = camera.eval_we(dir);
            let cos = dir.dot(camera.forward()).max(0.0);
            sum += we.x * cos * 4.0 * PI;
        }
        let mean = sum / n as f32;
        assert!((mean - 1.0).abs() < 0.05, "mean {mean}");
    }

    #[test]
    fn test_sample_wi() {
        let camera = camera();
        let s = camera.sample_wi(Vec3::new(0.0, 0.0, -2.0)).unwrap();
        assert!((s.wi - Vec3::Z).length() < 1e-6);
        assert!((s.pdf - 4.0).abs() < 1e-4);
        assert!((s.film - Vec2::splat(0.5)).length() < 1e-5);

        // Behind the camera
        assert!(camera.sample_wi(Vec3::new(0.0, 0.0, 2.0)).is_none());
    }
}

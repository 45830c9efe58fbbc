//! Warps from the unit square to common sampling domains, and a discrete
//! distribution for picking among weighted items.

use crate::{Vec2, Vec3};
use std::f32::consts::{FRAC_1_PI, PI};

pub const UNIFORM_SPHERE_PDF: f32 = 1.0 / (4.0 * PI);

/// Cosine-weighted direction around local +Z.
pub fn cosine_hemisphere(u: Vec2) -> Vec3 {
    let d = concentric_disk(u);
    let z = (1.0 - d.x * d.x - d.y * d.y).max(0.0).sqrt();
    Vec3::new(d.x, d.y, z)
}

pub fn cosine_hemisphere_pdf(cos_theta: f32) -> f32 {
    cos_theta.max(0.0) * FRAC_1_PI
}

pub fn uniform_sphere(u: Vec2) -> Vec3 {
    let z = 1.0 - 2.0 * u.x;
    let r = (1.0 - z * z).max(0.0).sqrt();
    let phi = 2.0 * PI * u.y;
    Vec3::new(r * phi.cos(), r * phi.sin(), z)
}

/// Shirley-Chiu concentric mapping onto the unit disk.
pub fn concentric_disk(u: Vec2) -> Vec2 {
    let offset = 2.0 * u - Vec2::ONE;
    if offset.x == 0.0 && offset.y == 0.0 {
        return Vec2::ZERO;
    }
    let (r, theta) = if offset.x.abs() > offset.y.abs() {
        (offset.x, (PI / 4.0) * (offset.y / offset.x))
    } else {
        (offset.y, PI / 2.0 - (PI / 4.0) * (offset.x / offset.y))
    };
    r * Vec2::new(theta.cos(), theta.sin())
}

/// Barycentric coordinates `(b0, b1)` uniformly distributed over a triangle.
pub fn uniform_triangle(u: Vec2) -> (f32, f32) {
    let su0 = u.x.sqrt();
    (1.0 - su0, u.y * su0)
}

/// Piecewise-constant discrete distribution.
///
/// Falls back to a uniform choice when every weight is zero or any weight is
/// not finite.
#[derive(Debug, Clone)]
pub struct Distribution1D {
    func: Vec<f32>,
    cdf: Vec<f32>,
    func_sum: f32,
}

impl Distribution1D {
    pub fn new(weights: &[f32]) -> Self {
        let valid = weights.iter().all(|w| w.is_finite() && *w >= 0.0);
        let mut func: Vec<f32> = weights.to_vec();
        let mut func_sum: f32 = func.iter().sum();
        if !valid || func_sum <= 0.0 {
            func.iter_mut().for_each(|w| *w = 1.0);
            func_sum = func.len() as f32;
        }

        let mut cdf = Vec::with_capacity(func.len() + 1);
        cdf.push(0.0);
        let mut running = 0.0;
        for w in &func {
            running += w / func_sum;
            cdf.push(running);
        }
        if let Some(last) = cdf.last_mut() {
            *last = 1.0;
        }

        Self {
            func,
            cdf,
            func_sum,
        }
    }

    pub fn count(&self) -> usize {
        self.func.len()
    }

    pub fn is_empty(&self) -> bool {
        self.func.is_empty()
    }

    /// Pick an index for `u` in [0, 1). Returns the index and its probability,
    /// or `None` for an empty distribution.
    pub fn sample_discrete(&self, u: f32) -> Option<(usize, f32)> {
        if self.func.is_empty() {
            return None;
        }
        // Last cdf entry <= u, restricted to real buckets
        let mut idx = self
            .cdf
            .partition_point(|c| *c <= u)
            .saturating_sub(1)
            .min(self.func.len() - 1);
        // Skip zero-weight buckets landed on through float rounding
        while self.func[idx] == 0.0 && idx + 1 < self.func.len() {
            idx += 1;
        }
        Some((idx, self.discrete_pdf(idx)))
    }

    pub fn discrete_pdf(&self, index: usize) -> f32 {
        self.func
            .get(index)
            .map_or(0.0, |w| w / self.func_sum)
    }
}

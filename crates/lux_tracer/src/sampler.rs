//! Per-worker uniform sample streams.

use lux_math::{Vec2, Vec3};
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

/// Independent stream of uniform samples in [0, 1).
///
/// Each worker owns one; the stream restarts from its seed with [`Sampler::reseed`].
#[derive(Debug, Clone)]
pub struct Sampler {
    rng: SmallRng,
}

impl Sampler {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: SmallRng::seed_from_u64(seed),
        }
    }

    pub fn reseed(&mut self, seed: u64) {
        self.rng = SmallRng::seed_from_u64(seed);
    }

    #[inline]
    pub fn sample1(&mut self) -> f32 {
        self.rng.gen()
    }

    #[inline]
    pub fn sample2(&mut self) -> Vec2 {
        Vec2::new(self.rng.gen(), self.rng.gen())
    }

    #[inline]
    pub fn sample3(&mut self) -> Vec3 {
        Vec3::new(self.rng.gen(), self.rng.gen(), self.rng.gen())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sampler_range() {
        let mut sampler = Sampler::new(42);
        for _ in 0..1000 {
            let u = sampler.sample3();
            assert!(u.cmpge(Vec3::ZERO).all() && u.cmplt(Vec3::ONE).all());
        }
    }

    #[test]
    fn test_sampler_restart() {
        let mut a = Sampler::new(7);
        let first: Vec<f32> = (0..8).map(|_| a.sample1()).collect();
        a.reseed(7);
        let again: Vec<f32> = (0..8).map(|_| a.sample1()).collect();
        assert_eq!(first, again);

        let mut b = Sampler::new(8);
        let other: Vec<f32> = (0..8).map(|_| b.sample1()).collect();
        assert_ne!(first, other);
    }
}

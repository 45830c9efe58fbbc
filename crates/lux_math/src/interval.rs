/// Range of ray parameters or of one box axis.
///
/// Bounds are inclusive unless a method says otherwise. `min > max` is the
/// canonical empty range.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Interval {
    pub min: f32,
    pub max: f32,
}

impl Interval {
    pub const EMPTY: Interval = Interval {
        min: f32::INFINITY,
        max: f32::NEG_INFINITY,
    };

    pub const UNIVERSE: Interval = Interval {
        min: f32::NEG_INFINITY,
        max: f32::INFINITY,
    };

    pub fn new(min: f32, max: f32) -> Self {
        Self { min, max }
    }

    pub fn size(&self) -> f32 {
        self.max - self.min
    }

    pub fn is_empty(&self) -> bool {
        self.min > self.max
    }

    pub fn contains(&self, x: f32) -> bool {
        (self.min..=self.max).contains(&x)
    }

    /// `[min, max)` membership, the convention for ray hit distances.
    pub fn contains_half_open(&self, x: f32) -> bool {
        (self.min..self.max).contains(&x)
    }

    /// Open-range membership.
    pub fn surrounds(&self, x: f32) -> bool {
        self.min < x && x < self.max
    }

    /// Grow by `delta` in total, split evenly between both ends.
    pub fn expand(&self, delta: f32) -> Interval {
        let half = 0.5 * delta;
        Interval::new(self.min - half, self.max + half)
    }

    /// Smallest range holding both. The empty range is the identity.
    pub fn union(&self, other: &Interval) -> Interval {
        Interval::new(self.min.min(other.min), self.max.max(other.max))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_membership_conventions() {
        let r = Interval::new(1.0, 2.0);
        assert!(r.contains(1.0) && r.contains(2.0));
        assert!(r.contains_half_open(1.0) && !r.contains_half_open(2.0));
        assert!(!r.surrounds(1.0) && r.surrounds(1.5));
        assert!(!r.contains(0.5));
    }

    #[test]
    fn test_empty_and_universe() {
        let a = Interval::new(-1.0, 3.0);
        assert!(Interval::EMPTY.is_empty());
        assert!(!Interval::EMPTY.contains(0.0));
        assert_eq!(Interval::EMPTY.union(&a), a);
        assert_eq!(a.union(&Interval::EMPTY), a);

        assert!(Interval::UNIVERSE.contains(-1e30));
        assert_eq!(Interval::UNIVERSE.size(), f32::INFINITY);
    }

    #[test]
    fn test_expand_is_symmetric() {
        let grown = Interval::new(0.0, 10.0).expand(4.0);
        assert_eq!(grown, Interval::new(-2.0, 12.0));
    }
}

use rand::Rng;
use serde::{Deserialize, Serialize};

/// A box-shaped continuous space `[low, high]` per dimension.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoxSpace {
    low: Vec<f32>,
    high: Vec<f32>,
}

impl BoxSpace {
    /// Creates a space from per-dimension bounds.
    ///
    /// # Panics
    ///
    /// Panics if the bounds differ in length or any `low > high`.
    #[must_use]
    pub fn new(low: Vec<f32>, high: Vec<f32>) -> Self {
        assert_eq!(low.len(), high.len(), "bounds must have the same length");
        assert!(
            low.iter().zip(&high).all(|(l, h)| l <= h),
            "low bound must not exceed high bound"
        );
        Self { low, high }
    }

    /// Creates a space with the same bounds on every dimension.
    #[must_use]
    pub fn uniform(dim: usize, low: f32, high: f32) -> Self {
        Self::new(vec![low; dim], vec![high; dim])
    }

    #[must_use]
    pub fn dim(&self) -> usize {
        self.low.len()
    }

    #[must_use]
    pub fn low(&self) -> &[f32] {
        &self.low
    }

    #[must_use]
    pub fn high(&self) -> &[f32] {
        &self.high
    }

    #[must_use]
    pub fn contains(&self, value: &[f32]) -> bool {
        value.len() == self.dim()
            && value
                .iter()
                .zip(self.low.iter().zip(&self.high))
                .all(|(v, (l, h))| (*l..=*h).contains(v))
    }

    /// Clamps `value` into the space in place.
    pub fn clip(&self, value: &mut [f32]) {
        for (v, (l, h)) in value.iter_mut().zip(self.low.iter().zip(&self.high)) {
            *v = v.clamp(*l, *h);
        }
    }

    #[must_use]
    pub fn clipped(&self, value: &[f32]) -> Vec<f32> {
        let mut value = value.to_vec();
        self.clip(&mut value);
        value
    }

    /// Samples a point uniformly from the space.
    pub fn sample<R>(&self, rng: &mut R) -> Vec<f32>
    where
        R: Rng + ?Sized,
    {
        self.low
            .iter()
            .zip(&self.high)
            .map(|(l, h)| rng.random_range(*l..=*h))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng as _;
    use rand_pcg::Pcg64;

    use super::*;

    #[test]
    fn test_clip_and_contains() {
        let space = BoxSpace::uniform(2, -1.0, 1.0);
        assert!(!space.contains(&[1.5, 0.0]));
        let clipped = space.clipped(&[1.5, -3.0]);
        assert_eq!(clipped, vec![1.0, -1.0]);
        assert!(space.contains(&clipped));
        assert!(!space.contains(&[0.0]));
    }

    #[test]
    fn test_sample_stays_in_bounds() {
        let space = BoxSpace::new(vec![0.0, -2.0], vec![1.0, 2.0]);
        let mut rng = Pcg64::seed_from_u64(7);
        for _ in 0..100 {
            assert!(space.contains(&space.sample(&mut rng)));
        }
    }

    #[test]
    #[should_panic(expected = "same length")]
    fn test_mismatched_bounds() {
        let _ = BoxSpace::new(vec![0.0], vec![1.0, 2.0]);
    }

    #[test]
    fn test_serde_shape() {
        let space = BoxSpace::uniform(1, -1.0, 1.0);
        let json = serde_json::to_string(&space).unwrap();
        assert_eq!(json, r#"{"low":[-1.0],"high":[1.0]}"#);
    }
}

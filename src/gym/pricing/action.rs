use rand::Rng;
use serde::{Deserialize, Serialize};

/// Index into the configured surge level set.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
pub struct SurgeAction(pub usize);

impl From<usize> for SurgeAction {
    fn from(idx: usize) -> Self {
        Self(idx)
    }
}

impl std::fmt::Display for SurgeAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Discrete action space `{0, ..., n - 1}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionSpace {
    n: usize,
}

impl ActionSpace {
    pub fn new(n: usize) -> Self {
        Self { n }
    }

    pub fn n(&self) -> usize {
        self.n
    }

    pub fn contains(&self, action: SurgeAction) -> bool {
        action.0 < self.n
    }

    /// Uniform draw. An empty space always yields action 0.
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> SurgeAction {
        if self.n == 0 {
            return SurgeAction(0);
        }
        SurgeAction(rng.random_range(0..self.n))
    }

    pub fn iter(&self) -> impl Iterator<Item = SurgeAction> {
        (0..self.n).map(SurgeAction)
    }
}

#[cfg(test)]
mod tests {
    use rand::{SeedableRng, rngs::StdRng};

    use super::*;

    #[test]
    fn samples_stay_in_space() {
        let space = ActionSpace::new(7);
        let mut rng = StdRng::seed_from_u64(3);
        for _ in 0..1000 {
            assert!(space.contains(space.sample(&mut rng)));
        }
        assert!(!space.contains(SurgeAction(7)));
        assert_eq!(space.iter().count(), 7);
    }
}

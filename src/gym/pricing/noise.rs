use rand::{
    Rng,
    distr::{Distribution, Uniform, weighted::WeightedIndex},
};
use serde::{Deserialize, Serialize};

use crate::error::{EnvError, SurgeResult};

/// Synthetic observation noise.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NoiseConfig {
    pub wait_time_min: f64,
    pub wait_time_max: f64,
    /// Competitor multipliers with their sampling weights.
    pub competitor_surges: Vec<(f64, f64)>,
    /// Size of the trailing window behind `recent_ride_count`.
    pub recent_window: usize,
}

impl Default for NoiseConfig {
    fn default() -> Self {
        Self {
            wait_time_min: 2.0,
            wait_time_max: 15.0,
            competitor_surges: vec![(1.0, 0.7), (1.25, 0.2), (1.5, 0.1)],
            recent_window: 20,
        }
    }
}

impl NoiseConfig {
    pub fn validate(&self) -> SurgeResult<()> {
        NoiseSampler::new(self).map(|_| ())
    }
}

/// Samplers prepared from a [`NoiseConfig`].
#[derive(Debug, Clone)]
pub struct NoiseSampler {
    wait_time: Uniform<f64>,
    competitor: WeightedIndex<f64>,
    competitor_levels: Vec<f64>,
}

impl NoiseSampler {
    pub fn new(cfg: &NoiseConfig) -> SurgeResult<Self> {
        let wait_time = Uniform::new(cfg.wait_time_min, cfg.wait_time_max).map_err(|e| {
            EnvError::InvalidConfig(format!(
                "wait time range [{}, {}): {e}",
                cfg.wait_time_min, cfg.wait_time_max
            ))
        })?;
        let competitor = WeightedIndex::new(cfg.competitor_surges.iter().map(|(_, w)| *w))
            .map_err(|e| EnvError::InvalidConfig(format!("competitor surge weights: {e}")))?;
        Ok(Self {
            wait_time,
            competitor,
            competitor_levels: cfg.competitor_surges.iter().map(|(s, _)| *s).collect(),
        })
    }

    pub fn wait_time<R: Rng + ?Sized>(&self, rng: &mut R) -> f64 {
        self.wait_time.sample(rng)
    }

    pub fn competitor_surge<R: Rng + ?Sized>(&self, rng: &mut R) -> f64 {
        self.competitor_levels[self.competitor.sample(rng)]
    }
}

#[cfg(test)]
mod tests {
    use rand::{SeedableRng, rngs::StdRng};

    use super::*;

    #[test]
    fn samples_follow_config() {
        let sampler = NoiseSampler::new(&NoiseConfig::default()).unwrap();
        let mut rng = StdRng::seed_from_u64(9);
        let mut base = 0;
        for _ in 0..2_000 {
            let w = sampler.wait_time(&mut rng);
            assert!((2.0..15.0).contains(&w));
            let c = sampler.competitor_surge(&mut rng);
            assert!([1.0, 1.25, 1.5].contains(&c));
            base += usize::from(c == 1.0);
        }
        // 70% weight on no competitor surge.
        assert!((1_200..1_600).contains(&base), "{base}");
    }

    #[test]
    fn rejects_degenerate_config() {
        let no_weights = NoiseConfig {
            competitor_surges: vec![],
            ..NoiseConfig::default()
        };
        assert!(no_weights.validate().is_err());

        let empty_wait = NoiseConfig {
            wait_time_min: 5.0,
            wait_time_max: 5.0,
            ..NoiseConfig::default()
        };
        assert!(empty_wait.validate().is_err());
    }
}

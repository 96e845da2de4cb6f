use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::{EnvError, SurgeResult};

/// Half-open integer range `[low, high)` used for market noise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntRange {
    pub low: i32,
    pub high: i32,
}

impl IntRange {
    pub const fn new(low: i32, high: i32) -> Self {
        Self { low, high }
    }

    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> f64 {
        f64::from(rng.random_range(self.low..self.high))
    }

    fn validate(&self, name: &str) -> SurgeResult<()> {
        if self.low >= self.high {
            return Err(EnvError::InvalidConfig(format!(
                "{name} range [{}, {}) is empty",
                self.low, self.high
            ))
            .into());
        }
        Ok(())
    }
}

/// Bounds on demand and supply. Both are clamped into `[min, max]` after
/// every update.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MarketBounds {
    pub min: f64,
    pub max: f64,
}

impl Default for MarketBounds {
    fn default() -> Self {
        Self {
            min: 10.0,
            max: 100.0,
        }
    }
}

impl MarketBounds {
    pub fn clamp(&self, v: f64) -> f64 {
        v.clamp(self.min, self.max)
    }

    pub fn contains(&self, v: f64) -> bool {
        (self.min..=self.max).contains(&v)
    }
}

/// Market response to a priced ride.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MarketDynamicsConfig {
    pub bounds: MarketBounds,
    /// Demand factor after an accepted ride.
    pub accepted_demand_factor: f64,
    /// Demand factor after a rejected ride.
    pub rejected_demand_factor: f64,
    /// Surge strictly above this attracts drivers.
    pub supply_attraction_threshold: f64,
    /// Surge exactly equal to this makes drivers leave.
    pub supply_outflow_surge: f64,
    pub supply_inflow: IntRange,
    /// Drivers leaving at the outflow surge.
    pub supply_outflow: IntRange,
    pub demand_jitter: IntRange,
    pub supply_jitter: IntRange,
}

impl Default for MarketDynamicsConfig {
    fn default() -> Self {
        Self {
            bounds: MarketBounds::default(),
            accepted_demand_factor: 1.01,
            rejected_demand_factor: 0.98,
            supply_attraction_threshold: 1.5,
            supply_outflow_surge: 1.0,
            supply_inflow: IntRange::new(1, 5),
            supply_outflow: IntRange::new(0, 3),
            demand_jitter: IntRange::new(-5, 5),
            supply_jitter: IntRange::new(-3, 3),
        }
    }
}

impl MarketDynamicsConfig {
    pub fn validate(&self) -> SurgeResult<()> {
        let b = self.bounds;
        if !(b.min.is_finite() && b.max.is_finite() && b.min <= b.max) {
            return Err(EnvError::InvalidConfig(format!(
                "market bounds [{}, {}] are invalid",
                b.min, b.max
            ))
            .into());
        }
        for (name, factor) in [
            ("accepted_demand_factor", self.accepted_demand_factor),
            ("rejected_demand_factor", self.rejected_demand_factor),
        ] {
            if !factor.is_finite() || factor <= 0.0 {
                return Err(EnvError::InvalidConfig(format!(
                    "{name} must be positive, got {factor}"
                ))
                .into());
            }
        }
        if !self.supply_outflow_surge.is_finite()
            || self.supply_outflow_surge > self.supply_attraction_threshold
        {
            return Err(EnvError::InvalidConfig(format!(
                "supply_outflow_surge {} must be finite and not above supply_attraction_threshold {}",
                self.supply_outflow_surge, self.supply_attraction_threshold
            ))
            .into());
        }
        self.supply_inflow.validate("supply_inflow")?;
        self.supply_outflow.validate("supply_outflow")?;
        self.demand_jitter.validate("demand_jitter")?;
        self.supply_jitter.validate("supply_jitter")
    }
}

/// Distribution of the market at the start of an episode.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct InitialMarketConfig {
    pub demand: IntRange,
    pub supply: IntRange,
}

impl Default for InitialMarketConfig {
    fn default() -> Self {
        Self {
            demand: IntRange::new(20, 80),
            supply: IntRange::new(30, 70),
        }
    }
}

impl InitialMarketConfig {
    pub fn validate(&self) -> SurgeResult<()> {
        self.demand.validate("initial demand")?;
        self.supply.validate("initial supply")
    }
}

/// Demand and supply of the simulated market.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MarketState {
    pub demand: f64,
    pub supply: f64,
}

impl MarketState {
    pub fn sample<R: Rng + ?Sized>(cfg: &InitialMarketConfig, rng: &mut R) -> Self {
        Self {
            demand: cfg.demand.sample(rng),
            supply: cfg.supply.sample(rng),
        }
    }

    /// Demand over supply, supply floored at 1.
    pub fn ratio(&self) -> f64 {
        self.demand / self.supply.max(1.0)
    }

    /// Driver utilization in `[0, 1]`.
    pub fn utilization(&self) -> f64 {
        self.ratio().min(1.0)
    }

    /// Applies one step of market dynamics.
    ///
    /// Randomness is drawn in a fixed order: driver inflow or outflow (only
    /// when the surge triggers it), then demand jitter, then supply jitter.
    pub fn update<R: Rng + ?Sized>(
        &mut self,
        surge: f64,
        accepted: bool,
        cfg: &MarketDynamicsConfig,
        rng: &mut R,
    ) {
        self.demand *= if accepted {
            cfg.accepted_demand_factor
        } else {
            cfg.rejected_demand_factor
        };

        if surge > cfg.supply_attraction_threshold {
            self.supply += cfg.supply_inflow.sample(rng);
        } else if surge == cfg.supply_outflow_surge {
            self.supply -= cfg.supply_outflow.sample(rng);
        }

        self.demand += cfg.demand_jitter.sample(rng);
        self.supply += cfg.supply_jitter.sample(rng);

        self.demand = cfg.bounds.clamp(self.demand);
        self.supply = cfg.bounds.clamp(self.supply);
    }
}

#[cfg(test)]
mod tests {
    use rand::{SeedableRng, rngs::StdRng};

    use super::*;

    #[test]
    fn initial_market_is_integral_and_in_range() {
        let cfg = InitialMarketConfig::default();
        let mut rng = StdRng::seed_from_u64(11);
        for _ in 0..500 {
            let m = MarketState::sample(&cfg, &mut rng);
            assert!((20.0..80.0).contains(&m.demand));
            assert!((30.0..70.0).contains(&m.supply));
            assert_eq!(m.demand.fract(), 0.0);
        }
    }

    #[test]
    fn updates_stay_in_bounds() {
        let cfg = MarketDynamicsConfig::default();
        let mut rng = StdRng::seed_from_u64(5);
        let mut m = MarketState {
            demand: 99.0,
            supply: 11.0,
        };
        for i in 0..5_000 {
            let surge = [1.0, 1.25, 2.0, 3.0][i % 4];
            m.update(surge, i % 3 == 0, &cfg, &mut rng);
            assert!(cfg.bounds.contains(m.demand), "demand {}", m.demand);
            assert!(cfg.bounds.contains(m.supply), "supply {}", m.supply);
        }
    }

    #[test]
    fn no_noise_update_is_deterministic() {
        let cfg = MarketDynamicsConfig {
            supply_inflow: IntRange::new(2, 3),
            supply_outflow: IntRange::new(1, 2),
            demand_jitter: IntRange::new(0, 1),
            supply_jitter: IntRange::new(0, 1),
            ..MarketDynamicsConfig::default()
        };
        let mut rng = StdRng::seed_from_u64(0);

        let mut m = MarketState {
            demand: 50.0,
            supply: 50.0,
        };
        m.update(2.0, true, &cfg, &mut rng);
        assert!((m.demand - 50.5).abs() < 1e-12);
        assert_eq!(m.supply, 52.0);

        m.update(1.0, false, &cfg, &mut rng);
        assert!((m.demand - 50.5 * 0.98).abs() < 1e-12);
        assert_eq!(m.supply, 51.0);

        // 1.25 neither attracts nor repels drivers.
        m.update(1.25, true, &cfg, &mut rng);
        assert_eq!(m.supply, 51.0);
    }

    #[test]
    fn utilization_is_capped() {
        let m = MarketState {
            demand: 80.0,
            supply: 40.0,
        };
        assert_eq!(m.ratio(), 2.0);
        assert_eq!(m.utilization(), 1.0);
    }

    #[test]
    fn empty_ranges_are_rejected() {
        let cfg = MarketDynamicsConfig {
            demand_jitter: IntRange::new(3, 3),
            ..MarketDynamicsConfig::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn outflow_follows_configured_surge() {
        let cfg = MarketDynamicsConfig {
            supply_outflow_surge: 1.25,
            supply_outflow: IntRange::new(2, 3),
            demand_jitter: IntRange::new(0, 1),
            supply_jitter: IntRange::new(0, 1),
            ..MarketDynamicsConfig::default()
        };
        assert!(cfg.validate().is_ok());
        let mut rng = StdRng::seed_from_u64(3);
        let mut m = MarketState {
            demand: 50.0,
            supply: 50.0,
        };

        m.update(1.0, true, &cfg, &mut rng);
        assert_eq!(m.supply, 50.0);
        m.update(1.25, true, &cfg, &mut rng);
        assert_eq!(m.supply, 48.0);

        let above_inflow = MarketDynamicsConfig {
            supply_outflow_surge: 2.0,
            ..MarketDynamicsConfig::default()
        };
        assert!(above_inflow.validate().is_err());
    }
}

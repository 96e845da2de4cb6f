use serde::{Deserialize, Serialize};

use crate::{gym::Reward, gym::pricing::market::MarketState};

/// Reward shaping constants.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RewardConfig {
    /// Share of the final price paid out on acceptance.
    pub price_weight: f64,
    /// Accepted surge while demand exceeds supply.
    pub surge_bonus: f64,
    /// Accepted base price while supply exceeds demand.
    pub balance_bonus: f64,
    pub rejection_penalty: f64,
    /// Rejected surge strictly above this, in a slack market, is penalised.
    pub oversurge_threshold: f64,
    pub oversurge_penalty: f64,
    pub utilization_weight: f64,
    /// Surge above this costs `high_surge_slope` per unit.
    pub high_surge_threshold: f64,
    pub high_surge_slope: f64,
    /// Surge at or above this costs a flat `extreme_penalty` on top.
    pub extreme_threshold: f64,
    pub extreme_penalty: f64,
}

impl Default for RewardConfig {
    fn default() -> Self {
        Self {
            price_weight: 0.5,
            surge_bonus: 5.0,
            balance_bonus: 3.0,
            rejection_penalty: 2.0,
            oversurge_threshold: 1.5,
            oversurge_penalty: 5.0,
            utilization_weight: 2.0,
            high_surge_threshold: 2.0,
            high_surge_slope: 10.0,
            extreme_threshold: 2.5,
            extreme_penalty: 10.0,
        }
    }
}

impl RewardConfig {
    /// Scores one priced ride against the market as it was when quoted.
    pub fn compute(
        &self,
        market: &MarketState,
        surge: f64,
        final_price: f64,
        accepted: bool,
    ) -> Reward {
        let MarketState { demand, supply } = *market;
        let mut reward = Reward::default();

        if accepted {
            reward += final_price * self.price_weight;
            if demand > supply && surge > 1.0 {
                reward += self.surge_bonus;
            } else if demand < supply && surge == 1.0 {
                reward += self.balance_bonus;
            }
        } else {
            reward -= self.rejection_penalty;
            if demand < supply && surge > self.oversurge_threshold {
                reward -= self.oversurge_penalty;
            }
        }

        reward += market.utilization() * self.utilization_weight;

        if surge > self.high_surge_threshold {
            reward -= (surge - self.high_surge_threshold) * self.high_surge_slope;
        }
        if surge >= self.extreme_threshold {
            reward -= self.extreme_penalty;
        }

        reward
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn market(demand: f64, supply: f64) -> MarketState {
        MarketState { demand, supply }
    }

    fn approx(a: Reward, b: f64) -> bool {
        (a.0 - b).abs() < 1e-9
    }

    #[test]
    fn accepted_max_surge_in_tight_market() {
        let cfg = RewardConfig::default();
        // 20*0.5 + 5 + 2 - 10 - 10
        let r = cfg.compute(&market(80.0, 40.0), 3.0, 20.0, true);
        assert!(approx(r, -3.0), "{r:?}");
    }

    #[test]
    fn rejected_oversurge_in_slack_market() {
        let cfg = RewardConfig::default();
        // -2 - 5 + (30/60)*2 - 10 - 10
        let r = cfg.compute(&market(30.0, 60.0), 3.0, 20.0, false);
        assert!(approx(r, -26.0), "{r:?}");
    }

    #[test]
    fn balance_bonus_at_base_price() {
        let cfg = RewardConfig::default();
        // 10*0.5 + 3 + 0.5*2
        let r = cfg.compute(&market(25.0, 50.0), 1.0, 10.0, true);
        assert!(approx(r, 9.0), "{r:?}");
    }

    #[test]
    fn equal_market_gets_no_bonus() {
        let cfg = RewardConfig::default();
        let r = cfg.compute(&market(50.0, 50.0), 1.25, 10.0, true);
        assert!(approx(r, 7.0), "{r:?}");
    }

    #[test]
    fn base_price_in_tight_market_gets_no_bonus() {
        let cfg = RewardConfig::default();
        // 10*0.5 + 2, neither surge nor balance bonus
        let r = cfg.compute(&market(80.0, 40.0), 1.0, 10.0, true);
        assert!(approx(r, 7.0), "{r:?}");
    }

    #[test]
    fn extreme_penalties_compound_at_two_and_a_half() {
        let cfg = RewardConfig::default();
        let r = cfg.compute(&market(50.0, 50.0), 2.5, 0.0, true);
        // 0 + 2 - 5 - 10
        assert!(approx(r, -13.0), "{r:?}");
    }
}

use serde::{Deserialize, Serialize};

use crate::{
    data::domain::{Hour, HourSet},
    error::{EnvError, SurgeResult},
};

/// Rider acceptance model.
///
/// `p = 1 / (1 + price_sensitivity * (surge - 1)^2)`, scaled by `rain_factor`
/// when it rains and by `late_night_factor` at night. The adjustments stack
/// multiplicatively and the result is clamped to
/// `[min_probability, max_probability]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AcceptanceConfig {
    pub price_sensitivity: f64,
    /// Rain strictly above this counts as raining.
    pub rain_threshold: f64,
    pub rain_factor: f64,
    pub late_night_hours: HourSet,
    pub late_night_factor: f64,
    pub min_probability: f64,
    pub max_probability: f64,
}

impl Default for AcceptanceConfig {
    fn default() -> Self {
        Self {
            price_sensitivity: 0.3,
            rain_threshold: 0.1,
            rain_factor: 1.2,
            late_night_hours: HourSet::LATE_NIGHT_ACCEPTANCE,
            late_night_factor: 1.1,
            min_probability: 0.1,
            max_probability: 0.95,
        }
    }
}

impl AcceptanceConfig {
    pub fn probability(&self, surge: f64, rain: f64, hour: Hour) -> f64 {
        let mut p = 1.0 / (1.0 + self.price_sensitivity * (surge - 1.0).powi(2));
        if rain > self.rain_threshold {
            p *= self.rain_factor;
        }
        if self.late_night_hours.contains(hour) {
            p *= self.late_night_factor;
        }
        p.clamp(self.min_probability, self.max_probability)
    }

    pub fn validate(&self) -> SurgeResult<()> {
        let lo = self.min_probability;
        let hi = self.max_probability;
        if !(0.0 <= lo && lo <= hi && hi <= 1.0) {
            return Err(EnvError::InvalidConfig(format!(
                "acceptance bounds [{lo}, {hi}] must lie within [0, 1]"
            ))
            .into());
        }
        if self.price_sensitivity < 0.0 || self.rain_factor < 0.0 || self.late_night_factor < 0.0
        {
            return Err(EnvError::InvalidConfig(
                "acceptance sensitivity and factors must be non-negative".to_string(),
            )
            .into());
        }
        Ok(())
    }
}

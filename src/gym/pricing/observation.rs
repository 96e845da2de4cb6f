use serde::{Deserialize, Serialize};

use crate::data::domain::{DayOfWeek, Hour};

/// What the pricing agent sees before choosing a surge.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    pub hour: Hour,
    pub day_of_week: DayOfWeek,
    pub demand: f64,
    pub supply: f64,
    pub recent_ride_count: u32,
    pub avg_wait_time: f64,
    pub competitor_surge: f64,
}

impl Observation {
    pub const DIM: usize = 7;

    /// `[hour, day_of_week, demand, supply, recent_ride_count, avg_wait_time,
    /// competitor_surge]`
    pub fn to_array(&self) -> [f64; Self::DIM] {
        [
            f64::from(self.hour.value()),
            f64::from(self.day_of_week.value()),
            self.demand,
            self.supply,
            f64::from(self.recent_ride_count),
            self.avg_wait_time,
            self.competitor_surge,
        ]
    }

    /// Each component scaled into `[0, 1]` by `bounds`, saturating outside.
    pub fn normalized(&self, bounds: &ObservationBounds) -> [f64; Self::DIM] {
        let raw = self.to_array();
        std::array::from_fn(|i| {
            let span = bounds.high[i] - bounds.low[i];
            if span <= 0.0 {
                0.0
            } else {
                ((raw[i] - bounds.low[i]) / span).clamp(0.0, 1.0)
            }
        })
    }

    pub fn demand_supply_ratio(&self) -> f64 {
        self.demand / self.supply.max(1.0)
    }
}

/// Nominal value range of each observation component.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ObservationBounds {
    pub low: [f64; Observation::DIM],
    pub high: [f64; Observation::DIM],
}

impl Default for ObservationBounds {
    fn default() -> Self {
        Self {
            low: [0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 1.0],
            high: [23.0, 6.0, 100.0, 100.0, 50.0, 30.0, 3.0],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn obs() -> Observation {
        Observation {
            hour: Hour::new(23).unwrap(),
            day_of_week: DayOfWeek::new(3).unwrap(),
            demand: 50.0,
            supply: 25.0,
            recent_ride_count: 20,
            avg_wait_time: 45.0,
            competitor_surge: 1.0,
        }
    }

    #[test]
    fn normalization_saturates() {
        let n = obs().normalized(&ObservationBounds::default());
        assert_eq!(n[0], 1.0);
        assert_eq!(n[1], 0.5);
        assert_eq!(n[2], 0.5);
        assert_eq!(n[4], 0.4);
        assert_eq!(n[5], 1.0);
        assert_eq!(n[6], 0.0);
    }

    #[test]
    fn ratio_floors_supply() {
        let o = Observation {
            supply: 0.0,
            ..obs()
        };
        assert_eq!(o.demand_supply_ratio(), 50.0);
        assert_eq!(obs().demand_supply_ratio(), 2.0);
    }
}

use rand::{Rng, SeedableRng, rngs::StdRng};
use serde::{Deserialize, Serialize};
use strum::{EnumCount, IntoEnumIterator};

use crate::{
    data::{
        dataset::RideDataset,
        domain::ServiceCategory,
        ride::{RideRecord, Weather},
    },
    error::{SurgeResult, invalid_input},
    predictor::{BasePricePredictor, DistanceFarePredictor},
};

/// Pickup and drop-off neighbourhoods covered by the ride data.
pub const LOCATIONS: [&str; 12] = [
    "Back Bay",
    "Beacon Hill",
    "Boston University",
    "Fenway",
    "Financial District",
    "Haymarket Square",
    "North End",
    "North Station",
    "Northeastern University",
    "South Station",
    "Theatre District",
    "West End",
];

/// 2018-11-26T00:00:00Z, start of the generated timeline.
const EPOCH_MS: i64 = 1_543_190_400_000;

/// Seeded generator of plausible ride records.
///
/// Rides are laid out on a monotone timeline with a few minutes between
/// consecutive pickups, so hour and weekday advance the way they do in
/// real data.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyntheticRides {
    pub seed: u64,
    pub min_distance: f64,
    pub max_distance: f64,
    /// Upper bound, in minutes, of the gap between consecutive pickups.
    pub max_gap_minutes: u32,
    pub rain_probability: f64,
    pub weather_coverage: f64,
}

impl Default for SyntheticRides {
    fn default() -> Self {
        Self {
            seed: 42,
            min_distance: 0.2,
            max_distance: 7.5,
            max_gap_minutes: 6,
            rain_probability: 0.15,
            weather_coverage: 0.9,
        }
    }
}

impl SyntheticRides {
    pub fn with_seed(self, seed: u64) -> Self {
        Self { seed, ..self }
    }

    pub fn with_rain_probability(self, rain_probability: f64) -> Self {
        Self {
            rain_probability,
            ..self
        }
    }

    pub fn generate(&self, n: usize) -> SurgeResult<RideDataset> {
        if !(self.min_distance >= 0.0 && self.min_distance < self.max_distance) {
            return Err(invalid_input(format!(
                "distance range [{}, {}) is empty or negative",
                self.min_distance, self.max_distance
            )));
        }
        for (name, p) in [
            ("rain_probability", self.rain_probability),
            ("weather_coverage", self.weather_coverage),
        ] {
            if !(0.0..=1.0).contains(&p) {
                return Err(invalid_input(format!("{name} must be within [0, 1], got {p}")));
            }
        }

        let mut rng = StdRng::seed_from_u64(self.seed);
        let fares = DistanceFarePredictor::default();
        let services: Vec<ServiceCategory> = ServiceCategory::iter().collect();
        let mut ts = EPOCH_MS;

        let mut records = Vec::with_capacity(n);
        for _ in 0..n {
            ts += i64::from(rng.random_range(1..=self.max_gap_minutes.max(1))) * 60_000;

            let distance = rng.random_range(self.min_distance..self.max_distance);
            let service = services[rng.random_range(0..ServiceCategory::COUNT)];
            let source = LOCATIONS[rng.random_range(0..LOCATIONS.len())];
            let destination = LOCATIONS[rng.random_range(0..LOCATIONS.len())];

            let mut record = RideRecord::from_timestamp_millis(ts, distance, service)?
                .with_route(source, destination)
                .with_surge_multiplier(if rng.random_bool(0.05) { 1.25 } else { 1.0 });
            let price = fares.predict(&record.price_features()) * record.surge_multiplier;
            record = record.with_price((price * 100.0).round() / 100.0);

            if rng.random_bool(self.weather_coverage) {
                let rain = if rng.random_bool(self.rain_probability) {
                    Some(rng.random_range(0.0..0.8))
                } else {
                    None
                };
                record = record.with_weather(Weather {
                    temp: Some(rng.random_range(20.0..55.0)),
                    humidity: Some(rng.random_range(0.5..1.0) * 100.0),
                    wind: Some(rng.random_range(0.5..15.0)),
                    rain,
                    pressure: Some(rng.random_range(990.0..1035.0)),
                });
            }
            records.push(record);
        }

        Ok(RideDataset::new(records))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_seed_same_rides() {
        let a = SyntheticRides::default().generate(50).unwrap();
        let b = SyntheticRides::default().generate(50).unwrap();
        assert_eq!(a.records(), b.records());

        let c = SyntheticRides::default().with_seed(7).generate(50).unwrap();
        assert_ne!(a.records(), c.records());
    }

    #[test]
    fn records_are_well_formed() {
        let ds = SyntheticRides::default().generate(500).unwrap();
        assert_eq!(ds.len(), 500);
        for r in ds.iter() {
            assert!((0.2..7.5).contains(&r.distance));
            assert!(r.price.is_some_and(|p| p > 0.0));
            assert!(r.source.as_deref().is_some_and(|s| LOCATIONS.contains(&s)));
            assert_eq!(r.cab_type, r.service.cab_type());
        }
    }

    #[test]
    fn dry_weather_has_no_rain() {
        let ds = SyntheticRides::default()
            .with_rain_probability(0.0)
            .generate(200)
            .unwrap();
        assert!(ds.iter().all(|r| r.rain() == 0.0));
    }

    #[test]
    fn rejects_bad_probabilities() {
        assert!(
            SyntheticRides::default()
                .with_rain_probability(1.5)
                .generate(1)
                .is_err()
        );
    }
}

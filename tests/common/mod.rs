#![allow(dead_code)]

use fareflow::prelude::*;

pub const RIDES: usize = 500;

pub fn rides() -> RideDataset {
    SyntheticRides::default()
        .with_seed(17)
        .generate(RIDES)
        .expect("synthetic rides")
}

pub fn environment(cfg: EnvConfig) -> Environment<DistanceFarePredictor> {
    make(rides(), DistanceFarePredictor::default(), cfg).expect("pricing environment")
}

pub fn default_environment() -> Environment<DistanceFarePredictor> {
    environment(EnvConfig::default())
}

pub fn observation(hour: u8, demand: f64, supply: f64) -> Observation {
    Observation {
        hour: Hour::new(hour).expect("hour"),
        day_of_week: DayOfWeek::new(2).expect("day"),
        demand,
        supply,
        recent_ride_count: 10,
        avg_wait_time: 5.0,
        competitor_surge: 1.0,
    }
}

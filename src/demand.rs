use serde::{Deserialize, Serialize};

use crate::{
    data::domain::{Hour, HourSet},
    impl_from_primitive,
};

/// Demand level on a `0..=100` scale.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
pub struct DemandScore(pub f64);
impl_from_primitive!(DemandScore, f64);

impl DemandScore {
    pub const MAX: f64 = 100.0;
}

/// Tunable constants of the demand heuristic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DemandConfig {
    pub base: f64,
    pub rush_hours: HourSet,
    pub rush_bonus: f64,
    pub late_night_hours: HourSet,
    pub late_night_bonus: f64,
    pub lunch_hours: HourSet,
    pub lunch_bonus: f64,
    pub high_demand_locations: Vec<String>,
    pub location_bonus: f64,
    /// Recent ride counts strictly above this value earn `activity_bonus`.
    pub activity_threshold: u32,
    pub activity_bonus: f64,
}

impl Default for DemandConfig {
    fn default() -> Self {
        Self {
            base: 30.0,
            rush_hours: HourSet::RUSH,
            rush_bonus: 20.0,
            late_night_hours: HourSet::LATE_NIGHT,
            late_night_bonus: 15.0,
            lunch_hours: HourSet::LUNCH,
            lunch_bonus: 10.0,
            high_demand_locations: ["Back Bay", "Financial District", "North Station"]
                .map(String::from)
                .to_vec(),
            location_bonus: 15.0,
            activity_threshold: 10,
            activity_bonus: 20.0,
        }
    }
}

/// Heuristic demand score from the hour of day, pickup location and recent
/// ride activity.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DemandEstimator {
    cfg: DemandConfig,
}

impl DemandEstimator {
    pub fn new(cfg: DemandConfig) -> Self {
        Self { cfg }
    }

    pub fn config(&self) -> &DemandConfig {
        &self.cfg
    }

    /// Time-of-day bonuses are exclusive: rush hour beats late night beats
    /// lunch.
    pub fn estimate(&self, hour: Hour, location: &str, recent_ride_count: u32) -> DemandScore {
        let cfg = &self.cfg;
        let mut score = cfg.base;

        if cfg.rush_hours.contains(hour) {
            score += cfg.rush_bonus;
        } else if cfg.late_night_hours.contains(hour) {
            score += cfg.late_night_bonus;
        } else if cfg.lunch_hours.contains(hour) {
            score += cfg.lunch_bonus;
        }

        if cfg.high_demand_locations.iter().any(|l| l == location) {
            score += cfg.location_bonus;
        }

        if recent_ride_count > cfg.activity_threshold {
            score += cfg.activity_bonus;
        }

        DemandScore(score.min(DemandScore::MAX))
    }
}

use serde::{Deserialize, Serialize};

use crate::gym::{Reward, pricing::observation::Observation};

/// Episode-level statistics reported after each step.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct StepInfo {
    pub revenue: f64,
    /// Accepted over priced rides, `0.0` before the first ride.
    pub acceptance_rate: f64,
    /// Mean surge over the retained history.
    pub avg_surge: f64,
    pub demand: f64,
    pub supply: f64,
    pub ride: PricedRide,
}

/// The ride priced by the step that produced a [`StepInfo`].
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct PricedRide {
    pub base_price: f64,
    pub surge: f64,
    pub final_price: f64,
    pub acceptance_probability: f64,
    pub accepted: bool,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StepResult {
    pub observation: Observation,
    pub reward: Reward,
    pub done: bool,
    pub info: StepInfo,
}

/// Totals of one finished episode.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct EpisodeSummary {
    pub steps: usize,
    pub total_reward: f64,
    pub revenue: f64,
    pub acceptance_rate: f64,
    pub avg_surge: f64,
}

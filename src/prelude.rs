// 1. Traits
pub use crate::agent::Agent;
pub use crate::gym::pricing::Env;
pub use crate::predictor::BasePricePredictor;

// 2. The Core "Loop" Types
pub use crate::gym::{
    EnvStatus, Reward,
    pricing::{
        action::{ActionSpace, SurgeAction},
        env::Environment,
        info::{EpisodeSummary, PricedRide, StepInfo, StepResult},
        observation::{Observation, ObservationBounds},
    },
};

// 3. Ride & Pricing Domain Types
pub use crate::data::dataset::RideDataset;
pub use crate::data::domain::{CabType, DayOfWeek, Hour, HourSet, ServiceCategory};
pub use crate::data::ride::{RideRecord, Weather};
pub use crate::data::synthetic::SyntheticRides;
pub use crate::demand::{DemandEstimator, DemandScore};
pub use crate::predictor::{DistanceFarePredictor, FnPredictor, PriceFeatures};
pub use crate::surge::{RecommendationTier, RuleBasedSurge, SurgeLevel, SurgeLevels, SurgeTier};

// 4. Agents
pub use crate::agent::{
    AgentIdentifier, actor_critic::ActorCriticPolicy, fixed::FixedSurgeAgent,
    random::RandomAgent, rule_based::RuleBasedAgent,
};

// 5. Configurations
pub use crate::demand::DemandConfig;
pub use crate::gym::pricing::config::EnvConfig;
pub use crate::surge::{RatioBands, SurgeThresholds};
pub use crate::train::TrainerConfig;

// 6. Errors
pub use crate::error::{
    AgentError, DataError, EnvError, IoError, PricingError, SurgeError, SurgeResult, SystemError,
};

// 7. Factories, Training & Reports
pub use crate::eval::{
    EvaluationReport, Leaderboard, compare_agents, evaluate_agent, evaluate_seeds,
};
pub use crate::gym::pricing::factory::{load, make, make_with_rng};
pub use crate::io::{SerdeFormat, StorageLocation};
pub use crate::quote::{QuoteComparison, QuoteEngine, QuoteRequest, QuoteResponse, SurgeSource};
pub use crate::report::EpisodeJournal;
pub use crate::train::{A2cTrainer, TrainingReport};

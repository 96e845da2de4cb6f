pub mod actor_critic;
pub mod fixed;
pub mod random;
pub mod rule_based;

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use strum::{Display, EnumString};

use crate::{
    error::SurgeResult,
    gym::pricing::{action::SurgeAction, observation::Observation},
};

/// Represents the unique identifier of an agent, used to label journals and
/// evaluation reports.
#[derive(
    Clone,
    Debug,
    PartialEq,
    Eq,
    Hash,
    Display,
    Default,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    EnumString,
)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum AgentIdentifier {
    /// A custom user-defined agent.
    #[strum(to_string = "{0}")]
    Named(Arc<String>),

    ActorCritic,

    RuleBased,

    FixedSurge,

    #[default]
    Random,
}

pub trait Agent {
    /// Decide on a surge level for the ride described by `obs`.
    fn act(&mut self, obs: &Observation) -> SurgeResult<SurgeAction>;

    /// Optional agent name for logging/debugging.
    fn identifier(&self) -> AgentIdentifier {
        AgentIdentifier::Named(Arc::new(
            "UnnamedAgent: override Agent::identifier()".to_string(),
        ))
    }

    /// Reset internal state at the start of an episode. Default is no-op.
    fn reset(&mut self) {}
}

impl<A: Agent + ?Sized> Agent for Box<A> {
    fn act(&mut self, obs: &Observation) -> SurgeResult<SurgeAction> {
        (**self).act(obs)
    }

    fn identifier(&self) -> AgentIdentifier {
        (**self).identifier()
    }

    fn reset(&mut self) {
        (**self).reset()
    }
}

impl<A: Agent + ?Sized> Agent for &mut A {
    fn act(&mut self, obs: &Observation) -> SurgeResult<SurgeAction> {
        (**self).act(obs)
    }

    fn identifier(&self) -> AgentIdentifier {
        (**self).identifier()
    }

    fn reset(&mut self) {
        (**self).reset()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identifiers_display() {
        assert_eq!(AgentIdentifier::RuleBased.to_string(), "RULE_BASED");
        assert_eq!(
            AgentIdentifier::Named(Arc::new("surge-v2".to_string())).to_string(),
            "surge-v2"
        );
    }
}

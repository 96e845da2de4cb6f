use serde::{Deserialize, Serialize};

use crate::{
    agent::{Agent, AgentIdentifier},
    error::{SurgeResult, SystemError},
    gym::pricing::{action::SurgeAction, observation::Observation},
    surge::RuleBasedSurge,
};

/// Applies the demand/supply ratio rule to the observed market.
///
/// The selector's level set must be the environment's, otherwise the
/// returned indices point at different multipliers.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RuleBasedAgent {
    selector: RuleBasedSurge,
}

impl RuleBasedAgent {
    pub fn new(selector: RuleBasedSurge) -> Self {
        Self { selector }
    }

    pub fn selector(&self) -> &RuleBasedSurge {
        &self.selector
    }
}

impl Agent for RuleBasedAgent {
    fn identifier(&self) -> AgentIdentifier {
        AgentIdentifier::RuleBased
    }

    fn act(&mut self, obs: &Observation) -> SurgeResult<SurgeAction> {
        let level = self.selector.select(obs.demand, obs.supply)?;
        self.selector
            .levels()
            .index_of(level.value())
            .map(SurgeAction)
            .ok_or_else(|| {
                SystemError::InvariantViolation(format!("selected {level} outside its level set"))
                    .into()
            })
    }
}

use serde::{Deserialize, Serialize};

use crate::{
    agent::{Agent, AgentIdentifier},
    error::{SurgeResult, invalid_input},
    gym::pricing::{action::SurgeAction, observation::Observation},
    surge::SurgeLevels,
};

/// Always quotes the same surge level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FixedSurgeAgent {
    action: SurgeAction,
}

impl FixedSurgeAgent {
    pub fn new(action: SurgeAction) -> Self {
        Self { action }
    }

    /// Agent pinned to `multiplier`, which must be one of `levels`.
    pub fn at_multiplier(levels: &SurgeLevels, multiplier: f64) -> SurgeResult<Self> {
        levels
            .index_of(multiplier)
            .map(|idx| Self::new(SurgeAction(idx)))
            .ok_or_else(|| invalid_input(format!("{multiplier} is not a configured surge level")))
    }

    pub fn action(&self) -> SurgeAction {
        self.action
    }
}

impl Agent for FixedSurgeAgent {
    fn identifier(&self) -> AgentIdentifier {
        AgentIdentifier::FixedSurge
    }

    fn act(&mut self, _obs: &Observation) -> SurgeResult<SurgeAction> {
        Ok(self.action)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_multiplier() {
        let levels = SurgeLevels::default();
        let agent = FixedSurgeAgent::at_multiplier(&levels, 2.5).unwrap();
        assert_eq!(agent.action(), SurgeAction(5));
        assert!(FixedSurgeAgent::at_multiplier(&levels, 2.2).is_err());
    }
}

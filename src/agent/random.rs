use rand::{SeedableRng, rngs::StdRng};

use crate::{
    agent::{Agent, AgentIdentifier},
    error::SurgeResult,
    gym::pricing::{
        action::{ActionSpace, SurgeAction},
        observation::Observation,
    },
};

/// Uniformly random surge. Reproducible from its seed.
#[derive(Debug, Clone)]
pub struct RandomAgent {
    space: ActionSpace,
    rng: StdRng,
}

impl RandomAgent {
    pub fn new(space: ActionSpace, seed: u64) -> Self {
        Self {
            space,
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl Agent for RandomAgent {
    fn identifier(&self) -> AgentIdentifier {
        AgentIdentifier::Random
    }

    fn act(&mut self, _obs: &Observation) -> SurgeResult<SurgeAction> {
        Ok(self.space.sample(&mut self.rng))
    }
}

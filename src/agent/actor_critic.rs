use ndarray::{Array1, Array2};
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::{
    agent::{Agent, AgentIdentifier},
    error::{AgentError, SurgeResult},
    gym::pricing::{
        action::SurgeAction,
        observation::{Observation, ObservationBounds},
    },
    io::{SerdeFormat, StorageLocation},
};

/// Normalized observation, demand/supply ratio and a bias term.
pub const N_FEATURES: usize = Observation::DIM + 2;

/// Demand/supply ratios at or above this saturate the ratio feature.
const RATIO_SCALE: f64 = 3.0;

/// Linear softmax actor with a linear state-value critic.
///
/// At inference time the policy is greedy: [`Agent::act`] returns the most
/// probable action, lowest index on ties, and is a pure function of the
/// observation. Stochastic sampling is reserved for training.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActorCriticPolicy {
    /// `n_actions x N_FEATURES` logit weights.
    actor: Array2<f64>,
    critic: Array1<f64>,
    bounds: ObservationBounds,
}

impl ActorCriticPolicy {
    /// Zero-initialized policy: uniform action probabilities, zero value.
    pub fn new(n_actions: usize) -> SurgeResult<Self> {
        if n_actions == 0 {
            return Err(
                AgentError::InvalidConfig("policy needs at least one action".to_string()).into(),
            );
        }
        Ok(Self {
            actor: Array2::zeros((n_actions, N_FEATURES)),
            critic: Array1::zeros(N_FEATURES),
            bounds: ObservationBounds::default(),
        })
    }

    pub fn with_bounds(self, bounds: ObservationBounds) -> Self {
        Self { bounds, ..self }
    }

    pub fn n_actions(&self) -> usize {
        self.actor.nrows()
    }

    pub fn actor(&self) -> &Array2<f64> {
        &self.actor
    }

    pub fn critic(&self) -> &Array1<f64> {
        &self.critic
    }

    pub fn features(&self, obs: &Observation) -> Array1<f64> {
        let mut x = Array1::zeros(N_FEATURES);
        for (i, v) in obs.normalized(&self.bounds).into_iter().enumerate() {
            x[i] = v;
        }
        x[Observation::DIM] = (obs.demand_supply_ratio() / RATIO_SCALE).min(1.0);
        x[Observation::DIM + 1] = 1.0;
        x
    }

    /// Softmax action distribution for feature vector `x`.
    pub fn probabilities_from(&self, x: &Array1<f64>) -> Array1<f64> {
        let logits = self.actor.dot(x);
        let max = logits.fold(f64::NEG_INFINITY, |m, v| m.max(*v));
        let exp = logits.mapv(|l| (l - max).exp());
        let z = exp.sum();
        exp / z
    }

    pub fn probabilities(&self, obs: &Observation) -> Array1<f64> {
        self.probabilities_from(&self.features(obs))
    }

    pub fn value_from(&self, x: &Array1<f64>) -> f64 {
        self.critic.dot(x)
    }

    pub fn value(&self, obs: &Observation) -> f64 {
        self.value_from(&self.features(obs))
    }

    pub fn greedy(&self, obs: &Observation) -> SurgeAction {
        SurgeAction(argmax(&self.probabilities(obs)))
    }

    /// Draws an action from the policy distribution.
    pub fn sample<R: Rng + ?Sized>(&self, x: &Array1<f64>, rng: &mut R) -> SurgeAction {
        let probs = self.probabilities_from(x);
        let u: f64 = rng.random();
        let mut acc = 0.0;
        for (i, p) in probs.iter().enumerate() {
            acc += p;
            if u < acc {
                return SurgeAction(i);
            }
        }
        SurgeAction(probs.len() - 1)
    }

    /// Gradient ascent on the actor and descent on the critic loss.
    pub(crate) fn apply_gradients(
        &mut self,
        actor_grad: &Array2<f64>,
        critic_grad: &Array1<f64>,
        actor_lr: f64,
        critic_lr: f64,
    ) -> SurgeResult<()> {
        if actor_grad.dim() != self.actor.dim() || critic_grad.len() != self.critic.len() {
            return Err(AgentError::Execution(format!(
                "gradient shape {:?}/{} does not match policy {:?}/{}",
                actor_grad.dim(),
                critic_grad.len(),
                self.actor.dim(),
                self.critic.len()
            ))
            .into());
        }
        self.actor.scaled_add(actor_lr, actor_grad);
        self.critic.scaled_add(-critic_lr, critic_grad);
        Ok(())
    }

    /// Writes the policy to `<dir>/<name>.<format>`.
    pub fn save(
        &self,
        location: &StorageLocation<'_>,
        name: &str,
        format: SerdeFormat,
    ) -> SurgeResult<()> {
        location.write_value(name, format, self)?;
        info!(policy = name, %format, dir = %location.path().display(), "Saved policy");
        Ok(())
    }

    pub fn load(
        location: &StorageLocation<'_>,
        name: &str,
        format: SerdeFormat,
    ) -> SurgeResult<Self> {
        let policy: Self = location.read_value(name, format)?;
        if policy.critic.len() != N_FEATURES || policy.actor.ncols() != N_FEATURES {
            return Err(AgentError::InvalidInput(format!(
                "stored policy has {} features, expected {N_FEATURES}",
                policy.critic.len()
            ))
            .into());
        }
        info!(policy = name, %format, actions = policy.n_actions(), "Loaded policy");
        Ok(policy)
    }
}

impl Agent for ActorCriticPolicy {
    fn identifier(&self) -> AgentIdentifier {
        AgentIdentifier::ActorCritic
    }

    fn act(&mut self, obs: &Observation) -> SurgeResult<SurgeAction> {
        Ok(self.greedy(obs))
    }
}

/// Index of the largest value, first one on ties.
pub(crate) fn argmax(values: &Array1<f64>) -> usize {
    values
        .iter()
        .enumerate()
        .fold((0, f64::NEG_INFINITY), |(bi, bv), (i, v)| {
            if *v > bv { (i, *v) } else { (bi, bv) }
        })
        .0
}

#[cfg(test)]
mod tests {
    use rand::{SeedableRng, rngs::StdRng};

    use super::*;
    use crate::data::domain::{DayOfWeek, Hour};

    fn obs() -> Observation {
        Observation {
            hour: Hour::new(18).unwrap(),
            day_of_week: DayOfWeek::new(4).unwrap(),
            demand: 90.0,
            supply: 30.0,
            recent_ride_count: 20,
            avg_wait_time: 9.0,
            competitor_surge: 1.25,
        }
    }

    #[test]
    fn fresh_policy_is_uniform_and_picks_first() {
        let mut policy = ActorCriticPolicy::new(7).unwrap();
        let probs = policy.probabilities(&obs());
        assert!(probs.iter().all(|p| (p - 1.0 / 7.0).abs() < 1e-12));
        assert_eq!(policy.act(&obs()).unwrap(), SurgeAction(0));
        assert_eq!(policy.value(&obs()), 0.0);
    }

    #[test]
    fn features_are_bounded() {
        let policy = ActorCriticPolicy::new(3).unwrap();
        let x = policy.features(&obs());
        assert_eq!(x.len(), N_FEATURES);
        assert!(x.iter().all(|v| (0.0..=1.0).contains(v)));
        assert_eq!(x[N_FEATURES - 1], 1.0);
        assert_eq!(x[Observation::DIM], 1.0);
    }

    #[test]
    fn gradients_move_the_greedy_action() {
        let mut policy = ActorCriticPolicy::new(4).unwrap();
        let mut g = Array2::zeros((4, N_FEATURES));
        g[[2, N_FEATURES - 1]] = 1.0;
        policy
            .apply_gradients(&g, &Array1::zeros(N_FEATURES), 1.0, 1.0)
            .unwrap();
        assert_eq!(policy.greedy(&obs()), SurgeAction(2));

        let wrong = Array2::zeros((3, N_FEATURES));
        assert!(
            policy
                .apply_gradients(&wrong, &Array1::zeros(N_FEATURES), 1.0, 1.0)
                .is_err()
        );
    }

    #[test]
    fn sampling_covers_the_support() {
        let policy = ActorCriticPolicy::new(3).unwrap();
        let x = policy.features(&obs());
        let mut rng = StdRng::seed_from_u64(1);
        let mut seen = [false; 3];
        for _ in 0..300 {
            seen[policy.sample(&x, &mut rng).0] = true;
        }
        assert_eq!(seen, [true; 3]);
    }

    #[test]
    fn save_and_load() {
        let dir = std::env::temp_dir().join(format!("fareflow-policy-{}", std::process::id()));
        let location = StorageLocation::Local(&dir);
        let mut policy = ActorCriticPolicy::new(7).unwrap();
        let mut g = Array2::zeros((7, N_FEATURES));
        g[[3, 0]] = 0.5;
        policy
            .apply_gradients(&g, &Array1::ones(N_FEATURES), 1.0, 0.1)
            .unwrap();

        for format in [SerdeFormat::Postcard, SerdeFormat::Json] {
            policy.save(&location, "a2c", format).unwrap();
            let back = ActorCriticPolicy::load(&location, "a2c", format).unwrap();
            assert_eq!(back, policy);
        }
        std::fs::remove_dir_all(&dir).ok();
    }
}

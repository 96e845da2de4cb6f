use ndarray::{Array1, Array2};
use rand::{SeedableRng, rngs::StdRng};
use rayon::iter::{IntoParallelRefMutIterator, ParallelIterator};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::{
    agent::actor_critic::{ActorCriticPolicy, N_FEATURES},
    error::{AgentError, SurgeResult},
    gym::pricing::{
        Env,
        env::{Environment, progress_bar},
        observation::Observation,
    },
    predictor::BasePricePredictor,
};

/// Hyperparameters of the advantage actor-critic trainer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainerConfig {
    pub iterations: usize,
    /// Environments stepped in parallel, each with its own seed.
    pub workers: usize,
    /// Steps collected per worker per iteration.
    pub rollout_len: usize,
    pub gamma: f64,
    pub gae_lambda: f64,
    pub actor_lr: f64,
    pub critic_lr: f64,
    pub entropy_coef: f64,
    pub max_grad_norm: f64,
    /// Multiplier applied to environment rewards before learning.
    pub reward_scale: f64,
    pub normalize_advantages: bool,
    pub seed: u64,
}

impl Default for TrainerConfig {
    fn default() -> Self {
        Self {
            iterations: 200,
            workers: 4,
            rollout_len: 128,
            gamma: 0.99,
            gae_lambda: 0.95,
            actor_lr: 0.05,
            critic_lr: 0.05,
            entropy_coef: 0.01,
            max_grad_norm: 0.5,
            reward_scale: 0.1,
            normalize_advantages: true,
            seed: 0,
        }
    }
}

impl TrainerConfig {
    pub fn with_iterations(self, iterations: usize) -> Self {
        Self { iterations, ..self }
    }

    pub fn with_workers(self, workers: usize) -> Self {
        Self { workers, ..self }
    }

    pub fn with_rollout_len(self, rollout_len: usize) -> Self {
        Self {
            rollout_len,
            ..self
        }
    }

    pub fn with_seed(self, seed: u64) -> Self {
        Self { seed, ..self }
    }

    pub fn validate(&self) -> SurgeResult<()> {
        let bad = |msg: String| -> SurgeResult<()> { Err(AgentError::InvalidConfig(msg).into()) };
        if self.workers == 0 || self.rollout_len == 0 {
            return bad(format!(
                "workers ({}) and rollout_len ({}) must be positive",
                self.workers, self.rollout_len
            ));
        }
        for (name, v) in [("gamma", self.gamma), ("gae_lambda", self.gae_lambda)] {
            if !(0.0..=1.0).contains(&v) {
                return bad(format!("{name} must be within [0, 1], got {v}"));
            }
        }
        for (name, v) in [
            ("actor_lr", self.actor_lr),
            ("critic_lr", self.critic_lr),
            ("max_grad_norm", self.max_grad_norm),
            ("reward_scale", self.reward_scale),
        ] {
            if !v.is_finite() || v <= 0.0 {
                return bad(format!("{name} must be positive, got {v}"));
            }
        }
        if !self.entropy_coef.is_finite() || self.entropy_coef < 0.0 {
            return bad(format!(
                "entropy_coef must be non-negative, got {}",
                self.entropy_coef
            ));
        }
        Ok(())
    }
}

/// Diagnostics of one policy update.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IterationStats {
    pub iteration: usize,
    /// Mean unscaled reward of episodes completed during the rollout.
    pub mean_episode_reward: Option<f64>,
    pub episodes: usize,
    pub entropy: f64,
    pub value_loss: f64,
    /// Gradient norm before clipping.
    pub grad_norm: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingReport {
    pub iterations: Vec<IterationStats>,
}

impl TrainingReport {
    /// Mean episode reward over the last `n` iterations that completed one.
    pub fn recent_mean_reward(&self, n: usize) -> Option<f64> {
        let recent: Vec<f64> = self
            .iterations
            .iter()
            .rev()
            .filter_map(|s| s.mean_episode_reward)
            .take(n)
            .collect();
        (!recent.is_empty()).then(|| recent.iter().sum::<f64>() / recent.len() as f64)
    }
}

// ================================================================================================
// Rollouts
// ================================================================================================

struct Transition {
    x: Array1<f64>,
    action: usize,
    reward: f64,
    value: f64,
    done: bool,
}

struct Rollout {
    steps: Vec<Transition>,
    bootstrap: f64,
    episode_rewards: Vec<f64>,
}

struct Worker<P> {
    env: Environment<P>,
    rng: StdRng,
    obs: Option<Observation>,
    episode_reward: f64,
}

impl<P: BasePricePredictor> Worker<P> {
    fn collect(
        &mut self,
        policy: &ActorCriticPolicy,
        len: usize,
        reward_scale: f64,
    ) -> SurgeResult<Rollout> {
        let mut obs = match self.obs.take() {
            Some(obs) => obs,
            None => self.env.reset()?,
        };
        let mut steps = Vec::with_capacity(len);
        let mut episode_rewards = Vec::new();

        for _ in 0..len {
            let x = policy.features(&obs);
            let value = policy.value_from(&x);
            let action = policy.sample(&x, &mut self.rng);
            let res = self.env.step(action)?;
            self.episode_reward += res.reward.0;

            steps.push(Transition {
                x,
                action: action.0,
                reward: res.reward.0 * reward_scale,
                value,
                done: res.done,
            });

            obs = if res.done {
                episode_rewards.push(self.episode_reward);
                self.episode_reward = 0.0;
                self.env.reset()?
            } else {
                res.observation
            };
        }

        let bootstrap = policy.value(&obs);
        self.obs = Some(obs);
        Ok(Rollout {
            steps,
            bootstrap,
            episode_rewards,
        })
    }
}

/// Generalized advantage estimation over one rollout.
///
/// Returns `(advantages, returns)`. A `done` flag cuts both the bootstrap
/// and the advantage trace.
pub fn gae(
    rewards: &[f64],
    values: &[f64],
    dones: &[bool],
    bootstrap: f64,
    gamma: f64,
    lambda: f64,
) -> (Vec<f64>, Vec<f64>) {
    let n = rewards.len();
    let mut advantages = vec![0.0; n];
    let mut running = 0.0;
    for t in (0..n).rev() {
        let next_value = if t + 1 < n { values[t + 1] } else { bootstrap };
        let mask = if dones[t] { 0.0 } else { 1.0 };
        let delta = rewards[t] + gamma * next_value * mask - values[t];
        running = delta + gamma * lambda * mask * running;
        advantages[t] = running;
    }
    let returns = advantages.iter().zip(values).map(|(a, v)| a + v).collect();
    (advantages, returns)
}

// ================================================================================================
// Trainer
// ================================================================================================

/// Synchronous advantage actor-critic.
///
/// Every iteration, all workers roll out `rollout_len` steps in parallel with
/// the current stochastic policy, then a single clipped gradient step is
/// taken on the pooled batch. Results depend only on the trainer seed and
/// worker count.
pub struct A2cTrainer<P> {
    cfg: TrainerConfig,
    workers: Vec<Worker<P>>,
    policy: ActorCriticPolicy,
    iteration: usize,
}

impl<P> A2cTrainer<P>
where
    P: BasePricePredictor + Clone + Send + Sync,
{
    /// Clones `env` once per worker and reseeds each clone.
    pub fn new(env: &Environment<P>, cfg: TrainerConfig) -> SurgeResult<Self> {
        cfg.validate()?;
        let policy = ActorCriticPolicy::new(env.action_space().n())?;
        let workers = (0..cfg.workers as u64)
            .map(|i| {
                let mut env = env.clone();
                env.reseed(cfg.seed.wrapping_mul(1_000_003).wrapping_add(i));
                Worker {
                    env,
                    rng: StdRng::seed_from_u64(cfg.seed ^ (0x9E37_79B9 + i)),
                    obs: None,
                    episode_reward: 0.0,
                }
            })
            .collect();

        Ok(Self {
            cfg,
            workers,
            policy,
            iteration: 0,
        })
    }

    /// Continues training from an existing policy.
    pub fn with_policy(self, policy: ActorCriticPolicy) -> SurgeResult<Self> {
        if policy.n_actions() != self.policy.n_actions() {
            return Err(AgentError::InvalidInput(format!(
                "policy has {} actions, environment has {}",
                policy.n_actions(),
                self.policy.n_actions()
            ))
            .into());
        }
        Ok(Self { policy, ..self })
    }

    pub fn config(&self) -> &TrainerConfig {
        &self.cfg
    }

    pub fn policy(&self) -> &ActorCriticPolicy {
        &self.policy
    }

    pub fn into_policy(self) -> ActorCriticPolicy {
        self.policy
    }

    #[tracing::instrument(skip(self), fields(iterations = self.cfg.iterations, workers = self.cfg.workers))]
    pub fn train(&mut self) -> SurgeResult<TrainingReport> {
        let pb = progress_bar(self.cfg.iterations as u64)?;
        pb.set_message("Training policy...");

        let mut iterations = Vec::with_capacity(self.cfg.iterations);
        for _ in 0..self.cfg.iterations {
            let stats = self.iterate()?;
            if let Some(r) = stats.mean_episode_reward {
                pb.set_message(format!("mean episode reward {r:.2}"));
            }
            iterations.push(stats);
            pb.inc(1);
        }

        pb.finish_with_message("Training complete.");
        Ok(TrainingReport { iterations })
    }

    /// One rollout plus one policy update.
    pub fn iterate(&mut self) -> SurgeResult<IterationStats> {
        let policy = &self.policy;
        let (len, scale) = (self.cfg.rollout_len, self.cfg.reward_scale);
        let rollouts = self
            .workers
            .par_iter_mut()
            .map(|w| w.collect(policy, len, scale))
            .collect::<SurgeResult<Vec<_>>>()?;

        let stats = self.update(&rollouts)?;
        self.iteration += 1;

        info!(
            iteration = stats.iteration,
            episodes = stats.episodes,
            mean_episode_reward = stats.mean_episode_reward,
            entropy = stats.entropy,
            value_loss = stats.value_loss,
            grad_norm = stats.grad_norm,
            "Policy updated"
        );
        Ok(stats)
    }

    fn update(&mut self, rollouts: &[Rollout]) -> SurgeResult<IterationStats> {
        let (gamma, lambda) = (self.cfg.gamma, self.cfg.gae_lambda);

        let mut batch: Vec<(&Transition, f64, f64)> = Vec::new();
        for r in rollouts {
            let rewards: Vec<f64> = r.steps.iter().map(|t| t.reward).collect();
            let values: Vec<f64> = r.steps.iter().map(|t| t.value).collect();
            let dones: Vec<bool> = r.steps.iter().map(|t| t.done).collect();
            let (adv, ret) = gae(&rewards, &values, &dones, r.bootstrap, gamma, lambda);
            batch.extend(r.steps.iter().zip(adv).zip(ret).map(|((t, a), g)| (t, a, g)));
        }
        if batch.is_empty() {
            return Err(AgentError::Execution("empty rollout batch".to_string()).into());
        }

        let n = batch.len() as f64;
        let mut advantages: Vec<f64> = batch.iter().map(|(_, a, _)| *a).collect();
        if self.cfg.normalize_advantages {
            let mean = advantages.iter().sum::<f64>() / n;
            let var = advantages.iter().map(|a| (a - mean).powi(2)).sum::<f64>() / n;
            let std = var.sqrt();
            if std < 1e-8 {
                warn!(std, "Degenerate advantage distribution");
            }
            for a in &mut advantages {
                *a = (*a - mean) / (std + 1e-8);
            }
        }

        let n_actions = self.policy.n_actions();
        let mut actor_grad = Array2::<f64>::zeros((n_actions, N_FEATURES));
        let mut critic_grad = Array1::<f64>::zeros(N_FEATURES);
        let mut entropy_sum = 0.0;
        let mut value_loss = 0.0;

        for ((t, _, ret), adv) in batch.iter().zip(&advantages) {
            let probs = self.policy.probabilities_from(&t.x);
            let entropy = -probs
                .iter()
                .filter(|p| **p > 0.0)
                .map(|p| p * p.ln())
                .sum::<f64>();
            entropy_sum += entropy;

            for k in 0..n_actions {
                let p = probs[k];
                let indicator = if k == t.action { 1.0 } else { 0.0 };
                let pg = adv * (indicator - p);
                let ent = if p > 0.0 {
                    -p * (p.ln() + entropy)
                } else {
                    0.0
                };
                let coeff = (pg + self.cfg.entropy_coef * ent) / n;
                actor_grad.row_mut(k).scaled_add(coeff, &t.x);
            }

            let err = self.policy.value_from(&t.x) - ret;
            value_loss += 0.5 * err * err / n;
            critic_grad.scaled_add(err / n, &t.x);
        }

        let grad_norm = (actor_grad.iter().map(|g| g * g).sum::<f64>()
            + critic_grad.iter().map(|g| g * g).sum::<f64>())
        .sqrt();
        if grad_norm > self.cfg.max_grad_norm {
            let scale = self.cfg.max_grad_norm / grad_norm;
            actor_grad *= scale;
            critic_grad *= scale;
        }

        self.policy.apply_gradients(
            &actor_grad,
            &critic_grad,
            self.cfg.actor_lr,
            self.cfg.critic_lr,
        )?;

        let episode_rewards: Vec<f64> = rollouts
            .iter()
            .flat_map(|r| r.episode_rewards.iter().copied())
            .collect();
        let mean_episode_reward = (!episode_rewards.is_empty())
            .then(|| episode_rewards.iter().sum::<f64>() / episode_rewards.len() as f64);

        Ok(IterationStats {
            iteration: self.iteration,
            mean_episode_reward,
            episodes: episode_rewards.len(),
            entropy: entropy_sum / n,
            value_loss,
            grad_norm,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        data::synthetic::SyntheticRides, gym::pricing::config::EnvConfig,
        gym::pricing::factory::make, predictor::DistanceFarePredictor,
    };

    fn env() -> Environment<DistanceFarePredictor> {
        let rides = SyntheticRides::default().generate(400).unwrap();
        let cfg = EnvConfig::default().with_episode_length(20);
        make(rides, DistanceFarePredictor::default(), cfg).unwrap()
    }

    #[test]
    fn gae_matches_hand_computation() {
        // Single terminal step: advantage = r - V.
        let (adv, ret) = gae(&[1.0], &[0.25], &[true], 100.0, 0.9, 0.5);
        assert_eq!(adv, vec![0.75]);
        assert_eq!(ret, vec![1.0]);

        // Two steps, bootstrapped: delta1 = 0 + 0.5*2 - 1 = 0, delta0 = 1 + 0.5*1 - 0 = 1.5
        let (adv, _) = gae(&[1.0, 0.0], &[0.0, 1.0], &[false, false], 2.0, 0.5, 1.0);
        assert_eq!(adv, vec![1.5, 0.0]);
    }

    #[test]
    fn done_cuts_the_trace() {
        let (adv, _) = gae(&[0.0, 10.0], &[0.0, 0.0], &[true, false], 0.0, 1.0, 1.0);
        assert_eq!(adv[0], 0.0);
        assert_eq!(adv[1], 10.0);
    }

    #[test]
    fn rejects_bad_config() {
        assert!(TrainerConfig::default().with_workers(0).validate().is_err());
        let cfg = TrainerConfig {
            gamma: 1.5,
            ..TrainerConfig::default()
        };
        assert!(A2cTrainer::new(&env(), cfg).is_err());
    }

    #[test]
    fn training_is_deterministic() {
        let cfg = TrainerConfig::default()
            .with_iterations(3)
            .with_workers(2)
            .with_rollout_len(30)
            .with_seed(5);
        let mut a = A2cTrainer::new(&env(), cfg.clone()).unwrap();
        let mut b = A2cTrainer::new(&env(), cfg).unwrap();
        let ra = a.train().unwrap();
        let rb = b.train().unwrap();
        assert_eq!(ra, rb);
        assert_eq!(a.policy(), b.policy());
        // 90 steps per worker complete 4 episodes of 20 steps each
        assert_eq!(ra.iterations.iter().map(|s| s.episodes).sum::<usize>(), 8);
    }

    #[test]
    fn updates_respect_the_gradient_clip() {
        let cfg = TrainerConfig::default()
            .with_iterations(1)
            .with_workers(1)
            .with_rollout_len(40);
        let max_norm = cfg.max_grad_norm;
        let lr = cfg.actor_lr.max(cfg.critic_lr);
        let mut trainer = A2cTrainer::new(&env(), cfg).unwrap();
        let before = trainer.policy().clone();
        trainer.iterate().unwrap();
        let after = trainer.policy();

        let delta = (after.actor() - before.actor()).mapv(|v| v * v).sum()
            + (after.critic() - before.critic()).mapv(|v| v * v).sum();
        assert!(delta.sqrt() <= lr * max_norm + 1e-9);
        assert_ne!(&before, after);
    }

    #[test]
    fn mismatched_policy_is_rejected() {
        let trainer = A2cTrainer::new(&env(), TrainerConfig::default()).unwrap();
        let policy = ActorCriticPolicy::new(3).unwrap();
        assert!(trainer.with_policy(policy).is_err());
    }
}

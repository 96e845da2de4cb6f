use std::cmp::Reverse;

use itertools::Itertools;
use ordered_float::OrderedFloat;
use rand::Rng;
use rayon::iter::{IntoParallelIterator, ParallelIterator};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::{
    agent::{Agent, AgentIdentifier},
    error::{AgentError, SurgeResult},
    gym::pricing::{
        env::{Environment, progress_bar},
        info::EpisodeSummary,
    },
    predictor::BasePricePredictor,
};

/// Aggregate performance of one agent over several episodes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationReport {
    pub agent: AgentIdentifier,
    pub episodes: Vec<EpisodeSummary>,
    pub mean_reward: f64,
    pub std_reward: f64,
    pub mean_revenue: f64,
    pub mean_acceptance_rate: f64,
    pub mean_surge: f64,
}

impl EvaluationReport {
    fn from_episodes(agent: AgentIdentifier, episodes: Vec<EpisodeSummary>) -> Self {
        let n = episodes.len() as f64;
        let mean = |f: fn(&EpisodeSummary) -> f64| episodes.iter().map(f).sum::<f64>() / n;
        let mean_reward = mean(|e| e.total_reward);
        let var = episodes
            .iter()
            .map(|e| (e.total_reward - mean_reward).powi(2))
            .sum::<f64>()
            / n;
        Self {
            agent,
            mean_reward,
            std_reward: var.sqrt(),
            mean_revenue: mean(|e| e.revenue),
            mean_acceptance_rate: mean(|e| e.acceptance_rate),
            mean_surge: mean(|e| e.avg_surge),
            episodes,
        }
    }
}

/// Plays `episodes` full episodes with `agent` and averages the outcome.
#[tracing::instrument(skip_all, fields(agent = %agent.identifier(), episodes = episodes))]
pub fn evaluate_agent<P, R, A>(
    env: &mut Environment<P, R>,
    agent: &mut A,
    episodes: usize,
) -> SurgeResult<EvaluationReport>
where
    P: BasePricePredictor,
    R: Rng,
    A: Agent + ?Sized,
{
    if episodes == 0 {
        return Err(
            AgentError::InvalidInput("evaluation needs at least one episode".to_string()).into(),
        );
    }
    let summaries = (0..episodes)
        .map(|_| env.run_episode(agent, None))
        .collect::<SurgeResult<Vec<_>>>()?;
    let report = EvaluationReport::from_episodes(agent.identifier(), summaries);
    info!(
        mean_reward = report.mean_reward,
        mean_revenue = report.mean_revenue,
        acceptance = report.mean_acceptance_rate,
        surge = report.mean_surge,
        "Evaluation finished"
    );
    Ok(report)
}

/// Evaluates clones of `agent` in parallel, one environment copy per seed.
/// Reports come back in `seeds` order.
pub fn evaluate_seeds<P, A>(
    env: &Environment<P>,
    agent: &A,
    seeds: &[u64],
    episodes: usize,
) -> SurgeResult<Vec<EvaluationReport>>
where
    P: BasePricePredictor + Clone + Send + Sync,
    A: Agent + Clone + Send + Sync,
{
    let pb = progress_bar(seeds.len() as u64)?;
    pb.set_message("Evaluating seeds...");

    let reports = seeds
        .into_par_iter()
        .map(|&seed| {
            let mut env = env.clone();
            env.reseed(seed);
            let report = evaluate_agent(&mut env, &mut agent.clone(), episodes);
            pb.inc(1);
            report
        })
        .collect::<SurgeResult<Vec<_>>>()?;

    pb.finish_with_message("Evaluation complete.");
    Ok(reports)
}

/// Agents ranked by mean episode reward, best first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Leaderboard {
    entries: Vec<EvaluationReport>,
}

impl Leaderboard {
    pub fn entries(&self) -> &[EvaluationReport] {
        &self.entries
    }

    pub fn best(&self) -> Option<&EvaluationReport> {
        self.entries.first()
    }

    /// One-based rank of `agent`.
    pub fn rank_of(&self, agent: &AgentIdentifier) -> Option<usize> {
        self.entries
            .iter()
            .position(|r| &r.agent == agent)
            .map(|i| i + 1)
    }
}

/// Evaluates every agent in parallel on its own copy of `env`, all copies
/// seeded with `seed` so each agent faces the same ride sequence.
pub fn compare_agents<P>(
    env: &Environment<P>,
    agents: Vec<Box<dyn Agent + Send>>,
    episodes: usize,
    seed: u64,
) -> SurgeResult<Leaderboard>
where
    P: BasePricePredictor + Clone + Send + Sync,
{
    let pb = progress_bar(agents.len() as u64)?;
    pb.set_message("Evaluating agents...");

    let reports = agents
        .into_par_iter()
        .map(|mut agent| {
            let mut env = env.clone();
            env.reseed(seed);
            let report = evaluate_agent(&mut env, &mut agent, episodes);
            pb.inc(1);
            report
        })
        .collect::<SurgeResult<Vec<_>>>()?;

    pb.finish_with_message("Evaluation complete.");
    let entries = reports
        .into_iter()
        .sorted_by_key(|r| Reverse(OrderedFloat(r.mean_reward)))
        .collect();
    Ok(Leaderboard { entries })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        agent::{fixed::FixedSurgeAgent, rule_based::RuleBasedAgent},
        data::synthetic::SyntheticRides,
        gym::pricing::{action::SurgeAction, config::EnvConfig, factory::make},
        predictor::DistanceFarePredictor,
    };

    fn env() -> Environment<DistanceFarePredictor> {
        let rides = SyntheticRides::default().generate(200).unwrap();
        let cfg = EnvConfig::default().with_episode_length(25);
        make(rides, DistanceFarePredictor::default(), cfg).unwrap()
    }

    #[test]
    fn averages_over_episodes() {
        let mut env = env();
        let mut agent = FixedSurgeAgent::new(SurgeAction(0));
        let report = evaluate_agent(&mut env, &mut agent, 3).unwrap();
        assert_eq!(report.episodes.len(), 3);
        assert!(report.episodes.iter().all(|e| e.steps == 25));
        assert_eq!(report.mean_surge, 1.0);
        let mean = report.episodes.iter().map(|e| e.total_reward).sum::<f64>() / 3.0;
        assert!((report.mean_reward - mean).abs() < 1e-9);
        assert_eq!(report.agent, AgentIdentifier::FixedSurge);
    }

    #[test]
    fn zero_episodes_is_rejected() {
        let mut env = env();
        let mut agent = RuleBasedAgent::default();
        assert!(evaluate_agent(&mut env, &mut agent, 0).is_err());
    }

    #[test]
    fn seeds_are_reproducible_and_ordered() {
        let env = env();
        let agent = RuleBasedAgent::default();
        let a = evaluate_seeds(&env, &agent, &[1, 2, 3], 2).unwrap();
        let b = evaluate_seeds(&env, &agent, &[1, 2, 3], 2).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.len(), 3);

        let mut single = env.clone();
        single.reseed(2);
        let direct = evaluate_agent(&mut single, &mut agent.clone(), 2).unwrap();
        assert_eq!(a[1], direct);
    }

    #[test]
    fn leaderboard_is_sorted() {
        let agents: Vec<Box<dyn Agent + Send>> = vec![
            Box::new(FixedSurgeAgent::new(SurgeAction(6))),
            Box::new(RuleBasedAgent::default()),
            Box::new(FixedSurgeAgent::new(SurgeAction(0))),
        ];
        let board = compare_agents(&env(), agents, 2, 9).unwrap();
        assert_eq!(board.entries().len(), 3);
        assert!(
            board
                .entries()
                .windows(2)
                .all(|w| w[0].mean_reward >= w[1].mean_reward)
        );
        assert!(board.rank_of(&AgentIdentifier::RuleBased).is_some());
        assert_eq!(board.rank_of(&AgentIdentifier::ActorCritic), None);
    }
}

use indicatif::{ProgressBar, ProgressStyle};
use rand::{Rng, SeedableRng, rngs::StdRng};
use tracing::{debug, info};

use crate::{
    agent::Agent,
    data::{dataset::RideDataset, ride::RideRecord},
    error::{EnvError, SurgeResult, SystemError},
    gym::{
        EnvStatus, Reward,
        pricing::{
            Env,
            action::{ActionSpace, SurgeAction},
            config::EnvConfig,
            history::{HistoryBuffer, StepRecord},
            info::{EpisodeSummary, PricedRide, StepInfo, StepResult},
            market::MarketState,
            noise::NoiseSampler,
            observation::Observation,
        },
    },
    predictor::{BasePricePredictor, checked_predict},
    report::EpisodeJournal,
};

/// Ride pricing environment.
///
/// Each episode replays `episode_length` consecutive rides from the dataset,
/// starting at a random offset, against a freshly sampled market. The agent
/// picks a surge for every ride, the simulated rider accepts or declines,
/// and the market drifts in response.
#[derive(Clone, Debug)]
pub struct Environment<P, R = StdRng> {
    // === Capabilities ===
    cfg: EnvConfig,
    dataset: RideDataset,
    predictor: P,
    rng: R,
    noise: NoiseSampler,

    // === Episode state ===
    market: MarketState,
    history: HistoryBuffer<StepRecord>,
    /// Absolute index of the next ride to price.
    cursor: usize,
    /// Dataset offset the current episode started at.
    start: usize,
    step_count: usize,
    revenue: f64,
    accepted_rides: u64,
    total_rides: u64,
    episode: u64,
    env_status: EnvStatus,
}

impl<P, R> Env for Environment<P, R>
where
    P: BasePricePredictor,
    R: Rng,
{
    #[tracing::instrument(skip(self), fields(episode = self.episode))]
    fn reset(&mut self) -> SurgeResult<Observation> {
        let len = self.dataset.len();
        let required = self.cfg.episode_length();
        if self.dataset.is_empty() || len < required {
            return Err(EnvError::InsufficientData {
                available: len,
                required,
            }
            .into());
        }

        self.start = self.rng.random_range(0..=len - required);
        self.cursor = self.start;
        self.market = MarketState::sample(self.cfg.initial_market(), &mut self.rng);
        self.step_count = 0;
        self.revenue = 0.0;
        self.accepted_rides = 0;
        self.total_rides = 0;
        self.history.clear();
        self.episode += 1;
        self.env_status = EnvStatus::Running;

        info!(
            start = self.start,
            demand = self.market.demand,
            supply = self.market.supply,
            "Episode Starting"
        );

        Ok(self.observe())
    }

    fn step(&mut self, action: SurgeAction) -> SurgeResult<StepResult> {
        self.check_step_status()?;

        // 1. Resolve and price. Nothing is mutated until this succeeds.
        let surge = self.cfg.levels().level(action.0)?.value();
        let record = self.current_record()?;
        let base_price = checked_predict(&self.predictor, &record.price_features())?;
        let final_price = base_price * surge;
        let hour = record.hour;
        let rain = record.rain();

        // 2. Rider decision
        let acceptance_probability = self.cfg.acceptance().probability(surge, rain, hour);
        let accepted = self.rng.random::<f64>() < acceptance_probability;

        // 3. Reward against the market the ride was quoted in
        let reward = self
            .cfg
            .reward()
            .compute(&self.market, surge, final_price, accepted);

        // 4. Transition
        if accepted {
            self.revenue += final_price;
            self.accepted_rides += 1;
        }
        self.total_rides += 1;
        self.market
            .update(surge, accepted, self.cfg.market(), &mut self.rng);
        self.step_count += 1;
        self.cursor += 1;
        let done = self.step_count >= self.cfg.episode_length();

        self.history.push(StepRecord {
            revenue: if accepted { final_price } else { 0.0 },
            accepted,
            surge,
        });

        debug!(
            step = self.step_count,
            surge,
            final_price,
            accepted,
            reward = reward.0,
            "Ride priced"
        );

        // 5. Observe S(t+1)
        let observation = self.observe();
        let info = self.info(PricedRide {
            base_price,
            surge,
            final_price,
            acceptance_probability,
            accepted,
        });

        if done {
            self.env_status = EnvStatus::Done;
            info!(
                revenue = info.revenue,
                acceptance_rate = info.acceptance_rate,
                avg_surge = info.avg_surge,
                "Episode Finished"
            );
        }

        Ok(StepResult {
            observation,
            reward,
            done,
            info,
        })
    }
}

impl<P, R> Environment<P, R>
where
    P: BasePricePredictor,
    R: Rng,
{
    /// Plays one full episode with `agent`, optionally logging every step.
    pub fn run_episode<A: Agent + ?Sized>(
        &mut self,
        agent: &mut A,
        mut journal: Option<&mut EpisodeJournal>,
    ) -> SurgeResult<EpisodeSummary> {
        let mut obs = self.reset()?;
        agent.reset();
        let episode = self.episode;
        let mut total_reward = Reward::default();

        let last = loop {
            let action = agent.act(&obs)?;
            let res = self.step(action)?;
            total_reward += res.reward.0;
            if let Some(journal) = journal.as_deref_mut() {
                journal.record(episode, self.step_count, &obs, &res);
            }
            if res.done {
                break res.info;
            }
            obs = res.observation;
        };

        Ok(EpisodeSummary {
            steps: self.step_count,
            total_reward: total_reward.0,
            revenue: last.revenue,
            acceptance_rate: last.acceptance_rate,
            avg_surge: last.avg_surge,
        })
    }

    fn check_step_status(&self) -> SurgeResult<()> {
        use EnvStatus::*;
        match self.env_status {
            Running => Ok(()),
            Uninitialized => Err(EnvError::InvalidState(
                "Environment is not started. Call `reset()` before stepping.".to_string(),
            )
            .into()),
            Done => Err(EnvError::InvalidState(
                "Episode is done. Call `reset()` before stepping.".to_string(),
            )
            .into()),
        }
    }

    fn current_record(&self) -> SurgeResult<&RideRecord> {
        self.dataset.get(self.cursor).ok_or_else(|| {
            SystemError::IndexOutOfBounds(format!(
                "cursor {} past dataset of {} rides",
                self.cursor,
                self.dataset.len()
            ))
            .into()
        })
    }

    /// The terminal observation of an episode that ends on the last ride
    /// repeats that ride's calendar.
    fn observe(&mut self) -> Observation {
        let idx = self.cursor.min(self.dataset.len().saturating_sub(1));
        let (hour, day_of_week) = self
            .dataset
            .get(idx)
            .map(|r| (r.hour, r.day_of_week))
            .unwrap_or_default();
        let recent = self
            .dataset
            .trailing_count(self.cursor, self.cfg.noise().recent_window);

        Observation {
            hour,
            day_of_week,
            demand: self.market.demand,
            supply: self.market.supply,
            recent_ride_count: u32::try_from(recent).unwrap_or(u32::MAX),
            avg_wait_time: self.noise.wait_time(&mut self.rng),
            competitor_surge: self.noise.competitor_surge(&mut self.rng),
        }
    }

    fn info(&self, ride: PricedRide) -> StepInfo {
        StepInfo {
            revenue: self.revenue,
            acceptance_rate: self.accepted_rides as f64 / self.total_rides.max(1) as f64,
            avg_surge: self.history.mean_surge(),
            demand: self.market.demand,
            supply: self.market.supply,
            ride,
        }
    }
}

// ================================================================================================
// Accessors
// ================================================================================================

impl<P, R> Environment<P, R> {
    pub fn status(&self) -> EnvStatus {
        self.env_status
    }

    pub fn config(&self) -> &EnvConfig {
        &self.cfg
    }

    pub fn dataset(&self) -> &RideDataset {
        &self.dataset
    }

    pub fn predictor(&self) -> &P {
        &self.predictor
    }

    pub fn market(&self) -> MarketState {
        self.market
    }

    pub fn history(&self) -> &HistoryBuffer<StepRecord> {
        &self.history
    }

    pub fn action_space(&self) -> ActionSpace {
        ActionSpace::new(self.cfg.levels().len())
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn episode_start(&self) -> usize {
        self.start
    }

    pub fn step_count(&self) -> usize {
        self.step_count
    }

    /// Number of episodes started since construction.
    pub fn episodes(&self) -> u64 {
        self.episode
    }
}

impl<P> Environment<P, StdRng> {
    /// Replaces the RNG, making subsequent episodes reproducible from `seed`.
    pub fn reseed(&mut self, seed: u64) {
        self.rng = StdRng::seed_from_u64(seed);
    }
}

// ================================================================================================
// Building
// ================================================================================================

impl<P, R> Environment<P, R> {
    pub(super) fn new(
        cfg: EnvConfig,
        dataset: RideDataset,
        predictor: P,
        rng: R,
    ) -> SurgeResult<Self> {
        cfg.validate()?;
        let noise = NoiseSampler::new(cfg.noise())?;
        let history = HistoryBuffer::with_capacity(cfg.history_capacity())?;
        Ok(Self {
            cfg,
            dataset,
            predictor,
            rng,
            noise,
            market: MarketState {
                demand: 0.0,
                supply: 0.0,
            },
            history,
            cursor: 0,
            start: 0,
            step_count: 0,
            revenue: 0.0,
            accepted_rides: 0,
            total_rides: 0,
            episode: 0,
            env_status: EnvStatus::Uninitialized,
        })
    }
}

// ================================================================================================
// Helper Functions
// ================================================================================================
pub(crate) fn progress_bar(capacity: u64) -> SurgeResult<ProgressBar> {
    let bar = ProgressBar::new(capacity);
    bar.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta_precise}) {msg}")
            .map_err(EnvError::ProgressBar)?
            .progress_chars("#>-"));
    Ok(bar)
}

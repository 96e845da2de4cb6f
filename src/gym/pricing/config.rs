use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::{
    error::{EnvError, IoError, SurgeResult},
    gym::pricing::{
        acceptance::AcceptanceConfig,
        market::{InitialMarketConfig, MarketDynamicsConfig},
        noise::NoiseConfig,
        reward::RewardConfig,
    },
    surge::SurgeLevels,
};

/// Configuration blueprint for building a pricing environment.
///
/// # Components
///
/// **Episode:**
/// - `episode_length`: Rides priced per episode
/// - `history_capacity`: Size of the step history ring buffer
/// - `seed`: Seed of the environment RNG
///
/// **Decision Space:**
/// - `levels`: Surge multipliers the agent chooses from
///
/// **Simulation Models:**
/// - `reward`, `acceptance`, `market`, `initial_market`, `noise`
///
/// # Example
///
/// ```no_run
/// # use fareflow::prelude::*;
/// # fn example() -> SurgeResult<()> {
/// let cfg = EnvConfig::default()
///     .with_episode_length(50)
///     .with_seed(7);
///
/// let rides = SyntheticRides::default().generate(1_000)?;
/// let env = make(rides, DistanceFarePredictor::default(), cfg)?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnvConfig {
    episode_length: usize,
    history_capacity: usize,
    seed: u64,
    levels: SurgeLevels,
    reward: RewardConfig,
    acceptance: AcceptanceConfig,
    market: MarketDynamicsConfig,
    initial_market: InitialMarketConfig,
    noise: NoiseConfig,
}

impl Default for EnvConfig {
    fn default() -> Self {
        Self {
            episode_length: 100,
            history_capacity: 1000,
            seed: 42,
            levels: SurgeLevels::default(),
            reward: RewardConfig::default(),
            acceptance: AcceptanceConfig::default(),
            market: MarketDynamicsConfig::default(),
            initial_market: InitialMarketConfig::default(),
            noise: NoiseConfig::default(),
        }
    }
}

// ================================================================================================
// Builder Methods
// ================================================================================================

impl EnvConfig {
    pub fn with_episode_length(self, episode_length: usize) -> Self {
        Self {
            episode_length,
            ..self
        }
    }

    pub fn with_history_capacity(self, history_capacity: usize) -> Self {
        Self {
            history_capacity,
            ..self
        }
    }

    pub fn with_seed(self, seed: u64) -> Self {
        Self { seed, ..self }
    }

    pub fn with_levels(self, levels: SurgeLevels) -> Self {
        Self { levels, ..self }
    }

    pub fn with_reward(self, reward: RewardConfig) -> Self {
        Self { reward, ..self }
    }

    pub fn with_acceptance(self, acceptance: AcceptanceConfig) -> Self {
        Self { acceptance, ..self }
    }

    pub fn with_market(self, market: MarketDynamicsConfig) -> Self {
        Self { market, ..self }
    }

    pub fn with_initial_market(self, initial_market: InitialMarketConfig) -> Self {
        Self {
            initial_market,
            ..self
        }
    }

    pub fn with_noise(self, noise: NoiseConfig) -> Self {
        Self { noise, ..self }
    }
}

// ================================================================================================
// Accessor Methods
// ================================================================================================

impl EnvConfig {
    pub fn episode_length(&self) -> usize {
        self.episode_length
    }

    pub fn history_capacity(&self) -> usize {
        self.history_capacity
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn levels(&self) -> &SurgeLevels {
        &self.levels
    }

    pub fn reward(&self) -> &RewardConfig {
        &self.reward
    }

    pub fn acceptance(&self) -> &AcceptanceConfig {
        &self.acceptance
    }

    pub fn market(&self) -> &MarketDynamicsConfig {
        &self.market
    }

    pub fn initial_market(&self) -> &InitialMarketConfig {
        &self.initial_market
    }

    pub fn noise(&self) -> &NoiseConfig {
        &self.noise
    }
}

// ================================================================================================
// Validation, Hashing & Persistence
// ================================================================================================

impl EnvConfig {
    pub fn validate(&self) -> SurgeResult<()> {
        if self.episode_length == 0 {
            return Err(
                EnvError::InvalidConfig("episode_length must be at least 1".to_string()).into(),
            );
        }
        if self.history_capacity == 0 {
            return Err(
                EnvError::InvalidConfig("history_capacity must be at least 1".to_string()).into(),
            );
        }
        self.acceptance.validate()?;
        self.market.validate()?;
        self.initial_market.validate()?;
        self.noise.validate()
    }

    /// Computes a deterministic hash of this configuration.
    ///
    /// Used to name persisted policies and journals after the environment
    /// they were produced with.
    pub fn hash(&self) -> SurgeResult<String> {
        let mut hasher = blake3::Hasher::new();
        let bytes = postcard::to_stdvec(self).map_err(EnvError::Encoding)?;
        hasher.update(&bytes);
        Ok(format!("{}", hasher.finalize()))
    }

    /// Reads a JSON configuration. Missing fields take their defaults.
    pub fn from_json_file(path: impl AsRef<Path>) -> SurgeResult<Self> {
        let file = std::fs::File::open(path.as_ref())
            .map_err(|e| IoError::ReaderCreation(format!("{}: {e}", path.as_ref().display())))?;
        let cfg: Self =
            serde_json::from_reader(std::io::BufReader::new(file)).map_err(IoError::Json)?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn to_json_file(&self, path: impl AsRef<Path>) -> SurgeResult<()> {
        let file = std::fs::File::create(path.as_ref())
            .map_err(|e| IoError::WriterCreation(format!("{}: {e}", path.as_ref().display())))?;
        serde_json::to_writer_pretty(std::io::BufWriter::new(file), self).map_err(IoError::Json)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_valid() {
        let cfg = EnvConfig::default();
        assert!(cfg.validate().is_ok());
        assert_eq!(cfg.episode_length(), 100);
        assert_eq!(cfg.history_capacity(), 1000);
        assert_eq!(cfg.levels().len(), 7);
    }

    #[test]
    fn hash_tracks_content() {
        let a = EnvConfig::default();
        let b = EnvConfig::default().with_seed(43);
        assert_eq!(a.hash().unwrap(), EnvConfig::default().hash().unwrap());
        assert_ne!(a.hash().unwrap(), b.hash().unwrap());
    }

    #[test]
    fn partial_json_uses_defaults() {
        let cfg: EnvConfig =
            serde_json::from_str(r#"{"episode_length": 25, "levels": [1.0, 2.0]}"#).unwrap();
        assert_eq!(cfg.episode_length(), 25);
        assert_eq!(cfg.levels().len(), 2);
        assert_eq!(cfg.reward(), &RewardConfig::default());
    }

    #[test]
    fn rejects_zero_lengths() {
        assert!(EnvConfig::default().with_episode_length(0).validate().is_err());
        assert!(EnvConfig::default().with_history_capacity(0).validate().is_err());
    }

    #[test]
    fn json_file_round_trip() {
        let path = std::env::temp_dir().join(format!("fareflow-env-{}.json", std::process::id()));
        let cfg = EnvConfig::default().with_episode_length(12);
        cfg.to_json_file(&path).unwrap();
        let back = EnvConfig::from_json_file(&path).unwrap();
        std::fs::remove_file(&path).ok();
        assert_eq!(back, cfg);
    }
}

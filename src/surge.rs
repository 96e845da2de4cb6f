use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, IntoStaticStr};

use crate::error::{PricingError, SurgeError, SurgeResult, invalid_input};

// ================================================================================================
// Surge Levels
// ================================================================================================

/// A surge multiplier taken from a [`SurgeLevels`] set.
///
/// There is no public constructor: every `SurgeLevel` in circulation was
/// resolved against a validated level set.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize)]
pub struct SurgeLevel(f64);

impl SurgeLevel {
    pub fn value(self) -> f64 {
        self.0
    }

    pub fn is_surging(self) -> bool {
        self.0 > 1.0
    }
}

impl From<SurgeLevel> for f64 {
    fn from(level: SurgeLevel) -> Self {
        level.0
    }
}

impl std::fmt::Display for SurgeLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.2}x", self.0)
    }
}

/// Ordered set of allowed surge multipliers. The index of a level is its
/// action encoding.
///
/// Levels are finite, at least `1.0` and strictly increasing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<f64>", into = "Vec<f64>")]
pub struct SurgeLevels(Vec<f64>);

impl Default for SurgeLevels {
    fn default() -> Self {
        Self(vec![1.0, 1.25, 1.5, 1.75, 2.0, 2.5, 3.0])
    }
}

impl SurgeLevels {
    pub fn new(levels: Vec<f64>) -> SurgeResult<Self> {
        if levels.is_empty() {
            return Err(config_err("surge level set is empty"));
        }
        if let Some(bad) = levels.iter().find(|l| !l.is_finite() || **l < 1.0) {
            return Err(config_err(format!(
                "surge levels must be finite and >= 1.0, got {bad}"
            )));
        }
        if levels.windows(2).any(|w| w[0] >= w[1]) {
            return Err(config_err(format!(
                "surge levels must be strictly increasing, got {levels:?}"
            )));
        }
        Ok(Self(levels))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, idx: usize) -> Option<SurgeLevel> {
        self.0.get(idx).copied().map(SurgeLevel)
    }

    /// Resolves an action index, failing with `InvalidInput` when it is out
    /// of range.
    pub fn level(&self, idx: usize) -> SurgeResult<SurgeLevel> {
        self.get(idx).ok_or_else(|| {
            invalid_input(format!(
                "surge action {idx} out of range [0, {})",
                self.len()
            ))
        })
    }

    /// Looks up a multiplier by exact value.
    pub fn resolve(&self, multiplier: f64) -> Option<SurgeLevel> {
        self.index_of(multiplier).map(|i| SurgeLevel(self.0[i]))
    }

    pub fn index_of(&self, multiplier: f64) -> Option<usize> {
        self.0.iter().position(|l| *l == multiplier)
    }

    pub fn contains(&self, multiplier: f64) -> bool {
        self.index_of(multiplier).is_some()
    }

    pub fn min(&self) -> SurgeLevel {
        SurgeLevel(self.0[0])
    }

    pub fn max(&self) -> SurgeLevel {
        SurgeLevel(self.0[self.0.len() - 1])
    }

    pub fn iter(&self) -> impl Iterator<Item = SurgeLevel> + '_ {
        self.0.iter().copied().map(SurgeLevel)
    }
}

impl TryFrom<Vec<f64>> for SurgeLevels {
    type Error = SurgeError;

    fn try_from(levels: Vec<f64>) -> Result<Self, Self::Error> {
        Self::new(levels)
    }
}

impl From<SurgeLevels> for Vec<f64> {
    fn from(levels: SurgeLevels) -> Self {
        levels.0
    }
}

// ================================================================================================
// Rule-Based Selection
// ================================================================================================

/// Demand/supply pressure bucket.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Display, EnumIter, IntoStaticStr,
)]
pub enum SurgeTier {
    Low,
    Medium,
    High,
    VeryHigh,
    Extreme,
}

/// Multiplier assigned to each [`SurgeTier`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SurgeThresholds {
    pub low: f64,
    pub medium: f64,
    pub high: f64,
    pub very_high: f64,
    pub extreme: f64,
}

impl Default for SurgeThresholds {
    fn default() -> Self {
        Self {
            low: 1.0,
            medium: 1.25,
            high: 1.5,
            very_high: 2.0,
            extreme: 2.5,
        }
    }
}

impl SurgeThresholds {
    pub fn multiplier(&self, tier: SurgeTier) -> f64 {
        match tier {
            SurgeTier::Low => self.low,
            SurgeTier::Medium => self.medium,
            SurgeTier::High => self.high,
            SurgeTier::VeryHigh => self.very_high,
            SurgeTier::Extreme => self.extreme,
        }
    }

    fn as_array(&self) -> [f64; 5] {
        [self.low, self.medium, self.high, self.very_high, self.extreme]
    }
}

/// Upper (exclusive) demand/supply ratio bound of each tier below `Extreme`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RatioBands {
    pub low: f64,
    pub medium: f64,
    pub high: f64,
    pub very_high: f64,
}

impl Default for RatioBands {
    fn default() -> Self {
        Self {
            low: 1.2,
            medium: 1.5,
            high: 2.0,
            very_high: 2.5,
        }
    }
}

impl RatioBands {
    pub fn tier(&self, ratio: f64) -> SurgeTier {
        if ratio < self.low {
            SurgeTier::Low
        } else if ratio < self.medium {
            SurgeTier::Medium
        } else if ratio < self.high {
            SurgeTier::High
        } else if ratio < self.very_high {
            SurgeTier::VeryHigh
        } else {
            SurgeTier::Extreme
        }
    }

    fn as_array(&self) -> [f64; 4] {
        [self.low, self.medium, self.high, self.very_high]
    }
}

/// Deterministic surge from the demand/supply ratio.
///
/// Thresholds are checked against the level set at construction, so
/// [`RuleBasedSurge::select`] always yields a member of it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleBasedSurge {
    levels: SurgeLevels,
    thresholds: SurgeThresholds,
    bands: RatioBands,
}

impl Default for RuleBasedSurge {
    fn default() -> Self {
        Self {
            levels: SurgeLevels::default(),
            thresholds: SurgeThresholds::default(),
            bands: RatioBands::default(),
        }
    }
}

impl RuleBasedSurge {
    pub fn new(
        levels: SurgeLevels,
        thresholds: SurgeThresholds,
        bands: RatioBands,
    ) -> SurgeResult<Self> {
        let multipliers = thresholds.as_array();
        if let Some(m) = multipliers.iter().find(|m| !levels.contains(**m)) {
            return Err(config_err(format!(
                "threshold {m} is not one of the surge levels {:?}",
                Vec::from(levels.clone())
            )));
        }
        if multipliers.windows(2).any(|w| w[0] > w[1]) {
            return Err(config_err(format!(
                "thresholds must be non-decreasing by tier, got {multipliers:?}"
            )));
        }
        let b = bands.as_array();
        if b.iter().any(|v| !v.is_finite() || *v <= 0.0) || b.windows(2).any(|w| w[0] >= w[1]) {
            return Err(config_err(format!(
                "ratio bands must be positive and strictly increasing, got {b:?}"
            )));
        }
        Ok(Self {
            levels,
            thresholds,
            bands,
        })
    }

    pub fn levels(&self) -> &SurgeLevels {
        &self.levels
    }

    pub fn thresholds(&self) -> SurgeThresholds {
        self.thresholds
    }

    pub fn bands(&self) -> RatioBands {
        self.bands
    }

    pub fn tier(&self, demand: f64, supply: f64) -> SurgeResult<SurgeTier> {
        if !demand.is_finite() || !supply.is_finite() {
            return Err(invalid_input(format!(
                "demand and supply must be finite, got {demand} / {supply}"
            )));
        }
        if supply <= 0.0 {
            return Err(invalid_input(format!("supply must be positive, got {supply}")));
        }
        Ok(self.bands.tier(demand / supply))
    }

    pub fn select(&self, demand: f64, supply: f64) -> SurgeResult<SurgeLevel> {
        let tier = self.tier(demand, supply)?;
        let multiplier = self.thresholds.multiplier(tier);
        self.levels.resolve(multiplier).ok_or_else(|| {
            config_err(format!("threshold {multiplier} left the surge level set"))
        })
    }
}

// ================================================================================================
// Rider Recommendation
// ================================================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, Serialize, Deserialize)]
pub enum RecommendationTier {
    High,
    Moderate,
    LowOrNone,
}

impl RecommendationTier {
    pub fn from_multiplier(multiplier: f64) -> Self {
        if multiplier >= 2.0 {
            Self::High
        } else if multiplier >= 1.5 {
            Self::Moderate
        } else {
            Self::LowOrNone
        }
    }

    pub fn advice(self) -> &'static str {
        match self {
            Self::High => "High surge - consider waiting if possible",
            Self::Moderate => "Moderate surge - typical for this time",
            Self::LowOrNone => "Good time to ride - low or no surge",
        }
    }
}

fn config_err(msg: impl Into<String>) -> SurgeError {
    PricingError::InvalidSurgeConfig(msg.into()).into()
}

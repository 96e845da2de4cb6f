use polars::{
    df,
    frame::DataFrame,
    prelude::{CsvWriter, DataType, IntoLazy, SerWriter, SortMultipleOptions, col},
};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString, IntoStaticStr};
use tracing::info;

use crate::{
    error::{DataError, IoError, SurgeResult},
    gym::pricing::{info::StepResult, observation::Observation},
    io::{DEFAULT_BUFFER_SIZE, StorageLocation},
};

/// Columns of the step journal, in output order.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    EnumString,
    Display,
    PartialOrd,
    Ord,
    EnumIter,
    IntoStaticStr,
)]
#[strum(serialize_all = "snake_case")]
pub enum JournalCol {
    // === Identifiers ===
    Episode,
    Step,

    // === Observed market ===
    Hour,
    DayOfWeek,
    Demand,
    Supply,

    // === Priced ride ===
    Surge,
    BasePrice,
    FinalPrice,
    AcceptanceProbability,
    Accepted,

    // === Outcome ===
    Reward,
    Revenue,
}

impl JournalCol {
    pub fn name(self) -> &'static str {
        self.into()
    }
}

/// One environment step as seen by the journal.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct JournalEntry {
    pub episode: u64,
    pub step: usize,
    pub hour: u8,
    pub day_of_week: u8,
    /// Market before the step was applied.
    pub demand: f64,
    pub supply: f64,
    pub surge: f64,
    pub base_price: f64,
    pub final_price: f64,
    pub acceptance_probability: f64,
    pub accepted: bool,
    pub reward: f64,
    /// Cumulative episode revenue after the step.
    pub revenue: f64,
}

/// Step-by-step log of priced rides across one or more episodes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EpisodeJournal {
    entries: Vec<JournalEntry>,
}

impl EpisodeJournal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends the transition `obs -> res`. `obs` is the observation the
    /// action was chosen on.
    pub fn record(&mut self, episode: u64, step: usize, obs: &Observation, res: &StepResult) {
        let ride = res.info.ride;
        self.entries.push(JournalEntry {
            episode,
            step,
            hour: obs.hour.value(),
            day_of_week: obs.day_of_week.value(),
            demand: obs.demand,
            supply: obs.supply,
            surge: ride.surge,
            base_price: ride.base_price,
            final_price: ride.final_price,
            acceptance_probability: ride.acceptance_probability,
            accepted: ride.accepted,
            reward: res.reward.0,
            revenue: res.info.revenue,
        });
    }

    pub fn entries(&self) -> &[JournalEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn to_df(&self) -> SurgeResult<DataFrame> {
        let e = &self.entries;
        let pick = |f: fn(&JournalEntry) -> f64| e.iter().map(f).collect::<Vec<_>>();
        df!(
            JournalCol::Episode.name() => e.iter().map(|r| r.episode).collect::<Vec<_>>(),
            JournalCol::Step.name() => e.iter().map(|r| r.step as u64).collect::<Vec<_>>(),
            JournalCol::Hour.name() => e.iter().map(|r| u32::from(r.hour)).collect::<Vec<_>>(),
            JournalCol::DayOfWeek.name() => e.iter().map(|r| u32::from(r.day_of_week)).collect::<Vec<_>>(),
            JournalCol::Demand.name() => pick(|r| r.demand),
            JournalCol::Supply.name() => pick(|r| r.supply),
            JournalCol::Surge.name() => pick(|r| r.surge),
            JournalCol::BasePrice.name() => pick(|r| r.base_price),
            JournalCol::FinalPrice.name() => pick(|r| r.final_price),
            JournalCol::AcceptanceProbability.name() => pick(|r| r.acceptance_probability),
            JournalCol::Accepted.name() => e.iter().map(|r| r.accepted).collect::<Vec<_>>(),
            JournalCol::Reward.name() => pick(|r| r.reward),
            JournalCol::Revenue.name() => pick(|r| r.revenue),
        )
        .map_err(|e| DataError::DataFrame(format!("Failed to build journal frame: {e}")).into())
    }

    /// Per-episode totals: steps, reward, final revenue, acceptance rate and
    /// mean surge, sorted by episode.
    pub fn episode_summary(&self) -> SurgeResult<DataFrame> {
        let episode = JournalCol::Episode.name();
        self.to_df()?
            .lazy()
            .group_by([col(episode)])
            .agg([
                col(JournalCol::Step.name()).count().alias("steps"),
                col(JournalCol::Reward.name()).sum().alias("total_reward"),
                col(JournalCol::Revenue.name()).last().alias("revenue"),
                col(JournalCol::Accepted.name())
                    .cast(DataType::Float64)
                    .mean()
                    .alias("acceptance_rate"),
                col(JournalCol::Surge.name()).mean().alias("avg_surge"),
            ])
            .sort([episode], SortMultipleOptions::default())
            .collect()
            .map_err(|e| DataError::DataFrame(format!("Failed to summarize journal: {e}")).into())
    }

    /// Writes the journal to `<dir>/<name>.csv`, overwriting any existing file.
    pub fn to_csv(&self, location: &StorageLocation<'_>, name: &str) -> SurgeResult<()> {
        let mut df = self.to_df()?;
        let file_name = format!("{name}.csv");
        let mut writer = location.writer(&file_name, DEFAULT_BUFFER_SIZE)?;
        CsvWriter::new(&mut writer)
            .include_header(true)
            .finish(&mut df)
            .map_err(|e| IoError::FileSystem(format!("Failed to write '{file_name}': {e}")))?;
        info!(
            journal = name,
            rows = self.len(),
            dir = %location.path().display(),
            "Wrote journal"
        );
        Ok(())
    }

    /// Serializes the journal to a JSON array of row objects.
    pub fn to_json(&self) -> SurgeResult<serde_json::Value> {
        Ok(serde_json::to_value(&self.entries).map_err(IoError::Json)?)
    }
}

#[cfg(test)]
mod tests {
    use polars::prelude::AnyValue;

    use super::*;
    use crate::{
        data::domain::{DayOfWeek, Hour},
        gym::{
            Reward,
            pricing::info::{PricedRide, StepInfo},
        },
    };

    fn obs(demand: f64) -> Observation {
        Observation {
            hour: Hour::new(17).unwrap(),
            day_of_week: DayOfWeek::new(2).unwrap(),
            demand,
            supply: 40.0,
            recent_ride_count: 12,
            avg_wait_time: 6.0,
            competitor_surge: 1.0,
        }
    }

    fn result(surge: f64, accepted: bool, reward: f64, revenue: f64) -> StepResult {
        StepResult {
            observation: obs(50.0),
            reward: Reward(reward),
            done: false,
            info: StepInfo {
                revenue,
                ride: PricedRide {
                    base_price: 10.0,
                    surge,
                    final_price: 10.0 * surge,
                    acceptance_probability: 0.8,
                    accepted,
                },
                ..StepInfo::default()
            },
        }
    }

    fn journal() -> EpisodeJournal {
        let mut j = EpisodeJournal::new();
        j.record(1, 1, &obs(60.0), &result(1.5, true, 2.0, 15.0));
        j.record(1, 2, &obs(61.0), &result(2.0, false, -1.0, 15.0));
        j.record(2, 1, &obs(30.0), &result(1.0, true, 0.5, 10.0));
        j
    }

    #[test]
    fn frame_has_one_row_per_step() {
        let df = journal().to_df().unwrap();
        assert_eq!(df.height(), 3);
        assert_eq!(df.width(), 13);
        let surge = df.column(JournalCol::Surge.name()).unwrap();
        assert_eq!(surge.get(1).unwrap(), AnyValue::Float64(2.0));
    }

    #[test]
    fn summary_groups_by_episode() {
        let summary = journal().episode_summary().unwrap();
        assert_eq!(summary.height(), 2);
        let reward = summary.column("total_reward").unwrap();
        assert_eq!(reward.get(0).unwrap(), AnyValue::Float64(1.0));
        let rate = summary.column("acceptance_rate").unwrap();
        assert_eq!(rate.get(0).unwrap(), AnyValue::Float64(0.5));
        assert_eq!(rate.get(1).unwrap(), AnyValue::Float64(1.0));
    }

    #[test]
    fn json_rows_carry_column_names() {
        let value = journal().to_json().unwrap();
        let rows = value.as_array().unwrap();
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0]["final_price"], 15.0);
        assert_eq!(rows[1]["accepted"], false);
    }

    #[test]
    fn csv_lands_in_directory() {
        let dir = std::env::temp_dir().join(format!("fareflow-journal-{}", std::process::id()));
        journal()
            .to_csv(&StorageLocation::Local(&dir), "episodes")
            .unwrap();
        let text = std::fs::read_to_string(dir.join("episodes.csv")).unwrap();
        assert!(text.starts_with("episode,step,hour,day_of_week,demand"));
        assert_eq!(text.lines().count(), 4);
        std::fs::remove_dir_all(&dir).ok();
    }
}

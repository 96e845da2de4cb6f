use serde::{Deserialize, Serialize};
use strum::{Display, EnumCount, EnumIter, EnumString, IntoEnumIterator, IntoStaticStr};

use crate::error::{SurgeResult, invalid_input};

// ================================================================================================
// Domain Strong Types (NewTypes)
// ================================================================================================

/// Hour of the day in `[0, 23]`.
///
/// The only way to build an `Hour` is through validation, so every consumer
/// (demand estimation, acceptance model, observations) can rely on the range.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(try_from = "u8", into = "u8")]
pub struct Hour(u8);

impl Hour {
    pub const MAX: u8 = 23;

    pub fn new(hour: u8) -> SurgeResult<Self> {
        if hour > Self::MAX {
            return Err(invalid_input(format!(
                "hour must be within [0, {}], got {hour}",
                Self::MAX
            )));
        }
        Ok(Self(hour))
    }

    /// Validates a wide integer, as read from data files or request payloads.
    pub fn from_i64(hour: i64) -> SurgeResult<Self> {
        u8::try_from(hour)
            .map_err(|_| invalid_input(format!("hour must be within [0, 23], got {hour}")))
            .and_then(Self::new)
    }

    pub fn value(self) -> u8 {
        self.0
    }
}

impl TryFrom<u8> for Hour {
    type Error = crate::error::SurgeError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Hour> for u8 {
    fn from(hour: Hour) -> Self {
        hour.0
    }
}

impl std::fmt::Display for Hour {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:02}h", self.0)
    }
}

/// Day of the week, `0 = Monday` through `6 = Sunday`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(try_from = "u8", into = "u8")]
pub struct DayOfWeek(u8);

impl DayOfWeek {
    pub const MAX: u8 = 6;

    pub fn new(day: u8) -> SurgeResult<Self> {
        if day > Self::MAX {
            return Err(invalid_input(format!(
                "day_of_week must be within [0, {}], got {day}",
                Self::MAX
            )));
        }
        Ok(Self(day))
    }

    pub fn from_i64(day: i64) -> SurgeResult<Self> {
        u8::try_from(day)
            .map_err(|_| invalid_input(format!("day_of_week must be within [0, 6], got {day}")))
            .and_then(Self::new)
    }

    pub fn value(self) -> u8 {
        self.0
    }

    /// Saturday and Sunday.
    pub fn is_weekend(self) -> bool {
        self.0 >= 5
    }
}

impl From<chrono::Weekday> for DayOfWeek {
    fn from(weekday: chrono::Weekday) -> Self {
        Self(weekday.num_days_from_monday() as u8)
    }
}

impl TryFrom<u8> for DayOfWeek {
    type Error = crate::error::SurgeError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<DayOfWeek> for u8 {
    fn from(day: DayOfWeek) -> Self {
        day.0
    }
}

// ================================================================================================
// Hour Sets
// ================================================================================================

/// A set of hours of the day, stored as a 24-bit mask.
///
/// Serialized as a plain list of hours so configuration files stay readable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "Vec<u8>", into = "Vec<u8>")]
pub struct HourSet(u32);

impl HourSet {
    pub const RUSH: Self = Self::from_slice(&[7, 8, 9, 17, 18, 19]);
    pub const LATE_NIGHT: Self = Self::from_slice(&[22, 23, 0, 1, 2, 3]);
    pub const LUNCH: Self = Self::from_slice(&[12, 13]);

    /// Late-night window used by the rider acceptance model. Narrower than
    /// [`HourSet::LATE_NIGHT`]: 3am is not included.
    pub const LATE_NIGHT_ACCEPTANCE: Self = Self::from_slice(&[22, 23, 0, 1, 2]);

    /// Builds a set at compile time. Hours above 23 are ignored.
    pub const fn from_slice(hours: &[u8]) -> Self {
        let mut mask = 0u32;
        let mut i = 0;
        while i < hours.len() {
            if hours[i] <= Hour::MAX {
                mask |= 1 << hours[i];
            }
            i += 1;
        }
        Self(mask)
    }

    pub fn contains(&self, hour: Hour) -> bool {
        self.0 & (1 << hour.value()) != 0
    }

    pub fn hours(&self) -> impl Iterator<Item = u8> + '_ {
        (0..=Hour::MAX).filter(|h| self.0 & (1 << h) != 0)
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }
}

impl TryFrom<Vec<u8>> for HourSet {
    type Error = crate::error::SurgeError;

    fn try_from(hours: Vec<u8>) -> Result<Self, Self::Error> {
        for &h in &hours {
            Hour::new(h)?;
        }
        Ok(Self::from_slice(&hours))
    }
}

impl From<HourSet> for Vec<u8> {
    fn from(set: HourSet) -> Self {
        set.hours().collect()
    }
}

// ================================================================================================
// Ride Products
// ================================================================================================

/// Ride product as named in the historical ride data.
///
/// Declaration order is alphabetical, so [`ServiceCategory::code`] matches a
/// label encoding fitted over the full product catalogue.
#[derive(
    Copy,
    Clone,
    Debug,
    PartialEq,
    Eq,
    Hash,
    Display,
    EnumString,
    EnumIter,
    EnumCount,
    IntoStaticStr,
    Serialize,
    Deserialize,
    PartialOrd,
    Ord,
)]
pub enum ServiceCategory {
    #[strum(serialize = "Black")]
    #[serde(rename = "Black")]
    Black,
    #[strum(serialize = "Black SUV")]
    #[serde(rename = "Black SUV")]
    BlackSuv,
    #[strum(serialize = "Lux")]
    #[serde(rename = "Lux")]
    Lux,
    #[strum(serialize = "Lux Black")]
    #[serde(rename = "Lux Black")]
    LuxBlack,
    #[strum(serialize = "Lux Black XL")]
    #[serde(rename = "Lux Black XL")]
    LuxBlackXl,
    #[strum(serialize = "Lyft")]
    #[serde(rename = "Lyft")]
    Lyft,
    #[strum(serialize = "Lyft XL")]
    #[serde(rename = "Lyft XL")]
    LyftXl,
    #[strum(serialize = "Shared")]
    #[serde(rename = "Shared")]
    Shared,
    #[strum(serialize = "Taxi")]
    #[serde(rename = "Taxi")]
    Taxi,
    #[strum(serialize = "UberPool")]
    #[serde(rename = "UberPool")]
    UberPool,
    #[strum(serialize = "UberX")]
    #[serde(rename = "UberX")]
    UberX,
    #[strum(serialize = "UberXL")]
    #[serde(rename = "UberXL")]
    UberXl,
    #[strum(serialize = "WAV")]
    #[serde(rename = "WAV")]
    Wav,
}

impl ServiceCategory {
    /// Label-encoded product code.
    pub fn code(self) -> u8 {
        self as u8
    }

    pub fn from_code(code: i64) -> SurgeResult<Self> {
        Self::iter()
            .find(|s| i64::from(s.code()) == code)
            .ok_or_else(|| invalid_input(format!("unknown service code {code}")))
    }

    /// Platform operating this product.
    pub fn cab_type(self) -> CabType {
        use ServiceCategory::*;
        match self {
            Lux | LuxBlack | LuxBlackXl | Lyft | LyftXl | Shared => CabType::Lyft,
            Black | BlackSuv | Taxi | UberPool | UberX | UberXl | Wav => CabType::Uber,
        }
    }

    /// Price scale of the product relative to the standard tier.
    pub fn fare_multiplier(self) -> f64 {
        use ServiceCategory::*;
        match self {
            UberXl | LyftXl => 1.5,
            Black | LuxBlack => 2.0,
            BlackSuv | LuxBlackXl => 2.5,
            _ => 1.0,
        }
    }
}

#[derive(
    Copy,
    Clone,
    Debug,
    PartialEq,
    Eq,
    Hash,
    Display,
    EnumString,
    EnumIter,
    IntoStaticStr,
    Serialize,
    Deserialize,
    PartialOrd,
    Ord,
)]
pub enum CabType {
    Uber,
    Lyft,
}

impl CabType {
    pub fn is_uber(self) -> bool {
        matches!(self, Self::Uber)
    }

    pub fn from_flag(is_uber: bool) -> Self {
        if is_uber { Self::Uber } else { Self::Lyft }
    }
}

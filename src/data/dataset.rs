use std::{ops::Index, path::Path, str::FromStr, sync::Arc};

use polars::{
    frame::DataFrame,
    prelude::{DataType, LazyCsvReader, LazyFileListReader, PlPath, PolarsError},
};
use tracing::info;

use crate::{
    data::{
        domain::{CabType, DayOfWeek, Hour, ServiceCategory},
        ride::{RideRecord, Weather},
    },
    error::{DataError, IoError, SurgeError, SurgeResult},
};

/// Ordered, immutable sequence of historical rides.
///
/// Cloning is cheap: all clones share the same backing slice, so any number
/// of environments can read the dataset concurrently.
#[derive(Debug, Clone)]
pub struct RideDataset(Arc<[RideRecord]>);

impl RideDataset {
    pub fn new(records: Vec<RideRecord>) -> Self {
        Self(records.into())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, idx: usize) -> Option<&RideRecord> {
        self.0.get(idx)
    }

    pub fn records(&self) -> &[RideRecord] {
        &self.0
    }

    pub fn iter(&self) -> impl Iterator<Item = &RideRecord> {
        self.0.iter()
    }

    /// Number of records in the trailing window `[cursor - window, cursor)`,
    /// truncated at the start of the dataset.
    pub fn trailing_count(&self, cursor: usize, window: usize) -> usize {
        let end = cursor.min(self.len());
        end - end.saturating_sub(window)
    }

    /// Loads a processed ride CSV.
    ///
    /// # Columns
    /// - Required: `distance`, `hour`, `day_of_week`, `surge_multiplier`.
    /// - Product: `service_encoded` (label code) or `name` (product name).
    /// - Platform: `is_uber` (0/1) or `cab_type` (`Uber`/`Lyft`); inferred from
    ///   the product if both are missing.
    /// - Optional: `price`, `source`, `destination`, `temp`, `humidity`, `wind`,
    ///   `rain`, `pressure`.
    pub fn from_csv(path: impl AsRef<Path>) -> SurgeResult<Self> {
        let path = path.as_ref();
        let uri = path.to_str().ok_or_else(|| {
            IoError::FileSystem(format!(
                "Path contains invalid UTF-8 characters: {}",
                path.display()
            ))
        })?;

        let df = LazyCsvReader::new(PlPath::new(uri))
            .with_has_header(true)
            .finish()
            .map_err(polars_err)?
            .collect()
            .map_err(polars_err)?;

        let dataset = Self::try_from(&df)?;
        info!(path = %path.display(), records = dataset.len(), "Loaded ride dataset");
        Ok(dataset)
    }
}

impl Index<usize> for RideDataset {
    type Output = RideRecord;

    fn index(&self, idx: usize) -> &Self::Output {
        &self.0[idx]
    }
}

impl From<Vec<RideRecord>> for RideDataset {
    fn from(records: Vec<RideRecord>) -> Self {
        Self::new(records)
    }
}

impl FromIterator<RideRecord> for RideDataset {
    fn from_iter<I: IntoIterator<Item = RideRecord>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

// ================================================================================================
// DataFrame Conversion
// ================================================================================================

impl TryFrom<&DataFrame> for RideDataset {
    type Error = SurgeError;

    fn try_from(df: &DataFrame) -> Result<Self, Self::Error> {
        let distance = required_f64(df, "distance")?;
        let hour = required_f64(df, "hour")?;
        let day = required_f64(df, "day_of_week")?;
        let surge = required_f64(df, "surge_multiplier")?;

        let service_codes = optional_f64(df, "service_encoded")?;
        let service_names = optional_str(df, "name")?;
        if service_codes.is_none() && service_names.is_none() {
            return Err(DataError::MissingColumn("service_encoded | name".to_string()).into());
        }
        let is_uber = optional_f64(df, "is_uber")?;
        let cab_type = optional_str(df, "cab_type")?;

        let price = optional_f64(df, "price")?;
        let source = optional_str(df, "source")?;
        let destination = optional_str(df, "destination")?;
        let temp = optional_f64(df, "temp")?;
        let humidity = optional_f64(df, "humidity")?;
        let wind = optional_f64(df, "wind")?;
        let rain = optional_f64(df, "rain")?;
        let pressure = optional_f64(df, "pressure")?;
        let has_weather = [&temp, &humidity, &wind, &rain, &pressure]
            .iter()
            .any(|c| c.is_some());

        let mut records = Vec::with_capacity(df.height());
        for row in 0..df.height() {
            let service = match (&service_codes, &service_names) {
                (Some(codes), _) => {
                    ServiceCategory::from_code(integral_at(codes, "service_encoded", row)?)?
                }
                (None, Some(names)) => {
                    let name = names[row].as_deref().ok_or_else(|| missing("name", row))?;
                    ServiceCategory::from_str(name)
                        .map_err(|_| DataError::InvalidService(name.to_string()))?
                }
                (None, None) => {
                    return Err(DataError::MissingColumn("service_encoded | name".to_string()).into());
                }
            };

            let platform = match (&is_uber, &cab_type) {
                (Some(flags), _) => match integral_at(flags, "is_uber", row)? {
                    v @ (0 | 1) => CabType::from_flag(v == 1),
                    v => {
                        return Err(DataError::InvalidValue(format!(
                            "is_uber must be 0 or 1 at row {row}, got {v}"
                        ))
                        .into());
                    }
                },
                (None, Some(names)) => {
                    let name = names[row].as_deref().ok_or_else(|| missing("cab_type", row))?;
                    CabType::from_str(name).map_err(DataError::from)?
                }
                (None, None) => service.cab_type(),
            };

            let mut record = RideRecord::new(
                value_at(&distance, "distance", row)?,
                Hour::from_i64(integral_at(&hour, "hour", row)?)?,
                DayOfWeek::from_i64(integral_at(&day, "day_of_week", row)?)?,
                service,
            )?
            .with_cab_type(platform)
            .with_surge_multiplier(value_at(&surge, "surge_multiplier", row)?);

            record.price = price.as_ref().and_then(|c| c[row]);
            record.source = source.as_ref().and_then(|c| c[row].clone());
            record.destination = destination.as_ref().and_then(|c| c[row].clone());
            if has_weather {
                let at = |c: &Option<Vec<Option<f64>>>| c.as_ref().and_then(|v| v[row]);
                record.weather = Some(Weather {
                    temp: at(&temp),
                    humidity: at(&humidity),
                    wind: at(&wind),
                    rain: at(&rain),
                    pressure: at(&pressure),
                });
            }
            records.push(record);
        }

        Ok(Self::new(records))
    }
}

fn required_f64(df: &DataFrame, name: &str) -> SurgeResult<Vec<Option<f64>>> {
    optional_f64(df, name)?.ok_or_else(|| DataError::MissingColumn(name.to_string()).into())
}

fn optional_f64(df: &DataFrame, name: &str) -> SurgeResult<Option<Vec<Option<f64>>>> {
    let Ok(column) = df.column(name) else {
        return Ok(None);
    };
    let casted = column.cast(&DataType::Float64).map_err(polars_err)?;
    let values = casted.f64().map_err(polars_err)?.into_iter().collect();
    Ok(Some(values))
}

fn optional_str(df: &DataFrame, name: &str) -> SurgeResult<Option<Vec<Option<String>>>> {
    let Ok(column) = df.column(name) else {
        return Ok(None);
    };
    let casted = column.cast(&DataType::String).map_err(polars_err)?;
    let values = casted
        .str()
        .map_err(polars_err)?
        .into_iter()
        .map(|v| v.map(str::to_string))
        .collect();
    Ok(Some(values))
}

fn value_at(column: &[Option<f64>], name: &str, row: usize) -> SurgeResult<f64> {
    column[row].ok_or_else(|| missing(name, row))
}

/// Whole-number value, rejecting fractions and non-finite input instead of truncating.
fn integral_at(column: &[Option<f64>], name: &str, row: usize) -> SurgeResult<i64> {
    let v = value_at(column, name, row)?;
    if !v.is_finite() || v.fract() != 0.0 {
        return Err(
            DataError::InvalidValue(format!("{name} must be a whole number at row {row}, got {v}"))
                .into(),
        );
    }
    Ok(v as i64)
}

fn missing(column: &str, row: usize) -> SurgeError {
    DataError::MissingValue {
        column: column.to_string(),
        row,
    }
    .into()
}

fn polars_err(e: PolarsError) -> SurgeError {
    DataError::DataFrame(e.to_string()).into()
}

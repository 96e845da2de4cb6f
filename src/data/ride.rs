use chrono::{DateTime, Datelike, Timelike, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    data::domain::{CabType, DayOfWeek, Hour, HourSet, ServiceCategory},
    error::{DataError, SurgeResult, invalid_input},
    predictor::PriceFeatures,
};

/// Hourly weather observed at the pickup location.
///
/// Every field is optional because the weather feed does not cover all
/// pickup hours.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Weather {
    pub temp: Option<f64>,
    pub humidity: Option<f64>,
    pub wind: Option<f64>,
    pub rain: Option<f64>,
    pub pressure: Option<f64>,
}

impl Weather {
    /// Composite weather severity score.
    ///
    /// `rain * 3 + (100 - humidity) / 100 + |temp - 65| / 20 + wind / 20`, with
    /// missing readings replaced by rain 0, humidity 50, temperature 50 and wind 10.
    pub fn severity(&self) -> f64 {
        let rain = self.rain.unwrap_or(0.0);
        let humidity = self.humidity.unwrap_or(50.0);
        let temp = self.temp.unwrap_or(50.0);
        let wind = self.wind.unwrap_or(10.0);
        rain * 3.0 + (100.0 - humidity) / 100.0 + (temp - 65.0).abs() / 20.0 + wind / 20.0
    }
}

/// One historical ride, read-only during simulation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RideRecord {
    pub distance: f64,
    pub hour: Hour,
    pub day_of_week: DayOfWeek,
    pub service: ServiceCategory,
    pub cab_type: CabType,
    pub price: Option<f64>,
    pub surge_multiplier: f64,
    pub source: Option<String>,
    pub destination: Option<String>,
    pub weather: Option<Weather>,
}

impl RideRecord {
    /// Builds a minimal record, platform inferred from the product.
    pub fn new(
        distance: f64,
        hour: Hour,
        day_of_week: DayOfWeek,
        service: ServiceCategory,
    ) -> SurgeResult<Self> {
        if !distance.is_finite() || distance < 0.0 {
            return Err(invalid_input(format!(
                "distance must be a non-negative number, got {distance}"
            )));
        }
        Ok(Self {
            distance,
            hour,
            day_of_week,
            service,
            cab_type: service.cab_type(),
            price: None,
            surge_multiplier: 1.0,
            source: None,
            destination: None,
            weather: None,
        })
    }

    /// Builds a record from a raw epoch timestamp in milliseconds, deriving
    /// the UTC hour and weekday.
    pub fn from_timestamp_millis(
        timestamp_ms: i64,
        distance: f64,
        service: ServiceCategory,
    ) -> SurgeResult<Self> {
        let dt: DateTime<Utc> = DateTime::from_timestamp_millis(timestamp_ms).ok_or_else(|| {
            DataError::TimestampConversion(format!("{timestamp_ms} ms is out of range"))
        })?;
        let hour = Hour::new(dt.hour() as u8)?;
        Self::new(distance, hour, dt.weekday().into(), service)
    }

    pub fn with_price(self, price: f64) -> Self {
        Self {
            price: Some(price),
            ..self
        }
    }

    pub fn with_surge_multiplier(self, surge_multiplier: f64) -> Self {
        Self {
            surge_multiplier,
            ..self
        }
    }

    pub fn with_cab_type(self, cab_type: CabType) -> Self {
        Self { cab_type, ..self }
    }

    pub fn with_route(self, source: impl Into<String>, destination: impl Into<String>) -> Self {
        Self {
            source: Some(source.into()),
            destination: Some(destination.into()),
            ..self
        }
    }

    pub fn with_weather(self, weather: Weather) -> Self {
        Self {
            weather: Some(weather),
            ..self
        }
    }

    /// Rain intensity, `0.0` when the weather feed had no reading.
    pub fn rain(&self) -> f64 {
        self.weather.and_then(|w| w.rain).unwrap_or(0.0)
    }

    pub fn is_uber(&self) -> bool {
        self.cab_type.is_uber()
    }

    pub fn is_rush_hour(&self) -> bool {
        HourSet::RUSH.contains(self.hour)
    }

    pub fn is_late_night(&self) -> bool {
        HourSet::LATE_NIGHT.contains(self.hour)
    }

    pub fn is_lunch_hour(&self) -> bool {
        HourSet::LUNCH.contains(self.hour)
    }

    pub fn is_weekend(&self) -> bool {
        self.day_of_week.is_weekend()
    }

    pub fn weather_severity(&self) -> f64 {
        self.weather.unwrap_or_default().severity()
    }

    /// Features consumed by the base price predictor.
    pub fn price_features(&self) -> PriceFeatures {
        PriceFeatures {
            distance: self.distance,
            service: self.service,
            is_uber: self.is_uber(),
            hour: self.hour,
            day_of_week: self.day_of_week,
        }
    }
}

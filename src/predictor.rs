use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::{
    data::domain::{DayOfWeek, Hour, ServiceCategory},
    error::{PricingError, SurgeResult},
};

/// Features of a ride as seen by the base price model.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PriceFeatures {
    pub distance: f64,
    pub service: ServiceCategory,
    pub is_uber: bool,
    pub hour: Hour,
    pub day_of_week: DayOfWeek,
}

impl PriceFeatures {
    /// Numeric encoding in the column order the base price model was fit on:
    /// `distance, service_encoded, is_uber, hour, day_of_week`.
    pub fn to_row(&self) -> [f64; 5] {
        [
            self.distance,
            f64::from(self.service.code()),
            f64::from(u8::from(self.is_uber)),
            f64::from(self.hour.value()),
            f64::from(self.day_of_week.value()),
        ]
    }
}

/// Predicts the non-surge price of a ride.
///
/// Implementations must be deterministic for identical inputs and free of
/// side effects. A non-negative, finite price is expected; anything else is
/// reported as [`PricingError::PredictorFault`] by [`checked_predict`].
pub trait BasePricePredictor {
    fn predict(&self, features: &PriceFeatures) -> f64;
}

/// Adapts a plain function or closure into a predictor.
#[derive(Debug, Clone, Copy)]
pub struct FnPredictor<F>(pub F);

impl<F> BasePricePredictor for FnPredictor<F>
where
    F: Fn(&PriceFeatures) -> f64,
{
    fn predict(&self, features: &PriceFeatures) -> f64 {
        (self.0)(features)
    }
}

impl<P: BasePricePredictor + ?Sized> BasePricePredictor for Arc<P> {
    fn predict(&self, features: &PriceFeatures) -> f64 {
        (**self).predict(features)
    }
}

impl<P: BasePricePredictor + ?Sized> BasePricePredictor for Box<P> {
    fn predict(&self, features: &PriceFeatures) -> f64 {
        (**self).predict(features)
    }
}

/// Runs the predictor and rejects corrupted output.
pub fn checked_predict<P>(predictor: &P, features: &PriceFeatures) -> SurgeResult<f64>
where
    P: BasePricePredictor + ?Sized,
{
    let price = predictor.predict(features);
    if !price.is_finite() || price < 0.0 {
        return Err(PricingError::PredictorFault(format!(
            "predictor returned {price} for {features:?}"
        ))
        .into());
    }
    Ok(price)
}

/// Distance-based fare: `base_fare + distance * per_mile_rate`, scaled by the
/// product's fare multiplier.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DistanceFarePredictor {
    pub base_fare: f64,
    pub per_mile_rate: f64,
}

impl Default for DistanceFarePredictor {
    fn default() -> Self {
        Self {
            base_fare: 2.5,
            per_mile_rate: 1.5,
        }
    }
}

impl BasePricePredictor for DistanceFarePredictor {
    fn predict(&self, features: &PriceFeatures) -> f64 {
        (self.base_fare + features.distance * self.per_mile_rate)
            * features.service.fare_multiplier()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn features(distance: f64, service: ServiceCategory) -> PriceFeatures {
        PriceFeatures {
            distance,
            service,
            is_uber: service.cab_type().is_uber(),
            hour: Hour::new(10).unwrap(),
            day_of_week: DayOfWeek::new(2).unwrap(),
        }
    }

    #[test]
    fn distance_fare_scales_with_product() {
        let p = DistanceFarePredictor::default();
        assert!((p.predict(&features(2.0, ServiceCategory::UberX)) - 5.5).abs() < 1e-12);
        assert!((p.predict(&features(2.0, ServiceCategory::BlackSuv)) - 13.75).abs() < 1e-12);
    }

    #[test]
    fn closures_adapt_into_predictors() {
        let flat = FnPredictor(|_: &PriceFeatures| 12.0);
        assert_eq!(checked_predict(&flat, &features(1.0, ServiceCategory::Lyft)).unwrap(), 12.0);
    }

    #[test]
    fn corrupted_prices_are_faults() {
        let negative = FnPredictor(|_: &PriceFeatures| -1.0);
        let nan = FnPredictor(|_: &PriceFeatures| f64::NAN);
        let f = features(1.0, ServiceCategory::Lyft);

        for res in [checked_predict(&negative, &f), checked_predict(&nan, &f)] {
            assert!(matches!(
                res,
                Err(crate::error::SurgeError::Pricing(PricingError::PredictorFault(_)))
            ));
        }
    }

    #[test]
    fn feature_row_order() {
        let row = features(3.0, ServiceCategory::UberXl).to_row();
        assert_eq!(row, [3.0, 11.0, 1.0, 10.0, 2.0]);
    }
}

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use tracing::debug;

use crate::{
    agent::Agent,
    data::domain::{DayOfWeek, Hour, ServiceCategory},
    demand::DemandEstimator,
    error::{SurgeResult, invalid_input},
    gym::pricing::observation::Observation,
    predictor::{BasePricePredictor, PriceFeatures, checked_predict},
    surge::{RecommendationTier, RuleBasedSurge, SurgeLevels},
};

/// Rides assumed in the recent window when quoting outside a simulation.
pub const QUOTE_RECENT_RIDES: u32 = 10;
pub const QUOTE_WAIT_TIME: f64 = 5.0;
pub const QUOTE_COMPETITOR_SURGE: f64 = 1.0;

const DEFAULT_MARKET_LEVEL: f64 = 50.0;

fn default_market_level() -> f64 {
    DEFAULT_MARKET_LEVEL
}

/// Which surge the quote engine prices with.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum SurgeSource {
    #[default]
    Agent,
    RuleBased,
}

/// A rider's request for a price.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuoteRequest {
    pub distance: f64,
    pub hour: i64,
    pub day_of_week: i64,
    /// Pickup neighbourhood.
    pub source: String,
    pub service: ServiceCategory,
    #[serde(default = "default_market_level")]
    pub current_demand: f64,
    #[serde(default = "default_market_level")]
    pub current_supply: f64,
}

impl QuoteRequest {
    /// Request with demand and supply at their neutral default of 50.
    pub fn new(
        distance: f64,
        hour: i64,
        day_of_week: i64,
        source: impl Into<String>,
        service: ServiceCategory,
    ) -> Self {
        Self {
            distance,
            hour,
            day_of_week,
            source: source.into(),
            service,
            current_demand: DEFAULT_MARKET_LEVEL,
            current_supply: DEFAULT_MARKET_LEVEL,
        }
    }

    pub fn with_market(self, demand: f64, supply: f64) -> Self {
        Self {
            current_demand: demand,
            current_supply: supply,
            ..self
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuoteResponse {
    /// Rounded to cents.
    pub base_price: f64,
    pub surge_multiplier: f64,
    /// `base_price * surge_multiplier` before rounding, rounded to cents.
    pub final_price: f64,
    pub demand_level: f64,
    pub supply_level: f64,
    pub recommendation_tier: RecommendationTier,
    pub recommendation: String,
}

/// Both candidate quotes for one request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuoteComparison {
    pub agent: QuoteResponse,
    pub rule_based: QuoteResponse,
}

/// Prices single ride requests with a trained agent or the ratio rule.
#[derive(Debug, Clone)]
pub struct QuoteEngine<P, A> {
    predictor: P,
    agent: A,
    levels: SurgeLevels,
    selector: RuleBasedSurge,
    estimator: DemandEstimator,
    source: SurgeSource,
}

/// Validated form of a [`QuoteRequest`].
struct Checked {
    features: PriceFeatures,
    demand: f64,
    supply: f64,
}

impl<P, A> QuoteEngine<P, A>
where
    P: BasePricePredictor,
    A: Agent,
{
    /// `levels` must be the set the agent's actions index into.
    pub fn new(predictor: P, agent: A, levels: SurgeLevels) -> Self {
        Self {
            predictor,
            agent,
            levels,
            selector: RuleBasedSurge::default(),
            estimator: DemandEstimator::default(),
            source: SurgeSource::default(),
        }
    }

    pub fn with_selector(self, selector: RuleBasedSurge) -> Self {
        Self { selector, ..self }
    }

    pub fn with_estimator(self, estimator: DemandEstimator) -> Self {
        Self { estimator, ..self }
    }

    pub fn with_source(self, source: SurgeSource) -> Self {
        Self { source, ..self }
    }

    pub fn source(&self) -> SurgeSource {
        self.source
    }

    /// Quotes with the configured [`SurgeSource`].
    pub fn quote(&mut self, req: &QuoteRequest) -> SurgeResult<QuoteResponse> {
        let checked = check(req)?;
        let base = checked_predict(&self.predictor, &checked.features)?;
        let surge = match self.source {
            SurgeSource::Agent => self.agent_surge(&checked)?,
            SurgeSource::RuleBased => self.rule_surge(req, &checked)?,
        };
        debug!(source = %self.source, base, surge, "Quoted ride");
        Ok(respond(base, surge, &checked))
    }

    /// Quotes with both sources for side-by-side comparison.
    pub fn quote_both(&mut self, req: &QuoteRequest) -> SurgeResult<QuoteComparison> {
        let checked = check(req)?;
        let base = checked_predict(&self.predictor, &checked.features)?;
        let agent = self.agent_surge(&checked)?;
        let rule = self.rule_surge(req, &checked)?;
        debug!(base, agent, rule, "Quoted ride with both sources");
        Ok(QuoteComparison {
            agent: respond(base, agent, &checked),
            rule_based: respond(base, rule, &checked),
        })
    }

    fn agent_surge(&mut self, checked: &Checked) -> SurgeResult<f64> {
        let obs = Observation {
            hour: checked.features.hour,
            day_of_week: checked.features.day_of_week,
            demand: checked.demand,
            supply: checked.supply,
            recent_ride_count: QUOTE_RECENT_RIDES,
            avg_wait_time: QUOTE_WAIT_TIME,
            competitor_surge: QUOTE_COMPETITOR_SURGE,
        };
        let action = self.agent.act(&obs)?;
        Ok(self.levels.level(action.0)?.value())
    }

    /// Estimated demand for the pickup area against the reported supply.
    fn rule_surge(&self, req: &QuoteRequest, checked: &Checked) -> SurgeResult<f64> {
        let demand = self
            .estimator
            .estimate(checked.features.hour, &req.source, QUOTE_RECENT_RIDES);
        Ok(self.selector.select(demand.0, checked.supply)?.value())
    }
}

fn check(req: &QuoteRequest) -> SurgeResult<Checked> {
    if !req.distance.is_finite() || req.distance < 0.0 {
        return Err(invalid_input(format!("invalid distance {}", req.distance)));
    }
    if !req.current_demand.is_finite() || req.current_demand < 0.0 {
        return Err(invalid_input(format!("invalid demand {}", req.current_demand)));
    }
    if !req.current_supply.is_finite() || req.current_supply <= 0.0 {
        return Err(invalid_input(format!(
            "supply must be positive, got {}",
            req.current_supply
        )));
    }
    Ok(Checked {
        features: PriceFeatures {
            distance: req.distance,
            service: req.service,
            is_uber: req.service.cab_type().is_uber(),
            hour: Hour::from_i64(req.hour)?,
            day_of_week: DayOfWeek::from_i64(req.day_of_week)?,
        },
        demand: req.current_demand,
        supply: req.current_supply,
    })
}

fn respond(base: f64, surge: f64, checked: &Checked) -> QuoteResponse {
    let tier = RecommendationTier::from_multiplier(surge);
    QuoteResponse {
        base_price: round_cents(base),
        surge_multiplier: surge,
        final_price: round_cents(base * surge),
        demand_level: checked.demand,
        supply_level: checked.supply,
        recommendation_tier: tier,
        recommendation: tier.advice().to_string(),
    }
}

fn round_cents(price: f64) -> f64 {
    (price * 100.0).round() / 100.0
}

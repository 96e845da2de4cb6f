use fareflow::{
    gym::pricing::{acceptance::AcceptanceConfig, market::MarketState, reward::RewardConfig},
    prelude::*,
};

mod common;

#[test]
fn demand_estimate_for_rush_hour_in_back_bay() {
    let estimator = DemandEstimator::default();
    let score = estimator.estimate(Hour::new(8).unwrap(), "Back Bay", 15);
    assert_eq!(score, DemandScore(85.0));

    for hour in 0..24 {
        let s = estimator.estimate(Hour::new(hour).unwrap(), "Financial District", 500);
        assert!((0.0..=100.0).contains(&s.0));
    }
}

#[test]
fn selected_surge_is_a_level_and_monotone_in_demand() {
    let selector = RuleBasedSurge::default();
    let levels = SurgeLevels::default();
    let supply = 40.0;

    let mut previous = 0.0;
    // crosses every band edge: 48, 60, 80, 100
    for step in 0..=200 {
        let demand = step as f64 * 0.6;
        let surge = selector.select(demand, supply).unwrap().value();
        assert!(levels.contains(surge), "{surge} is not a level");
        assert!(surge >= previous, "surge fell from {previous} to {surge} at demand {demand}");
        previous = surge;
    }
    assert_eq!(previous, 2.5);
}

#[test]
fn selector_band_edges() {
    let selector = RuleBasedSurge::default();
    let pick = |d: f64| selector.select(d, 10.0).unwrap().value();
    assert_eq!(pick(11.9), 1.0);
    assert_eq!(pick(12.0), 1.25);
    assert_eq!(pick(15.0), 1.5);
    assert_eq!(pick(20.0), 2.0);
    assert_eq!(pick(25.0), 2.5);
}

#[test]
fn selector_rejects_empty_supply() {
    let selector = RuleBasedSurge::default();
    for supply in [0.0, -3.0, f64::NAN] {
        let err = selector.select(50.0, supply).unwrap_err();
        assert!(matches!(err, SurgeError::Pricing(PricingError::InvalidInput(_))));
    }
}

#[test]
fn reward_at_maximum_surge_compounds_both_penalties() {
    let cfg = RewardConfig::default();
    let market = MarketState {
        demand: 90.0,
        supply: 45.0,
    };
    // 0.5 * 30 + 5 (surge bonus) + 2 (full utilization) - 10 - 10
    let reward = cfg.compute(&market, 3.0, 30.0, true);
    assert!((reward.0 - 2.0).abs() < 1e-12, "{reward:?}");
}

#[test]
fn acceptance_probability_boundaries() {
    let cfg = AcceptanceConfig::default();
    let afternoon = Hour::new(15).unwrap();
    assert_eq!(cfg.probability(1.0, 0.0, afternoon), 0.95);
    let p = cfg.probability(3.0, 0.0, afternoon);
    assert!((p - 1.0 / 2.2).abs() < 1e-12);

    // rain and late night stack multiplicatively
    let late = Hour::new(23).unwrap();
    let stacked = cfg.probability(3.0, 0.5, late);
    assert!((stacked - 1.0 / 2.2 * 1.2 * 1.1).abs() < 1e-12);
    // hour 3 is not a late-night hour for riders
    assert_eq!(cfg.probability(3.0, 0.0, Hour::new(3).unwrap()), p);
}

#[test]
fn rule_based_agent_follows_the_selector() {
    let mut agent = RuleBasedAgent::default();
    let levels = SurgeLevels::default();
    let selector = RuleBasedSurge::default();
    for (demand, supply) in [(20.0, 80.0), (55.0, 40.0), (70.0, 40.0), (95.0, 40.0), (100.0, 10.0)] {
        let action = agent.act(&common::observation(12, demand, supply)).unwrap();
        let expected = selector.select(demand, supply).unwrap();
        assert_eq!(levels.level(action.0).unwrap(), expected);
    }
}

use fareflow::{gym::pricing::reward::RewardConfig, prelude::*};

mod common;

#[test]
fn episode_ends_exactly_on_the_hundredth_step() {
    let mut env = common::default_environment();
    env.reset().unwrap();

    for step in 1..=100 {
        let res = env.step(SurgeAction(0)).unwrap();
        assert_eq!(res.done, step == 100, "step {step}");
    }
    assert!(env.status().is_done());

    let err = env.step(SurgeAction(0)).unwrap_err();
    assert!(matches!(err, SurgeError::Env(EnvError::InvalidState(_))));
}

#[test]
fn stepping_before_reset_is_rejected() {
    let mut env = common::default_environment();
    let err = env.step(SurgeAction(1)).unwrap_err();
    assert!(matches!(err, SurgeError::Env(EnvError::InvalidState(_))));
}

#[test]
fn reset_starts_a_clean_episode_every_time() {
    let mut env = common::default_environment();
    env.reset().unwrap();
    for _ in 0..30 {
        env.step(SurgeAction(4)).unwrap();
    }

    for _ in 0..3 {
        let obs = env.reset().unwrap();
        assert!(env.status().is_running());
        assert_eq!(env.step_count(), 0);
        assert!(env.history().is_empty());
        assert_eq!(env.cursor(), env.episode_start());
        assert!((20.0..80.0).contains(&obs.demand));
        assert!((30.0..70.0).contains(&obs.supply));
    }

    let first = env.step(SurgeAction(0)).unwrap();
    let ride = first.info.ride;
    let expected = if ride.accepted { ride.final_price } else { 0.0 };
    assert_eq!(first.info.revenue, expected);
}

#[test]
fn same_seed_replays_the_same_episode() {
    let run = || {
        let mut env = common::environment(EnvConfig::default().with_seed(5));
        let mut agent = RuleBasedAgent::default();
        let mut journal = EpisodeJournal::new();
        env.run_episode(&mut agent, Some(&mut journal)).unwrap();
        journal
    };
    assert_eq!(run(), run());
}

#[test]
fn market_stays_bounded_over_many_steps() {
    let mut env = common::environment(EnvConfig::default().with_episode_length(250));
    let mut agent = RandomAgent::new(env.action_space(), 99);

    for _ in 0..8 {
        let mut obs = env.reset().unwrap();
        loop {
            let res = env.step(agent.act(&obs).unwrap()).unwrap();
            for v in [res.info.demand, res.info.supply] {
                assert!((10.0..=100.0).contains(&v), "{v} left the market bounds");
            }
            assert_eq!(res.observation.demand, res.info.demand);
            assert!((2.0..15.0).contains(&res.observation.avg_wait_time));
            assert!([1.0, 1.25, 1.5].contains(&res.observation.competitor_surge));
            assert!(res.observation.recent_ride_count <= 20);
            if res.done {
                break;
            }
            obs = res.observation;
        }
    }
}

#[test]
fn out_of_range_action_leaves_the_episode_untouched() {
    let mut env = common::default_environment();
    env.reset().unwrap();
    env.step(SurgeAction(2)).unwrap();
    let market = env.market();

    let err = env.step(SurgeAction(7)).unwrap_err();
    assert!(matches!(err, SurgeError::Pricing(PricingError::InvalidInput(_))));
    assert_eq!(env.step_count(), 1);
    assert_eq!(env.market(), market);
}

#[test]
fn faulty_predictor_is_reported() {
    let predictor = FnPredictor(|f: &PriceFeatures| if f.distance > 0.0 { f64::NAN } else { 1.0 });
    let mut env = make(common::rides(), predictor, EnvConfig::default()).unwrap();
    env.reset().unwrap();

    let err = env.step(SurgeAction(0)).unwrap_err();
    assert!(matches!(err, SurgeError::Pricing(PricingError::PredictorFault(_))));
    assert_eq!(env.step_count(), 0);
}

#[test]
fn short_dataset_cannot_start_an_episode() {
    let rides = SyntheticRides::default().generate(99).unwrap();
    let mut env = make(rides, DistanceFarePredictor::default(), EnvConfig::default()).unwrap();
    let err = env.reset().unwrap_err();
    assert!(matches!(
        err,
        SurgeError::Env(EnvError::InsufficientData {
            available: 99,
            required: 100
        })
    ));
}

#[test]
fn journal_summary_matches_the_episode() {
    let mut env = common::default_environment();
    let mut agent = FixedSurgeAgent::at_multiplier(env.config().levels(), 1.5).unwrap();
    let mut journal = EpisodeJournal::new();
    let summary = env.run_episode(&mut agent, Some(&mut journal)).unwrap();

    assert_eq!(journal.len(), 100);
    assert_eq!(summary.steps, 100);
    assert_eq!(summary.avg_surge, 1.5);
    let total: f64 = journal.entries().iter().map(|e| e.reward).sum();
    assert!((total - summary.total_reward).abs() < 1e-9);

    let last = journal.entries().last().unwrap();
    assert_eq!(last.revenue, summary.revenue);
    let accepted = journal.entries().iter().filter(|e| e.accepted).count();
    assert!((accepted as f64 / 100.0 - summary.acceptance_rate).abs() < 1e-12);
}

#[test]
fn reward_is_scored_on_the_market_before_the_update() {
    let predictor = FnPredictor(|_: &PriceFeatures| 10.0);
    let mut env = make(common::rides(), predictor, EnvConfig::default()).unwrap();
    let cfg = RewardConfig::default();
    env.reset().unwrap();

    let mut moved = 0;
    loop {
        let before = env.market();
        let res = env.step(SurgeAction(6)).unwrap();
        assert_eq!(res.info.ride.final_price, 30.0);
        assert_eq!(
            res.reward,
            cfg.compute(&before, 3.0, 30.0, res.info.ride.accepted),
            "step {}",
            env.step_count()
        );
        if env.market() != before {
            moved += 1;
        }
        if res.done {
            break;
        }
    }
    assert!(moved > 0);
}

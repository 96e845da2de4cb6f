use std::path::Path;

use rand::{Rng, SeedableRng, rngs::StdRng};

use crate::{
    data::dataset::RideDataset,
    error::SurgeResult,
    gym::pricing::{config::EnvConfig, env::Environment},
    predictor::BasePricePredictor,
};

/// Builds an environment whose RNG is seeded from `cfg.seed()`.
#[tracing::instrument(skip(dataset, predictor, cfg), fields(hash = tracing::field::Empty))]
pub fn make<P>(dataset: RideDataset, predictor: P, cfg: EnvConfig) -> SurgeResult<Environment<P>>
where
    P: BasePricePredictor,
{
    let rng = StdRng::seed_from_u64(cfg.seed());
    make_with_rng(dataset, predictor, cfg, rng)
}

/// Builds an environment drawing all randomness from `rng`.
pub fn make_with_rng<P, R>(
    dataset: RideDataset,
    predictor: P,
    cfg: EnvConfig,
    rng: R,
) -> SurgeResult<Environment<P, R>>
where
    P: BasePricePredictor,
    R: Rng,
{
    if let Ok(hash) = cfg.hash() {
        tracing::Span::current().record("hash", &hash);
    }
    tracing::debug!(
        rides = dataset.len(),
        episode_length = cfg.episode_length(),
        "Building pricing environment"
    );
    Environment::new(cfg, dataset, predictor, rng)
}

/// Loads rides from a processed CSV and builds an environment over them.
pub fn load<P>(
    rides_csv: impl AsRef<Path>,
    predictor: P,
    cfg: EnvConfig,
) -> SurgeResult<Environment<P>>
where
    P: BasePricePredictor,
{
    let dataset = RideDataset::from_csv(rides_csv)?;
    make(dataset, predictor, cfg)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        data::synthetic::SyntheticRides,
        gym::{EnvStatus, pricing::Env},
        predictor::DistanceFarePredictor,
    };

    #[test]
    fn make_rejects_invalid_config() {
        let rides = SyntheticRides::default().generate(10).unwrap();
        let res = make(
            rides,
            DistanceFarePredictor::default(),
            EnvConfig::default().with_episode_length(0),
        );
        assert!(res.is_err());
    }

    #[test]
    fn same_seed_same_episode() {
        let rides = SyntheticRides::default().generate(400).unwrap();
        let cfg = EnvConfig::default().with_seed(17);
        let mut a = make(rides.clone(), DistanceFarePredictor::default(), cfg.clone()).unwrap();
        let mut b = make(rides, DistanceFarePredictor::default(), cfg).unwrap();
        assert_eq!(a.status(), EnvStatus::Uninitialized);

        assert_eq!(a.reset().unwrap(), b.reset().unwrap());
        for i in 0..100 {
            let action = (i % 7).into();
            let ra = a.step(action).unwrap();
            let rb = b.step(action).unwrap();
            assert_eq!(ra, rb);
        }
    }

    #[test]
    fn missing_csv_is_an_error() {
        let res = load(
            "/definitely/not/here/rides.csv",
            DistanceFarePredictor::default(),
            EnvConfig::default(),
        );
        assert!(res.is_err());
    }
}

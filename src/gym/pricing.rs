use crate::{
    error::SurgeResult,
    gym::pricing::{action::SurgeAction, info::StepResult, observation::Observation},
};

pub mod acceptance;
pub mod action;
pub mod config;
pub mod env;
pub mod factory;
pub mod history;
pub mod info;
pub mod market;
pub mod noise;
pub mod observation;
pub mod reward;

pub trait Env {
    fn reset(&mut self) -> SurgeResult<Observation>;
    fn step(&mut self, action: SurgeAction) -> SurgeResult<StepResult>;
}

use serde::{Deserialize, Serialize};

use crate::{impl_add_sub_mul_div_primitive, impl_from_primitive};

pub mod pricing;

/// Scalar reward emitted by one environment step.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
pub struct Reward(pub f64);
impl_from_primitive!(Reward, f64);
impl_add_sub_mul_div_primitive!(Reward, f64);

/// Represents the lifecycle status of a pricing environment.
///
/// # Lifecycle
///
/// ```md
/// Current State                       | Action  | Next State | Notes
/// ------------------------------------|---------|------------|------------------------------
/// `Uninitialized` / `Running` / `Done` | reset() | Running    | Fresh episode, fresh market
/// `Running` (steps left)              | step()  | Running    | Continue within episode
/// `Running` (last step)               | step()  | Done       | Episode terminates
/// `Uninitialized` / `Done`            | step()  | unchanged  | Rejected with `InvalidState`
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EnvStatus {
    /// Built but never reset.
    #[default]
    Uninitialized,

    /// An episode is active and the environment accepts `step()` calls.
    Running,

    /// The episode has reached its configured length.
    Done,
}

impl EnvStatus {
    pub fn is_uninitialized(&self) -> bool {
        matches!(self, Self::Uninitialized)
    }

    pub fn is_running(&self) -> bool {
        matches!(self, Self::Running)
    }

    pub fn is_done(&self) -> bool {
        matches!(self, Self::Done)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reward_arithmetic() {
        let mut r = Reward(1.5) + Reward(2.0);
        r += 0.5;
        r -= 1.0;
        assert_eq!(r, Reward(3.0));
        let total: Reward = [Reward(1.0), Reward(-4.0)].into_iter().sum();
        assert_eq!(f64::from(total), -3.0);
    }
}

mod action;
pub mod env;
mod observation;

pub use action::Action;
pub use env::MarketEnv;
pub use observation::{Observation, Snapshot};

use crate::error::Result;

pub trait Environment {
    /// Start a new episode and return its first observation.
    fn reset(&mut self) -> Observation;

    fn step(&mut self, action: Action) -> Result<Snapshot>;

    /// Cash plus holdings after the last step
    fn portfolio_value(&self) -> f64;
}

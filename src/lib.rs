//! Tabular Q-learning over a historical price series.
//!
//! A [`gym::MarketEnv`] replays closing prices and settles one-share trades, a
//! [`agent::QAgent`] learns action values over discretized observations, and
//! [`run::run`] drives training, persistence and greedy evaluation end to end.

pub mod agent;
pub mod charts;
pub mod config;
pub mod constants;
pub mod data;
pub mod error;
pub mod events;
pub mod gym;
pub mod history;
pub mod logging;
pub mod report;
pub mod run;
pub mod types;
pub mod utils;

pub use error::{Result, TradingError};

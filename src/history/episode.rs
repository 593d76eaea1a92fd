use std::path::Path;

use crate::{
    charts::general::{assets_chart, buy_sell_chart},
    constants::files::{BUY_SELL_PLOT, TRADING_PLOT},
    error::Result,
    gym::{Action, Observation, Snapshot},
    utils::create_folder_if_not_exists,
};

/// Step-by-step record of one evaluation episode.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct EpisodeHistory {
    pub actions: Vec<Action>,
    /// Price each step executed at
    pub prices: Vec<f64>,
    pub cash: Vec<f64>,
    pub positioned: Vec<f64>,
    pub portfolio: Vec<f64>,
    pub rewards: Vec<f64>,
    /// Steps where a buy or sell actually filled
    pub buys: Vec<usize>,
    pub sells: Vec<usize>,
}

impl EpisodeHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    /// Record one step. `before` is the observation the action was chosen from.
    pub fn push(
        &mut self,
        before: &Observation,
        action: Action,
        snapshot: &Snapshot,
        portfolio_value: f64,
    ) {
        let step = self.actions.len();
        let after = &snapshot.observation;

        if after.position > before.position {
            self.buys.push(step);
        } else if after.position < before.position {
            self.sells.push(step);
        }

        self.actions.push(action);
        self.prices.push(before.price);
        self.cash.push(after.balance);
        self.positioned.push(portfolio_value - after.balance);
        self.portfolio.push(portfolio_value);
        self.rewards.push(snapshot.reward);
    }

    pub fn final_assets(&self) -> Option<f64> {
        self.portfolio.last().copied()
    }

    pub fn total_reward(&self) -> f64 {
        self.rewards.iter().sum()
    }

    pub fn record(&self, dir: &Path) -> Result<()> {
        create_folder_if_not_exists(dir)?;

        assets_chart(
            dir,
            TRADING_PLOT,
            &self.portfolio,
            &self.cash,
            Some(self.positioned.as_slice()),
        )?;
        buy_sell_chart(dir, BUY_SELL_PLOT, &self.prices, &self.buys, &self.sells)?;
        Ok(())
    }
}

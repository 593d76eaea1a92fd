use std::path::Path;

use crate::{charts::general::simple_chart, error::Result, utils::create_folder_if_not_exists};

/// Per-episode summary across a training run.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct MetaHistory {
    pub final_assets: Vec<f64>,
    pub cumulative_reward: Vec<f64>,
    pub exploration_rate: Vec<f64>,
}

impl MetaHistory {
    pub fn record(&mut self, final_assets: f64, cumulative_reward: f64, exploration_rate: f64) {
        self.final_assets.push(final_assets);
        self.cumulative_reward.push(cumulative_reward);
        self.exploration_rate.push(exploration_rate);
    }

    pub fn episodes(&self) -> usize {
        self.final_assets.len()
    }

    pub fn chart(&self, dir: &Path) -> Result<()> {
        create_folder_if_not_exists(dir)?;
        if !self.final_assets.is_empty() {
            simple_chart(dir, "final_assets", &self.final_assets)?;
        }
        if !self.cumulative_reward.is_empty() {
            simple_chart(dir, "cum_reward", &self.cumulative_reward)?;
        }
        if !self.exploration_rate.is_empty() {
            simple_chart(dir, "exploration_rate", &self.exploration_rate)?;
        }
        Ok(())
    }
}

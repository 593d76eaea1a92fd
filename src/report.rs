use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::{error::Result, gym::Action, history::EpisodeHistory, utils::write_atomic};

/// Outcome of one run, as handed back to the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunResults {
    /// Portfolio value after every evaluation step
    pub portfolio_history: Vec<f64>,
    pub final_balance: f64,
    /// Final balance minus the starting balance
    pub total_reward: f64,
    pub episodes_completed: usize,
    pub actions: Vec<Action>,
    pub table_size: usize,
}

impl RunResults {
    pub fn from_evaluation(
        history: &EpisodeHistory,
        initial_balance: f64,
        episodes_completed: usize,
        table_size: usize,
    ) -> Self {
        let final_balance = history.final_assets().unwrap_or(initial_balance);

        Self {
            portfolio_history: history.portfolio.clone(),
            final_balance,
            total_reward: final_balance - initial_balance,
            episodes_completed,
            actions: history.actions.clone(),
            table_size,
        }
    }

    pub fn write(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_vec_pretty(self)?;
        write_atomic(path, &json)?;

        info!(path = %path.display(), "wrote results");
        Ok(())
    }
}

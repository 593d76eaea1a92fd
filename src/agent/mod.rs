use std::path::Path;

use rand::{rngs::StdRng, Rng, SeedableRng};

use crate::{
    config::AgentConfig,
    error::Result,
    gym::{Action, Observation},
};

use table::{QTable, StateKey};

pub mod table;
pub mod train;

/// Epsilon-greedy tabular Q-learning agent.
#[derive(Debug, Clone)]
pub struct QAgent<R = StdRng> {
    config: AgentConfig,
    table: QTable,
    exploration_rate: f64,
    min_exploration: f64,
    rng: R,
}

impl QAgent<StdRng> {
    /// Agent with a reproducible random source when `seed` is given.
    pub fn seeded(config: AgentConfig, seed: Option<u64>) -> Result<Self> {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self::new(config, rng)
    }
}

impl<R: Rng> QAgent<R> {
    pub fn new(config: AgentConfig, rng: R) -> Result<Self> {
        config.validate()?;

        Ok(Self {
            table: QTable::new(config.discretizer()),
            exploration_rate: config.exploration_rate,
            min_exploration: config.min_exploration,
            config,
            rng,
        })
    }

    pub fn config(&self) -> &AgentConfig {
        &self.config
    }

    pub fn table(&self) -> &QTable {
        &self.table
    }

    pub fn exploration_rate(&self) -> f64 {
        self.exploration_rate
    }

    /// Pure exploitation from here on, used for evaluation.
    pub fn disable_exploration(&mut self) {
        self.exploration_rate = 0.0;
        self.min_exploration = 0.0;
    }

    pub fn discretize(&self, observation: &Observation) -> StateKey {
        self.table.discretizer().key(observation)
    }

    pub fn choose_action(&mut self, observation: &Observation) -> Action {
        if self.exploration_rate > 0.0 && self.rng.gen::<f64>() < self.exploration_rate {
            return Action::random(&mut self.rng);
        }

        self.greedy_action(observation)
    }

    pub fn greedy_action(&self, observation: &Observation) -> Action {
        self.table.best_action(&self.discretize(observation))
    }

    pub fn learn(
        &mut self,
        observation: &Observation,
        action: Action,
        reward: f64,
        next_observation: &Observation,
        done: bool,
    ) {
        let key = self.discretize(observation);
        let next_key = self.discretize(next_observation);

        self.table.row_mut(next_key);
        let target = if done {
            reward
        } else {
            reward + self.config.discount_factor * self.table.max_value(&next_key)
        };

        let value = &mut self.table.row_mut(key)[action];
        *value += self.config.learning_rate * (target - *value);
    }

    pub fn decay_exploration(&mut self) {
        self.exploration_rate =
            (self.exploration_rate * self.config.exploration_decay).max(self.min_exploration);
    }

    pub fn persist(&self, destination: &Path) -> Result<()> {
        self.table.persist(destination)
    }

    /// Replace the table with one read from `source`.
    pub fn restore(&mut self, source: &Path) -> Result<()> {
        self.table = QTable::restore(source, self.config.discretizer())?;
        Ok(())
    }
}

use std::{
    fs,
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};

use crate::{
    agent::table::Discretizer,
    constants::{agent, env, files},
    error::{Result, TradingError},
};

/// Hyperparameters of the tabular agent.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AgentConfig {
    pub learning_rate: f64,
    pub discount_factor: f64,
    pub exploration_rate: f64,
    pub exploration_decay: f64,
    pub min_exploration: f64,
    pub price_bin: f64,
    pub balance_bin: f64,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            learning_rate: agent::LEARNING_RATE,
            discount_factor: agent::DISCOUNT_FACTOR,
            exploration_rate: agent::EXPLORATION_RATE,
            exploration_decay: agent::EXPLORATION_DECAY,
            min_exploration: agent::MIN_EXPLORATION,
            price_bin: agent::PRICE_BIN,
            balance_bin: agent::BALANCE_BIN,
        }
    }
}

impl AgentConfig {
    pub fn discretizer(&self) -> Discretizer {
        Discretizer::new(self.price_bin, self.balance_bin)
    }

    pub fn validate(&self) -> Result<()> {
        let in_range = |name: &str, value: f64, low: f64, high: f64, open_low: bool| {
            let above = if open_low { value > low } else { value >= low };
            if value.is_finite() && above && value <= high {
                Ok(())
            } else {
                let bracket = if open_low { '(' } else { '[' };
                Err(TradingError::InvalidInput(format!(
                    "{name} must be in {bracket}{low}, {high}], got {value}"
                )))
            }
        };

        in_range("learning_rate", self.learning_rate, 0.0, 1.0, true)?;
        in_range("discount_factor", self.discount_factor, 0.0, 1.0, false)?;
        in_range("exploration_rate", self.exploration_rate, 0.0, 1.0, false)?;
        in_range("exploration_decay", self.exploration_decay, 0.0, 1.0, true)?;
        in_range(
            "min_exploration",
            self.min_exploration,
            0.0,
            self.exploration_rate,
            false,
        )?;

        for (name, width) in [("price_bin", self.price_bin), ("balance_bin", self.balance_bin)] {
            if !width.is_finite() || width <= 0.0 {
                return Err(TradingError::InvalidInput(format!(
                    "{name} must be positive, got {width}"
                )));
            }
        }
        Ok(())
    }
}

/// Everything one run needs, fully resolved.
#[derive(Debug, Clone, PartialEq)]
pub struct RunConfig {
    pub data_path: PathBuf,
    pub model_path: PathBuf,
    pub results_dir: PathBuf,
    pub episodes: usize,
    pub initial_balance: f64,
    pub transaction_cost: f64,
    pub agent: AgentConfig,
    /// Seed for exploration; `None` draws one from the OS
    pub seed: Option<u64>,
    pub charts: bool,
}

impl RunConfig {
    pub fn results_file(&self) -> PathBuf {
        self.results_dir.join(files::RESULTS_FILE)
    }
}

/// Parameter bundle as sent by the caller. Every field may be missing at parse time,
/// [`TrainingParams::into_config`] decides which ones are required.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrainingParams {
    pub data_path: Option<PathBuf>,
    pub episodes: Option<usize>,
    pub learning_rate: Option<f64>,
    pub gamma: Option<f64>,
    pub epsilon: Option<f64>,
    pub epsilon_decay: Option<f64>,
    pub initial_balance: Option<f64>,
    pub transaction_cost: Option<f64>,
    pub min_exploration: Option<f64>,
    pub price_bin: Option<f64>,
    pub balance_bin: Option<f64>,
    pub seed: Option<u64>,
}

impl TrainingParams {
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(TradingError::MissingInput(path.to_path_buf()));
        }
        Self::from_json(&fs::read_to_string(path)?)
    }

    /// Every hyperparameter at its default and a single episode. Only the initial
    /// balance is left for the caller to supply.
    pub fn with_agent_defaults() -> Self {
        let defaults = AgentConfig::default();
        Self {
            episodes: Some(1),
            learning_rate: Some(defaults.learning_rate),
            gamma: Some(defaults.discount_factor),
            epsilon: Some(defaults.exploration_rate),
            epsilon_decay: Some(defaults.exploration_decay),
            ..Default::default()
        }
    }

    /// Fields set in `other` replace the ones set here.
    pub fn merge(self, other: TrainingParams) -> Self {
        Self {
            data_path: other.data_path.or(self.data_path),
            episodes: other.episodes.or(self.episodes),
            learning_rate: other.learning_rate.or(self.learning_rate),
            gamma: other.gamma.or(self.gamma),
            epsilon: other.epsilon.or(self.epsilon),
            epsilon_decay: other.epsilon_decay.or(self.epsilon_decay),
            initial_balance: other.initial_balance.or(self.initial_balance),
            transaction_cost: other.transaction_cost.or(self.transaction_cost),
            min_exploration: other.min_exploration.or(self.min_exploration),
            price_bin: other.price_bin.or(self.price_bin),
            balance_bin: other.balance_bin.or(self.balance_bin),
            seed: other.seed.or(self.seed),
        }
    }

    fn missing(&self) -> Vec<String> {
        [
            ("episodes", self.episodes.is_none()),
            ("learningRate", self.learning_rate.is_none()),
            ("gamma", self.gamma.is_none()),
            ("epsilon", self.epsilon.is_none()),
            ("epsilonDecay", self.epsilon_decay.is_none()),
            ("initialBalance", self.initial_balance.is_none()),
        ]
        .into_iter()
        .filter(|(_, missing)| *missing)
        .map(|(name, _)| name.to_string())
        .collect()
    }

    /// Resolve into a [`RunConfig`]. Relative data paths are taken relative to `base_dir`.
    pub fn into_config(self, base_dir: &Path) -> Result<RunConfig> {
        let (
            Some(episodes),
            Some(learning_rate),
            Some(discount_factor),
            Some(exploration_rate),
            Some(exploration_decay),
            Some(initial_balance),
        ) = (
            self.episodes,
            self.learning_rate,
            self.gamma,
            self.epsilon,
            self.epsilon_decay,
            self.initial_balance,
        )
        else {
            return Err(TradingError::MissingConfiguration(self.missing()));
        };

        if episodes == 0 {
            return Err(TradingError::InvalidInput(
                "episodes must be a positive integer".to_string(),
            ));
        }

        let defaults = AgentConfig::default();
        let agent = AgentConfig {
            learning_rate,
            discount_factor,
            exploration_rate,
            exploration_decay,
            min_exploration: self
                .min_exploration
                .unwrap_or(defaults.min_exploration.min(exploration_rate)),
            price_bin: self.price_bin.unwrap_or(defaults.price_bin),
            balance_bin: self.balance_bin.unwrap_or(defaults.balance_bin),
        };
        agent.validate()?;

        let data_path = self
            .data_path
            .unwrap_or_else(|| PathBuf::from(files::DATA_PATH));
        let data_path = if data_path.is_absolute() {
            data_path
        } else {
            base_dir.join(data_path)
        };

        Ok(RunConfig {
            data_path,
            model_path: base_dir.join(files::MODEL_PATH),
            results_dir: base_dir.join(files::RESULTS_PATH),
            episodes,
            initial_balance,
            transaction_cost: self.transaction_cost.unwrap_or(env::TRANSACTION_COST),
            agent,
            seed: self.seed,
            charts: true,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FULL: &str = r#"{
        "dataPath": "prices.csv",
        "episodes": 10,
        "learningRate": 0.2,
        "gamma": 0.9,
        "epsilon": 1.0,
        "epsilonDecay": 0.99,
        "initialBalance": 10000
    }"#;

    #[test]
    fn default_agent_config_is_valid() {
        AgentConfig::default().validate().unwrap();
    }

    #[test]
    fn parses_full_bundle() {
        let config = TrainingParams::from_json(FULL)
            .unwrap()
            .into_config(Path::new("/srv"))
            .unwrap();

        assert_eq!(config.data_path, PathBuf::from("/srv/prices.csv"));
        assert_eq!(config.model_path, PathBuf::from("/srv/models/q_table.bin"));
        assert_eq!(config.results_file(), PathBuf::from("/srv/results/results.json"));
        assert_eq!(config.episodes, 10);
        assert_eq!(config.initial_balance, 10_000.0);
        assert_eq!(config.transaction_cost, 0.0);
        assert_eq!(config.agent.learning_rate, 0.2);
        assert_eq!(config.agent.discount_factor, 0.9);
        assert_eq!(config.agent.min_exploration, 0.01);
        assert_eq!(config.agent.price_bin, 5.0);
        assert_eq!(config.seed, None);
    }

    #[test]
    fn reports_every_missing_field() {
        let params = TrainingParams::from_json(r#"{"episodes": 5, "gamma": 0.9}"#).unwrap();

        match params.into_config(Path::new(".")) {
            Err(TradingError::MissingConfiguration(missing)) => assert_eq!(
                missing,
                vec!["learningRate", "epsilon", "epsilonDecay", "initialBalance"]
            ),
            other => panic!("expected missing configuration, got {other:?}"),
        }
    }

    #[test]
    fn missing_configuration_message_lists_fields() {
        let err = TrainingParams::default()
            .into_config(Path::new("."))
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Missing required parameters: episodes, learningRate, gamma, epsilon, epsilonDecay, initialBalance"
        );
    }

    #[test]
    fn later_params_override_earlier() {
        let base = TrainingParams::from_json(FULL).unwrap();
        let flags = TrainingParams {
            episodes: Some(3),
            seed: Some(42),
            ..Default::default()
        };

        let merged = base.merge(flags);

        assert_eq!(merged.episodes, Some(3));
        assert_eq!(merged.seed, Some(42));
        assert_eq!(merged.gamma, Some(0.9));
    }

    #[test]
    fn min_exploration_never_exceeds_start_rate() {
        let params = TrainingParams::from_json(FULL).unwrap().merge(TrainingParams {
            epsilon: Some(0.0),
            ..Default::default()
        });

        let config = params.into_config(Path::new(".")).unwrap();
        assert_eq!(config.agent.min_exploration, 0.0);
    }

    #[test]
    fn rejects_out_of_range_hyperparameters() {
        let params = TrainingParams::from_json(FULL).unwrap().merge(TrainingParams {
            gamma: Some(1.5),
            ..Default::default()
        });
        assert!(matches!(
            params.into_config(Path::new(".")),
            Err(TradingError::InvalidInput(_))
        ));

        let zero_episodes = TrainingParams::from_json(FULL).unwrap().merge(TrainingParams {
            episodes: Some(0),
            ..Default::default()
        });
        assert!(zero_episodes.into_config(Path::new(".")).is_err());
    }

    #[test]
    fn agent_defaults_leave_only_balance_missing() {
        let err = TrainingParams::with_agent_defaults()
            .into_config(Path::new("."))
            .unwrap_err();
        assert!(matches!(
            err,
            TradingError::MissingConfiguration(missing) if missing == vec!["initialBalance"]
        ));
    }

    #[test]
    fn rejects_zero_learning_rate() {
        let config = AgentConfig {
            learning_rate: 0.0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}

pub mod files {
    pub const DATA_PATH: &str = "uploaded_data.csv";
    pub const MODEL_PATH: &str = "models/q_table.bin";
    pub const RESULTS_PATH: &str = "results";
    pub const RESULTS_FILE: &str = "results.json";
    pub const TRADING_PLOT: &str = "trading_plot";
    pub const BUY_SELL_PLOT: &str = "buy_sell";
    /// Sub-directory of the results folder for training meta charts
    pub const TRAINING_CHARTS: &str = "training";
}

pub mod agent {
    pub const LEARNING_RATE: f64 = 0.1;
    pub const DISCOUNT_FACTOR: f64 = 0.95;
    pub const EXPLORATION_RATE: f64 = 1.0;
    pub const EXPLORATION_DECAY: f64 = 0.995;
    pub const MIN_EXPLORATION: f64 = 0.01;
    /// Width of a price bucket when discretizing observations
    pub const PRICE_BIN: f64 = 5.0;
    /// Width of a cash bucket when discretizing observations
    pub const BALANCE_BIN: f64 = 50.0;
}

pub mod env {
    pub const TRANSACTION_COST: f64 = 0.0;
    /// Fewest prices an episode can run over
    pub const MIN_PRICES: usize = 2;
}

pub mod training {
    /// How often training writes an info log line
    pub const LOG_EVERY_EPISODES: usize = 100;
}

pub mod charts {
    pub const CHART_DIMS: (u32, u32) = (1024, 768);
}

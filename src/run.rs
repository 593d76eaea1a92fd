use std::fs;

use tracing::{info, warn};

use crate::{
    agent::{
        train::{evaluate, train},
        QAgent,
    },
    config::RunConfig,
    constants::files::TRAINING_CHARTS,
    data::load_prices,
    error::Result,
    events::ProgressSink,
    gym::MarketEnv,
    history::EpisodeHistory,
    report::RunResults,
    types::Data,
};

/// Load, train, persist, evaluate and report.
///
/// Evaluation runs on a fresh environment and an agent restored from the table
/// just written, so it sees exactly what was persisted.
pub fn run(config: &RunConfig, progress: &mut impl ProgressSink) -> Result<RunResults> {
    remove_stale_results(config)?;

    let prices = load_prices(&config.data_path)?;
    let mut env = MarketEnv::new(prices.clone(), config.initial_balance, config.transaction_cost)?;
    let mut agent = QAgent::seeded(config.agent, config.seed)?;

    info!(
        steps = env.horizon(),
        episodes = config.episodes,
        initial_balance = config.initial_balance,
        "starting training"
    );
    let meta = train(&mut env, &mut agent, config.episodes, progress)?;
    agent.persist(&config.model_path)?;

    if cfg!(feature = "debug_training") && config.charts {
        meta.chart(&config.results_dir.join(TRAINING_CHARTS))?;
    }

    let (history, table_size) = evaluate_prices(config, prices)?;
    finish(config, &history, meta.episodes(), table_size)
}

/// Evaluate a previously persisted table without training.
pub fn evaluate_only(config: &RunConfig) -> Result<RunResults> {
    remove_stale_results(config)?;

    let prices = load_prices(&config.data_path)?;
    let (history, table_size) = evaluate_prices(config, prices)?;
    finish(config, &history, 0, table_size)
}

/// Greedy pass with the persisted table. Also returns the number of stored states.
fn evaluate_prices(config: &RunConfig, prices: Data) -> Result<(EpisodeHistory, usize)> {
    let mut env = MarketEnv::new(prices, config.initial_balance, config.transaction_cost)?;
    let mut agent = QAgent::seeded(config.agent, config.seed)?;
    agent.restore(&config.model_path)?;

    let states = agent.table().len();
    info!(states, "evaluating");
    Ok((evaluate(&mut env, &mut agent)?, states))
}

fn finish(
    config: &RunConfig,
    history: &EpisodeHistory,
    episodes: usize,
    table_size: usize,
) -> Result<RunResults> {
    if config.charts {
        history.record(&config.results_dir)?;
    }

    let results =
        RunResults::from_evaluation(history, config.initial_balance, episodes, table_size);
    results.write(&config.results_file())?;

    info!(
        final_balance = results.final_balance,
        total_reward = results.total_reward,
        "run complete"
    );
    Ok(results)
}

fn remove_stale_results(config: &RunConfig) -> Result<()> {
    let path = config.results_file();
    if path.exists() {
        warn!(path = %path.display(), "removing stale results");
        fs::remove_file(&path)?;
    }
    Ok(())
}

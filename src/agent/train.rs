use std::time::Instant;

use rand::Rng;
use tracing::{debug, info};

use crate::{
    constants::training::LOG_EVERY_EPISODES,
    error::Result,
    events::ProgressSink,
    gym::Environment,
    history::{EpisodeHistory, MetaHistory},
};

use super::QAgent;

/// Run `episodes` full passes over `env`, learning after every step.
///
/// Exploration decays once per completed episode. `progress` hears about each
/// episode as it finishes.
pub fn train<E, R>(
    env: &mut E,
    agent: &mut QAgent<R>,
    episodes: usize,
    progress: &mut impl ProgressSink,
) -> Result<MetaHistory>
where
    E: Environment,
    R: Rng,
{
    let time = Instant::now();
    let mut meta = MetaHistory::default();

    for episode in 1..=episodes {
        let mut observation = env.reset();
        let mut cumulative_reward = 0.0;
        let mut steps = 0usize;

        loop {
            let action = agent.choose_action(&observation);
            let snapshot = env.step(action)?;

            agent.learn(
                &observation,
                action,
                snapshot.reward,
                &snapshot.observation,
                snapshot.done,
            );

            cumulative_reward += snapshot.reward;
            steps += 1;
            observation = snapshot.observation;

            if snapshot.done {
                break;
            }
        }

        agent.decay_exploration();

        let final_assets = env.portfolio_value();
        meta.record(final_assets, cumulative_reward, agent.exploration_rate());

        debug!(
            episode,
            steps,
            final_assets,
            cumulative_reward,
            exploration_rate = agent.exploration_rate(),
            "episode complete"
        );
        if episode % LOG_EVERY_EPISODES == 0 || episode == episodes {
            info!(
                episode,
                episodes,
                final_assets,
                states = agent.table().len(),
                exploration_rate = agent.exploration_rate(),
                "training"
            );
        }

        progress.episode_completed(episode, episodes);
    }

    info!(
        episodes,
        states = agent.table().len(),
        seconds = time.elapsed().as_secs_f64(),
        "completed training"
    );
    Ok(meta)
}

/// One greedy pass over `env` without learning. Exploration is switched off for good.
pub fn evaluate<E, R>(env: &mut E, agent: &mut QAgent<R>) -> Result<EpisodeHistory>
where
    E: Environment,
    R: Rng,
{
    agent.disable_exploration();

    let mut history = EpisodeHistory::new();
    let mut observation = env.reset();

    loop {
        let action = agent.greedy_action(&observation);
        let snapshot = env.step(action)?;

        history.push(&observation, action, &snapshot, env.portfolio_value());

        if snapshot.done {
            break;
        }
        observation = snapshot.observation;
    }

    debug!(
        steps = history.len(),
        final_assets = history.final_assets(),
        buys = history.buys.len(),
        sells = history.sells.len(),
        "evaluation complete"
    );
    Ok(history)
}

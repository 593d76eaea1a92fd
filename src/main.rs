use std::{io, path::PathBuf};

use anyhow::Result;
use clap::{error::ErrorKind, Args, Parser, Subcommand};
use colored::Colorize;
use tracing::Level;

use trading_qlearning::{
    config::{RunConfig, TrainingParams},
    events::{Event, StdoutProgress},
    logging::init_logging,
    report::RunResults,
    run::{evaluate_only, run},
    utils::percent_change,
};

#[derive(Parser, Debug)]
#[command(name = "trading_qlearning")]
#[command(about = "Tabular Q-learning trader over historical closing prices", long_about = None)]
#[command(args_conflicts_with_subcommands = true)]
struct Cli {
    /// Without a subcommand these arguments start a training run
    #[command(flatten)]
    run: RunArgs,

    #[command(subcommand)]
    command: Option<Commands>,
}

impl Cli {
    fn into_command(self) -> Commands {
        self.command.unwrap_or(Commands::Train(self.run))
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Train, persist the Q-table, evaluate greedily and write results
    Train(RunArgs),
    /// Evaluate a previously persisted Q-table
    Evaluate(RunArgs),
}

#[derive(Args, Debug)]
struct RunArgs {
    /// JSON parameter bundle, or the path of the price CSV
    params: Option<String>,

    /// Log at debug level unless RUST_LOG says otherwise
    #[arg(short, long, default_value_t = false)]
    verbose: bool,

    #[arg(long)]
    params_file: Option<PathBuf>,

    #[arg(short, long)]
    data: Option<PathBuf>,

    #[arg(short, long)]
    episodes: Option<usize>,

    #[arg(long)]
    learning_rate: Option<f64>,

    #[arg(long)]
    gamma: Option<f64>,

    #[arg(long)]
    epsilon: Option<f64>,

    #[arg(long)]
    epsilon_decay: Option<f64>,

    #[arg(long)]
    min_exploration: Option<f64>,

    #[arg(long)]
    initial_balance: Option<f64>,

    #[arg(long)]
    transaction_cost: Option<f64>,

    #[arg(long)]
    price_bin: Option<f64>,

    #[arg(long)]
    balance_bin: Option<f64>,

    #[arg(long)]
    seed: Option<u64>,

    /// Directory the data path, model and results are resolved against
    #[arg(long, default_value = ".")]
    base_dir: PathBuf,

    #[arg(long, default_value_t = false)]
    no_charts: bool,
}

impl RunArgs {
    fn flags(&self) -> TrainingParams {
        TrainingParams {
            data_path: self.data.clone(),
            episodes: self.episodes,
            learning_rate: self.learning_rate,
            gamma: self.gamma,
            epsilon: self.epsilon,
            epsilon_decay: self.epsilon_decay,
            initial_balance: self.initial_balance,
            transaction_cost: self.transaction_cost,
            min_exploration: self.min_exploration,
            price_bin: self.price_bin,
            balance_bin: self.balance_bin,
            seed: self.seed,
        }
    }

    /// File, then positional argument, then flags; later sources win.
    fn config(&self, base: TrainingParams) -> Result<RunConfig> {
        let mut params = base;

        if let Some(path) = &self.params_file {
            params = params.merge(TrainingParams::from_file(path)?);
        }

        if let Some(raw) = &self.params {
            let positional = if raw.trim_start().starts_with('{') {
                TrainingParams::from_json(raw)?
            } else {
                TrainingParams {
                    data_path: Some(PathBuf::from(raw)),
                    ..Default::default()
                }
            };
            params = params.merge(positional);
        }

        let mut config = params.merge(self.flags()).into_config(&self.base_dir)?;
        config.charts = !self.no_charts;
        Ok(config)
    }
}

impl Commands {
    fn args(&self) -> &RunArgs {
        match self {
            Commands::Train(args) | Commands::Evaluate(args) => args,
        }
    }
}

/// Parse failures become an error event; help and version are printed by clap.
fn parse_failure(err: &clap::Error) -> Option<Event> {
    match err.kind() {
        ErrorKind::DisplayHelp
        | ErrorKind::DisplayVersion
        | ErrorKind::DisplayHelpOnMissingArgumentOrSubcommand => None,
        _ => Some(Event::Error {
            message: err.to_string().trim_end().to_string(),
        }),
    }
}

fn fail(event: Event) -> ! {
    event.emit(&mut io::stderr().lock());
    std::process::exit(1);
}

fn main() {
    let command = match Cli::try_parse() {
        Ok(cli) => cli.into_command(),
        Err(err) => match parse_failure(&err) {
            Some(event) => fail(event),
            None => err.exit(),
        },
    };

    init_logging(if command.args().verbose { Level::DEBUG } else { Level::INFO });
    eprintln!("{}", "Start".green());

    if let Err(err) = execute(command) {
        fail(Event::Error {
            message: format!("{err:#}"),
        });
    }

    eprintln!("{}", "End".green());
}

fn execute(command: Commands) -> Result<()> {
    let (config, results) = match command {
        Commands::Train(args) => {
            let config = args.config(TrainingParams::default())?;
            let results = run(&config, &mut StdoutProgress)?;
            (config, results)
        }
        Commands::Evaluate(args) => {
            let config = args.config(TrainingParams::with_agent_defaults())?;
            let results = evaluate_only(&config)?;
            (config, results)
        }
    };

    print_summary(&config, &results);

    Event::WroteResults {
        path: config.results_file().display().to_string(),
    }
    .emit(&mut io::stdout().lock());
    Ok(())
}

fn print_summary(config: &RunConfig, results: &RunResults) {
    let profit = results.total_reward;
    let percent = percent_change(config.initial_balance, results.final_balance);
    let line = format!("Profit: ${profit:.2} ({percent:.2}%)");

    eprintln!("Final balance: ${:.2}", results.final_balance);
    if profit >= 0.0 {
        eprintln!("{}", line.green());
    } else {
        eprintln!("{}", line.red());
    }
    eprintln!(
        "Episodes: {} States: {} Steps: {}",
        results.episodes_completed,
        results.table_size,
        results.portfolio_history.len()
    );
}

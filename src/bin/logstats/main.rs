//! Kuba LogStats command line
//!
//! Evaluates a stats function over newline-delimited JSON log records.
//!
//! # CLI Commands
//!
//! - `eval <EXPR> [INPUT]` - evaluate e.g. `min(duration)` over INPUT (stdin by default)
//! - `check-config` - validate the configuration file
//!
//! # Configuration
//!
//! Settings come from the file given with `--config` (or `LOGSTATS_CONFIG`),
//! then environment overrides, then command line flags.

mod input;

use std::fs::File;
use std::io::{self, BufReader};
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing::{debug, info};

use kuba_logstats::stats::{parse_stats_func, ParallelStats};
use kuba_logstats::Config;

#[derive(Parser)]
#[command(name = "logstats")]
#[command(version)]
#[command(about = "Stats functions over columnar log blocks", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to configuration file (overrides LOGSTATS_CONFIG env var)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Override worker thread count
    #[arg(short, long, global = true)]
    workers: Option<usize>,

    /// Rows packed into each block
    #[arg(short, long, global = true, default_value_t = 4096)]
    block_size: usize,
}

#[derive(Subcommand)]
enum Commands {
    /// Evaluate a stats expression such as `min(duration)` or `max(*)`
    Eval {
        /// Stats expression
        expr: String,

        /// Input file with one JSON record per line (stdin if omitted)
        input: Option<PathBuf>,

        /// Print execution details after the result
        #[arg(long)]
        explain: bool,
    },

    /// Validate configuration file
    CheckConfig,
}

fn load_config(cli: &Cli) -> kuba_logstats::Result<Config> {
    let path = cli
        .config
        .clone()
        .or_else(|| std::env::var_os("LOGSTATS_CONFIG").map(PathBuf::from));

    let mut config = match path {
        Some(path) => Config::from_file_with_env(path)?,
        None => Config::from_env(),
    };
    if let Some(workers) = cli.workers {
        config.stats.num_workers = workers;
    }
    config.validate()?;
    Ok(config)
}

fn init_tracing(config: &Config) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.logging.log_level));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(true)
        .with_thread_ids(false);

    if config.logging.json {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let config = load_config(&cli)?;
    init_tracing(&config);

    match &cli.command {
        Commands::CheckConfig => {
            println!("configuration OK");
            println!("{}", toml::to_string_pretty(&config)?);
            Ok(())
        },
        Commands::Eval {
            expr,
            input,
            explain,
        } => {
            let func = parse_stats_func(expr)?;
            debug!(func = %func, needed = ?func.needed_fields(), "parsed stats expression");

            let blocks = match input {
                Some(path) => input::read_blocks(BufReader::new(File::open(path)?), cli.block_size)?,
                None => input::read_blocks(io::stdin().lock(), cli.block_size)?,
            };

            let engine = ParallelStats::new(config.stats.clone())?;
            let outcome = engine.compute(func.as_ref(), &blocks);
            info!(
                func = %func,
                rows = outcome.rows,
                blocks = outcome.blocks,
                shards = outcome.shards,
                "evaluation complete"
            );

            println!("{}", outcome.value);
            if *explain {
                println!(
                    "{}: rows={} blocks={} shards={} state_bytes={}",
                    func, outcome.rows, outcome.blocks, outcome.shards, outcome.state_bytes
                );
            }
            Ok(())
        },
    }
}

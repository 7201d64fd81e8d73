use std::num::NonZero;
use std::path::PathBuf;

use clap::Parser;

use crate::{Result, logger, settings::Settings};

mod environments;
mod run;
mod select;
mod upgrade;
mod validate;

#[derive(clap::Parser)]
#[clap(name = "drover", version = env!("CARGO_PKG_VERSION"), about = env!("CARGO_PKG_DESCRIPTION"))]
struct Cli {
    /// Path to the config file (default: search for drover.toml/yaml/json upward)
    #[clap(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,
    /// Number of concurrent execution slots (default: logical CPU count)
    #[clap(short, long, global = true)]
    jobs: Option<NonZero<usize>>,
    /// Enables verbose output
    #[clap(short, long, global = true, action = clap::ArgAction::Count, overrides_with = "quiet")]
    verbose: u8,
    /// Suppresses output
    #[clap(short, long, global = true, overrides_with = "verbose")]
    quiet: bool,
    #[clap(subcommand)]
    command: Commands,
}

#[derive(clap::Subcommand)]
enum Commands {
    Run(Box<run::Run>),
    Upgrade(Box<upgrade::Upgrade>),
    Environments(Box<environments::Environments>),
    Select(Box<select::Select>),
    Validate(Box<validate::Validate>),
}

pub async fn run() -> Result<()> {
    let args = Cli::parse();

    let mut level = None;
    if args.verbose == 1 {
        level = Some(log::LevelFilter::Debug);
    }
    if args.verbose > 1 {
        level = Some(log::LevelFilter::Trace);
    }
    if args.quiet {
        level = Some(log::LevelFilter::Warn);
    }
    logger::init(level);

    if let Some(jobs) = args.jobs {
        Settings::set_jobs(jobs);
    }

    let config_path = args.config.as_deref();
    match args.command {
        Commands::Run(cmd) => cmd.run(config_path).await,
        Commands::Upgrade(cmd) => cmd.run(config_path).await,
        Commands::Environments(cmd) => cmd.run(config_path).await,
        Commands::Select(cmd) => cmd.run(config_path).await,
        Commands::Validate(cmd) => cmd.run(config_path).await,
    }
}

#[macro_use]
extern crate log;

mod backend;
mod claims;
mod cli;
mod config;
mod env;
mod environment;
mod error;
mod execution;
mod file_type;
mod git;
mod glob;
mod logger;
mod manifest;
mod report;
mod scheduler;
mod select;
mod settings;
mod unit;

pub use error::{Error, Result};

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    cli::run().await
}

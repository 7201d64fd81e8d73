use std::path::Path;

use crate::Result;
use crate::config::Config;

/// Loads and validates the configuration
#[derive(clap::Args)]
pub struct Validate {}

impl Validate {
    pub async fn run(&self, config_path: Option<&Path>) -> Result<()> {
        let config = Config::get(config_path)?;
        info!(
            "{} ok: {} environments, {} hooks",
            config.path.display(),
            config.environments.len(),
            config.hooks.len()
        );
        Ok(())
    }
}

use std::path::Path;

use crate::config::Config;
use crate::{Result, environment, git};

/// Regenerates lock files for every environment
#[derive(clap::Args)]
pub struct Upgrade {}

impl Upgrade {
    pub async fn run(&self, config_path: Option<&Path>) -> Result<()> {
        let config = Config::get(config_path)?;
        let project_root = git::repo_root().await?;
        let environments = environment::build_environments(&config, &project_root);
        environment::prepare_all(environments, true).await?;
        info!("all environments up-to-date");
        Ok(())
    }
}

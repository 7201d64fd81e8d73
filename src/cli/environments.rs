use std::path::Path;

use crate::config::Config;
use crate::{Result, environment, git};
use eyre::bail;

/// Shows provisioned environment state
#[derive(clap::Args)]
#[clap(visible_alias = "env")]
pub struct Environments {
    /// Show only this environment
    environment: Option<String>,
}

impl Environments {
    pub async fn run(&self, config_path: Option<&Path>) -> Result<()> {
        let config = Config::get(config_path)?;
        let project_root = git::repo_root().await?;
        let environments = environment::build_environments(&config, &project_root);

        if let Some(id) = &self.environment {
            let Some(environment) = environments.get(id) else {
                bail!("no such environment: {id:?}");
            };
            print_environment(environment);
            return Ok(());
        }
        for environment in environments.values() {
            print_environment(environment);
        }
        Ok(())
    }
}

fn print_environment(environment: &environment::Environment) {
    println!("{}", environment.config.id);
    println!(
        "  ecosystem: {} {}",
        environment.config.ecosystem.language, environment.config.ecosystem.version
    );
    println!("  path: {}", environment.path().display());
    println!("  lock-files-path: {}", environment.lock_files_path().display());
    println!("  state: {}", environment.state_description());
}

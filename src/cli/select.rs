use std::path::Path;

use crate::config::Config;
use crate::error::Error;
use crate::select::{Selector, filter_hook_targets, select_targets};
use crate::Result;

/// Shows the file selection for a hook
#[derive(clap::Args)]
pub struct Select {
    /// Hook id
    hook: String,
    /// Which files to select from
    #[clap(long, value_enum, default_value_t = Selector::Changed)]
    select: Selector,
}

impl Select {
    pub async fn run(&self, config_path: Option<&Path>) -> Result<()> {
        let config = Config::get(config_path)?;
        let Some(hook) = config.hooks.get(&self.hook) else {
            return Err(Error::UnknownHook(self.hook.clone()).into());
        };
        if !hook.parameterize {
            eprintln!("hook is not parameterized, it always runs against the whole repository");
            return Ok(());
        }
        let targets = select_targets(&config, self.select).await?;
        for file in filter_hook_targets(hook, &targets)? {
            println!("{}", file.display());
        }
        Ok(())
    }
}

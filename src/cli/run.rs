use std::path::Path;
use std::sync::Arc;

use indexmap::IndexMap;
use tokio_util::sync::CancellationToken;

use crate::config::Config;
use crate::error::Error;
use crate::scheduler::{Scheduler, watch_for_ctrl_c};
use crate::select::{Selector, select_targets};
use crate::settings::Settings;
use crate::{Result, environment, git};

/// Runs configured hooks over the selected files
#[derive(clap::Args)]
#[clap(visible_alias = "r")]
pub struct Run {
    /// Run only this hook
    hook: Option<String>,
    /// Which files to run against
    #[clap(long, value_enum, default_value_t = Selector::Changed)]
    select: Selector,
    /// Shorthand for --select=all
    #[clap(short, long, conflicts_with = "select")]
    all: bool,
    /// Remove environment directories for environments no longer configured
    #[clap(long)]
    delete_orphan_environments: bool,
}

impl Run {
    #[tracing::instrument(level = "info", name = "run", skip_all)]
    pub async fn run(&self, config_path: Option<&Path>) -> Result<()> {
        let config = Config::get(config_path)?;
        let hooks = self.selected_hooks(&config)?;
        let selector = if self.all { Selector::All } else { self.select };

        let project_root = git::repo_root().await?;
        environment::probe_orphans(&config, &project_root, self.delete_orphan_environments)?;

        // Provision every referenced environment before anything is
        // scheduled; a provisioning failure is fatal for the whole run.
        let environments = environment::build_environments(&config, &project_root);
        let environments = environment::prepare_all(environments, false).await?;
        let bin_dirs: IndexMap<String, _> = environments
            .values()
            .map(|e| (e.config.id.clone(), e.bin_dir()))
            .collect();

        let targets = select_targets(&config, selector).await?;
        debug!("{} candidate files ({selector})", targets.len());

        let settings = Settings::get();
        let cancel = CancellationToken::new();
        watch_for_ctrl_c(cancel.clone());
        let scheduler = Scheduler::new(&hooks, &targets, bin_dirs, settings.jobs.get(), cancel)?;
        if scheduler.unit_count() == 0 {
            info!("nothing to do");
            return Ok(());
        }
        let report = scheduler.run_to_completion().await?;

        eprint!("{}", report.render_summary());
        if !report.success() {
            std::process::exit(1);
        }
        Ok(())
    }

    fn selected_hooks(&self, config: &Config) -> Result<Vec<Arc<crate::config::HookConfig>>> {
        let hooks: Vec<_> = config
            .hooks
            .values()
            .filter(|h| self.hook.as_deref().is_none_or(|id| h.id == id))
            .map(|h| Arc::new(h.clone()))
            .collect();
        if hooks.is_empty() {
            return Err(match &self.hook {
                Some(id) => Error::UnknownHook(id.clone()).into(),
                None => Error::NoHooks.into(),
            });
        }
        Ok(hooks)
    }
}

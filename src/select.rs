//! File selection: turning discovered repository paths into per-hook
//! candidate file lists.

use std::collections::HashSet;
use std::path::PathBuf;

use crate::config::{Config, HookConfig};
use crate::{Result, file_type, git, glob};

/// Built-in excludes applied on top of the config's global exclude list.
const BUILTIN_EXCLUDES: &[&str] = &[".drover/**"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum, strum::Display)]
#[strum(serialize_all = "lowercase")]
pub enum Selector {
    /// All files tracked by git
    All,
    /// Files changed relative to HEAD
    #[default]
    Changed,
}

/// A candidate file with its classified type tags.
#[derive(Debug, Clone)]
pub struct Target {
    pub path: PathBuf,
    pub tags: HashSet<String>,
}

/// Discovers files per the selector and classifies them. Order follows git's
/// output so later partitioning is deterministic.
pub async fn select_targets(config: &Config, selector: Selector) -> Result<Vec<Target>> {
    let paths = match selector {
        Selector::All => git::all_files().await?,
        Selector::Changed => git::changed_files().await?,
    };
    targets_from_paths(config, paths)
}

pub fn targets_from_paths(config: &Config, paths: Vec<PathBuf>) -> Result<Vec<Target>> {
    let mut excludes = config.exclude.clone();
    excludes.extend(BUILTIN_EXCLUDES.iter().map(|s| s.to_string()));
    let exclude_set = glob::build_set(&excludes)?;
    let targets = paths
        .into_iter()
        .filter(|path| !exclude_set.is_match(path))
        .map(|path| {
            let tags = file_type::tags_for_path(&path);
            Target { path, tags }
        })
        .collect();
    Ok(targets)
}

/// The final candidate file list for one hook: targets whose tags intersect
/// the hook's `types` (all types when empty) minus the hook's own excludes.
/// Input ordering is preserved.
pub fn filter_hook_targets(hook: &HookConfig, targets: &[Target]) -> Result<Vec<PathBuf>> {
    let exclude_set = glob::build_set(&hook.exclude)?;
    let files = targets
        .iter()
        .filter(|t| hook.types.is_empty() || hook.types.iter().any(|ty| t.tags.contains(ty)))
        .filter(|t| !exclude_set.is_match(&t.path))
        .map(|t| t.path.clone())
        .collect();
    Ok(files)
}

pub use std::env::*;
use std::{num::NonZero, path::PathBuf, sync::LazyLock};

use indexmap::IndexSet;

pub static HOME_DIR: LazyLock<PathBuf> = LazyLock::new(|| dirs::home_dir().unwrap_or_default());

pub static DROVER_CACHE_DIR: LazyLock<PathBuf> = LazyLock::new(|| {
    var_path("DROVER_CACHE_DIR").unwrap_or(
        dirs::cache_dir()
            .unwrap_or(HOME_DIR.join(".cache"))
            .join("drover"),
    )
});

pub static DROVER_CONFIG: LazyLock<Option<PathBuf>> = LazyLock::new(|| var_path("DROVER_CONFIG"));

pub static DROVER_LOG: LazyLock<log::LevelFilter> =
    LazyLock::new(|| var_log_level("DROVER_LOG").unwrap_or(log::LevelFilter::Info));

pub static DROVER_JOBS: LazyLock<Option<NonZero<usize>>> =
    LazyLock::new(|| var("DROVER_JOBS").ok().and_then(|v| v.parse().ok()));

pub static DROVER_SKIP_HOOKS: LazyLock<IndexSet<String>> =
    LazyLock::new(|| var_csv("DROVER_SKIP_HOOKS").unwrap_or_default());

/// Overrides the directory hash used to key per-checkout environment
/// directories, letting CI give several checkouts of the same repo a shared
/// environment cache.
pub static DROVER_ENV_KEY: LazyLock<Option<String>> = LazyLock::new(|| var("DROVER_ENV_KEY").ok());

fn var_path(name: &str) -> Option<PathBuf> {
    var(name).map(PathBuf::from).ok()
}

fn var_csv(name: &str) -> Option<IndexSet<String>> {
    var(name)
        .map(|val| val.split(',').map(|s| s.trim().to_string()).collect())
        .ok()
}

fn var_log_level(name: &str) -> Option<log::LevelFilter> {
    var(name).ok().and_then(|level| level.parse().ok())
}

//! System environments: hooks run against whatever is already on PATH.
//! Nothing to install, nothing to lock.

use std::path::{Path, PathBuf};

use crate::Result;
use crate::config::EnvironmentConfig;

pub async fn bootstrap(_config: &EnvironmentConfig, env_path: &Path) -> Result<()> {
    xx::file::mkdirp(env_path)?;
    Ok(())
}

pub async fn freeze(
    _config: &EnvironmentConfig,
    _env_path: &Path,
    lock_files_path: &Path,
) -> Result<Vec<PathBuf>> {
    xx::file::mkdirp(lock_files_path)?;
    Ok(vec![])
}

pub async fn sync(
    _config: &EnvironmentConfig,
    _env_path: &Path,
    _lock_files_path: &Path,
) -> Result<()> {
    Ok(())
}

//! Provisioned tool environments.
//!
//! Each environment is an isolated toolchain directory keyed by checkout
//! (`~/.cache/drover/<cwd-hash>/<env-id>`), built from lock files committed
//! under `./.drover/<env-id>/`. The state file in the environment directory
//! records how far provisioning got; every stage re-verifies against the
//! lock manifest rather than trusting the file blindly.

use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::config::{Config, EcosystemConfig, EnvironmentConfig};
use crate::error::Error;
use crate::manifest::{self, LockFileState};
use crate::{Result, env};
use eyre::WrapErr;

const STATE_FILE: &str = "drover-state.json";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Stage {
    Bootstrapped,
    Frozen,
    Synced,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersistedState {
    pub stage: Stage,
    pub ecosystem: EcosystemConfig,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub checksum: Option<String>,
}

pub struct Environment {
    pub config: EnvironmentConfig,
    path: PathBuf,
    lock_files_path: PathBuf,
    state: Option<PersistedState>,
}

impl Environment {
    fn new(config: EnvironmentConfig, env_base: &Path, lock_base: &Path) -> Self {
        let path = env_base.join(&config.id);
        let lock_files_path = lock_base.join(&config.id);
        let state = read_state(&path);
        Self { config, path, lock_files_path, state }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn lock_files_path(&self) -> &Path {
        &self.lock_files_path
    }

    /// Executable dir hooks get prepended to PATH (None for system
    /// environments).
    pub fn bin_dir(&self) -> Option<PathBuf> {
        self.config.ecosystem.language.bin_dir(&self.path)
    }

    pub fn state_description(&self) -> String {
        match &self.state {
            None => "uninitialized".to_string(),
            Some(state) => match &state.checksum {
                Some(checksum) => format!("{} ({checksum})", state.stage),
                None => state.stage.to_string(),
            },
        }
    }

    fn should_teardown(&self) -> bool {
        match &self.state {
            None => false,
            Some(state) => state.ecosystem != self.config.ecosystem,
        }
    }

    fn should_bootstrap(&self) -> bool {
        self.state.is_none() || !self.path.exists()
    }

    fn should_freeze(&self) -> bool {
        let state = manifest::check_lock_files(&self.lock_files_path, None, &self.config);
        matches!(
            state,
            LockFileState::MissingLockFile
                | LockFileState::ManifestLockFileMismatch
                | LockFileState::ConfigManifestMismatch
        )
    }

    fn should_sync(&self) -> Result<bool> {
        let checksum = match &self.state {
            Some(state) if state.stage == Stage::Synced => state.checksum.as_deref(),
            _ => return Ok(true),
        };
        let state = manifest::check_lock_files(&self.lock_files_path, checksum, &self.config);
        match state {
            LockFileState::Matching => Ok(false),
            LockFileState::MissingLockFile | LockFileState::StateManifestMismatch => {
                info!("[{}] environment out of sync: {state}", self.config.id);
                Ok(true)
            }
            // Freezing is always checked before syncing, so the lock files
            // agree with the manifest by the time we get here.
            LockFileState::ManifestLockFileMismatch | LockFileState::ConfigManifestMismatch => {
                Err(eyre::eyre!("lock files need freezing but freeze check already passed: {state}"))
            }
        }
    }

    async fn teardown(&mut self) -> Result<()> {
        info!("[{}] ecosystem changed, tearing down environment", self.config.id);
        xx::file::remove_dir_all(&self.path)?;
        self.state = None;
        Ok(())
    }

    fn transition(&mut self, stage: Stage, checksum: Option<String>) -> Result<()> {
        let state = PersistedState {
            stage,
            ecosystem: self.config.ecosystem.clone(),
            checksum,
        };
        write_state(&self.path, &state)?;
        self.state = Some(state);
        Ok(())
    }

    /// Brings the environment to a runnable state. Idempotent; called once
    /// per environment before any unit referencing it is scheduled. With
    /// `upgrade` the lock files are regenerated instead of verified.
    pub async fn prepare(&mut self, upgrade: bool) -> Result<()> {
        match self.prepare_inner(upgrade).await {
            Ok(()) => Ok(()),
            Err(err) => match err.downcast_ref::<Error>() {
                Some(Error::NeedsFreeze { .. }) => Err(err),
                _ => Err(Error::Provision {
                    id: self.config.id.clone(),
                    reason: format!("{err:#}"),
                }
                .into()),
            },
        }
    }

    async fn prepare_inner(&mut self, upgrade: bool) -> Result<()> {
        let id = self.config.id.clone();
        let language = self.config.ecosystem.language;

        if self.should_teardown() {
            self.teardown().await?;
        }

        if self.should_bootstrap() {
            language
                .bootstrap(&self.config, &self.path)
                .await
                .wrap_err("bootstrap failed")?;
            self.transition(Stage::Bootstrapped, None)?;
            debug!("[{id}] bootstrapped");
        } else {
            trace!("[{id}] found previously bootstrapped environment");
        }

        if upgrade {
            info!("[{id}] freezing dependencies");
            let lock_files = language
                .freeze(&self.config, &self.path, &self.lock_files_path)
                .await
                .wrap_err("freeze failed")?;
            let lock_file_refs: Vec<&Path> = lock_files.iter().map(|p| p.as_path()).collect();
            let lock_manifest =
                manifest::build_manifest(&self.config, &lock_file_refs, &self.lock_files_path)?;
            manifest::write_manifest(&self.lock_files_path, &lock_manifest)?;
            self.transition(Stage::Frozen, None)?;
        } else if self.should_freeze() {
            return Err(Error::NeedsFreeze { id }.into());
        }

        if self.should_sync()? {
            info!("[{id}] syncing dependencies");
            let lock_manifest = manifest::read_manifest(&self.lock_files_path)?;
            language
                .sync(&self.config, &self.path, &self.lock_files_path)
                .await
                .wrap_err("sync failed")?;
            self.transition(Stage::Synced, Some(lock_manifest.checksum))?;
        } else {
            trace!("[{id}] dependencies up-to-date");
        }
        Ok(())
    }
}

fn read_state(env_dir: &Path) -> Option<PersistedState> {
    let raw = std::fs::read_to_string(env_dir.join(STATE_FILE)).ok()?;
    match serde_json::from_str(&raw) {
        Ok(state) => Some(state),
        Err(err) => {
            warn!("discarding unreadable state file in {}: {err}", env_dir.display());
            None
        }
    }
}

fn write_state(env_dir: &Path, state: &PersistedState) -> Result<()> {
    xx::file::mkdirp(env_dir)?;
    let json = serde_json::to_string(state)?;
    xx::file::write(env_dir.join(STATE_FILE), json)?;
    Ok(())
}

/// Base directory for this checkout's environments, keyed by a hash of the
/// project root so unrelated checkouts never share toolchains.
pub fn environments_base(project_root: &Path) -> PathBuf {
    let key = env::DROVER_ENV_KEY
        .clone()
        .unwrap_or_else(|| xx::hash::hash_to_str(&project_root.to_path_buf()));
    env::DROVER_CACHE_DIR.join("envs").join(key)
}

pub fn build_environments(config: &Config, project_root: &Path) -> IndexMap<String, Environment> {
    let env_base = environments_base(project_root);
    let lock_base = project_root.join(".drover");
    config
        .environments
        .values()
        .map(|cfg| {
            (
                cfg.id.clone(),
                Environment::new(cfg.clone(), &env_base, &lock_base),
            )
        })
        .collect()
}

/// Prepares every environment concurrently. Any failure is fatal for the
/// run: nothing gets scheduled afterwards.
pub async fn prepare_all(
    environments: IndexMap<String, Environment>,
    upgrade: bool,
) -> Result<IndexMap<String, Environment>> {
    let mut set = tokio::task::JoinSet::new();
    for (index, (_, mut environment)) in environments.into_iter().enumerate() {
        set.spawn(async move {
            environment.prepare(upgrade).await?;
            Ok::<_, eyre::Report>((index, environment))
        });
    }
    let mut prepared: Vec<(usize, Environment)> = Vec::new();
    while let Some(joined) = set.join_next().await {
        let (index, environment) = joined.wrap_err("environment preparation task panicked")??;
        prepared.push((index, environment));
    }
    prepared.sort_by_key(|(index, _)| *index);
    Ok(prepared
        .into_iter()
        .map(|(_, environment)| (environment.config.id.clone(), environment))
        .collect())
}

/// Warns about (or deletes) environment directories no longer named by the
/// configuration.
pub fn probe_orphans(config: &Config, project_root: &Path, delete: bool) -> Result<()> {
    let env_base = environments_base(project_root);
    if !env_base.exists() {
        return Ok(());
    }
    for entry in xx::file::ls(&env_base)? {
        if !entry.is_dir() {
            continue;
        }
        let name = entry.file_name().and_then(|n| n.to_str()).unwrap_or_default();
        if config.environments.contains_key(name) {
            continue;
        }
        if delete {
            info!("deleting orphan environment {name:?}");
            xx::file::remove_dir_all(&entry)?;
        } else {
            warn!("orphan environment {name:?} (pass --delete-orphan-environments to remove)");
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::Language;
    use crate::manifest::build_manifest;

    fn env_config(id: &str, language: Language, deps: &[&str]) -> EnvironmentConfig {
        EnvironmentConfig {
            id: id.into(),
            ecosystem: EcosystemConfig { language, version: String::new() },
            dependencies: deps.iter().map(|s| s.to_string()).collect(),
        }
    }

    #[test]
    fn test_state_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let state = PersistedState {
            stage: Stage::Synced,
            ecosystem: EcosystemConfig { language: Language::Python, version: "3.12".into() },
            checksum: Some("sha256:abc".into()),
        };
        write_state(dir.path(), &state).unwrap();
        let read = read_state(dir.path()).unwrap();
        assert_eq!(read.stage, Stage::Synced);
        assert_eq!(read.checksum.as_deref(), Some("sha256:abc"));
    }

    #[test]
    fn test_missing_state_is_uninitialized() {
        let dir = tempfile::tempdir().unwrap();
        assert!(read_state(dir.path()).is_none());
    }

    #[tokio::test]
    async fn test_system_environment_prepares_end_to_end() {
        let cache = tempfile::tempdir().unwrap();
        let locks = tempfile::tempdir().unwrap();
        let config = env_config("system", Language::System, &[]);
        let mut environment =
            Environment::new(config, cache.path(), locks.path());

        // Nothing frozen yet: preparing must demand an upgrade first.
        let err = environment.prepare(false).await.unwrap_err();
        assert!(
            matches!(err.downcast_ref::<Error>(), Some(Error::NeedsFreeze { .. })),
            "{err}"
        );

        environment.prepare(true).await.unwrap();
        assert_eq!(environment.state_description().split(' ').next(), Some("synced"));

        // Second prepare is a no-op and must not error.
        environment.prepare(false).await.unwrap();
        assert!(environment.bin_dir().is_none());
    }

    #[tokio::test]
    async fn test_changed_dependencies_demand_refreeze() {
        let cache = tempfile::tempdir().unwrap();
        let locks = tempfile::tempdir().unwrap();
        let lock_dir = locks.path().join("py");
        std::fs::create_dir_all(&lock_dir).unwrap();
        let lock = lock_dir.join("requirements.txt");
        std::fs::write(&lock, "ruff==0.4.0").unwrap();
        let frozen = env_config("py", Language::Python, &["ruff"]);
        let m = build_manifest(&frozen, &[&lock], &lock_dir).unwrap();
        manifest::write_manifest(&lock_dir, &m).unwrap();

        let reconfigured = env_config("py", Language::Python, &["ruff", "mypy"]);
        let environment = Environment::new(reconfigured, cache.path(), locks.path());
        assert!(environment.should_freeze());
    }
}

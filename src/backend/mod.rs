//! Ecosystem backends.
//!
//! A backend knows how to bootstrap an isolated toolchain directory, freeze
//! the configured dependencies into lock files, and sync the environment
//! from those lock files. Backend choice is data-driven by the environment's
//! ecosystem language; the scheduler never sees past the resolved bin dir.

mod node;
mod python;
mod system;

use std::path::{Path, PathBuf};
use std::process::Stdio;

use serde::{Deserialize, Serialize};

use crate::Result;
use crate::config::EnvironmentConfig;
use eyre::{WrapErr, bail};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, strum::Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Language {
    Python,
    Node,
    System,
}

impl Language {
    /// Directory prepended to PATH for hooks running in this environment.
    /// System environments run against the inherited PATH unchanged.
    pub fn bin_dir(&self, env_path: &Path) -> Option<PathBuf> {
        match self {
            Language::Python => Some(env_path.join("bin")),
            Language::Node => Some(env_path.join("node_modules").join(".bin")),
            Language::System => None,
        }
    }

    pub async fn bootstrap(&self, config: &EnvironmentConfig, env_path: &Path) -> Result<()> {
        match self {
            Language::Python => python::bootstrap(config, env_path).await,
            Language::Node => node::bootstrap(config, env_path).await,
            Language::System => system::bootstrap(config, env_path).await,
        }
    }

    /// Regenerates lock files from the configured dependencies. Returns the
    /// lock files written (paths inside `lock_files_path`).
    pub async fn freeze(
        &self,
        config: &EnvironmentConfig,
        env_path: &Path,
        lock_files_path: &Path,
    ) -> Result<Vec<PathBuf>> {
        match self {
            Language::Python => python::freeze(config, env_path, lock_files_path).await,
            Language::Node => node::freeze(config, env_path, lock_files_path).await,
            Language::System => system::freeze(config, env_path, lock_files_path).await,
        }
    }

    /// Installs exactly the locked dependency set into the environment.
    pub async fn sync(
        &self,
        config: &EnvironmentConfig,
        env_path: &Path,
        lock_files_path: &Path,
    ) -> Result<()> {
        match self {
            Language::Python => python::sync(config, env_path, lock_files_path).await,
            Language::Node => node::sync(config, env_path, lock_files_path).await,
            Language::System => system::sync(config, env_path, lock_files_path).await,
        }
    }
}

/// Runs a provisioning command, failing with its stderr on a non-zero exit.
pub(crate) async fn run_cmd(
    id: &str,
    program: &str,
    args: &[&str],
    cwd: Option<&Path>,
) -> Result<String> {
    let mut cmd = tokio::process::Command::new(program);
    cmd.args(args);
    if let Some(cwd) = cwd {
        cmd.current_dir(cwd);
    }
    cmd.stdin(Stdio::null());
    debug!("[{id}] $ {program} {}", args.join(" "));
    let output = cmd
        .output()
        .await
        .wrap_err_with(|| format!("[{id}] failed to spawn {program}"))?;
    let stderr = String::from_utf8_lossy(&output.stderr);
    if !output.status.success() {
        bail!("[{id}] {program} {} failed: {}", args.join(" "), stderr.trim());
    }
    if !stderr.trim().is_empty() {
        trace!("[{id}] {program} stderr: {}", stderr.trim());
    }
    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_language_parses_lowercase() {
        let lang: Language = serde_json::from_str("\"python\"").unwrap();
        assert_eq!(lang, Language::Python);
        assert_eq!(lang.to_string(), "python");
    }

    #[test]
    fn test_bin_dirs() {
        let env = Path::new("/envs/x");
        assert_eq!(
            Language::Python.bin_dir(env),
            Some(PathBuf::from("/envs/x/bin"))
        );
        assert_eq!(
            Language::Node.bin_dir(env),
            Some(PathBuf::from("/envs/x/node_modules/.bin"))
        );
        assert_eq!(Language::System.bin_dir(env), None);
    }

    #[tokio::test]
    async fn test_run_cmd_failure_carries_stderr() {
        let err = run_cmd("t", "sh", &["-c", "echo boom >&2; exit 3"], None)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("boom"), "{err}");
    }
}

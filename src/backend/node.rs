//! Node environments, provisioned with npm.
//!
//! The lock directory carries a generated `package.json` plus the
//! `package-lock.json` npm resolves from it; syncing copies both into the
//! environment and runs a clean install there.

use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::Result;
use crate::config::EnvironmentConfig;

use super::run_cmd;

#[derive(Serialize)]
struct PackageJson {
    name: String,
    private: bool,
    dependencies: indexmap::IndexMap<String, String>,
}

fn render_package_json(config: &EnvironmentConfig) -> Result<String> {
    let package = PackageJson {
        name: format!("drover-env-{}", config.id),
        private: true,
        dependencies: config
            .dependencies
            .iter()
            // TODO: support version specs in dependency entries
            .map(|dep| (dep.clone(), "*".to_string()))
            .collect(),
    };
    Ok(serde_json::to_string_pretty(&package)?)
}

pub async fn bootstrap(_config: &EnvironmentConfig, env_path: &Path) -> Result<()> {
    xx::file::mkdirp(env_path)?;
    Ok(())
}

pub async fn freeze(
    config: &EnvironmentConfig,
    _env_path: &Path,
    lock_files_path: &Path,
) -> Result<Vec<PathBuf>> {
    xx::file::mkdirp(lock_files_path)?;
    let package_json = lock_files_path.join("package.json");
    xx::file::write(&package_json, render_package_json(config)?)?;
    run_cmd(
        &config.id,
        "npm",
        &["install", "--package-lock-only", "--ignore-scripts", "--no-fund"],
        Some(lock_files_path),
    )
    .await?;
    Ok(vec![package_json, lock_files_path.join("package-lock.json")])
}

pub async fn sync(
    config: &EnvironmentConfig,
    env_path: &Path,
    lock_files_path: &Path,
) -> Result<()> {
    for name in ["package.json", "package-lock.json"] {
        let contents = xx::file::read_to_string(&lock_files_path.join(name))?;
        xx::file::write(&env_path.join(name), contents)?;
    }
    run_cmd(
        &config.id,
        "npm",
        &["ci", "--ignore-scripts", "--no-fund"],
        Some(env_path),
    )
    .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::Language;
    use crate::config::EcosystemConfig;

    #[test]
    fn test_package_json_lists_dependencies() {
        let config = EnvironmentConfig {
            id: "node".into(),
            ecosystem: EcosystemConfig { language: Language::Node, version: "22".into() },
            dependencies: vec!["prettier".into(), "eslint".into()],
        };
        let json = render_package_json(&config).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["dependencies"]["prettier"], "*");
        assert_eq!(value["dependencies"]["eslint"], "*");
        assert_eq!(value["private"], true);
    }
}

//! Lock-file manifests.
//!
//! Each environment's lock directory carries a `manifest.json` recording the
//! dependency set the lock files were generated from, plus checksums of the
//! lock files themselves. Comparing manifest, config, and on-disk lock files
//! tells us whether an environment needs freezing or syncing.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::Result;
use crate::config::{EcosystemConfig, EnvironmentConfig};
use eyre::WrapErr;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
pub struct LockFile {
    /// Relative to the environment's lock directory
    pub path: String,
    pub checksum: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LockManifest {
    pub source_ecosystem: EcosystemConfig,
    /// Sorted
    pub source_dependencies: Vec<String>,
    /// Sorted by path
    pub lock_files: Vec<LockFile>,
    /// Accumulated over the lock-file checksums
    pub checksum: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "kebab-case")]
pub enum LockFileState {
    Matching,
    /// A lock file named by the manifest is gone
    MissingLockFile,
    /// Environment was synced against a different manifest
    StateManifestMismatch,
    /// A lock file changed underneath the manifest
    ManifestLockFileMismatch,
    /// Configured dependencies or ecosystem differ from what was frozen
    ConfigManifestMismatch,
}

pub fn file_checksum(path: &Path) -> Result<String> {
    let contents = fs::read(path)
        .wrap_err_with(|| format!("failed to read lock file {}", path.display()))?;
    let digest = Sha256::digest(&contents);
    Ok(format!("sha256:{digest:x}"))
}

fn accumulated_checksum(lock_files: &[LockFile]) -> String {
    let mut hasher = Sha256::new();
    for lock_file in lock_files {
        hasher.update(lock_file.checksum.as_bytes());
    }
    format!("sha256:{:x}", hasher.finalize())
}

fn read_lock_file(lock_files_path: &Path, path: &Path) -> Result<LockFile> {
    let rel = path.strip_prefix(lock_files_path).unwrap_or(path);
    Ok(LockFile {
        path: rel.display().to_string(),
        checksum: file_checksum(path)?,
    })
}

pub fn build_manifest(
    config: &EnvironmentConfig,
    lock_files: &[&Path],
    lock_files_path: &Path,
) -> Result<LockManifest> {
    let mut lock_files = lock_files
        .iter()
        .map(|path| read_lock_file(lock_files_path, path))
        .collect::<Result<Vec<_>>>()?;
    lock_files.sort();
    let mut source_dependencies = config.dependencies.clone();
    source_dependencies.sort();
    let checksum = accumulated_checksum(&lock_files);
    Ok(LockManifest {
        source_ecosystem: config.ecosystem.clone(),
        source_dependencies,
        lock_files,
        checksum,
    })
}

pub fn write_manifest(lock_files_path: &Path, manifest: &LockManifest) -> Result<()> {
    let manifest_path = lock_files_path.join("manifest.json");
    let json = serde_json::to_string_pretty(manifest)?;
    xx::file::write(&manifest_path, json)?;
    debug!("wrote manifest to {}", manifest_path.display());
    Ok(())
}

pub fn read_manifest(lock_files_path: &Path) -> Result<LockManifest> {
    let manifest_path = lock_files_path.join("manifest.json");
    let raw = xx::file::read_to_string(&manifest_path)?;
    Ok(serde_json::from_str(&raw)?)
}

/// Classifies the lock directory against the configured dependency set and
/// the environment's last synced checksum.
pub fn check_lock_files(
    lock_files_path: &Path,
    state_checksum: Option<&str>,
    config: &EnvironmentConfig,
) -> LockFileState {
    let Ok(manifest) = read_manifest(lock_files_path) else {
        return LockFileState::ConfigManifestMismatch;
    };

    if config.ecosystem != manifest.source_ecosystem {
        return LockFileState::ConfigManifestMismatch;
    }
    let mut configured = config.dependencies.clone();
    configured.sort();
    if configured != manifest.source_dependencies {
        return LockFileState::ConfigManifestMismatch;
    }

    for persisted in &manifest.lock_files {
        let path = lock_files_path.join(&persisted.path);
        if !path.exists() {
            return LockFileState::MissingLockFile;
        }
        match read_lock_file(lock_files_path, &path) {
            Ok(actual) if actual.checksum == persisted.checksum => {}
            _ => return LockFileState::ManifestLockFileMismatch,
        }
    }

    if state_checksum != Some(manifest.checksum.as_str()) {
        return LockFileState::StateManifestMismatch;
    }
    LockFileState::Matching
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::Language;

    fn env_config(deps: &[&str]) -> EnvironmentConfig {
        EnvironmentConfig {
            id: "python".into(),
            ecosystem: EcosystemConfig { language: Language::Python, version: "3.12".into() },
            dependencies: deps.iter().map(|s| s.to_string()).collect(),
        }
    }

    fn write_lock(dir: &Path, name: &str, contents: &str) -> std::path::PathBuf {
        let path = dir.join(name);
        fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn test_checksum_accumulation_is_order_independent_after_sort() {
        let dir = tempfile::tempdir().unwrap();
        let a = write_lock(dir.path(), "a.txt", "aaa");
        let b = write_lock(dir.path(), "b.txt", "bbb");
        let config = env_config(&["ruff"]);
        let m1 = build_manifest(&config, &[&a, &b], dir.path()).unwrap();
        let m2 = build_manifest(&config, &[&b, &a], dir.path()).unwrap();
        assert_eq!(m1.checksum, m2.checksum);
        assert!(m1.checksum.starts_with("sha256:"));
    }

    #[test]
    fn test_roundtrip_and_matching() {
        let dir = tempfile::tempdir().unwrap();
        let lock = write_lock(dir.path(), "requirements.txt", "ruff==0.4.0");
        let config = env_config(&["ruff"]);
        let manifest = build_manifest(&config, &[&lock], dir.path()).unwrap();
        write_manifest(dir.path(), &manifest).unwrap();

        let state = check_lock_files(dir.path(), Some(&manifest.checksum), &config);
        assert_eq!(state, LockFileState::Matching);
    }

    #[test]
    fn test_missing_manifest_needs_freeze() {
        let dir = tempfile::tempdir().unwrap();
        let state = check_lock_files(dir.path(), None, &env_config(&["ruff"]));
        assert_eq!(state, LockFileState::ConfigManifestMismatch);
    }

    #[test]
    fn test_changed_dependencies_mismatch() {
        let dir = tempfile::tempdir().unwrap();
        let lock = write_lock(dir.path(), "requirements.txt", "ruff==0.4.0");
        let frozen = env_config(&["ruff"]);
        let manifest = build_manifest(&frozen, &[&lock], dir.path()).unwrap();
        write_manifest(dir.path(), &manifest).unwrap();

        let reconfigured = env_config(&["ruff", "mypy"]);
        let state = check_lock_files(dir.path(), Some(&manifest.checksum), &reconfigured);
        assert_eq!(state, LockFileState::ConfigManifestMismatch);
    }

    #[test]
    fn test_deleted_lock_file() {
        let dir = tempfile::tempdir().unwrap();
        let lock = write_lock(dir.path(), "requirements.txt", "ruff==0.4.0");
        let config = env_config(&["ruff"]);
        let manifest = build_manifest(&config, &[&lock], dir.path()).unwrap();
        write_manifest(dir.path(), &manifest).unwrap();
        fs::remove_file(&lock).unwrap();

        let state = check_lock_files(dir.path(), Some(&manifest.checksum), &config);
        assert_eq!(state, LockFileState::MissingLockFile);
    }

    #[test]
    fn test_edited_lock_file() {
        let dir = tempfile::tempdir().unwrap();
        let lock = write_lock(dir.path(), "requirements.txt", "ruff==0.4.0");
        let config = env_config(&["ruff"]);
        let manifest = build_manifest(&config, &[&lock], dir.path()).unwrap();
        write_manifest(dir.path(), &manifest).unwrap();
        fs::write(&lock, "ruff==0.5.0").unwrap();

        let state = check_lock_files(dir.path(), Some(&manifest.checksum), &config);
        assert_eq!(state, LockFileState::ManifestLockFileMismatch);
    }

    #[test]
    fn test_stale_state_checksum() {
        let dir = tempfile::tempdir().unwrap();
        let lock = write_lock(dir.path(), "requirements.txt", "ruff==0.4.0");
        let config = env_config(&["ruff"]);
        let manifest = build_manifest(&config, &[&lock], dir.path()).unwrap();
        write_manifest(dir.path(), &manifest).unwrap();

        let state = check_lock_files(dir.path(), Some("sha256:other"), &config);
        assert_eq!(state, LockFileState::StateManifestMismatch);
    }
}

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::{Result, backend::Language, env, error::Error};
use eyre::{WrapErr, bail};

/// A configured invocation of an external checking/formatting tool.
#[derive(Debug, Clone, Default, Deserialize, Serialize, Eq, PartialEq)]
#[serde(rename_all = "snake_case")]
pub struct HookConfig {
    /// The hook id (set from the map key during initialization)
    #[serde(default, skip_serializing)]
    pub id: String,

    /// Id of the environment the command runs inside
    pub environment: String,

    /// Executable to spawn (resolved via the environment's PATH)
    pub command: String,

    /// Static arguments, passed before any file arguments
    #[serde(default)]
    pub args: Vec<String>,

    /// Static environment variable overrides. May not override PATH.
    #[serde(default)]
    pub env_vars: IndexMap<String, String>,

    /// Whether matched files are appended to the command line. Hooks that
    /// discover their own inputs (whole-program type checkers, mostly) set
    /// this to false and always run as a single whole-repository unit.
    #[serde(default = "default_true")]
    pub parameterize: bool,

    /// File type tags to match (empty = all types)
    #[serde(default)]
    pub types: Vec<String>,

    /// Glob patterns excluding files from this hook
    #[serde(default)]
    pub exclude: Vec<String>,

    /// Hooks that only observe files may overlap with each other freely
    #[serde(default)]
    pub read_only: bool,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Deserialize, Serialize, Eq, PartialEq)]
#[serde(rename_all = "snake_case")]
pub struct EcosystemConfig {
    pub language: Language,
    pub version: String,
}

#[derive(Debug, Clone, Deserialize, Serialize, Eq, PartialEq)]
#[serde(rename_all = "snake_case")]
pub struct EnvironmentConfig {
    #[serde(default, skip_serializing)]
    pub id: String,

    pub ecosystem: EcosystemConfig,

    #[serde(default)]
    pub dependencies: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct Config {
    #[serde(default)]
    pub environments: IndexMap<String, EnvironmentConfig>,

    #[serde(default)]
    pub hooks: IndexMap<String, HookConfig>,

    /// Glob patterns excluding files from every hook
    #[serde(default)]
    pub exclude: Vec<String>,

    #[serde(skip)]
    pub path: PathBuf,
}

impl Config {
    #[tracing::instrument(level = "info", name = "config.load", skip_all)]
    pub fn get(cli_path: Option<&Path>) -> Result<Self> {
        let path = match cli_path.map(Path::to_path_buf).or(env::DROVER_CONFIG.clone()) {
            Some(path) => path,
            None => Self::find_config_file()?,
        };
        let mut config = Self::read(&path)
            .wrap_err_with(|| format!("failed to read config file: {}", path.display()))?;
        config.init(&path);
        config.validate()?;
        Ok(config)
    }

    fn find_config_file() -> Result<PathBuf> {
        let cwd = std::env::current_dir()?;
        let names = ["drover.toml", "drover.yaml", "drover.yml", "drover.json"];
        let mut dir = cwd.as_path();
        loop {
            for name in names {
                let candidate = dir.join(name);
                if candidate.exists() {
                    return Ok(candidate);
                }
            }
            match dir.parent() {
                Some(parent) => dir = parent,
                None => bail!("no drover config file found (looked for {})", names.join(", ")),
            }
        }
    }

    fn read(path: &Path) -> Result<Self> {
        let ext = path.extension().unwrap_or_default().to_str().unwrap_or_default();
        let raw = xx::file::read_to_string(path)?;
        let config: Config = match ext {
            "toml" => toml::from_str(&raw)?,
            "yaml" | "yml" => serde_yaml::from_str(&raw)?,
            "json" => serde_json::from_str(&raw)?,
            _ => bail!("unsupported config file extension: {ext:?}"),
        };
        Ok(config)
    }

    fn init(&mut self, path: &Path) {
        self.path = path.to_path_buf();
        for (id, environment) in self.environments.iter_mut() {
            environment.id = id.clone();
        }
        for (id, hook) in self.hooks.iter_mut() {
            hook.id = id.clone();
        }
    }

    fn validate(&self) -> Result<()> {
        for hook in self.hooks.values() {
            if !self.environments.contains_key(&hook.environment) {
                return Err(Error::UnknownEnvironment {
                    hook: hook.id.clone(),
                    environment: hook.environment.clone(),
                }
                .into());
            }
            if hook.command.is_empty() {
                bail!("hook {:?} has an empty command", hook.id);
            }
            if hook.env_vars.contains_key("PATH") {
                bail!(
                    "hook {:?} sets PATH in env_vars; PATH is managed by the environment",
                    hook.id
                );
            }
        }
        Ok(())
    }
}

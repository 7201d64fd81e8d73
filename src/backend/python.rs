//! Python environments, provisioned with uv.

use std::path::{Path, PathBuf};

use crate::Result;
use crate::config::EnvironmentConfig;

use super::run_cmd;

fn venv_python(env_path: &Path) -> String {
    env_path.join("bin").join("python").display().to_string()
}

pub async fn bootstrap(config: &EnvironmentConfig, env_path: &Path) -> Result<()> {
    info!("[{}] creating virtualenv (python {})", config.id, config.ecosystem.version);
    let python_flag = format!("--python={}", config.ecosystem.version);
    run_cmd(
        &config.id,
        "uv",
        &[
            "venv",
            "--no-project",
            "--python-preference=only-managed",
            &python_flag,
            &env_path.display().to_string(),
        ],
        None,
    )
    .await?;
    Ok(())
}

pub async fn freeze(
    config: &EnvironmentConfig,
    env_path: &Path,
    lock_files_path: &Path,
) -> Result<Vec<PathBuf>> {
    xx::file::mkdirp(lock_files_path)?;
    let requirements_txt = lock_files_path.join("requirements.txt");

    // The equivalent of a requirements.in, written to a scratch file that
    // disappears once compiled.
    let mut requirements_in = tempfile::Builder::new()
        .prefix("requirements-")
        .suffix(".in")
        .tempfile_in(lock_files_path)?;
    {
        use std::io::Write;
        for dependency in &config.dependencies {
            writeln!(requirements_in, "{dependency}")?;
        }
        requirements_in.flush()?;
    }

    let python_flag = format!("--python={}", venv_python(env_path));
    let output_flag = format!("--output-file={}", requirements_txt.display());
    run_cmd(
        &config.id,
        "uv",
        &[
            "pip",
            "compile",
            &python_flag,
            "--upgrade",
            "--strip-extras",
            "--generate-hashes",
            "--no-annotate",
            "--no-header",
            &output_flag,
            &requirements_in.path().display().to_string(),
        ],
        None,
    )
    .await?;
    Ok(vec![requirements_txt])
}

pub async fn sync(
    config: &EnvironmentConfig,
    env_path: &Path,
    lock_files_path: &Path,
) -> Result<()> {
    let python_flag = format!("--python={}", venv_python(env_path));
    run_cmd(
        &config.id,
        "uv",
        &[
            "pip",
            "sync",
            &python_flag,
            &lock_files_path.join("requirements.txt").display().to_string(),
        ],
        None,
    )
    .await?;
    Ok(())
}

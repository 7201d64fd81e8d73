//! Git-based file discovery.
//!
//! All discovery goes through the git CLI so the tool behaves identically to
//! what the user sees in their own shell. Paths come back NUL-separated to
//! survive unusual filenames.

use std::path::PathBuf;
use std::process::Stdio;

use tokio::process::Command;

use crate::Result;
use eyre::{WrapErr, bail, eyre};

async fn git_output(args: &[&str], paths: Option<&[PathBuf]>) -> Result<Vec<u8>> {
    let mut cmd = Command::new("git");
    cmd.args(args);
    if let Some(paths) = paths {
        cmd.arg("--");
        cmd.args(paths);
    }
    cmd.stdin(Stdio::null());
    let output = cmd
        .output()
        .await
        .wrap_err_with(|| format!("failed to spawn git {}", args.join(" ")))?;
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        bail!("git {} failed: {}", args.join(" "), stderr.trim());
    }
    Ok(output.stdout)
}

fn nul_split_paths(output: &[u8]) -> Vec<PathBuf> {
    output
        .split(|b| *b == 0 || *b == b'\n')
        .filter(|chunk| !chunk.is_empty())
        .map(|chunk| PathBuf::from(String::from_utf8_lossy(chunk).into_owned()))
        .collect()
}

/// All tracked files in the repository.
pub async fn all_files() -> Result<Vec<PathBuf>> {
    let output = git_output(&["ls-files", "-z"], None).await?;
    Ok(existing(nul_split_paths(&output)))
}

/// Files changed relative to HEAD. Deleted files are excluded so hooks are
/// never handed paths that no longer exist.
pub async fn changed_files() -> Result<Vec<PathBuf>> {
    let output = git_output(
        &["diff", "--diff-filter=ACMR", "--name-only", "-z", "HEAD"],
        None,
    )
    .await?;
    Ok(existing(nul_split_paths(&output)))
}

fn existing(paths: Vec<PathBuf>) -> Vec<PathBuf> {
    paths
        .into_iter()
        .filter(|p| p.symlink_metadata().is_ok())
        .collect()
}

/// Captures the worktree status of a set of paths, for before/after
/// comparison around a mutating hook. An empty path list means the whole
/// repository.
pub async fn status_snapshot(paths: &[PathBuf]) -> Result<Vec<u8>> {
    let pathspec = if paths.is_empty() { None } else { Some(paths) };
    git_output(
        &["status", "--untracked-files=no", "--porcelain=v2", "-z"],
        pathspec,
    )
    .await
}

/// Repository root, used to resolve repository-relative hook paths when
/// drover is invoked from a subdirectory.
pub async fn repo_root() -> Result<PathBuf> {
    let output = git_output(&["rev-parse", "--show-toplevel"], None).await?;
    let root = String::from_utf8_lossy(&output);
    let root = root.trim();
    if root.is_empty() {
        return Err(eyre!("not inside a git repository"));
    }
    Ok(PathBuf::from(root))
}

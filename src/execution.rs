//! Process supervision for a single work unit.
//!
//! Builds the command line and environment, spawns the subprocess, and waits
//! for it while capturing output. Failures here are per-unit data: a
//! non-zero exit or an unspawnable command marks the unit failed and never
//! propagates out of the dispatch loop.

use std::path::Path;

use indexmap::IndexMap;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::config::HookConfig;
use crate::git;
use crate::report::{UnitOutcome, UnitStatus};
use crate::unit::{UnitScope, WorkUnit};

/// Runs one unit to completion (or until the run is cancelled).
///
/// `bin_dir` is the resolved environment's executable directory; when
/// present it is prepended to PATH so the hook's command resolves inside the
/// provisioned environment.
pub async fn execute(
    unit: &WorkUnit,
    bin_dir: Option<&Path>,
    cancel: &CancellationToken,
) -> UnitOutcome {
    // For mutating hooks, snapshot the worktree status of the unit's files so
    // we can report whether the hook changed anything. Outside a git checkout
    // (or if git itself fails) detection is skipped, never the unit.
    let status_prior = if unit.hook.read_only {
        None
    } else {
        git::status_snapshot(unit.scope.files()).await.ok()
    };

    let mut cmd = Command::new(&unit.hook.command);
    cmd.args(&unit.hook.args);
    if let UnitScope::Files(files) = &unit.scope {
        cmd.args(files);
    }
    for (key, value) in env_overrides(&unit.hook, bin_dir, env_path().as_deref()) {
        cmd.env(key, value);
    }
    cmd.stdin(std::process::Stdio::null());
    cmd.stdout(std::process::Stdio::piped());
    cmd.stderr(std::process::Stdio::piped());
    cmd.kill_on_drop(true);

    debug!("[{}] $ {} ({})", unit.hook.id, unit.hook.command, unit.describe_files());

    let mut child = match cmd.spawn() {
        Ok(child) => child,
        Err(err) => {
            return UnitOutcome {
                status: UnitStatus::SpawnFailed { message: format!("{}: {err}", unit.hook.command) },
                stdout: String::new(),
                stderr: String::new(),
            };
        }
    };

    // Drain both pipes concurrently with the wait, or a chatty tool fills
    // the pipe buffer and deadlocks.
    let stdout_task = drain(child.stdout.take());
    let stderr_task = drain(child.stderr.take());

    let status = tokio::select! {
        status = child.wait() => status.ok(),
        _ = cancel.cancelled() => {
            trace!("[{}] killing unit {} on cancellation", unit.hook.id, unit.seq);
            let _ = child.start_kill();
            let _ = child.wait().await;
            None
        }
    };

    let stdout = gather(stdout_task).await;
    let stderr = gather(stderr_task).await;

    let status = match status {
        None => UnitStatus::Cancelled,
        Some(status) if status.success() => {
            let modified = match status_prior {
                Some(prior) => git::status_snapshot(unit.scope.files())
                    .await
                    .is_ok_and(|post| post != prior),
                None => false,
            };
            if modified { UnitStatus::Modified } else { UnitStatus::Ok }
        }
        Some(status) => UnitStatus::Failed { code: status.code() },
    };
    UnitOutcome { status, stdout, stderr }
}

/// The PATH/env_vars overrides applied on top of the inherited environment.
/// PATH gets the environment's bin dir prepended; hook env_vars are applied
/// afterwards but can never touch PATH.
fn env_overrides(
    hook: &HookConfig,
    bin_dir: Option<&Path>,
    current_path: Option<&str>,
) -> IndexMap<String, String> {
    let mut overrides = IndexMap::new();
    if let Some(bin_dir) = bin_dir {
        let path = match current_path {
            Some(current) if !current.is_empty() => {
                format!("{}:{current}", bin_dir.display())
            }
            _ => bin_dir.display().to_string(),
        };
        overrides.insert("PATH".to_string(), path);
    }
    for (key, value) in &hook.env_vars {
        if key == "PATH" {
            warn!("[{}] ignoring PATH in env_vars", hook.id);
            continue;
        }
        overrides.insert(key.clone(), value.clone());
    }
    overrides
}

fn env_path() -> Option<String> {
    std::env::var("PATH").ok()
}

fn drain<R: AsyncRead + Unpin + Send + 'static>(stream: Option<R>) -> JoinHandle<Vec<u8>> {
    tokio::spawn(async move {
        let mut buf = Vec::new();
        if let Some(mut stream) = stream {
            let _ = stream.read_to_end(&mut buf).await;
        }
        buf
    })
}

async fn gather(task: JoinHandle<Vec<u8>>) -> String {
    let buf = task.await.unwrap_or_default();
    String::from_utf8_lossy(&buf).into_owned()
}

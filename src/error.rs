use thiserror::Error;

pub type Result<T> = eyre::Result<T>;

/// Failures that callers need to tell apart from ordinary hook failures.
///
/// A hook command exiting non-zero is not an error in this sense: it is
/// recorded in the run report and only affects the final exit code. The
/// variants here abort a run (or prevent it from starting) and surface with a
/// distinguishing classification.
#[derive(Error, Debug)]
pub enum Error {
    #[error("hook {hook:?} references unknown environment {environment:?}")]
    UnknownEnvironment { hook: String, environment: String },

    #[error("unknown hook id: {0:?}")]
    UnknownHook(String),

    #[error("no hooks configured")]
    NoHooks,

    #[error("[{id}] {reason}")]
    Provision { id: String, reason: String },

    #[error("[{id}] missing or outdated lock files, run `drover upgrade` first")]
    NeedsFreeze { id: String },

    #[error(
        "scheduler invariant violated: pending units remain but none are admissible while no slot is occupied"
    )]
    SchedulerInvariant,
}

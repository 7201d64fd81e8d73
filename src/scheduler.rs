//! The bounded-concurrency dispatch loop.
//!
//! A single coordinating task owns the pending queue and the claim set.
//! Worker tasks run one subprocess each and report back over a completion
//! channel, so admission decisions and claim updates never interleave: the
//! loop admits as many units as slots and conflicts allow, then suspends
//! until any running unit completes, then reclaims and scans again.
//!
//! The loop never aborts early because a unit failed; every scheduled unit
//! runs so the user sees all failures in one pass. Cancellation (ctrl-c, or
//! a fatal provisioning error detected before dispatch) stops admissions,
//! kills running subprocesses, and drains.

use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::Arc;

use indexmap::IndexMap;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::{
    Result,
    claims::FileClaims,
    config::HookConfig,
    env,
    error::Error,
    execution,
    report::{RunReport, UnitStatus},
    select::{self, Target},
    unit::{self, WorkUnit},
};

pub struct Scheduler {
    pending: VecDeque<WorkUnit>,
    claims: FileClaims,
    slots: usize,
    /// Environment id -> executable dir for PATH override (None for system
    /// environments).
    bin_dirs: IndexMap<String, Option<PathBuf>>,
    cancel: CancellationToken,
}

impl Scheduler {
    /// Builds the full pending queue: hooks in declaration order, each
    /// partitioned into units over its candidate files.
    pub fn new(
        hooks: &[Arc<HookConfig>],
        targets: &[Target],
        bin_dirs: IndexMap<String, Option<PathBuf>>,
        slots: usize,
        cancel: CancellationToken,
    ) -> Result<Self> {
        let mut seq = 0;
        let mut pending = VecDeque::new();
        for hook in hooks {
            if env::DROVER_SKIP_HOOKS.contains(&hook.id) {
                warn!("[{}] skipped via DROVER_SKIP_HOOKS", hook.id);
                continue;
            }
            let files = select::filter_hook_targets(hook, targets)?;
            let units = unit::partition(hook, &files, slots, &mut seq);
            if units.is_empty() {
                info!("[{}] skipped: no files to process", hook.id);
            }
            pending.extend(units);
        }
        Ok(Self { pending, claims: FileClaims::default(), slots, bin_dirs, cancel })
    }

    pub fn unit_count(&self) -> usize {
        self.pending.len()
    }

    #[tracing::instrument(level = "info", name = "scheduler.run", skip_all, fields(units = self.pending.len(), slots = self.slots))]
    pub async fn run_to_completion(mut self) -> Result<RunReport> {
        let mut report = RunReport::default();
        let (done_tx, mut done_rx) = mpsc::unbounded_channel();
        let mut running = 0usize;

        loop {
            if self.cancel.is_cancelled() {
                // Shutdown mode: admit nothing further, just drain.
                if running == 0 {
                    if !self.pending.is_empty() {
                        report.mark_aborted();
                    }
                    break;
                }
            } else {
                while running < self.slots {
                    let Some(pos) = self.pending.iter().position(|u| self.claims.admissible(u))
                    else {
                        break;
                    };
                    // VecDeque::remove preserves the order of the rest of
                    // the queue, so blocked units keep their place for the
                    // next scan.
                    let unit = self.pending.remove(pos).unwrap();
                    self.claims.claim(&unit);
                    running += 1;
                    self.spawn_unit(unit, done_tx.clone());
                }

                if running == 0 {
                    if self.pending.is_empty() {
                        break;
                    }
                    // Nothing running, slots free, yet nothing admissible.
                    // Impossible under the conflict rule (every unit is
                    // admissible against an empty claim set); bail out
                    // rather than hang.
                    return Err(Error::SchedulerInvariant.into());
                }
            }

            let Some((unit, outcome)) = done_rx.recv().await else {
                break;
            };
            self.claims.release(unit.seq);
            running -= 1;
            debug!("[{}] unit {} finished: {}", unit.hook.id, unit.seq, outcome.status);
            if outcome.status == UnitStatus::Cancelled {
                report.mark_aborted();
            }
            report.record(unit, outcome);
        }

        debug_assert!(self.claims.is_empty(), "claims outlived the run");
        Ok(report)
    }

    fn spawn_unit(&self, unit: WorkUnit, done_tx: mpsc::UnboundedSender<(WorkUnit, crate::report::UnitOutcome)>) {
        let bin_dir = self.bin_dirs.get(&unit.hook.environment).cloned().flatten();
        let cancel = self.cancel.clone();
        debug!("[{}] unit {} scheduled: {}", unit.hook.id, unit.seq, unit);
        tokio::spawn(async move {
            let outcome = execution::execute(&unit, bin_dir.as_deref(), &cancel).await;
            // The receiver only drops once the loop is done, and the loop
            // only finishes after every running unit reported.
            let _ = done_tx.send((unit, outcome));
        });
    }
}

/// First ctrl-c cancels the run (running hooks are killed, the loop drains);
/// a second one exits immediately.
pub fn watch_for_ctrl_c(cancel: CancellationToken) {
    tokio::spawn(async move {
        if let Err(err) = tokio::signal::ctrl_c().await {
            warn!("failed to watch for ctrl-c: {err}");
            return;
        }
        info!("interrupt received, cancelling running hooks");
        tokio::spawn(async move {
            let _ = tokio::signal::ctrl_c().await;
            std::process::exit(130);
        });
        cancel.cancel();
    });
}

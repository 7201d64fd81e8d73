//! Aggregation of unit outcomes into a final run result.

use std::fmt::Write as _;

use itertools::Itertools;

use crate::unit::WorkUnit;

#[derive(Debug, Clone, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "kebab-case")]
pub enum UnitStatus {
    /// Command exited 0 and left the worktree untouched.
    Ok,
    /// Command exited 0 but modified files. Informational: a formatter doing
    /// its job is not a failure.
    Modified,
    /// Command exited non-zero.
    Failed { code: Option<i32> },
    /// Command could not be spawned at all.
    SpawnFailed { message: String },
    /// Run was aborted while this unit was in flight.
    Cancelled,
}

#[derive(Debug, Clone)]
pub struct UnitOutcome {
    pub status: UnitStatus,
    pub stdout: String,
    pub stderr: String,
}

impl UnitOutcome {
    pub fn succeeded(&self) -> bool {
        matches!(self.status, UnitStatus::Ok | UnitStatus::Modified)
    }
}

#[derive(Debug, Default)]
pub struct RunReport {
    outcomes: Vec<(WorkUnit, UnitOutcome)>,
    /// Set when the run was aborted (provisioning failure, ctrl-c) rather
    /// than running every scheduled unit to completion.
    aborted: bool,
}

impl RunReport {
    pub fn record(&mut self, unit: WorkUnit, outcome: UnitOutcome) {
        self.outcomes.push((unit, outcome));
    }

    pub fn mark_aborted(&mut self) {
        self.aborted = true;
    }

    pub fn aborted(&self) -> bool {
        self.aborted
    }

    /// True iff every unit's command exited 0 and no fatal condition
    /// occurred.
    pub fn success(&self) -> bool {
        !self.aborted && self.outcomes.iter().all(|(_, o)| o.succeeded())
    }

    pub fn outcomes(&self) -> &[(WorkUnit, UnitOutcome)] {
        &self.outcomes
    }

    /// Final human-readable summary. Every failed unit names its hook and
    /// the files (or "whole repository") it ran against.
    pub fn render_summary(&self) -> String {
        let mut out = String::new();
        let failed = self
            .outcomes
            .iter()
            .filter(|(_, o)| !o.succeeded())
            .collect_vec();
        for (unit, outcome) in &failed {
            let _ = writeln!(out, "[{}] {}: {}", unit.hook.id, outcome.status, unit.describe_files());
            for stream in [&outcome.stdout, &outcome.stderr] {
                let trimmed = stream.trim_end();
                if !trimmed.is_empty() {
                    let _ = writeln!(out, "{trimmed}");
                }
            }
        }
        let modified = self
            .outcomes
            .iter()
            .filter(|(_, o)| o.status == UnitStatus::Modified)
            .map(|(u, _)| u.hook.id.as_str())
            .unique()
            .collect_vec();
        if !modified.is_empty() {
            let _ = writeln!(out, "hooks made changes: {}", modified.join(", "));
        }
        if self.aborted {
            let _ = writeln!(out, "run aborted before all units completed");
        } else if failed.is_empty() {
            let _ = writeln!(out, "all hooks passed ({} units)", self.outcomes.len());
        } else {
            let _ = writeln!(
                out,
                "{} of {} units failed",
                failed.len(),
                self.outcomes.len()
            );
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::HookConfig;
    use crate::unit::UnitScope;
    use std::path::PathBuf;
    use std::sync::Arc;

    fn unit(id: &str, seq: usize) -> WorkUnit {
        WorkUnit {
            hook: Arc::new(HookConfig {
                id: id.into(),
                environment: "system".into(),
                command: "true".into(),
                ..Default::default()
            }),
            seq,
            scope: UnitScope::Files(vec![PathBuf::from("a.py")]),
        }
    }

    fn outcome(status: UnitStatus) -> UnitOutcome {
        UnitOutcome { status, stdout: String::new(), stderr: String::new() }
    }

    #[test]
    fn test_success_requires_all_zero_exits() {
        let mut report = RunReport::default();
        report.record(unit("lint", 0), outcome(UnitStatus::Ok));
        report.record(unit("fmt", 1), outcome(UnitStatus::Ok));
        assert!(report.success());

        report.record(unit("mypy", 2), outcome(UnitStatus::Failed { code: Some(1) }));
        assert!(!report.success());
    }

    #[test]
    fn test_modified_counts_as_success() {
        let mut report = RunReport::default();
        report.record(unit("fmt", 0), outcome(UnitStatus::Modified));
        assert!(report.success());
        let summary = report.render_summary();
        assert!(summary.contains("hooks made changes: fmt"), "{summary}");
    }

    #[test]
    fn test_abort_fails_run_even_with_clean_units() {
        let mut report = RunReport::default();
        report.record(unit("lint", 0), outcome(UnitStatus::Ok));
        report.mark_aborted();
        assert!(!report.success());
    }

    #[test]
    fn test_summary_names_hook_and_files() {
        let mut report = RunReport::default();
        report.record(
            unit("ruff", 0),
            outcome(UnitStatus::Failed { code: Some(2) }),
        );
        let summary = report.render_summary();
        assert!(summary.contains("[ruff]"), "{summary}");
        assert!(summary.contains("a.py"), "{summary}");
    }

    #[test]
    fn test_spawn_failure_is_a_unit_failure() {
        let mut report = RunReport::default();
        report.record(
            unit("clippy", 0),
            outcome(UnitStatus::SpawnFailed { message: "command not found".into() }),
        );
        assert!(!report.success());
    }
}

//! Work units: the schedulable pieces of a hook invocation.
//!
//! A hook's candidate files are split into units so a single slow tool can
//! spread across execution slots. Splitting is pure and deterministic: the
//! same hook order, file lists, and slot count always produce the same units.

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use crate::config::HookConfig;

/// What a unit runs against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UnitScope {
    /// An ordered, non-empty subset of the hook's candidate files, appended
    /// to the command line.
    Files(Vec<PathBuf>),
    /// The whole repository; no file arguments are passed. Used for
    /// non-parameterized hooks, which discover their own inputs.
    Repository,
}

impl UnitScope {
    pub fn files(&self) -> &[PathBuf] {
        match self {
            UnitScope::Files(files) => files,
            UnitScope::Repository => &[],
        }
    }
}

#[derive(Debug, Clone)]
pub struct WorkUnit {
    pub hook: Arc<HookConfig>,
    /// Monotonic per-run sequence number; the deterministic tie-break.
    pub seq: usize,
    pub scope: UnitScope,
}

impl fmt::Display for WorkUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.scope {
            UnitScope::Repository => write!(f, "{} (whole repository)", self.hook.id),
            UnitScope::Files(files) => {
                write!(f, "{} ({} file{})", self.hook.id, files.len(), if files.len() == 1 { "" } else { "s" })
            }
        }
    }
}

impl WorkUnit {
    pub fn describe_files(&self) -> String {
        match &self.scope {
            UnitScope::Repository => "whole repository".to_string(),
            UnitScope::Files(files) => files
                .iter()
                .map(|f| f.display().to_string())
                .collect::<Vec<_>>()
                .join(", "),
        }
    }
}

/// Splits a hook's candidate files into work units.
///
/// - Non-parameterized hooks always get exactly one whole-repository unit,
///   even with zero candidate files.
/// - An empty candidate list otherwise produces no units (the hook is
///   skipped for this run).
/// - Otherwise files are split into `min(slots, files.len())` chunks. The
///   chunk size is `files.len().div_ceil(chunks)`; successive full chunks
///   are taken in original file order and the final chunk holds the
///   remainder, so chunk counts never exceed the slot count and sizes differ
///   by at most the remainder of the division.
///
/// `seq` is the run-wide unit counter, advanced for every emitted unit.
pub fn partition(
    hook: &Arc<HookConfig>,
    candidate_files: &[PathBuf],
    slots: usize,
    seq: &mut usize,
) -> Vec<WorkUnit> {
    let mut next = |scope: UnitScope| {
        let unit = WorkUnit { hook: hook.clone(), seq: *seq, scope };
        *seq += 1;
        unit
    };

    if !hook.parameterize {
        return vec![next(UnitScope::Repository)];
    }
    if candidate_files.is_empty() {
        return vec![];
    }

    let chunks = slots.clamp(1, candidate_files.len());
    let chunk_size = candidate_files.len().div_ceil(chunks);
    candidate_files
        .chunks(chunk_size)
        .map(|chunk| next(UnitScope::Files(chunk.to_vec())))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    fn hook(parameterize: bool) -> Arc<HookConfig> {
        Arc::new(HookConfig {
            id: "fmt".into(),
            environment: "system".into(),
            command: "fmt".into(),
            parameterize,
            ..Default::default()
        })
    }

    fn paths(n: usize) -> Vec<PathBuf> {
        (0..n).map(|i| PathBuf::from(format!("file{i:03}.py"))).collect()
    }

    #[test]
    fn test_disjoint_union_equals_candidates() {
        let files = paths(17);
        let mut seq = 0;
        let units = partition(&hook(true), &files, 4, &mut seq);
        assert_eq!(units.len(), 4);

        let mut seen = BTreeSet::new();
        for unit in &units {
            for file in unit.scope.files() {
                assert!(seen.insert(file.clone()), "{file:?} assigned twice");
            }
        }
        assert_eq!(seen, files.iter().cloned().collect::<BTreeSet<_>>());
    }

    #[test]
    fn test_remainder_goes_to_final_chunk() {
        // 10 files over 4 slots: ceil(10/4) = 3, so 3+3+3+1.
        let files = paths(10);
        let mut seq = 0;
        let units = partition(&hook(true), &files, 4, &mut seq);
        let sizes: Vec<usize> = units.iter().map(|u| u.scope.files().len()).collect();
        assert_eq!(sizes, vec![3, 3, 3, 1]);
        // Ordering within and across chunks follows the input.
        assert_eq!(units[0].scope.files()[0], PathBuf::from("file000.py"));
        assert_eq!(units[3].scope.files()[0], PathBuf::from("file009.py"));
    }

    #[test]
    fn test_more_slots_than_files() {
        let files = paths(3);
        let mut seq = 0;
        let units = partition(&hook(true), &files, 8, &mut seq);
        assert_eq!(units.len(), 3);
        assert!(units.iter().all(|u| u.scope.files().len() == 1));
    }

    #[test]
    fn test_non_parameterized_single_repository_unit() {
        let files = paths(5);
        let mut seq = 0;
        let units = partition(&hook(false), &files, 4, &mut seq);
        assert_eq!(units.len(), 1);
        assert_eq!(units[0].scope, UnitScope::Repository);

        // Still one unit with zero candidates.
        let units = partition(&hook(false), &[], 4, &mut seq);
        assert_eq!(units.len(), 1);
        assert_eq!(units[0].scope, UnitScope::Repository);
    }

    #[test]
    fn test_empty_candidates_yield_no_units() {
        let mut seq = 0;
        assert!(partition(&hook(true), &[], 4, &mut seq).is_empty());
        assert_eq!(seq, 0);
    }

    #[test]
    fn test_sequence_numbers_monotonic_across_hooks() {
        let mut seq = 0;
        let a = partition(&hook(true), &paths(4), 2, &mut seq);
        let b = partition(&hook(true), &paths(2), 2, &mut seq);
        let seqs: Vec<usize> = a.iter().chain(b.iter()).map(|u| u.seq).collect();
        assert_eq!(seqs, vec![0, 1, 2, 3]);
    }

    #[test]
    fn test_partition_is_deterministic() {
        let files = paths(11);
        let mut seq_a = 0;
        let mut seq_b = 0;
        let a = partition(&hook(true), &files, 3, &mut seq_a);
        let b = partition(&hook(true), &files, 3, &mut seq_b);
        for (ua, ub) in a.iter().zip(b.iter()) {
            assert_eq!(ua.scope, ub.scope);
            assert_eq!(ua.seq, ub.seq);
        }
    }
}

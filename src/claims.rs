//! Tracks which files are claimed by currently running units and decides
//! whether a pending unit may start.
//!
//! Two units conflict iff their file sets intersect (a whole-repository unit
//! intersects everything) and at least one of the owning hooks can mutate
//! files. Read-only units overlap freely with each other. This is the only
//! mutual-exclusion mechanism in the system; no OS-level file locking is
//! done, so correctness rests on hooks' `read_only` declarations being
//! accurate.
//!
//! The dispatch loop owns the claim set exclusively, so no internal locking
//! is needed: admission decisions and claim updates are serialized by
//! construction.

use std::collections::{HashMap, HashSet};
use std::path::PathBuf;

use crate::unit::{UnitScope, WorkUnit};

#[derive(Debug)]
struct Claim {
    read_only: bool,
    /// None = whole repository
    files: Option<HashSet<PathBuf>>,
}

#[derive(Debug, Default)]
pub struct FileClaims {
    claims: HashMap<usize, Claim>,
}

impl FileClaims {
    /// Whether `unit` conflicts with no running unit.
    pub fn admissible(&self, unit: &WorkUnit) -> bool {
        self.claims.values().all(|claim| !conflicts(unit, claim))
    }

    /// Registers a unit's files as in use. Must only be called after an
    /// `admissible` check against the same state.
    pub fn claim(&mut self, unit: &WorkUnit) {
        let files = match &unit.scope {
            UnitScope::Repository => None,
            UnitScope::Files(files) => Some(files.iter().cloned().collect()),
        };
        let prev = self.claims.insert(
            unit.seq,
            Claim { read_only: unit.hook.read_only, files },
        );
        debug_assert!(prev.is_none(), "unit {} claimed twice", unit.seq);
    }

    pub fn release(&mut self, seq: usize) {
        let prev = self.claims.remove(&seq);
        debug_assert!(prev.is_some(), "released unit {seq} holds no claim");
    }

    pub fn is_empty(&self) -> bool {
        self.claims.is_empty()
    }
}

fn conflicts(unit: &WorkUnit, claim: &Claim) -> bool {
    if unit.hook.read_only && claim.read_only {
        return false;
    }
    match (&unit.scope, &claim.files) {
        // A whole-repository scope on either side overlaps everything.
        (UnitScope::Repository, _) | (_, None) => true,
        (UnitScope::Files(files), Some(claimed)) => {
            files.iter().any(|f| claimed.contains(f))
        }
    }
}

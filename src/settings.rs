use std::{
    num::NonZero,
    sync::Mutex,
    thread,
};

use crate::env;

/// Process-wide knobs resolved from CLI flags and environment variables.
///
/// CLI overrides are applied once at startup via the setters, before any
/// scheduling starts.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Number of concurrent execution slots.
    pub jobs: NonZero<usize>,
}

static JOBS_OVERRIDE: Mutex<Option<NonZero<usize>>> = Mutex::new(None);

impl Settings {
    pub fn get() -> Self {
        let jobs = (*JOBS_OVERRIDE.lock().unwrap())
            .or(*env::DROVER_JOBS)
            .unwrap_or_else(default_jobs);
        Self { jobs }
    }

    pub fn set_jobs(jobs: NonZero<usize>) {
        *JOBS_OVERRIDE.lock().unwrap() = Some(jobs);
    }
}

fn default_jobs() -> NonZero<usize> {
    thread::available_parallelism().unwrap_or(NonZero::new(2).unwrap())
}

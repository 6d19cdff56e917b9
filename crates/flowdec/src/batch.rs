//! Concurrent decompilation of independent functions.

use rayon::prelude::*;
use tracing::{debug, warn};

use flowdec_dis::Disassembler;

use crate::config::DecompilerConfig;
use crate::decompiler::{Decompiler, RunState};
use crate::Result;

/// One function to decompile.
pub struct Job {
    /// Label used in logs and outcomes.
    pub name: String,
    pub dis: Box<dyn Disassembler>,
    pub entry: u64,
}

impl Job {
    pub fn new(name: impl Into<String>, dis: impl Disassembler + 'static, entry: u64) -> Self {
        Self {
            name: name.into(),
            dis: Box::new(dis),
            entry,
        }
    }
}

/// Result of one [`Job`].
pub struct JobOutcome {
    pub name: String,
    pub result: Result<RunState>,
}

/// Run every job to completion on the current rayon pool.
///
/// Each job gets its own run state and version counter. Outcomes are returned
/// in job order; one job failing does not affect the others.
pub fn decompile_all(jobs: Vec<Job>, config: DecompilerConfig) -> Vec<JobOutcome> {
    let count = jobs.len();
    let outcomes: Vec<JobOutcome> = jobs
        .into_par_iter()
        .map(|job| {
            let mut decompiler = Decompiler::from_boxed(job.dis, job.entry).with_config(config);
            let result = decompiler.run_to_completion().map(|_| ());
            if let Err(err) = &result {
                warn!(job = %job.name, error = %err, "decompilation failed");
            }
            JobOutcome {
                name: job.name,
                result: result.map(|()| decompiler.into_state()),
            }
        })
        .collect();

    let failed = outcomes.iter().filter(|o| o.result.is_err()).count();
    debug!(jobs = count, failed, "batch complete");
    outcomes
}

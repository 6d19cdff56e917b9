//! Command implementations.

use std::path::{Path, PathBuf};

use flowdec::{Decompiler, Job, TextDisassembler, decompile_all};
use tracing::{error, info};

use crate::cli::{Cli, Commands, EXIT_FAILURE, EXIT_SUCCESS, RunArgs};

/// Dispatch CLI command to the appropriate handler.
pub fn run_command(cli: &Cli) -> i32 {
    match &cli.command {
        Commands::Dump {
            input,
            until,
            entry,
            options,
        } => cmd_dump(input, until.as_deref(), *entry, *options),
        Commands::Batch {
            inputs,
            jobs,
            options,
        } => cmd_batch(inputs, *jobs, *options),
    }
}

/// Handle the `dump` command.
fn cmd_dump(input: &Path, until: Option<&str>, entry: u64, options: RunArgs) -> i32 {
    info!(input = %input.display(), "decompiling");

    let dis = match TextDisassembler::from_file(input) {
        Ok(dis) => dis,
        Err(err) => {
            error!(error = %err, "failed to load input");
            return EXIT_FAILURE;
        }
    };

    let mut decompiler = Decompiler::new(dis, entry).with_config(options.config());
    let result = match until {
        Some(step) => decompiler.run_until(step).map(|_| ()),
        None => decompiler.run_to_completion().map(|_| ()),
    };
    if let Err(err) = result {
        error!(error = %err, "decompilation failed");
        // Whatever was built before the failure is still worth showing.
        if let Some(flow) = &decompiler.state().flow {
            print!("{flow}");
        }
        return EXIT_FAILURE;
    }

    let state = decompiler.state();
    match state.flow() {
        Ok(flow) => {
            print!("{flow}");
            info!(steps = ?state.completed, blocks = flow.len(), "done");
            EXIT_SUCCESS
        }
        Err(err) => {
            error!(error = %err, "nothing to dump");
            EXIT_FAILURE
        }
    }
}

/// Handle the `batch` command.
fn cmd_batch(inputs: &[PathBuf], jobs: usize, options: RunArgs) -> i32 {
    let mut work = Vec::with_capacity(inputs.len());
    for input in inputs {
        match TextDisassembler::from_file(input) {
            Ok(dis) => work.push(Job::new(input.display().to_string(), dis, 0)),
            Err(err) => {
                error!(input = %input.display(), error = %err, "failed to load input");
                return EXIT_FAILURE;
            }
        }
    }

    let threads = if jobs == 0 { num_cpus::get() } else { jobs };
    let pool = match rayon::ThreadPoolBuilder::new().num_threads(threads).build() {
        Ok(pool) => pool,
        Err(err) => {
            error!(error = %err, "failed to start worker pool");
            return EXIT_FAILURE;
        }
    };
    info!(files = work.len(), threads, "decompiling batch");

    let config = options.config();
    let outcomes = pool.install(|| decompile_all(work, config));

    let mut failed = 0;
    for outcome in &outcomes {
        match &outcome.result {
            Ok(state) => {
                let blocks = state.flow().map_or(0, flowdec::FlowGraph::len);
                let phis = state.ssa_stats.map_or(0, |s| s.phis);
                println!(
                    "{}: ok blocks={blocks} phis={phis} pruned={}",
                    outcome.name,
                    state.pruned_phis.unwrap_or(0)
                );
            }
            Err(err) => {
                failed += 1;
                println!("{}: error {err}", outcome.name);
            }
        }
    }

    if failed == 0 {
        EXIT_SUCCESS
    } else {
        error!(failed, total = outcomes.len(), "batch had failures");
        EXIT_FAILURE
    }
}

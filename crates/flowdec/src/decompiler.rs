//! Staged decompilation driver.
//!
//! A [`Decompiler`] owns a fixed, ordered list of named steps ([`Pass`]es)
//! and one [`RunState`] they mutate in turn. The run can be advanced to any
//! named step and inspected there, which is how individual steps are tested.
//!
//! Built-in steps, in order:
//!
//! | Step           | Effect                                               |
//! |----------------|------------------------------------------------------|
//! | `basic_blocks` | disassemble from the entry and build the flow graph  |
//! | `ssa`          | rename definitions and uses, insert merge placeholders |
//! | `pruned`       | drop unused merge placeholders                       |
//! | `finalize`     | re-check graph invariants and record run metrics     |

use std::time::Instant;

use tracing::{debug, trace_span};

use flowdec_cfg::{FlowGraph, FlowGraphBuilder};
use flowdec_dis::Disassembler;
use flowdec_ssa::{SsaBuilder, SsaContext, SsaStats, prune_phis};

use crate::config::DecompilerConfig;
use crate::{Error, Result};

pub const STEP_BASIC_BLOCKS: &str = "basic_blocks";
pub const STEP_SSA: &str = "ssa";
pub const STEP_PRUNED: &str = "pruned";
pub const STEP_FINALIZE: &str = "finalize";

/// One named step of the pipeline.
pub trait Pass: Send + Sync {
    fn name(&self) -> &'static str;

    /// Apply the step. On error the state must be left as before the call.
    fn run(&self, state: &mut RunState) -> Result<()>;
}

/// Mutable state threaded through the steps of one run.
#[derive(Debug)]
pub struct RunState {
    /// Function entry address.
    pub entry: u64,
    pub config: DecompilerConfig,
    /// Set by `basic_blocks`.
    pub flow: Option<FlowGraph>,
    /// Version counter for this run only.
    pub ssa: SsaContext,
    /// Set by `ssa`.
    pub ssa_stats: Option<SsaStats>,
    /// Merge placeholders removed by `pruned`.
    pub pruned_phis: Option<usize>,
    /// Names of the steps executed so far, in order.
    pub completed: Vec<&'static str>,
    /// Index of the next step to execute.
    pub next_step: usize,
}

impl RunState {
    pub const fn new(entry: u64, config: DecompilerConfig) -> Self {
        Self {
            entry,
            config,
            flow: None,
            ssa: SsaContext::new(),
            ssa_stats: None,
            pruned_phis: None,
            completed: Vec::new(),
            next_step: 0,
        }
    }

    /// The flow graph.
    ///
    /// # Errors
    /// [`Error::StepNotReached`] before `basic_blocks` has run.
    pub fn flow(&self) -> Result<&FlowGraph> {
        self.flow
            .as_ref()
            .ok_or(Error::StepNotReached(STEP_BASIC_BLOCKS))
    }

    pub fn flow_mut(&mut self) -> Result<&mut FlowGraph> {
        self.flow
            .as_mut()
            .ok_or(Error::StepNotReached(STEP_BASIC_BLOCKS))
    }

    /// Check if the named step has executed.
    pub fn has_run(&self, step: &str) -> bool {
        self.completed.iter().any(|&done| done == step)
    }
}

/// Disassembles the function and builds its flow graph.
pub struct BasicBlocksPass {
    dis: Box<dyn Disassembler>,
}

impl BasicBlocksPass {
    pub fn new(dis: Box<dyn Disassembler>) -> Self {
        Self { dis }
    }
}

impl Pass for BasicBlocksPass {
    fn name(&self) -> &'static str {
        STEP_BASIC_BLOCKS
    }

    fn run(&self, state: &mut RunState) -> Result<()> {
        let items = self.dis.disassemble(state.entry)?;
        debug!(backend = self.dis.name(), items = items.len(), "disassembled");
        let graph = FlowGraphBuilder::new()
            .with_unresolved_targets(state.config.unresolved_targets)
            .build(items)?;
        state.flow = Some(graph);
        Ok(())
    }
}

/// Rewrites the flow graph into SSA form.
pub struct SsaPass;

impl Pass for SsaPass {
    fn name(&self) -> &'static str {
        STEP_SSA
    }

    fn run(&self, state: &mut RunState) -> Result<()> {
        let graph = state
            .flow
            .as_mut()
            .ok_or(Error::StepNotReached(STEP_BASIC_BLOCKS))?;
        let stats = SsaBuilder::build(graph, &mut state.ssa)?;
        state.ssa_stats = Some(stats);
        Ok(())
    }
}

/// Removes merge placeholders nothing reads, unless disabled in the config.
pub struct PrunePass;

impl Pass for PrunePass {
    fn name(&self) -> &'static str {
        STEP_PRUNED
    }

    fn run(&self, state: &mut RunState) -> Result<()> {
        if state.ssa_stats.is_none() {
            return Err(Error::StepNotReached(STEP_SSA));
        }
        let prune = state.config.prune_phis;
        let graph = state.flow_mut()?;
        let removed = if prune { prune_phis(graph) } else { 0 };
        state.pruned_phis = Some(removed);
        Ok(())
    }
}

/// Re-validates the finished graph and records run metrics.
pub struct FinalizePass;

impl Pass for FinalizePass {
    fn name(&self) -> &'static str {
        STEP_FINALIZE
    }

    fn run(&self, state: &mut RunState) -> Result<()> {
        let graph = state.flow()?;
        graph.validate()?;
        let phis: usize = graph.blocks().iter().map(|b| b.phis.len()).sum();
        crate::metrics::record_run(graph.len(), phis);
        debug!(
            entry = format_args!("0x{:x}", state.entry),
            blocks = graph.len(),
            phis,
            "decompilation finalized"
        );
        Ok(())
    }
}

/// Staged decompiler for one function.
///
/// # Example
///
/// ```ignore
/// use flowdec::{Decompiler, TextDisassembler};
///
/// let dis = TextDisassembler::new("a = 1;\nreturn a;")?;
/// let mut decompiler = Decompiler::new(dis, 0);
/// let state = decompiler.run_until("basic_blocks")?;
/// assert_eq!(state.flow()?.len(), 1);
/// ```
pub struct Decompiler {
    passes: Vec<Box<dyn Pass>>,
    state: RunState,
    failed: Option<&'static str>,
}

impl Decompiler {
    /// Driver with the built-in steps over `dis`, starting at `entry`.
    pub fn new(dis: impl Disassembler + 'static, entry: u64) -> Self {
        Self::from_boxed(Box::new(dis), entry)
    }

    pub fn from_boxed(dis: Box<dyn Disassembler>, entry: u64) -> Self {
        Self {
            passes: vec![
                Box::new(BasicBlocksPass::new(dis)),
                Box::new(SsaPass),
                Box::new(PrunePass),
                Box::new(FinalizePass),
            ],
            state: RunState::new(entry, DecompilerConfig::default()),
            failed: None,
        }
    }

    #[must_use]
    pub fn with_config(mut self, config: DecompilerConfig) -> Self {
        self.state.config = config;
        self
    }

    /// Insert an extra step just before `finalize`. Only allowed before the
    /// first step runs; the step order is fixed from then on.
    ///
    /// # Errors
    /// [`Error::PipelineStarted`] once any step has run;
    /// [`Error::DuplicateStep`] if a step with the same name exists.
    pub fn with_pass(mut self, pass: impl Pass + 'static) -> Result<Self> {
        let name = pass.name();
        if self.state.next_step > 0 || self.failed.is_some() {
            return Err(Error::PipelineStarted(name.to_string()));
        }
        if self.passes.iter().any(|p| p.name() == name) {
            return Err(Error::DuplicateStep(name.to_string()));
        }
        let at = self.passes.len() - 1;
        self.passes.insert(at, Box::new(pass));
        Ok(self)
    }

    /// Step names in execution order.
    pub fn steps(&self) -> Vec<&'static str> {
        self.passes.iter().map(|p| p.name()).collect()
    }

    /// Name of the step the next `run_*` call starts with.
    pub fn next_step(&self) -> Option<&'static str> {
        self.passes.get(self.state.next_step).map(|p| p.name())
    }

    pub fn is_finished(&self) -> bool {
        self.state.next_step >= self.passes.len()
    }

    pub const fn state(&self) -> &RunState {
        &self.state
    }

    pub fn into_state(self) -> RunState {
        self.state
    }

    /// Execute every remaining step.
    pub fn run_to_completion(&mut self) -> Result<&RunState> {
        self.check_aborted()?;
        while self.state.next_step < self.passes.len() {
            self.run_step(self.state.next_step)?;
        }
        Ok(&self.state)
    }

    /// Execute steps up to and including `step`. Does nothing if `step`
    /// already ran.
    ///
    /// # Errors
    /// [`Error::UnknownStep`] if no step has that name.
    pub fn run_until(&mut self, step: &str) -> Result<&RunState> {
        self.check_aborted()?;
        let target = self
            .passes
            .iter()
            .position(|p| p.name() == step)
            .ok_or_else(|| Error::UnknownStep(step.to_string()))?;
        while self.state.next_step <= target {
            self.run_step(self.state.next_step)?;
        }
        Ok(&self.state)
    }

    fn check_aborted(&self) -> Result<()> {
        match self.failed {
            Some(step) => Err(Error::Aborted { step }),
            None => Ok(()),
        }
    }

    fn run_step(&mut self, index: usize) -> Result<()> {
        let pass = &self.passes[index];
        let name = pass.name();
        let _span = trace_span!("step", name).entered();

        if index == 0 {
            self.state.ssa.reset();
        }

        let start = Instant::now();
        if let Err(err) = pass.run(&mut self.state) {
            self.failed = Some(name);
            return Err(Error::StepFailed {
                step: name,
                source: Box::new(err),
            });
        }
        let elapsed = start.elapsed().as_secs_f64();
        crate::metrics::record_step(name, elapsed);

        self.state.completed.push(name);
        self.state.next_step += 1;
        debug!(step = name, elapsed, "step complete");
        Ok(())
    }
}

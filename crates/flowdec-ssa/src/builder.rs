//! Dominance-based SSA construction.
//!
//! 1. **Phi placement**: for each variable, merge placeholders go on the
//!    iterated dominance frontier of the blocks that define it.
//! 2. **Renaming**: a preorder walk of the dominator tree keeps a stack of
//!    live versions per variable. Each definition (placeholders first) pushes
//!    a fresh version from the [`SsaContext`]; uses read the top of the stack;
//!    a block's pushes are popped once its dominator subtree is done.
//!
//! Blocks unreachable from the entry are left untouched.

use rustc_hash::FxHashMap;
use tracing::{debug, trace_span};

use flowdec_cfg::{BlockId, DominatorTree, FlowGraph, Phi, dominance_frontiers};
use flowdec_ir::Var;

use crate::context::SsaContext;
use crate::{Result, SsaError};

/// Counts from one SSA construction.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub struct SsaStats {
    /// Instruction definitions versioned.
    pub definitions: usize,
    /// Merge placeholders inserted.
    pub phis: usize,
    /// Uses, placeholder operands included, bound to a reaching definition.
    pub renamed_uses: usize,
}

/// Rewrites a flow graph into SSA form.
pub struct SsaBuilder;

impl SsaBuilder {
    /// Place merge placeholders and version every definition and use in the
    /// blocks reachable from the entry.
    ///
    /// # Errors
    /// [`SsaError::MalformedGraph`] if the graph's edges are inconsistent;
    /// [`SsaError::AlreadyInSsa`] if the graph was already rewritten;
    /// [`SsaError::VersionsExhausted`] if `ctx` cannot issue a version for
    /// every definition. The graph is left untouched on error.
    pub fn build(graph: &mut FlowGraph, ctx: &mut SsaContext) -> Result<SsaStats> {
        graph.validate()?;
        if is_in_ssa(graph) {
            return Err(SsaError::AlreadyInSsa);
        }

        let tree = {
            let _span = trace_span!("dominators").entered();
            DominatorTree::compute(graph)
        };

        let planned = {
            let _span = trace_span!("place_phis").entered();
            let frontiers = dominance_frontiers(graph, &tree);
            plan_phis(graph, &tree, &frontiers)
        };

        let needed = planned.len() + count_definitions(graph, &tree);
        let remaining = usize::try_from(ctx.remaining()).unwrap_or(usize::MAX);
        if needed > remaining {
            debug!(needed, remaining, "not enough versions left");
            return Err(SsaError::VersionsExhausted);
        }

        let phis = planned.len();
        for (id, phi) in planned {
            graph.block_mut(id).phis.push(phi);
        }

        let mut renamer = Renamer {
            ctx,
            stacks: FxHashMap::default(),
            stats: SsaStats {
                phis,
                ..SsaStats::default()
            },
        };
        {
            let _span = trace_span!("rename").entered();
            renamer.rename(graph, &tree)?;
        }

        let stats = renamer.stats;
        debug!(
            definitions = stats.definitions,
            phis = stats.phis,
            renamed_uses = stats.renamed_uses,
            "SSA built"
        );
        Ok(stats)
    }
}

fn is_in_ssa(graph: &FlowGraph) -> bool {
    graph.blocks().iter().any(|block| {
        !block.phis.is_empty()
            || block
                .instructions
                .iter()
                .any(|instr| instr.defs().iter().any(|var| var.is_versioned()))
    })
}

fn count_definitions(graph: &FlowGraph, tree: &DominatorTree) -> usize {
    graph
        .blocks()
        .iter()
        .enumerate()
        .filter(|&(index, _)| tree.is_reachable(BlockId::new(index)))
        .flat_map(|(_, block)| &block.instructions)
        .map(|instr| instr.defs().len())
        .sum()
}

/// Merge placeholders to insert, in placement order.
fn plan_phis(
    graph: &FlowGraph,
    tree: &DominatorTree,
    frontiers: &[Vec<BlockId>],
) -> Vec<(BlockId, Phi)> {
    // Variables in order of first definition, with their defining blocks.
    let mut order: Vec<String> = Vec::new();
    let mut def_blocks: FxHashMap<String, Vec<BlockId>> = FxHashMap::default();
    for (index, block) in graph.blocks().iter().enumerate() {
        let id = BlockId::new(index);
        if !tree.is_reachable(id) {
            continue;
        }
        for instr in &block.instructions {
            for var in instr.defs() {
                let blocks = def_blocks.entry(var.name.clone()).or_insert_with(|| {
                    order.push(var.name.clone());
                    Vec::new()
                });
                if blocks.last() != Some(&id) {
                    blocks.push(id);
                }
            }
        }
    }

    let n = graph.len();
    let entry = graph.entry();
    let mut placed = Vec::new();

    for name in &order {
        let mut has_phi = vec![false; n];
        let mut queued = vec![false; n];
        let mut worklist = def_blocks[name].clone();
        for id in &worklist {
            queued[id.index()] = true;
        }

        while let Some(id) = worklist.pop() {
            for &frontier in &frontiers[id.index()] {
                if has_phi[frontier.index()] {
                    continue;
                }
                has_phi[frontier.index()] = true;

                let entry_operand = (frontier == entry).then_some(None);
                let preds = graph.block(frontier).jump_from.iter().copied().map(Some);
                let phi = Phi::new(name, entry_operand.into_iter().chain(preds));
                placed.push((frontier, phi));

                if !queued[frontier.index()] {
                    queued[frontier.index()] = true;
                    worklist.push(frontier);
                }
            }
        }
    }
    placed
}

enum Visit {
    Enter(BlockId),
    /// Pop the versions pushed while in the block.
    Exit(Vec<String>),
}

struct Renamer<'a> {
    ctx: &'a mut SsaContext,
    stacks: FxHashMap<String, Vec<u32>>,
    stats: SsaStats,
}

impl Renamer<'_> {
    fn rename(&mut self, graph: &mut FlowGraph, tree: &DominatorTree) -> Result<()> {
        let mut visits = vec![Visit::Enter(tree.entry())];
        while let Some(visit) = visits.pop() {
            match visit {
                Visit::Enter(id) => {
                    let pushed = self.rename_block(graph, id)?;
                    visits.push(Visit::Exit(pushed));
                    visits.extend(tree.children(id).iter().rev().map(|&c| Visit::Enter(c)));
                }
                Visit::Exit(pushed) => {
                    for name in pushed {
                        if let Some(stack) = self.stacks.get_mut(&name) {
                            stack.pop();
                        }
                    }
                }
            }
        }
        Ok(())
    }

    fn rename_block(&mut self, graph: &mut FlowGraph, id: BlockId) -> Result<Vec<String>> {
        let mut pushed = Vec::new();
        let block = graph.block_mut(id);

        for phi in &mut block.phis {
            self.define(&mut phi.var, &mut pushed)?;
        }

        let mut definitions = 0;
        for instr in &mut block.instructions {
            for stmt in &mut instr.statements {
                for var in stmt.uses_mut() {
                    self.bind_use(var);
                }
                if let Some(var) = stmt.def_mut() {
                    self.define(var, &mut pushed)?;
                    definitions += 1;
                }
            }
            for var in instr.terminator.uses_mut() {
                self.bind_use(var);
            }
        }
        self.stats.definitions += definitions;

        let succs = block.jump_to.clone();
        for succ in succs {
            for phi in &mut graph.block_mut(succ).phis {
                let name = &phi.var.name;
                let reaching = self.top(name);
                if let Some(op) = phi.operands.iter_mut().find(|op| op.pred == Some(id)) {
                    op.var.version = reaching;
                    if reaching.is_some() {
                        self.stats.renamed_uses += 1;
                    }
                }
            }
        }
        Ok(pushed)
    }

    fn top(&self, name: &str) -> Option<u32> {
        self.stacks.get(name).and_then(|stack| stack.last()).copied()
    }

    fn define(&mut self, var: &mut Var, pushed: &mut Vec<String>) -> Result<()> {
        let version = self.ctx.next_id()?;
        var.version = Some(version);
        self.stacks.entry(var.name.clone()).or_default().push(version);
        pushed.push(var.name.clone());
        Ok(())
    }

    /// Tag a use with its reaching version; with none it stays a live-in.
    fn bind_use(&mut self, var: &mut Var) {
        var.version = self.top(&var.name);
        if var.version.is_some() {
            self.stats.renamed_uses += 1;
        }
    }
}

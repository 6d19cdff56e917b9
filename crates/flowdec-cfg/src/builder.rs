//! Flow graph construction from an ordered instruction sequence.

use rustc_hash::FxHashMap;
use tracing::{debug, trace_span, warn};

use flowdec_ir::{Flow, Instr};

use crate::block::{Block, BlockId};
use crate::graph::FlowGraph;
use crate::{CfgError, Result};

/// What to do with a jump whose target has no instruction in the function.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub enum UnresolvedTargets {
    /// Fail the build with [`CfgError::UnresolvedTarget`].
    #[default]
    Error,
    /// Drop the edge and list the jump in [`FlowGraph::unresolved`].
    Record,
}

/// Partitions instruction items into blocks and classifies their edges.
#[derive(Clone, Copy, Debug, Default)]
pub struct FlowGraphBuilder {
    unresolved: UnresolvedTargets,
}

/// A jump item and the position of its target, if the target exists.
struct Jump {
    from: usize,
    ea: u64,
    target_ea: u64,
    target: Option<usize>,
}

impl FlowGraphBuilder {
    pub const fn new() -> Self {
        Self {
            unresolved: UnresolvedTargets::Error,
        }
    }

    #[must_use]
    pub const fn with_unresolved_targets(mut self, policy: UnresolvedTargets) -> Self {
        self.unresolved = policy;
        self
    }

    /// Build the flow graph of one function.
    ///
    /// The first item is the function entry. Blocks start at the entry, at
    /// every jump target and after every jump, conditional jump or return.
    pub fn build(&self, mut instrs: Vec<Instr>) -> Result<FlowGraph> {
        if instrs.is_empty() {
            return Err(CfgError::EmptyFunction);
        }
        let entry_ea = instrs[0].ea;
        instrs.sort_by_key(|instr| instr.ea);
        if instrs[0].ea != entry_ea {
            return Err(CfgError::EntryNotFirst {
                entry: entry_ea,
                lowest: instrs[0].ea,
            });
        }

        let positions = {
            let _span = trace_span!("index_addresses").entered();
            index_addresses(&instrs)?
        };

        let (leaders, jumps) = {
            let _span = trace_span!("find_leaders").entered();
            self.find_leaders(&instrs, &positions)?
        };

        let (mut graph, block_of) = {
            let _span = trace_span!("partition").entered();
            partition(instrs, &leaders)?
        };

        {
            let _span = trace_span!("link_blocks").entered();
            link_blocks(&mut graph, &block_of, &jumps);
        }

        for jump in jumps.iter().filter(|jump| jump.target.is_none()) {
            graph.record_unresolved(jump.ea, jump.target_ea);
        }

        let edges: usize = graph.blocks().iter().map(|b| b.jump_to.len()).sum();
        debug!(
            blocks = graph.len(),
            edges,
            unresolved = graph.unresolved().len(),
            "flow graph built"
        );
        Ok(graph)
    }

    fn find_leaders(
        &self,
        instrs: &[Instr],
        positions: &FxHashMap<u64, usize>,
    ) -> Result<(Vec<bool>, Vec<Jump>)> {
        let mut leaders = vec![false; instrs.len()];
        let mut jumps = Vec::new();
        leaders[0] = true;

        for (pos, instr) in instrs.iter().enumerate() {
            let flow = instr.flow();
            if let Some(target) = flow.target() {
                let resolved = positions.get(&target).copied();
                match resolved {
                    Some(target_pos) => leaders[target_pos] = true,
                    None => match self.unresolved {
                        UnresolvedTargets::Error => {
                            return Err(CfgError::UnresolvedTarget {
                                from: instr.ea,
                                target,
                            });
                        }
                        UnresolvedTargets::Record => {
                            warn!(
                                from = format_args!("0x{:x}", instr.ea),
                                target = format_args!("0x{target:x}"),
                                "dropping edge to unresolved jump target"
                            );
                        }
                    },
                }
                jumps.push(Jump {
                    from: pos,
                    ea: instr.ea,
                    target_ea: target,
                    target: resolved,
                });
            }
            if flow.ends_block() && pos + 1 < instrs.len() {
                leaders[pos + 1] = true;
            }
        }
        Ok((leaders, jumps))
    }
}

fn index_addresses(instrs: &[Instr]) -> Result<FxHashMap<u64, usize>> {
    let mut positions = FxHashMap::default();
    positions.reserve(instrs.len());
    for (pos, instr) in instrs.iter().enumerate() {
        if positions.insert(instr.ea, pos).is_some() {
            return Err(CfgError::DuplicateAddress(instr.ea));
        }
    }
    Ok(positions)
}

/// Split the sequence at leaders. Returns the graph and each position's block.
fn partition(instrs: Vec<Instr>, leaders: &[bool]) -> Result<(FlowGraph, Vec<BlockId>)> {
    let mut blocks: Vec<Block> = Vec::new();
    let mut block_of = Vec::with_capacity(instrs.len());

    for (pos, instr) in instrs.into_iter().enumerate() {
        match blocks.last_mut() {
            Some(block) if !leaders[pos] => block.instructions.push(instr),
            _ => blocks.push(Block::new(instr.ea, vec![instr])),
        }
        block_of.push(BlockId::new(blocks.len() - 1));
    }

    Ok((FlowGraph::new(blocks)?, block_of))
}

/// Add every block's outgoing edges, in block order, so that `jump_from`
/// records predecessors in discovery order.
fn link_blocks(graph: &mut FlowGraph, block_of: &[BlockId], jumps: &[Jump]) {
    let targets: FxHashMap<usize, Option<usize>> =
        jumps.iter().map(|jump| (jump.from, jump.target)).collect();
    let count = graph.len();
    let mut last_pos = 0;

    for index in 0..count {
        let id = BlockId::new(index);
        let block = graph.block(id);
        let flow = block.last().map_or(Flow::Plain, Instr::flow);
        last_pos += block.len();
        let taken = targets
            .get(&(last_pos - 1))
            .copied()
            .flatten()
            .map(|pos| block_of[pos]);
        let next = (index + 1 < count).then(|| BlockId::new(index + 1));

        match flow {
            Flow::Plain => {
                if let Some(next) = next {
                    graph.add_edge(id, next, true);
                }
            }
            Flow::Jump(_) => {
                if let Some(taken) = taken {
                    graph.add_edge(id, taken, false);
                }
            }
            Flow::CondJump(_) => {
                if let Some(taken) = taken {
                    graph.add_edge(id, taken, false);
                }
                if let Some(next) = next {
                    graph.add_edge(id, next, true);
                }
            }
            Flow::Terminal => {}
        }
    }
}

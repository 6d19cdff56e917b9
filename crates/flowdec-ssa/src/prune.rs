//! Dead merge placeholder removal.

use rustc_hash::{FxHashMap, FxHashSet};
use tracing::debug;

use flowdec_cfg::FlowGraph;

/// Remove merge placeholders whose value never reaches an instruction.
///
/// A placeholder is live when an instruction reads its version, or when a
/// live placeholder takes it as an operand. Returns the number removed.
pub fn prune_phis(graph: &mut FlowGraph) -> usize {
    let mut phi_operands: FxHashMap<u32, Vec<u32>> = FxHashMap::default();
    for block in graph.blocks() {
        for phi in &block.phis {
            if let Some(version) = phi.var.version {
                let operands = phi.operands.iter().filter_map(|op| op.var.version);
                phi_operands.insert(version, operands.collect());
            }
        }
    }

    let mut live: FxHashSet<u32> = FxHashSet::default();
    let mut worklist: Vec<u32> = Vec::new();
    for block in graph.blocks() {
        for instr in &block.instructions {
            for var in instr.uses() {
                if let Some(version) = var.version
                    && phi_operands.contains_key(&version)
                    && live.insert(version)
                {
                    worklist.push(version);
                }
            }
        }
    }

    while let Some(version) = worklist.pop() {
        for &operand in phi_operands.get(&version).into_iter().flatten() {
            if phi_operands.contains_key(&operand) && live.insert(operand) {
                worklist.push(operand);
            }
        }
    }

    let mut removed = 0;
    for block in graph.blocks_mut() {
        let before = block.phis.len();
        block
            .phis
            .retain(|phi| phi.var.version.is_none_or(|v| live.contains(&v)));
        removed += before - block.phis.len();
    }

    debug!(removed, kept = live.len(), "pruned merge placeholders");
    removed
}

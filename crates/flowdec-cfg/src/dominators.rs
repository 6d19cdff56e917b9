//! Dominator tree and dominance frontiers.
//!
//! Uses the iterative algorithm of Cooper, Harvey and Kennedy ("A Simple,
//! Fast Dominance Algorithm"): immediate dominators are refined over reverse
//! postorder until nothing changes. Blocks unreachable from the entry get no
//! immediate dominator and take no part in any query.

use crate::block::BlockId;
use crate::graph::FlowGraph;

/// Immediate-dominator tree of the blocks reachable from the entry.
#[derive(Clone, Debug)]
pub struct DominatorTree {
    entry: BlockId,
    idom: Vec<Option<BlockId>>,
    children: Vec<Vec<BlockId>>,
    depth: Vec<usize>,
    reachable: Vec<bool>,
}

impl DominatorTree {
    /// Compute the tree for `graph`, which should already be validated.
    pub fn compute(graph: &FlowGraph) -> Self {
        let n = graph.len();
        let entry = graph.entry();
        let rpo = graph.reverse_postorder();

        let mut order = vec![usize::MAX; n];
        for (i, id) in rpo.iter().enumerate() {
            order[id.index()] = i;
        }

        // While iterating, the entry is its own dominator.
        let mut idom: Vec<Option<BlockId>> = vec![None; n];
        idom[entry.index()] = Some(entry);

        let mut changed = true;
        while changed {
            changed = false;
            for &id in rpo.iter().skip(1) {
                let mut new_idom = None;
                for &pred in &graph.block(id).jump_from {
                    if idom.get(pred.index()).copied().flatten().is_none() {
                        continue;
                    }
                    new_idom = Some(match new_idom {
                        None => pred,
                        Some(cur) => intersect(&idom, &order, entry, pred, cur),
                    });
                }
                if new_idom.is_some() && idom[id.index()] != new_idom {
                    idom[id.index()] = new_idom;
                    changed = true;
                }
            }
        }
        idom[entry.index()] = None;

        let mut children = vec![Vec::new(); n];
        let mut depth = vec![0; n];
        for &id in rpo.iter().skip(1) {
            if let Some(parent) = idom[id.index()] {
                children[parent.index()].push(id);
                depth[id.index()] = depth[parent.index()] + 1;
            }
        }
        for list in &mut children {
            list.sort_unstable();
        }

        let reachable = order.iter().map(|&o| o != usize::MAX).collect();

        Self {
            entry,
            idom,
            children,
            depth,
            reachable,
        }
    }

    pub const fn entry(&self) -> BlockId {
        self.entry
    }

    /// Immediate dominator; `None` for the entry and for unreachable blocks.
    pub fn immediate_dominator(&self, id: BlockId) -> Option<BlockId> {
        self.idom.get(id.index()).copied().flatten()
    }

    pub fn is_reachable(&self, id: BlockId) -> bool {
        self.reachable.get(id.index()).copied().unwrap_or(false)
    }

    /// Check if `a` dominates `b`. A reachable block dominates itself.
    pub fn dominates(&self, a: BlockId, b: BlockId) -> bool {
        if !self.is_reachable(a) || !self.is_reachable(b) {
            return false;
        }
        let mut current = Some(b);
        while let Some(id) = current {
            if id == a {
                return true;
            }
            current = self.immediate_dominator(id);
        }
        false
    }

    pub fn strictly_dominates(&self, a: BlockId, b: BlockId) -> bool {
        a != b && self.dominates(a, b)
    }

    /// Blocks immediately dominated by `id`, in key order.
    pub fn children(&self, id: BlockId) -> &[BlockId] {
        self.children.get(id.index()).map_or(&[], Vec::as_slice)
    }

    /// Distance from the entry in the tree; the entry has depth 0.
    pub fn depth(&self, id: BlockId) -> usize {
        self.depth.get(id.index()).copied().unwrap_or(0)
    }

    /// Preorder walk of the tree from the entry.
    pub fn preorder(&self) -> Vec<BlockId> {
        let mut order = Vec::new();
        let mut stack = vec![self.entry];
        while let Some(id) = stack.pop() {
            order.push(id);
            stack.extend(self.children(id).iter().rev());
        }
        order
    }
}

fn intersect(
    idom: &[Option<BlockId>],
    order: &[usize],
    entry: BlockId,
    mut a: BlockId,
    mut b: BlockId,
) -> BlockId {
    while a != b {
        while order[a.index()] > order[b.index()] {
            a = idom[a.index()].unwrap_or(entry);
        }
        while order[b.index()] > order[a.index()] {
            b = idom[b.index()].unwrap_or(entry);
        }
    }
    a
}

/// Dominance frontier of every block, indexed by [`BlockId::index`].
///
/// The function entry counts as having one extra predecessor (the caller), so
/// a block that jumps back to the entry makes the entry a merge point.
/// Frontier lists are in discovery order without duplicates.
pub fn dominance_frontiers(graph: &FlowGraph, tree: &DominatorTree) -> Vec<Vec<BlockId>> {
    let mut frontiers: Vec<Vec<BlockId>> = vec![Vec::new(); graph.len()];

    for (index, block) in graph.blocks().iter().enumerate() {
        let id = BlockId::new(index);
        if !tree.is_reachable(id) {
            continue;
        }
        let preds: Vec<BlockId> = block
            .jump_from
            .iter()
            .copied()
            .filter(|&pred| tree.is_reachable(pred))
            .collect();
        let incoming = preds.len() + usize::from(id == tree.entry());
        if incoming < 2 {
            continue;
        }

        let stop = tree.immediate_dominator(id);
        for pred in preds {
            let mut runner = Some(pred);
            while let Some(r) = runner {
                if Some(r) == stop {
                    break;
                }
                let frontier = &mut frontiers[r.index()];
                if !frontier.contains(&id) {
                    frontier.push(id);
                }
                runner = tree.immediate_dominator(r);
            }
        }
    }
    frontiers
}

//! Flow graph arena and traversals.

use std::fmt;

use rustc_hash::FxHashMap;

use crate::block::{Block, BlockId};
use crate::{CfgError, Result};

/// Owns every block of one function.
///
/// Blocks live in a single arena in discovery order; `jump_from`, `jump_to`
/// and `falls_into` are [`BlockId`]s into that arena. Topology is fixed once
/// the builder returns; later passes only rewrite block contents.
#[derive(Clone, Debug)]
pub struct FlowGraph {
    blocks: Vec<Block>,
    index: FxHashMap<u64, BlockId>,
    entry: BlockId,
    /// `(jump ea, target ea)` pairs whose edge was dropped.
    unresolved: Vec<(u64, u64)>,
}

impl FlowGraph {
    /// Wrap blocks without edges. The first block is the entry.
    pub fn new(blocks: Vec<Block>) -> Result<Self> {
        if blocks.is_empty() {
            return Err(CfgError::EmptyFunction);
        }
        let mut index = FxHashMap::default();
        for (i, block) in blocks.iter().enumerate() {
            if index.insert(block.ea, BlockId::new(i)).is_some() {
                return Err(CfgError::DuplicateAddress(block.ea));
            }
        }
        Ok(Self {
            blocks,
            index,
            entry: BlockId::new(0),
            unresolved: Vec::new(),
        })
    }

    pub(crate) fn record_unresolved(&mut self, from: u64, target: u64) {
        self.unresolved.push((from, target));
    }

    /// All blocks in key (discovery) order, reachable or not.
    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    pub fn blocks_mut(&mut self) -> &mut [Block] {
        &mut self.blocks
    }

    /// Block identity keys in discovery order.
    pub fn keys(&self) -> impl Iterator<Item = u64> + '_ {
        self.blocks.iter().map(|block| block.ea)
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    pub const fn entry(&self) -> BlockId {
        self.entry
    }

    pub fn get(&self, id: BlockId) -> Option<&Block> {
        self.blocks.get(id.index())
    }

    /// # Panics
    /// Panics if `id` is not a block of this graph.
    pub fn block(&self, id: BlockId) -> &Block {
        &self.blocks[id.index()]
    }

    /// # Panics
    /// Panics if `id` is not a block of this graph.
    pub fn block_mut(&mut self, id: BlockId) -> &mut Block {
        &mut self.blocks[id.index()]
    }

    /// Block whose first item is at `ea`.
    pub fn block_at(&self, ea: u64) -> Option<BlockId> {
        self.index.get(&ea).copied()
    }

    /// Jumps whose target had no instruction and whose edge was dropped.
    pub fn unresolved(&self) -> &[(u64, u64)] {
        &self.unresolved
    }

    /// Add an edge `from -> to`, marking it as the fall-through edge if `fall`.
    ///
    /// Edges are deduplicated. The `jump_from` half is only written when `to`
    /// is a block of this graph, so an out-of-range target leaves the graph in
    /// a state [`validate`](Self::validate) rejects.
    pub fn add_edge(&mut self, from: BlockId, to: BlockId, fall: bool) {
        if let Some(block) = self.blocks.get_mut(from.index()) {
            if !block.jump_to.contains(&to) {
                block.jump_to.push(to);
            }
            if fall {
                block.falls_into = Some(to);
            }
        }
        if let Some(block) = self.blocks.get_mut(to.index())
            && !block.jump_from.contains(&from)
        {
            block.jump_from.push(from);
        }
    }

    /// Control-flow preorder from the entry block.
    ///
    /// Each block is visited before its successors, which are visited in
    /// `jump_to` order, so branch targets come before fall-through code.
    /// Blocks unreachable from the entry are not visited.
    pub fn preorder(&self) -> Vec<BlockId> {
        let mut visited = vec![false; self.blocks.len()];
        let mut order = Vec::with_capacity(self.blocks.len());
        let mut stack = vec![self.entry];

        while let Some(id) = stack.pop() {
            let Some(seen) = visited.get_mut(id.index()) else {
                continue;
            };
            if *seen {
                continue;
            }
            *seen = true;
            order.push(id);
            stack.extend(self.blocks[id.index()].jump_to.iter().rev());
        }
        order
    }

    /// Blocks in control-flow preorder. Restartable; yields the same sequence
    /// every call.
    pub fn iter_blocks(&self) -> impl Iterator<Item = &Block> + '_ {
        self.preorder().into_iter().map(|id| &self.blocks[id.index()])
    }

    /// Reverse postorder over reachable blocks, following `jump_to` order.
    pub fn reverse_postorder(&self) -> Vec<BlockId> {
        let mut visited = vec![false; self.blocks.len()];
        let mut post = Vec::with_capacity(self.blocks.len());
        // (block, next successor position)
        let mut stack = vec![(self.entry, 0usize)];
        visited[self.entry.index()] = true;

        while let Some((id, next)) = stack.last_mut() {
            let succs = &self.blocks[id.index()].jump_to;
            if let Some(&succ) = succs.get(*next) {
                *next += 1;
                if let Some(seen) = visited.get_mut(succ.index())
                    && !*seen
                {
                    *seen = true;
                    stack.push((succ, 0));
                }
            } else {
                post.push(*id);
                stack.pop();
            }
        }
        post.reverse();
        post
    }

    /// Check the structural invariants every pass relies on.
    pub fn validate(&self) -> Result<()> {
        let n = self.blocks.len();
        let malformed = |msg: String| Err(CfgError::MalformedGraph(msg));

        if self.entry.index() >= n {
            return malformed(format!("entry {} out of range", self.entry));
        }
        if self.index.len() != n {
            return malformed(format!("{} keys for {n} blocks", self.index.len()));
        }
        for (&ea, &id) in &self.index {
            if self.get(id).is_none_or(|block| block.ea != ea) {
                return malformed(format!("key 0x{ea:x} maps to {id}"));
            }
        }

        for (i, block) in self.blocks.iter().enumerate() {
            let id = BlockId::new(i);
            for &succ in &block.jump_to {
                let Some(target) = self.get(succ) else {
                    return malformed(format!("{id} jumps to missing block {succ}"));
                };
                if !target.jump_from.contains(&id) {
                    return malformed(format!("{id} -> {succ} has no back-link"));
                }
            }
            for &pred in &block.jump_from {
                let Some(source) = self.get(pred) else {
                    return malformed(format!("{id} entered from missing block {pred}"));
                };
                if !source.jump_to.contains(&id) {
                    return malformed(format!("{pred} -> {id} back-link has no edge"));
                }
            }
            if let Some(fall) = block.falls_into
                && !block.jump_to.contains(&fall)
            {
                return malformed(format!("{id} falls into {fall} outside jump_to"));
            }
        }
        Ok(())
    }

    fn key(&self, id: BlockId) -> String {
        self.get(id)
            .map_or_else(|| format!("?{id}"), |block| format!("0x{:x}", block.ea))
    }

    fn keys_of(&self, ids: &[BlockId]) -> String {
        let keys: Vec<String> = ids.iter().map(|&id| self.key(id)).collect();
        format!("[{}]", keys.join(", "))
    }
}

impl fmt::Display for FlowGraph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, block) in self.blocks.iter().enumerate() {
            let id = BlockId::new(i);
            write!(
                f,
                "block 0x{:x} ({id}) from {} to {}",
                block.ea,
                self.keys_of(&block.jump_from),
                self.keys_of(&block.jump_to),
            )?;
            if let Some(fall) = block.falls_into {
                write!(f, " falls {}", self.key(fall))?;
            }
            writeln!(f)?;
            for phi in &block.phis {
                writeln!(f, "    {phi}")?;
            }
            for instr in &block.instructions {
                writeln!(f, "    0x{:x}: {instr}", instr.ea)?;
            }
        }
        for (from, target) in &self.unresolved {
            writeln!(f, "unresolved 0x{from:x} -> 0x{target:x}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flowdec_ir::InstrBuilder;

    fn graph(eas: &[u64]) -> FlowGraph {
        let blocks = eas
            .iter()
            .map(|&ea| Block::new(ea, vec![InstrBuilder::new(ea).build_fall()]))
            .collect();
        FlowGraph::new(blocks).unwrap()
    }

    fn id(i: usize) -> BlockId {
        BlockId::new(i)
    }

    #[test]
    fn test_add_edge_dedup_and_symmetry() {
        let mut g = graph(&[0, 1]);
        g.add_edge(id(0), id(1), false);
        g.add_edge(id(0), id(1), true);
        assert_eq!(g.block(id(0)).jump_to, vec![id(1)]);
        assert_eq!(g.block(id(0)).falls_into, Some(id(1)));
        assert_eq!(g.block(id(1)).jump_from, vec![id(0)]);
        g.validate().unwrap();
    }

    #[test]
    fn test_preorder_taken_first() {
        // b0 -> [b3, b1], b1 -> b2, b2 -> b3
        let mut g = graph(&[0, 1, 2, 3]);
        g.add_edge(id(0), id(3), false);
        g.add_edge(id(0), id(1), true);
        g.add_edge(id(1), id(2), true);
        g.add_edge(id(2), id(3), true);
        assert_eq!(g.preorder(), vec![id(0), id(3), id(1), id(2)]);
        let keys: Vec<u64> = g.iter_blocks().map(|b| b.ea).collect();
        assert_eq!(keys, vec![0, 3, 1, 2]);
    }

    #[test]
    fn test_preorder_matches_recursive_order() {
        // b0 -> [b1, b2], b1 -> b2, b2 -> b1
        let mut g = graph(&[0, 1, 2]);
        g.add_edge(id(0), id(1), false);
        g.add_edge(id(0), id(2), true);
        g.add_edge(id(1), id(2), false);
        g.add_edge(id(2), id(1), false);
        assert_eq!(g.preorder(), vec![id(0), id(1), id(2)]);
    }

    #[test]
    fn test_preorder_skips_unreachable() {
        let mut g = graph(&[0, 1, 2]);
        g.add_edge(id(0), id(2), false);
        g.add_edge(id(1), id(2), true);
        assert_eq!(g.preorder(), vec![id(0), id(2)]);
        assert_eq!(g.keys().collect::<Vec<_>>(), vec![0, 1, 2]);
    }

    #[test]
    fn test_reverse_postorder() {
        let mut g = graph(&[0, 1, 2, 3]);
        g.add_edge(id(0), id(1), false);
        g.add_edge(id(0), id(2), true);
        g.add_edge(id(1), id(3), false);
        g.add_edge(id(2), id(3), true);
        assert_eq!(g.reverse_postorder(), vec![id(0), id(2), id(1), id(3)]);
    }

    #[test]
    fn test_validate_rejects_missing_block() {
        let mut g = graph(&[0]);
        g.add_edge(id(0), id(7), false);
        assert!(matches!(g.validate(), Err(CfgError::MalformedGraph(_))));
    }

    #[test]
    fn test_validate_rejects_asymmetric_edge() {
        let mut g = graph(&[0, 1]);
        g.block_mut(id(0)).jump_to.push(id(1));
        assert!(matches!(g.validate(), Err(CfgError::MalformedGraph(_))));
    }

    #[test]
    fn test_validate_rejects_stray_fall() {
        let mut g = graph(&[0, 1]);
        g.block_mut(id(0)).falls_into = Some(id(1));
        assert!(g.validate().is_err());
    }

    #[test]
    fn test_new_rejects_duplicates_and_empty() {
        assert_eq!(
            FlowGraph::new(Vec::new()).unwrap_err(),
            CfgError::EmptyFunction
        );
        let blocks = vec![Block::new(3, Vec::new()), Block::new(3, Vec::new())];
        assert_eq!(
            FlowGraph::new(blocks).unwrap_err(),
            CfgError::DuplicateAddress(3)
        );
    }

    #[test]
    fn test_display_dump() {
        let mut g = graph(&[0, 1]);
        g.add_edge(id(0), id(1), true);
        let dump = g.to_string();
        assert!(dump.contains("block 0x0 (b0) from [] to [0x1] falls 0x1"));
        assert!(dump.contains("block 0x1 (b1) from [0x0] to []"));
    }
}

#![allow(dead_code)]

use flowdec::{BlockId, Decompiler, FlowGraph, RunState, TextDisassembler};

/// Driver over textual IR, entry at address 0.
pub fn decompiler(text: &str) -> Decompiler {
    Decompiler::new(TextDisassembler::new(text).expect("invalid IR"), 0)
}

/// Run `text` up to and including `step` and hand back the run state.
pub fn decompile_until(text: &str, step: &str) -> RunState {
    let mut decompiler = decompiler(text);
    decompiler.run_until(step).expect("decompilation failed");
    decompiler.into_state()
}

pub fn basic_blocks(text: &str) -> FlowGraph {
    decompile_until(text, "basic_blocks")
        .flow
        .expect("no flow graph")
}

pub fn block_eas(flow: &FlowGraph, ids: &[BlockId]) -> Vec<u64> {
    ids.iter().map(|&id| flow.block(id).ea).collect()
}

pub fn iter_eas(flow: &FlowGraph) -> Vec<u64> {
    flow.iter_blocks().map(|block| block.ea).collect()
}

/// Assert the structural invariants every built graph must satisfy.
pub fn assert_graph_invariants(flow: &FlowGraph) {
    flow.validate().expect("graph failed validation");

    for (index, block) in flow.blocks().iter().enumerate() {
        let id = BlockId::new(index);
        for &to in &block.jump_to {
            assert!(
                flow.block(to).jump_from.contains(&id),
                "{id} -> {to} missing back-link"
            );
        }
        for &from in &block.jump_from {
            assert!(
                flow.block(from).jump_to.contains(&id),
                "{from} listed in jump_from of {id} without an edge"
            );
        }
        if let Some(fall) = block.falls_into {
            assert!(block.jump_to.contains(&fall), "falls_into of {id} not in jump_to");
        }
    }

    let visited = iter_eas(flow);
    assert_eq!(visited.first(), Some(&flow.block(flow.entry()).ea));
    let mut unique = visited.clone();
    unique.sort_unstable();
    unique.dedup();
    assert_eq!(unique.len(), visited.len(), "block visited twice");
}

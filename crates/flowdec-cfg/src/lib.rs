//! Basic-block flow graph for the flowdec decompiler.
//!
//! [`FlowGraphBuilder`] partitions a function's instruction items into
//! [`Block`]s and classifies the edges between them. The resulting
//! [`FlowGraph`] owns every block; edges are [`BlockId`] indices into that
//! arena. [`DominatorTree`] and [`dominance_frontiers`] feed SSA construction.

mod block;
mod builder;
mod dominators;
mod graph;

pub use block::*;
pub use builder::*;
pub use dominators::*;
pub use graph::*;

use thiserror::Error;

/// Flow graph errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CfgError {
    #[error("Jump at 0x{from:x} targets 0x{target:x}, which is outside the function")]
    UnresolvedTarget { from: u64, target: u64 },
    #[error("Duplicate instruction address 0x{0:x}")]
    DuplicateAddress(u64),
    #[error("Function has no instructions")]
    EmptyFunction,
    #[error("Entry 0x{entry:x} is not the lowest address (0x{lowest:x})")]
    EntryNotFirst { entry: u64, lowest: u64 },
    #[error("Malformed flow graph: {0}")]
    MalformedGraph(String),
}

pub type Result<T> = std::result::Result<T, CfgError>;

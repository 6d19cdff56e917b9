//! flowdec - staged decompiler core.
//!
//! Turns the instruction items of one function into a basic-block flow graph
//! and then into SSA form, one named step at a time.
//!
//! # Example
//!
//! ```ignore
//! use flowdec::{Decompiler, TextDisassembler};
//!
//! let dis = TextDisassembler::new("a = 1;\nif (b != 0) goto 3;\na = 2;\n3: return a;")?;
//! let mut decompiler = Decompiler::new(dis, 0);
//! let state = decompiler.run_to_completion()?;
//! for block in state.flow()?.iter_blocks() {
//!     println!("0x{:x}", block.ea);
//! }
//! ```

// Re-export from sub-crates
pub use flowdec_cfg::{
    Block, BlockId, CfgError, DominatorTree, FlowGraph, FlowGraphBuilder, Phi, PhiOperand,
    UnresolvedTargets, dominance_frontiers,
};
pub use flowdec_dis::{DisError, Disassembler, ListingDisassembler, TextDisassembler, parse_ir};
pub use flowdec_ir::{BinaryOp, Expr, Flow, Instr, InstrBuilder, Stmt, Terminator, UnaryOp, Var};
pub use flowdec_ssa::{SsaBuilder, SsaContext, SsaError, SsaStats, prune_phis};

mod batch;
mod config;
mod decompiler;
mod error;
pub mod metrics;

pub use batch::*;
pub use config::*;
pub use decompiler::*;
pub use error::*;

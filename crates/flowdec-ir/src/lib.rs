//! Instruction item model for the flowdec decompiler.
//!
//! This crate provides pure IR types with no knowledge of any instruction set.
//! Backends in `flowdec-dis` produce these items; the flow graph builder only
//! looks at [`Flow`], while SSA construction rewrites the [`Var`]s inside.

mod builder;
mod expr;
mod instr;
mod stmt;
mod terminator;

pub use builder::*;
pub use expr::*;
pub use instr::*;
pub use stmt::*;
pub use terminator::*;

//! Instruction terminator IR.

use std::fmt;

use crate::expr::{Expr, Var};

/// Control-flow discriminant of an instruction item.
///
/// This is everything the flow graph builder needs to know about an item:
/// whether control continues to the next address, transfers to a resolved
/// target, or leaves the function.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Flow {
    /// Control continues at the next address.
    Plain,
    /// Unconditional transfer to the target address.
    Jump(u64),
    /// Transfer to the target address when taken, else to the next address.
    CondJump(u64),
    /// Control leaves the function.
    Terminal,
}

impl Flow {
    /// Check if this item ends a basic block.
    pub const fn ends_block(self) -> bool {
        !matches!(self, Self::Plain)
    }

    /// Explicit jump target, if any.
    pub const fn target(self) -> Option<u64> {
        match self {
            Self::Jump(target) | Self::CondJump(target) => Some(target),
            Self::Plain | Self::Terminal => None,
        }
    }
}

/// Instruction terminator - controls where execution goes next.
#[derive(Clone, PartialEq, Eq, Debug, Default)]
pub enum Terminator {
    /// Fall through to the next instruction.
    #[default]
    Fall,
    /// Unconditional jump to a static target.
    Jump { target: u64 },
    /// Conditional branch; falls through when `cond` is zero.
    Branch { cond: Expr, target: u64 },
    /// Return from the function.
    Return { value: Option<Expr> },
}

impl Terminator {
    /// Create a static jump terminator.
    pub const fn jump(target: u64) -> Self {
        Self::Jump { target }
    }

    /// Create a conditional branch terminator.
    pub const fn branch(cond: Expr, target: u64) -> Self {
        Self::Branch { cond, target }
    }

    /// Create a return terminator.
    pub const fn ret(value: Option<Expr>) -> Self {
        Self::Return { value }
    }

    /// Check if this terminator is a fall-through.
    pub const fn is_fall(&self) -> bool {
        matches!(self, Self::Fall)
    }

    /// Classify this terminator for flow graph construction.
    pub const fn flow(&self) -> Flow {
        match self {
            Self::Fall => Flow::Plain,
            Self::Jump { target } => Flow::Jump(*target),
            Self::Branch { target, .. } => Flow::CondJump(*target),
            Self::Return { .. } => Flow::Terminal,
        }
    }

    /// Variables read by this terminator.
    pub fn uses(&self) -> Vec<&Var> {
        match self {
            Self::Branch { cond, .. } => cond.vars(),
            Self::Return { value: Some(value) } => value.vars(),
            Self::Fall | Self::Jump { .. } | Self::Return { value: None } => Vec::new(),
        }
    }

    pub fn uses_mut(&mut self) -> Vec<&mut Var> {
        match self {
            Self::Branch { cond, .. } => cond.vars_mut(),
            Self::Return { value: Some(value) } => value.vars_mut(),
            Self::Fall | Self::Jump { .. } | Self::Return { value: None } => Vec::new(),
        }
    }
}

impl fmt::Display for Terminator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Fall => Ok(()),
            Self::Jump { target } => write!(f, "goto {target};"),
            Self::Branch { cond, target } => write!(f, "if ({cond}) goto {target};"),
            Self::Return { value: Some(value) } => write!(f, "return {value};"),
            Self::Return { value: None } => f.write_str("return;"),
        }
    }
}

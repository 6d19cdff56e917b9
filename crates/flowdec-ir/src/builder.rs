//! Fluent builder for instruction items.

use crate::expr::Expr;
use crate::instr::Instr;
use crate::stmt::Stmt;
use crate::terminator::Terminator;

/// Builder for constructing an instruction item.
pub struct InstrBuilder {
    ea: u64,
    statements: Vec<Stmt>,
}

impl InstrBuilder {
    /// Start building the item at `ea`.
    pub const fn new(ea: u64) -> Self {
        Self {
            ea,
            statements: Vec::new(),
        }
    }

    /// Add an assignment.
    #[must_use]
    pub fn assign(mut self, dst: &str, value: Expr) -> Self {
        self.statements.push(Stmt::assign(dst, value));
        self
    }

    /// Add a raw statement.
    #[must_use]
    pub fn stmt(mut self, stmt: Stmt) -> Self {
        self.statements.push(stmt);
        self
    }

    /// Build with a fall-through terminator.
    pub fn build_fall(self) -> Instr {
        self.build(Terminator::Fall)
    }

    /// Build with an unconditional jump.
    pub fn build_jump(self, target: u64) -> Instr {
        self.build(Terminator::jump(target))
    }

    /// Build with a conditional branch.
    pub fn build_branch(self, cond: Expr, target: u64) -> Instr {
        self.build(Terminator::branch(cond, target))
    }

    /// Build with a return.
    pub fn build_return(self, value: Option<Expr>) -> Instr {
        self.build(Terminator::ret(value))
    }

    /// Build with an arbitrary terminator.
    pub fn build(self, terminator: Terminator) -> Instr {
        Instr::new(self.ea, self.statements, terminator)
    }
}

//! Single instruction item IR.

use std::fmt;

use crate::expr::Var;
use crate::stmt::Stmt;
use crate::terminator::{Flow, Terminator};

/// IR for a single instruction item.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Instr {
    /// Address of this item; unique within a function and its ordering key.
    pub ea: u64,
    /// Statements (definitions), executed in order.
    pub statements: Vec<Stmt>,
    /// Control flow terminator.
    pub terminator: Terminator,
}

impl Instr {
    /// Create a new instruction item.
    pub const fn new(ea: u64, statements: Vec<Stmt>, terminator: Terminator) -> Self {
        Self {
            ea,
            statements,
            terminator,
        }
    }

    /// Control-flow discriminant of this item.
    pub const fn flow(&self) -> Flow {
        self.terminator.flow()
    }

    /// Variables defined by this item, in statement order.
    pub fn defs(&self) -> Vec<&Var> {
        self.statements.iter().filter_map(Stmt::def).collect()
    }

    /// Variables read by this item, in evaluation order.
    pub fn uses(&self) -> Vec<&Var> {
        let mut uses: Vec<&Var> = self.statements.iter().flat_map(Stmt::uses).collect();
        uses.extend(self.terminator.uses());
        uses
    }
}

impl fmt::Display for Instr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for stmt in &self.statements {
            if !first {
                f.write_str(" ")?;
            }
            write!(f, "{stmt}")?;
            first = false;
        }
        if !self.terminator.is_fall() {
            if !first {
                f.write_str(" ")?;
            }
            write!(f, "{}", self.terminator)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::{BinaryOp, Expr};

    #[test]
    fn test_instr_defs_and_uses() {
        let instr = Instr::new(
            4,
            vec![Stmt::assign(
                "a",
                Expr::binary(BinaryOp::Add, Expr::var("b"), Expr::imm(1)),
            )],
            Terminator::branch(
                Expr::binary(BinaryOp::Ne, Expr::var("a"), Expr::var("c")),
                0,
            ),
        );
        let defs: Vec<&str> = instr.defs().iter().map(|v| v.name.as_str()).collect();
        let uses: Vec<&str> = instr.uses().iter().map(|v| v.name.as_str()).collect();
        assert_eq!(defs, vec!["a"]);
        assert_eq!(uses, vec!["b", "a", "c"]);
        assert_eq!(instr.flow(), Flow::CondJump(0));
    }

    #[test]
    fn test_instr_display() {
        let instr = Instr::new(0, Vec::new(), Terminator::ret(Some(Expr::var("a"))));
        assert_eq!(instr.to_string(), "return a;");

        let instr = Instr::new(1, vec![Stmt::assign("a", Expr::imm(1))], Terminator::Fall);
        assert_eq!(instr.to_string(), "a = 1;");
    }
}

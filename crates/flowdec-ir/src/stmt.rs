//! Statement IR.

use std::fmt;

use crate::expr::{Expr, Var};

/// Statement kinds.
#[derive(Clone, PartialEq, Eq, Debug)]
pub enum Stmt {
    /// Assign an expression to a variable. The only way to define a variable.
    Assign { dst: Var, value: Expr },
}

impl Stmt {
    /// Create an assignment statement.
    pub fn assign(dst: &str, value: Expr) -> Self {
        Self::Assign {
            dst: Var::new(dst),
            value,
        }
    }

    /// Variable defined by this statement, if any.
    pub const fn def(&self) -> Option<&Var> {
        match self {
            Self::Assign { dst, .. } => Some(dst),
        }
    }

    pub fn def_mut(&mut self) -> Option<&mut Var> {
        match self {
            Self::Assign { dst, .. } => Some(dst),
        }
    }

    /// Variables read by this statement.
    pub fn uses(&self) -> Vec<&Var> {
        match self {
            Self::Assign { value, .. } => value.vars(),
        }
    }

    pub fn uses_mut(&mut self) -> Vec<&mut Var> {
        match self {
            Self::Assign { value, .. } => value.vars_mut(),
        }
    }
}

impl fmt::Display for Stmt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Assign { dst, value } => write!(f, "{dst} = {value};"),
        }
    }
}

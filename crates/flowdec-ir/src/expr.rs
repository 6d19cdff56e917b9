//! Expression IR.

use std::fmt;

/// A named variable, optionally carrying its SSA version.
///
/// Before SSA construction every variable is unversioned. Afterwards each
/// definition carries a version unique within the decompilation run, and each
/// use carries the version of its reaching definition. A use that stays
/// unversioned after SSA reads the value live on function entry.
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub struct Var {
    pub name: String,
    pub version: Option<u32>,
}

impl Var {
    /// Create an unversioned variable.
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            version: None,
        }
    }

    /// Create a variable with an explicit SSA version.
    pub fn versioned(name: &str, version: u32) -> Self {
        Self {
            name: name.to_string(),
            version: Some(version),
        }
    }

    /// Check if the variable has been assigned an SSA version.
    pub const fn is_versioned(&self) -> bool {
        self.version.is_some()
    }
}

impl fmt::Display for Var {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.version {
            Some(version) => write!(f, "{}@{version}", self.name),
            None => f.write_str(&self.name),
        }
    }
}

/// Unary operations.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum UnaryOp {
    Neg,
    LogicalNot,
    Not,
}

impl UnaryOp {
    pub const fn symbol(self) -> &'static str {
        match self {
            Self::Neg => "-",
            Self::LogicalNot => "!",
            Self::Not => "~",
        }
    }
}

/// Binary operations.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    And,
    Or,
    Xor,
    Shl,
    Shr,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    LogicalAnd,
    LogicalOr,
}

impl BinaryOp {
    /// Operator spelling in the C-like surface syntax.
    pub const fn symbol(self) -> &'static str {
        match self {
            Self::Add => "+",
            Self::Sub => "-",
            Self::Mul => "*",
            Self::Div => "/",
            Self::Rem => "%",
            Self::And => "&",
            Self::Or => "|",
            Self::Xor => "^",
            Self::Shl => "<<",
            Self::Shr => ">>",
            Self::Eq => "==",
            Self::Ne => "!=",
            Self::Lt => "<",
            Self::Le => "<=",
            Self::Gt => ">",
            Self::Ge => ">=",
            Self::LogicalAnd => "&&",
            Self::LogicalOr => "||",
        }
    }

    /// Binding strength; higher binds tighter (C precedence levels).
    pub const fn precedence(self) -> u8 {
        match self {
            Self::LogicalOr => 1,
            Self::LogicalAnd => 2,
            Self::Or => 3,
            Self::Xor => 4,
            Self::And => 5,
            Self::Eq | Self::Ne => 6,
            Self::Lt | Self::Le | Self::Gt | Self::Ge => 7,
            Self::Shl | Self::Shr => 8,
            Self::Add | Self::Sub => 9,
            Self::Mul | Self::Div | Self::Rem => 10,
        }
    }
}

/// Expression tree node.
#[derive(Clone, PartialEq, Eq, Debug)]
pub enum Expr {
    Imm(i64),
    Var(Var),
    Unary {
        op: UnaryOp,
        expr: Box<Self>,
    },
    Binary {
        op: BinaryOp,
        left: Box<Self>,
        right: Box<Self>,
    },
}

impl Expr {
    /// Create an immediate expression.
    pub const fn imm(val: i64) -> Self {
        Self::Imm(val)
    }

    /// Create an unversioned variable read.
    pub fn var(name: &str) -> Self {
        Self::Var(Var::new(name))
    }

    /// Create a unary expression.
    pub fn unary(op: UnaryOp, expr: Self) -> Self {
        Self::Unary {
            op,
            expr: Box::new(expr),
        }
    }

    /// Create a binary expression.
    pub fn binary(op: BinaryOp, left: Self, right: Self) -> Self {
        Self::Binary {
            op,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    /// Variables read by this expression, left to right.
    pub fn vars(&self) -> Vec<&Var> {
        let mut out = Vec::new();
        self.collect_vars(&mut out);
        out
    }

    fn collect_vars<'a>(&'a self, out: &mut Vec<&'a Var>) {
        match self {
            Self::Imm(_) => {}
            Self::Var(var) => out.push(var),
            Self::Unary { expr, .. } => expr.collect_vars(out),
            Self::Binary { left, right, .. } => {
                left.collect_vars(out);
                right.collect_vars(out);
            }
        }
    }

    /// Mutable access to every variable read by this expression, left to right.
    pub fn vars_mut(&mut self) -> Vec<&mut Var> {
        let mut out = Vec::new();
        self.collect_vars_mut(&mut out);
        out
    }

    fn collect_vars_mut<'a>(&'a mut self, out: &mut Vec<&'a mut Var>) {
        match self {
            Self::Imm(_) => {}
            Self::Var(var) => out.push(var),
            Self::Unary { expr, .. } => expr.collect_vars_mut(out),
            Self::Binary { left, right, .. } => {
                left.collect_vars_mut(out);
                right.collect_vars_mut(out);
            }
        }
    }

    const fn precedence(&self) -> u8 {
        match self {
            Self::Binary { op, .. } => op.precedence(),
            Self::Unary { .. } => 11,
            Self::Imm(_) | Self::Var(_) => 12,
        }
    }

    fn fmt_operand(&self, f: &mut fmt::Formatter<'_>, min: u8) -> fmt::Result {
        if self.precedence() < min {
            write!(f, "({self})")
        } else {
            write!(f, "{self}")
        }
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Imm(val) => write!(f, "{val}"),
            Self::Var(var) => write!(f, "{var}"),
            Self::Unary { op, expr } => {
                f.write_str(op.symbol())?;
                expr.fmt_operand(f, 11)
            }
            Self::Binary { op, left, right } => {
                // Left-associative: the right operand needs parens at equal precedence.
                left.fmt_operand(f, op.precedence())?;
                write!(f, " {} ", op.symbol())?;
                right.fmt_operand(f, op.precedence() + 1)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_var_display() {
        assert_eq!(Var::new("a").to_string(), "a");
        assert_eq!(Var::versioned("a", 3).to_string(), "a@3");
    }

    #[test]
    fn test_expr_display_precedence() {
        let expr = Expr::binary(
            BinaryOp::Mul,
            Expr::binary(BinaryOp::Add, Expr::var("a"), Expr::imm(1)),
            Expr::var("b"),
        );
        assert_eq!(expr.to_string(), "(a + 1) * b");

        let expr = Expr::binary(
            BinaryOp::Sub,
            Expr::var("a"),
            Expr::binary(BinaryOp::Sub, Expr::var("b"), Expr::var("c")),
        );
        assert_eq!(expr.to_string(), "a - (b - c)");

        let expr = Expr::binary(BinaryOp::Ne, Expr::var("b"), Expr::imm(0));
        assert_eq!(expr.to_string(), "b != 0");
    }

    #[test]
    fn test_expr_vars_in_order() {
        let expr = Expr::binary(
            BinaryOp::Add,
            Expr::var("x"),
            Expr::unary(
                UnaryOp::Neg,
                Expr::binary(BinaryOp::Add, Expr::var("y"), Expr::var("x")),
            ),
        );
        let names: Vec<&str> = expr.vars().iter().map(|v| v.name.as_str()).collect();
        assert_eq!(names, vec!["x", "y", "x"]);
    }

    #[test]
    fn test_expr_vars_mut_rewrites() {
        let mut expr = Expr::binary(BinaryOp::Add, Expr::var("x"), Expr::var("y"));
        for (i, var) in expr.vars_mut().into_iter().enumerate() {
            var.version = Some(u32::try_from(i).unwrap());
        }
        assert_eq!(expr.to_string(), "x@0 + y@1");
    }
}

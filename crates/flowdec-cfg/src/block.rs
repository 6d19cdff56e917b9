//! Basic blocks and SSA merge placeholders.

use std::fmt;

use flowdec_ir::{Instr, Var};

/// Index of a block in its [`FlowGraph`](crate::FlowGraph).
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Debug)]
pub struct BlockId(usize);

impl BlockId {
    pub const fn new(index: usize) -> Self {
        Self(index)
    }

    pub const fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for BlockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "b{}", self.0)
    }
}

/// One incoming value of a [`Phi`].
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct PhiOperand {
    /// Predecessor the value flows in from; `None` for the value live on
    /// function entry.
    pub pred: Option<BlockId>,
    pub var: Var,
}

/// Merge placeholder: selects one version of `var` per incoming edge.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Phi {
    /// Defined variable.
    pub var: Var,
    pub operands: Vec<PhiOperand>,
}

impl Phi {
    /// Unversioned placeholder for `name` with one operand per predecessor.
    pub fn new(name: &str, preds: impl IntoIterator<Item = Option<BlockId>>) -> Self {
        Self {
            var: Var::new(name),
            operands: preds
                .into_iter()
                .map(|pred| PhiOperand {
                    pred,
                    var: Var::new(name),
                })
                .collect(),
        }
    }

    pub fn operand(&self, pred: Option<BlockId>) -> Option<&PhiOperand> {
        self.operands.iter().find(|op| op.pred == pred)
    }
}

impl fmt::Display for Phi {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} = phi(", self.var)?;
        for (i, op) in self.operands.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            match op.pred {
                Some(pred) => write!(f, "{pred}: {}", op.var)?,
                None => write!(f, "entry: {}", op.var)?,
            }
        }
        f.write_str(");")
    }
}

/// A maximal straight-line run of instruction items.
#[derive(Clone, Debug)]
pub struct Block {
    /// Address of the first item; the block's identity key.
    pub ea: u64,
    /// Items in program order.
    pub instructions: Vec<Instr>,
    /// Merge placeholders, evaluated before the first item.
    pub phis: Vec<Phi>,
    /// Blocks with an edge into this one, in discovery order.
    pub jump_from: Vec<BlockId>,
    /// Successors; a conditional branch lists its taken target first.
    pub jump_to: Vec<BlockId>,
    /// The successor reached by address adjacency, if any. Always in `jump_to`.
    pub falls_into: Option<BlockId>,
}

impl Block {
    pub const fn new(ea: u64, instructions: Vec<Instr>) -> Self {
        Self {
            ea,
            instructions,
            phis: Vec::new(),
            jump_from: Vec::new(),
            jump_to: Vec::new(),
            falls_into: None,
        }
    }

    /// Addresses of the items in this block.
    pub fn items(&self) -> impl Iterator<Item = u64> + '_ {
        self.instructions.iter().map(|instr| instr.ea)
    }

    /// Last item, which decides the outgoing edges.
    pub fn last(&self) -> Option<&Instr> {
        self.instructions.last()
    }

    pub fn len(&self) -> usize {
        self.instructions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }

    pub fn phi(&self, name: &str) -> Option<&Phi> {
        self.phis.iter().find(|phi| phi.var.name == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flowdec_ir::{Expr, InstrBuilder};

    #[test]
    fn test_block_items() {
        let block = Block::new(
            4,
            vec![
                InstrBuilder::new(4).assign("a", Expr::imm(1)).build_fall(),
                InstrBuilder::new(5).build_return(Some(Expr::var("a"))),
            ],
        );
        assert_eq!(block.items().collect::<Vec<_>>(), vec![4, 5]);
        assert_eq!(block.len(), 2);
        assert_eq!(block.last().map(|i| i.ea), Some(5));
    }

    #[test]
    fn test_phi_display() {
        let mut phi = Phi::new("a", [Some(BlockId::new(0)), None]);
        phi.var.version = Some(4);
        phi.operands[0].var.version = Some(1);
        assert_eq!(phi.to_string(), "a@4 = phi(b0: a@1, entry: a);");
        assert!(phi.operand(None).is_some());
        assert!(phi.operand(Some(BlockId::new(3))).is_none());
    }
}

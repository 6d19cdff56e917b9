//! Textual IR backend.
//!
//! Parses the C-like statement listing used throughout the test-suite:
//!
//! ```text
//!       a = 1;
//!       if (b != 0) goto 300;
//!       a = 2;
//! 300:  return a;
//! ```
//!
//! Every statement becomes one instruction item whose address is its position
//! in the listing. Numeric `label:` prefixes name statements, and `goto label`
//! is resolved to the address of the labelled statement.

use std::path::Path;

use rustc_hash::FxHashMap;
use tracing::debug;

use flowdec_ir::{BinaryOp, Expr, Instr, InstrBuilder, UnaryOp};

use crate::lexer::{Spanned, Token, tokenize};
use crate::{DisError, Disassembler, Result, from_entry};

/// Deepest run of parentheses and prefix operators one expression may nest.
const MAX_NESTING: usize = 256;

/// Disassembler backed by a textual IR listing.
#[derive(Clone, Debug)]
pub struct TextDisassembler {
    items: Vec<Instr>,
}

impl TextDisassembler {
    /// Parse a textual IR listing.
    pub fn new(src: &str) -> Result<Self> {
        let items = parse_ir(src)?;
        debug!(items = items.len(), "parsed textual IR");
        Ok(Self { items })
    }

    /// Read and parse a textual IR file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let src = std::fs::read_to_string(path)?;
        Self::new(&src)
    }

    /// All parsed items.
    pub fn items(&self) -> &[Instr] {
        &self.items
    }
}

impl Disassembler for TextDisassembler {
    fn name(&self) -> &'static str {
        "ir-parser"
    }

    fn disassemble(&self, entry: u64) -> Result<Vec<Instr>> {
        from_entry(&self.items, entry)
    }
}

/// Statement parsed but with jump labels not yet resolved.
enum Pending {
    Assign { dst: String, value: Expr },
    Goto { label: u64 },
    If { cond: Expr, label: u64 },
    Return { value: Option<Expr> },
}

/// Parse a textual IR listing into instruction items.
pub fn parse_ir(src: &str) -> Result<Vec<Instr>> {
    let tokens = tokenize(src)?;
    let mut parser = Parser {
        tokens,
        pos: 0,
        depth: 0,
    };

    let mut labels: FxHashMap<u64, u64> = FxHashMap::default();
    let mut pending: Vec<(Pending, usize)> = Vec::new();

    while !parser.at_end() {
        let ea = pending.len() as u64;
        while let Some(label) = parser.label()? {
            if labels.insert(label, ea).is_some() {
                return Err(DisError::DuplicateLabel {
                    label,
                    line: parser.line(),
                });
            }
        }
        let line = parser.line();
        let stmt = parser.statement()?;
        pending.push((stmt, line));
    }

    let resolve = |label: u64, line: usize| {
        labels
            .get(&label)
            .copied()
            .ok_or(DisError::UndefinedLabel { label, line })
    };

    pending
        .into_iter()
        .enumerate()
        .map(|(idx, (stmt, line))| {
            let builder = InstrBuilder::new(idx as u64);
            Ok(match stmt {
                Pending::Assign { dst, value } => builder.assign(&dst, value).build_fall(),
                Pending::Goto { label } => builder.build_jump(resolve(label, line)?),
                Pending::If { cond, label } => builder.build_branch(cond, resolve(label, line)?),
                Pending::Return { value } => builder.build_return(value),
            })
        })
        .collect()
}

struct Parser {
    tokens: Vec<Spanned>,
    pos: usize,
    /// Open parentheses and prefix operators above the current token.
    depth: usize,
}

impl Parser {
    fn at_end(&self) -> bool {
        self.pos >= self.tokens.len()
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos).map(|s| &s.token)
    }

    fn peek_at(&self, offset: usize) -> Option<&Token> {
        self.tokens.get(self.pos + offset).map(|s| &s.token)
    }

    fn line(&self) -> usize {
        self.tokens
            .get(self.pos)
            .or_else(|| self.tokens.last())
            .map_or(1, |s| s.line)
    }

    fn error<T>(&self, message: impl Into<String>) -> Result<T> {
        Err(DisError::Parse {
            line: self.line(),
            message: message.into(),
        })
    }

    fn bump(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).map(|s| s.token.clone());
        self.pos += 1;
        token
    }

    fn eat(&mut self, punct: &str) -> bool {
        if matches!(self.peek(), Some(Token::Punct(p)) if *p == punct) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, punct: &str) -> Result<()> {
        if self.eat(punct) {
            Ok(())
        } else {
            self.error(format!("expected '{punct}'"))
        }
    }

    fn keyword(&mut self, word: &str) -> bool {
        if matches!(self.peek(), Some(Token::Ident(w)) if w == word) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn number(&mut self) -> Result<u64> {
        match self.bump() {
            Some(Token::Num(n)) => Ok(n),
            _ => self.error("expected number"),
        }
    }

    /// `NUM ':'` prefix.
    fn label(&mut self) -> Result<Option<u64>> {
        if let (Some(Token::Num(n)), Some(Token::Punct(":"))) = (self.peek(), self.peek_at(1)) {
            let label = *n;
            self.pos += 2;
            return Ok(Some(label));
        }
        Ok(None)
    }

    fn statement(&mut self) -> Result<Pending> {
        let stmt = if self.keyword("goto") {
            Pending::Goto {
                label: self.number()?,
            }
        } else if self.keyword("if") {
            self.expect("(")?;
            let cond = self.expr(1)?;
            self.expect(")")?;
            if !self.keyword("goto") {
                return self.error("expected 'goto'");
            }
            Pending::If {
                cond,
                label: self.number()?,
            }
        } else if self.keyword("return") {
            let value = if matches!(self.peek(), Some(Token::Punct(";"))) {
                None
            } else {
                Some(self.expr(1)?)
            };
            Pending::Return { value }
        } else if let Some(Token::Ident(name)) = self.peek().cloned() {
            self.pos += 1;
            self.expect("=")?;
            Pending::Assign {
                dst: name,
                value: self.expr(1)?,
            }
        } else {
            return self.error("expected statement");
        };
        self.expect(";")?;
        Ok(stmt)
    }

    /// Precedence climbing over binary operators.
    fn expr(&mut self, min_prec: u8) -> Result<Expr> {
        let mut left = self.unary()?;
        while let Some(op) = self.peek_binary() {
            if op.precedence() < min_prec {
                break;
            }
            self.pos += 1;
            let right = self.expr(op.precedence() + 1)?;
            left = Expr::binary(op, left, right);
        }
        Ok(left)
    }

    fn peek_binary(&self) -> Option<BinaryOp> {
        let Some(Token::Punct(p)) = self.peek() else {
            return None;
        };
        Some(match *p {
            "+" => BinaryOp::Add,
            "-" => BinaryOp::Sub,
            "*" => BinaryOp::Mul,
            "/" => BinaryOp::Div,
            "%" => BinaryOp::Rem,
            "&" => BinaryOp::And,
            "|" => BinaryOp::Or,
            "^" => BinaryOp::Xor,
            "<<" => BinaryOp::Shl,
            ">>" => BinaryOp::Shr,
            "==" => BinaryOp::Eq,
            "!=" => BinaryOp::Ne,
            "<" => BinaryOp::Lt,
            "<=" => BinaryOp::Le,
            ">" => BinaryOp::Gt,
            ">=" => BinaryOp::Ge,
            "&&" => BinaryOp::LogicalAnd,
            "||" => BinaryOp::LogicalOr,
            _ => return None,
        })
    }

    fn unary(&mut self) -> Result<Expr> {
        let op = if self.eat("-") {
            UnaryOp::Neg
        } else if self.eat("!") {
            UnaryOp::LogicalNot
        } else if self.eat("~") {
            UnaryOp::Not
        } else {
            return self.primary();
        };
        let operand = self.nested(Self::unary)?;
        Ok(Expr::unary(op, operand))
    }

    fn nested(&mut self, parse: impl FnOnce(&mut Self) -> Result<Expr>) -> Result<Expr> {
        if self.depth >= MAX_NESTING {
            return self.error(format!("expression nested deeper than {MAX_NESTING}"));
        }
        self.depth += 1;
        let result = parse(self);
        self.depth -= 1;
        result
    }

    fn primary(&mut self) -> Result<Expr> {
        match self.bump() {
            Some(Token::Num(n)) => match i64::try_from(n) {
                Ok(val) => Ok(Expr::imm(val)),
                Err(_) => self.error(format!("constant {n} out of range")),
            },
            Some(Token::Ident(name)) => Ok(Expr::var(&name)),
            Some(Token::Punct("(")) => {
                let inner = self.nested(|p| p.expr(1))?;
                self.expect(")")?;
                Ok(inner)
            }
            _ => self.error("expected expression"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flowdec_ir::{Flow, Terminator};

    #[test]
    fn test_parse_positions_and_labels() {
        let items = parse_ir(
            "
                  a = 1;
                  if (b != 0) goto 300;
                  a = 2;
            300:  return a;
            ",
        )
        .unwrap();

        assert_eq!(items.len(), 4);
        let eas: Vec<u64> = items.iter().map(|i| i.ea).collect();
        assert_eq!(eas, vec![0, 1, 2, 3]);
        assert_eq!(items[0].flow(), Flow::Plain);
        assert_eq!(items[1].flow(), Flow::CondJump(3));
        assert_eq!(items[3].flow(), Flow::Terminal);
        assert_eq!(items[1].to_string(), "if (b != 0) goto 3;");
    }

    #[test]
    fn test_parse_self_loop() {
        let items = parse_ir("300: goto 300;").unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].terminator, Terminator::jump(0));
    }

    #[test]
    fn test_parse_forward_goto() {
        let items = parse_ir("goto 100;\n100: return a;").unwrap();
        assert_eq!(items[0].flow(), Flow::Jump(1));
    }

    #[test]
    fn test_parse_expression_precedence() {
        let items = parse_ir("x = a + b * -c == (d - 1) && !e;").unwrap();
        assert_eq!(items[0].to_string(), "x = a + b * -c == d - 1 && !e;");
    }

    #[test]
    fn test_parse_return_without_value() {
        let items = parse_ir("return;").unwrap();
        assert_eq!(items[0].terminator, Terminator::ret(None));
    }

    #[test]
    fn test_parse_undefined_label() {
        let err = parse_ir("a = 1;\ngoto 7;").unwrap_err();
        assert!(matches!(err, DisError::UndefinedLabel { label: 7, line: 2 }));
    }

    #[test]
    fn test_parse_duplicate_label() {
        let err = parse_ir("1: a = 1;\n1: return a;").unwrap_err();
        assert!(matches!(err, DisError::DuplicateLabel { label: 1, .. }));
    }

    #[test]
    fn test_parse_missing_semicolon() {
        let err = parse_ir("a = 1\nreturn a;").unwrap_err();
        assert!(matches!(err, DisError::Parse { .. }));
    }

    #[test]
    fn test_parse_dangling_label() {
        assert!(matches!(
            parse_ir("a = 1;\n5:"),
            Err(DisError::Parse { .. })
        ));
    }

    #[test]
    fn test_parse_nesting_limit() {
        let parens = format!("a = {}1{};", "(".repeat(10_000), ")".repeat(10_000));
        assert!(matches!(
            parse_ir(&parens),
            Err(DisError::Parse { line: 1, ref message }) if message.contains("nested")
        ));
        let negs = format!("a = {}1;", "-".repeat(10_000));
        assert!(matches!(parse_ir(&negs), Err(DisError::Parse { .. })));

        let mixed = format!("a = {}b{};", "-(".repeat(100), ")".repeat(100));
        let items = parse_ir(&format!("{mixed}\nreturn a;")).unwrap();
        assert_eq!(items.len(), 2);
    }

    #[test]
    fn test_disassemble_from_entry() {
        let dis = TextDisassembler::new("a = 1;\nb = 2;\nreturn a;").unwrap();
        assert_eq!(dis.disassemble(0).unwrap().len(), 3);
        let tail = dis.disassemble(1).unwrap();
        assert_eq!(tail.len(), 2);
        assert_eq!(tail[0].ea, 1);
        assert!(matches!(dis.disassemble(9), Err(DisError::EntryNotFound(9))));
    }

    #[test]
    fn test_from_file() {
        use std::io::Write;

        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "a = 1;").unwrap();
        writeln!(file, "return a;").unwrap();

        let dis = TextDisassembler::from_file(file.path()).unwrap();
        assert_eq!(dis.items().len(), 2);
        assert_eq!(dis.name(), "ir-parser");
    }
}

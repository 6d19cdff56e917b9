//! Instruction sources for the flowdec decompiler.
//!
//! A [`Disassembler`] turns some input (textual IR, bytes decoded by a
//! hardware disassembler, ...) into the ordered instruction items of one
//! function. The flow graph builder depends only on this trait.

mod lexer;
mod listing;
mod text;

pub use listing::*;
pub use text::*;

use flowdec_ir::Instr;
use thiserror::Error;

/// Instruction source errors.
#[derive(Error, Debug)]
pub enum DisError {
    #[error("line {line}: {message}")]
    Parse { line: usize, message: String },
    #[error("line {line}: undefined label {label}")]
    UndefinedLabel { label: u64, line: usize },
    #[error("line {line}: duplicate label {label}")]
    DuplicateLabel { label: u64, line: usize },
    #[error("No instruction at entry 0x{0:x}")]
    EntryNotFound(u64),
    #[error("Listing out of order at 0x{ea:x} (previous 0x{prev:x})")]
    UnorderedListing { ea: u64, prev: u64 },
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, DisError>;

/// Capability shared by all instruction source backends.
pub trait Disassembler: Send + Sync {
    /// Short backend name for logs.
    fn name(&self) -> &'static str;

    /// Produce the function's instruction items in address order, starting at `entry`.
    ///
    /// # Errors
    /// Fails with [`DisError::EntryNotFound`] when no item lives at `entry`.
    fn disassemble(&self, entry: u64) -> Result<Vec<Instr>>;
}

/// Slice the items of an address-ordered listing that start at `entry`.
pub(crate) fn from_entry(items: &[Instr], entry: u64) -> Result<Vec<Instr>> {
    let start = items
        .binary_search_by_key(&entry, |instr| instr.ea)
        .map_err(|_| DisError::EntryNotFound(entry))?;
    Ok(items[start..].to_vec())
}

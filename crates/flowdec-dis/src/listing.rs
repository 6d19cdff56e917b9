//! In-memory listing backend.

use tracing::debug;

use flowdec_ir::Instr;

use crate::{DisError, Disassembler, Result, from_entry};

/// Disassembler over pre-built instruction items.
///
/// Items must be in strictly ascending address order. Jump targets are not
/// checked here; a target with no item is left for the flow graph builder to
/// report.
#[derive(Clone, Debug)]
pub struct ListingDisassembler {
    items: Vec<Instr>,
}

impl ListingDisassembler {
    pub fn new(items: Vec<Instr>) -> Result<Self> {
        for pair in items.windows(2) {
            if pair[1].ea <= pair[0].ea {
                return Err(DisError::UnorderedListing {
                    ea: pair[1].ea,
                    prev: pair[0].ea,
                });
            }
        }
        debug!(items = items.len(), "loaded listing");
        Ok(Self { items })
    }

    pub fn items(&self) -> &[Instr] {
        &self.items
    }
}

impl Disassembler for ListingDisassembler {
    fn name(&self) -> &'static str {
        "listing"
    }

    fn disassemble(&self, entry: u64) -> Result<Vec<Instr>> {
        from_entry(&self.items, entry)
    }
}

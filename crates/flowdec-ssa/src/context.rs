//! Per-run version counter.

use crate::{Result, SsaError};

/// Issues SSA version identifiers for one decompilation run.
///
/// Every variable draws from the same sequence, so a version identifies a
/// single definition within the run. Independent runs own independent
/// contexts.
#[derive(Clone, Debug, Default)]
pub struct SsaContext {
    index: u32,
}

impl SsaContext {
    pub const fn new() -> Self {
        Self { index: 0 }
    }

    /// Issue a fresh version, greater than every version issued since the
    /// last [`reset`](Self::reset).
    ///
    /// # Errors
    /// [`SsaError::VersionsExhausted`] once the `u32` sequence runs out; the
    /// counter is left unchanged.
    pub const fn next_id(&mut self) -> Result<u32> {
        let id = self.index;
        match id.checked_add(1) {
            Some(next) => {
                self.index = next;
                Ok(id)
            }
            None => Err(SsaError::VersionsExhausted),
        }
    }

    /// How many more versions can be issued before the sequence runs out.
    pub const fn remaining(&self) -> u32 {
        u32::MAX - self.index
    }

    /// Restart the sequence. Call once at the start of a run.
    pub const fn reset(&mut self) {
        self.index = 0;
    }

    /// The version [`next_id`](Self::next_id) will issue next, which is also
    /// the number issued so far.
    pub const fn current(&self) -> u32 {
        self.index
    }

    #[cfg(test)]
    pub(crate) const fn starting_at(index: u32) -> Self {
        Self { index }
    }
}

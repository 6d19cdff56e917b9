//! Decompiler configuration.

use flowdec_cfg::UnresolvedTargets;

/// Per-run settings read by the built-in steps.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DecompilerConfig {
    /// Handling of jumps whose target lies outside the function.
    pub unresolved_targets: UnresolvedTargets,
    /// Remove unused merge placeholders in the `pruned` step.
    pub prune_phis: bool,
}

impl Default for DecompilerConfig {
    fn default() -> Self {
        Self {
            unresolved_targets: UnresolvedTargets::Error,
            prune_phis: true,
        }
    }
}

impl DecompilerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub const fn with_unresolved_targets(mut self, policy: UnresolvedTargets) -> Self {
        self.unresolved_targets = policy;
        self
    }

    #[must_use]
    pub const fn with_prune_phis(mut self, prune: bool) -> Self {
        self.prune_phis = prune;
        self
    }
}

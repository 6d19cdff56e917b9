//! Static single assignment construction.
//!
//! [`SsaBuilder`] rewrites a [`FlowGraph`](flowdec_cfg::FlowGraph) in place:
//! every definition receives a fresh version from the run's [`SsaContext`],
//! every use is tagged with the version of its reaching definition, and merge
//! placeholders ([`Phi`](flowdec_cfg::Phi)) are inserted on the iterated
//! dominance frontier of each variable's definitions.

mod builder;
mod context;
mod prune;

pub use builder::*;
pub use context::*;
pub use prune::*;

use flowdec_cfg::CfgError;
use thiserror::Error;

/// SSA construction errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SsaError {
    #[error("Malformed flow graph: {0}")]
    MalformedGraph(String),
    #[error("Flow graph is already in SSA form")]
    AlreadyInSsa,
    #[error("No SSA versions left in this run")]
    VersionsExhausted,
}

impl From<CfgError> for SsaError {
    fn from(err: CfgError) -> Self {
        match err {
            CfgError::MalformedGraph(msg) => Self::MalformedGraph(msg),
            other => Self::MalformedGraph(other.to_string()),
        }
    }
}

pub type Result<T> = std::result::Result<T, SsaError>;

use thiserror::Error;

/// Decompiler errors.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Disassembly error: {0}")]
    Dis(#[from] flowdec_dis::DisError),
    #[error("Flow graph error: {0}")]
    Cfg(#[from] flowdec_cfg::CfgError),
    #[error("SSA error: {0}")]
    Ssa(#[from] flowdec_ssa::SsaError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Thread pool error: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
    #[error("Step not reached: run {0} first")]
    StepNotReached(&'static str),
    #[error("Unknown step: {0}")]
    UnknownStep(String),
    #[error("Duplicate step: {0}")]
    DuplicateStep(String),
    #[error("Cannot add step {0}: the run has already started")]
    PipelineStarted(String),
    #[error("Step {step} failed: {source}")]
    StepFailed {
        step: &'static str,
        source: Box<Self>,
    },
    #[error("Run aborted: step {step} failed earlier")]
    Aborted { step: &'static str },
}

impl Error {
    /// The underlying error, with step context stripped.
    pub fn root(&self) -> &Self {
        match self {
            Self::StepFailed { source, .. } => source.root(),
            other => other,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

use thiserror::Error;

/// Everything that can stop a measurement run.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum Error {
    #[error("failed to allocate {bytes} bytes aligned to {align}")]
    Allocation { bytes: usize, align: usize },

    #[error("cannot build a layout of {bytes} bytes aligned to {align}")]
    Layout { bytes: usize, align: usize },

    #[error("chain of {spots} spots at stride {stride} does not fit in {capacity} words")]
    WorkingSetTooLarge {
        stride: u64,
        spots: u64,
        capacity: usize,
    },

    #[error("no samples were collected for {spots} spots")]
    MissingSamples { spots: u64 },

    #[error("capacity sweep produced no spot counts")]
    NoCandidates,

    #[error("associativity search did not converge below stride {max_stride}")]
    NoConvergence { max_stride: u64 },

    #[error("no cache capacity boundary found")]
    BoundaryNotFound,

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

pub type Result<T> = std::result::Result<T, Error>;

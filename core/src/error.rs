//! Error types for cyclebench-core

use thiserror::Error;

/// Core error type
#[derive(Error, Debug)]
pub enum Error {
    /// A task specification failed structural validation
    #[error("invalid task {index}: {field}: {reason}")]
    Validation {
        /// Index of the offending task in the submitted list
        index: usize,
        /// Name of the first violated field
        field: &'static str,
        /// What was expected
        reason: String,
    },

    /// An accessor was called before the run ended
    #[error("run has not ended yet")]
    RunNotEnded,

    /// `run` was called while a run is in progress
    #[error("run is still running")]
    StillRunning,

    /// `run` was called after the run ended
    #[error("run has already ended")]
    AlreadyEnded,

    /// An attempted transition to a state other than running/ended
    #[error("state must be \"running\" or \"ended\", got: \"{0}\"")]
    InvalidState(String),

    /// A measure referenced a mark that was never recorded
    #[error("unknown mark: \"{0}\"")]
    UnknownMark(String),

    /// A task's user function returned an error
    #[error("task \"{name}\" failed")]
    Task {
        /// Name of the failing task
        name: String,
        /// The user function's error
        #[source]
        source: anyhow::Error,
    },
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

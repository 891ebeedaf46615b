//! Diagnostic error types.
//!
//! The scoring functions themselves cannot fail; these errors come from
//! fetching snapshots and from the input policy.

use thiserror::Error;

/// Errors that can occur while producing a diagnostic report.
#[derive(Debug, Error)]
pub enum DiagError {
    #[error("node not found: {0}")]
    NodeNotFound(String),

    #[error("invalid snapshot for node {node}: {reason}")]
    InvalidSnapshot { node: String, reason: String },

    #[error("snapshot provider error: {0}")]
    Provider(String),

    #[error("state store error: {0}")]
    State(#[from] gpulens_state::StateError),

    #[error("snapshot file error: {0}")]
    Io(#[from] std::io::Error),

    #[error("snapshot decode error: {0}")]
    Decode(#[from] serde_json::Error),
}

pub type DiagResult<T> = Result<T, DiagError>;

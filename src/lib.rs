//! # Codenav - precise code navigation over precomputed index bundles
//!
//! Answers "what is at this position in this file at this commit" queries -
//! hover text, definitions, references - from symbol index bundles that were
//! built for specific, possibly different, commits.
//!
//! Codenav provides:
//! - Position translation between commits through line-level diff hunks
//! - Candidate bundle selection with deterministic ordering
//! - Per-bundle hover/definition/reference lookups
//! - Cross-bundle (and cross-repository) symbol resolution via monikers
//! - A query orchestrator that owns translation back into the caller's commit

pub mod config;
pub mod context;
pub mod git;
pub mod position;
pub mod resolver;
pub mod selector;
pub mod server;
pub mod storage;
pub mod store;
pub mod translate;
pub mod upload;

#[cfg(test)]
pub(crate) mod testing;

// Re-exports for convenient access
pub use context::QueryContext;
pub use position::{Position, Range};
pub use resolver::{QueryResolver, SchemePriority};
pub use upload::{AdjustedUpload, Hover, Location, Moniker, MonikerKind, Upload, UploadState};

/// Result type alias for codenav operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for codenav operations.
///
/// "No data found" is never an error: empty results, missing hover text and
/// unmappable positions all surface as empty successes. The variants here
/// cover malformed input, collaborator failures (retryable) and ended
/// request contexts.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("bundle store {operation} failed for upload {upload_id}: {source}")]
    Store {
        upload_id: i64,
        operation: &'static str,
        #[source]
        source: anyhow::Error,
    },

    #[error("upload store {operation} failed: {source}")]
    MetadataStore {
        operation: &'static str,
        #[source]
        source: anyhow::Error,
    },

    #[error("query cancelled")]
    Cancelled,

    #[error("query deadline exceeded")]
    DeadlineExceeded,
}

impl Error {
    /// Whether retrying the same query may succeed. Collaborator failures
    /// are retryable; bad input and ended contexts are not.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::Store { .. } | Error::MetadataStore { .. })
    }
}

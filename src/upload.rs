//! Index bundle metadata and query result types.
//!
//! An `Upload` describes one index bundle: a precomputed, per-commit store
//! of symbol ranges, hover text, monikers and location tables for a
//! repository subtree. Upload rows are owned by the external upload
//! pipeline; this engine treats them as read-only and only ever queries
//! bundles in the `Completed` state.

use crate::position::{Position, Range};
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Lifecycle state of an upload, mutated exclusively by the upload pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UploadState {
    Queued,
    Processing,
    Completed,
    Errored,
    Deleted,
}

impl UploadState {
    pub fn as_str(&self) -> &'static str {
        match self {
            UploadState::Queued => "queued",
            UploadState::Processing => "processing",
            UploadState::Completed => "completed",
            UploadState::Errored => "errored",
            UploadState::Deleted => "deleted",
        }
    }
}

impl FromStr for UploadState {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "queued" => Ok(UploadState::Queued),
            "processing" => Ok(UploadState::Processing),
            "completed" => Ok(UploadState::Completed),
            "errored" => Ok(UploadState::Errored),
            "deleted" => Ok(UploadState::Deleted),
            _ => Err(Error::InvalidArgument(format!("unknown upload state: {}", s))),
        }
    }
}

impl std::fmt::Display for UploadState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One index bundle's identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Upload {
    pub id: i64,
    pub repository_id: i64,
    /// The commit the bundle was indexed at
    pub commit: String,
    /// Directory prefix the bundle was indexed under; empty for the
    /// repository root. Bundle-local paths are relative to this root.
    pub root: String,
    /// Name of the indexer that produced the bundle
    pub indexer: String,
    pub state: UploadState,
    /// Epoch seconds at which processing completed
    pub finished_at: Option<i64>,
}

impl Upload {
    /// Only completed uploads may be queried
    pub fn is_queryable(&self) -> bool {
        self.state == UploadState::Completed
    }
}

/// An upload paired with the caller's path and position translated into
/// that upload's coordinate space. Created per query, never persisted or
/// reused across queries.
#[derive(Debug, Clone)]
pub struct AdjustedUpload {
    pub upload: Upload,
    /// The queried path rewritten relative to the upload's root
    pub adjusted_path: String,
    /// The queried position in the upload's indexed commit
    pub adjusted_position: Position,
}

/// A resolved result location.
///
/// The path is bundle-root-relative and the range is expressed in the
/// bundle's indexed commit until the query resolver translates it back into
/// the caller's coordinates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
    pub upload_id: i64,
    pub path: String,
    pub range: Range,
}

/// Hover text with the range it applies to. Absence of hover data is
/// modelled as `Option<Hover>::None`, a valid non-error outcome.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Hover {
    pub text: String,
    pub range: Range,
}

/// Directionality of a moniker: export monikers mark where a symbol is
/// defined, import monikers mark a reference to a symbol defined elsewhere.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MonikerKind {
    Import,
    Export,
}

impl MonikerKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MonikerKind::Import => "import",
            MonikerKind::Export => "export",
        }
    }
}

impl FromStr for MonikerKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "import" => Ok(MonikerKind::Import),
            "export" => Ok(MonikerKind::Export),
            _ => Err(Error::InvalidArgument(format!("unknown moniker kind: {}", s))),
        }
    }
}

impl std::fmt::Display for MonikerKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A portable symbol identity used to join a usage site to its definition
/// site across bundles and repositories.
///
/// Monikers are compared on `(scheme, identifier)` only; `kind` determines
/// the directionality of the join, never equality.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Moniker {
    pub scheme: String,
    pub identifier: String,
    pub kind: MonikerKind,
    pub package_information_id: Option<String>,
}

impl Moniker {
    pub fn new(
        scheme: impl Into<String>,
        identifier: impl Into<String>,
        kind: MonikerKind,
    ) -> Self {
        Self {
            scheme: scheme.into(),
            identifier: identifier.into(),
            kind,
            package_information_id: None,
        }
    }

    /// Identity comparison: scheme and identifier, ignoring kind
    pub fn same_identity(&self, other: &Moniker) -> bool {
        self.scheme == other.scheme && self.identifier == other.identifier
    }
}

/// Which per-bundle location table a moniker search reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LocationTable {
    Definitions,
    References,
}

impl LocationTable {
    pub fn as_str(&self) -> &'static str {
        match self {
            LocationTable::Definitions => "definitions",
            LocationTable::References => "references",
        }
    }
}

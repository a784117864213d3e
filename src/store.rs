//! Collaborator trait interfaces.
//!
//! The query engine consumes its external services through narrow trait
//! objects so concrete backends can be substituted, including with
//! in-memory fakes under test: the bundle store holding the per-commit
//! index tables, the upload metadata store, and the commit-diff source
//! backing position translation.
//!
//! All coordinates passed to a `BundleStore` are zero-based line/character
//! pairs local to that bundle's indexed commit. Implementations return
//! `anyhow::Result`; the engine wraps failures with the offending upload id
//! and operation name so a store failure stays distinguishable from
//! "no data".

use crate::position::{Position, Range};
use crate::translate::DiffHunk;
use crate::upload::{Location, LocationTable, Moniker, Upload};
use async_trait::async_trait;

/// Read access to one bundle's symbol tables.
#[async_trait]
pub trait BundleStore: Send + Sync {
    /// Hover text and the range it applies to at a bundle-local position.
    /// `None` means no hover data there, which is not an error.
    async fn hover(
        &self,
        upload_id: i64,
        path: &str,
        position: Position,
    ) -> anyhow::Result<Option<(String, Range)>>;

    /// Definition locations for the symbol at a bundle-local position
    async fn definitions(
        &self,
        upload_id: i64,
        path: &str,
        position: Position,
    ) -> anyhow::Result<Vec<Location>>;

    /// Reference locations for the symbol at a bundle-local position, with
    /// a per-bundle `(limit, offset)` window and the bundle-wide total.
    async fn references(
        &self,
        upload_id: i64,
        path: &str,
        position: Position,
        limit: usize,
        offset: usize,
    ) -> anyhow::Result<(Vec<Location>, usize)>;

    /// Monikers attached to the range covering a bundle-local position
    async fn monikers_at(
        &self,
        upload_id: i64,
        path: &str,
        position: Position,
    ) -> anyhow::Result<Vec<Moniker>>;

    /// Locations recorded for a moniker in one bundle's definition or
    /// reference table, with a per-bundle window and the bundle-wide total.
    /// Matching is on `(scheme, identifier)` only.
    async fn moniker_locations(
        &self,
        upload_id: i64,
        moniker: &Moniker,
        table: LocationTable,
        limit: usize,
        offset: usize,
    ) -> anyhow::Result<(Vec<Location>, usize)>;
}

/// Read access to upload metadata.
#[async_trait]
pub trait UploadStore: Send + Sync {
    /// Completed uploads of a repository whose root covers `path`, in any
    /// order; the engine applies its own deterministic ordering.
    async fn uploads_covering_path(
        &self,
        repository_id: i64,
        path: &str,
    ) -> anyhow::Result<Vec<Upload>>;

    /// Completed uploads, in any repository, whose export-moniker index
    /// contains a matching `(scheme, identifier)`, most recently completed
    /// first. The only query that crosses repository boundaries.
    async fn uploads_with_export_moniker(&self, moniker: &Moniker) -> anyhow::Result<Vec<Upload>>;
}

/// Line-level diffs between two commits of a repository.
#[async_trait]
pub trait CommitDiffSource: Send + Sync {
    /// Hunks between `from_commit` and `to_commit` for one path. An empty
    /// list means the file is unchanged; `None` means the path does not
    /// exist at `to_commit`.
    async fn hunks(
        &self,
        repository_id: i64,
        from_commit: &str,
        to_commit: &str,
        path: &str,
    ) -> anyhow::Result<Option<Vec<DiffHunk>>>;
}

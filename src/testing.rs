//! In-memory fakes shared by the unit tests.
//!
//! Builder-style fixtures: register exactly the data a test needs, every
//! unregistered lookup is an empty success. Call counters let tests assert
//! which collaborators were consulted.

use crate::position::{Position, Range};
use crate::selector::strip_root;
use crate::store::{BundleStore, CommitDiffSource, UploadStore};
use crate::translate::DiffHunk;
use crate::upload::{Location, LocationTable, Moniker, Upload, UploadState};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio_util::sync::CancellationToken;

pub(crate) fn completed_upload(
    id: i64,
    repository_id: i64,
    commit: &str,
    root: &str,
    finished_at: Option<i64>,
) -> Upload {
    Upload {
        id,
        repository_id,
        commit: commit.to_string(),
        root: root.to_string(),
        indexer: "lsif-go".to_string(),
        state: UploadState::Completed,
        finished_at,
    }
}

pub(crate) fn location(
    upload_id: i64,
    path: &str,
    start_line: u32,
    start_character: u32,
    end_line: u32,
    end_character: u32,
) -> Location {
    Location {
        upload_id,
        path: path.to_string(),
        range: Range::new(
            Position::new(start_line, start_character),
            Position::new(end_line, end_character),
        ),
    }
}

type PositionKey = (i64, String, Position);

#[derive(Default)]
pub(crate) struct FakeBundleStore {
    hovers: HashMap<PositionKey, (String, Range)>,
    definitions: HashMap<PositionKey, Vec<Location>>,
    references: HashMap<PositionKey, Vec<Location>>,
    monikers: HashMap<PositionKey, Vec<Moniker>>,
    moniker_locations: Vec<(i64, Moniker, LocationTable, Vec<Location>)>,
    pub hover_calls: AtomicUsize,
    pub definitions_calls: AtomicUsize,
    pub references_calls: AtomicUsize,
    pub monikers_at_calls: AtomicUsize,
    pub moniker_locations_calls: AtomicUsize,
}

impl FakeBundleStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_hover(
        mut self,
        upload_id: i64,
        path: &str,
        position: Position,
        text: &str,
        range: Range,
    ) -> Self {
        self.hovers.insert(
            (upload_id, path.to_string(), position),
            (text.to_string(), range),
        );
        self
    }

    pub fn with_definitions(
        mut self,
        upload_id: i64,
        path: &str,
        position: Position,
        locations: Vec<Location>,
    ) -> Self {
        self.definitions
            .insert((upload_id, path.to_string(), position), locations);
        self
    }

    pub fn with_references(
        mut self,
        upload_id: i64,
        path: &str,
        position: Position,
        locations: Vec<Location>,
    ) -> Self {
        self.references
            .insert((upload_id, path.to_string(), position), locations);
        self
    }

    pub fn with_monikers(
        mut self,
        upload_id: i64,
        path: &str,
        position: Position,
        monikers: Vec<Moniker>,
    ) -> Self {
        self.monikers
            .insert((upload_id, path.to_string(), position), monikers);
        self
    }

    pub fn with_moniker_locations(
        mut self,
        upload_id: i64,
        moniker: Moniker,
        table: LocationTable,
        locations: Vec<Location>,
    ) -> Self {
        self.moniker_locations
            .push((upload_id, moniker, table, locations));
        self
    }
}

#[async_trait]
impl BundleStore for FakeBundleStore {
    async fn hover(
        &self,
        upload_id: i64,
        path: &str,
        position: Position,
    ) -> anyhow::Result<Option<(String, Range)>> {
        self.hover_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .hovers
            .get(&(upload_id, path.to_string(), position))
            .cloned())
    }

    async fn definitions(
        &self,
        upload_id: i64,
        path: &str,
        position: Position,
    ) -> anyhow::Result<Vec<Location>> {
        self.definitions_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .definitions
            .get(&(upload_id, path.to_string(), position))
            .cloned()
            .unwrap_or_default())
    }

    async fn references(
        &self,
        upload_id: i64,
        path: &str,
        position: Position,
        limit: usize,
        offset: usize,
    ) -> anyhow::Result<(Vec<Location>, usize)> {
        self.references_calls.fetch_add(1, Ordering::SeqCst);
        let all = self
            .references
            .get(&(upload_id, path.to_string(), position))
            .cloned()
            .unwrap_or_default();
        let page = all.iter().skip(offset).take(limit).cloned().collect();
        Ok((page, all.len()))
    }

    async fn monikers_at(
        &self,
        upload_id: i64,
        path: &str,
        position: Position,
    ) -> anyhow::Result<Vec<Moniker>> {
        self.monikers_at_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .monikers
            .get(&(upload_id, path.to_string(), position))
            .cloned()
            .unwrap_or_default())
    }

    async fn moniker_locations(
        &self,
        upload_id: i64,
        moniker: &Moniker,
        table: LocationTable,
        limit: usize,
        offset: usize,
    ) -> anyhow::Result<(Vec<Location>, usize)> {
        self.moniker_locations_calls.fetch_add(1, Ordering::SeqCst);
        let all: Vec<Location> = self
            .moniker_locations
            .iter()
            .filter(|(id, m, t, _)| *id == upload_id && m.same_identity(moniker) && *t == table)
            .flat_map(|(_, _, _, locations)| locations.clone())
            .collect();
        let page = all.iter().skip(offset).take(limit).cloned().collect();
        Ok((page, all.len()))
    }
}

#[derive(Default)]
pub(crate) struct FakeUploadStore {
    uploads: Vec<Upload>,
    exports: Vec<(String, String, i64)>,
    cancel_on_export: Option<CancellationToken>,
    pub export_calls: AtomicUsize,
}

impl FakeUploadStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_upload(mut self, upload: Upload) -> Self {
        self.uploads.push(upload);
        self
    }

    pub fn with_export(mut self, scheme: &str, identifier: &str, upload_id: i64) -> Self {
        self.exports
            .push((scheme.to_string(), identifier.to_string(), upload_id));
        self
    }

    /// Cancel this token from inside the next export lookup, simulating a
    /// caller giving up mid-fanout.
    pub fn cancel_on_export_lookup(mut self, token: CancellationToken) -> Self {
        self.cancel_on_export = Some(token);
        self
    }
}

#[async_trait]
impl UploadStore for FakeUploadStore {
    async fn uploads_covering_path(
        &self,
        repository_id: i64,
        path: &str,
    ) -> anyhow::Result<Vec<Upload>> {
        Ok(self
            .uploads
            .iter()
            .filter(|u| u.repository_id == repository_id && strip_root(&u.root, path).is_some())
            .cloned()
            .collect())
    }

    async fn uploads_with_export_moniker(
        &self,
        moniker: &Moniker,
    ) -> anyhow::Result<Vec<Upload>> {
        self.export_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(token) = &self.cancel_on_export {
            token.cancel();
        }
        let ids: Vec<i64> = self
            .exports
            .iter()
            .filter(|(scheme, identifier, _)| {
                *scheme == moniker.scheme && *identifier == moniker.identifier
            })
            .map(|(_, _, id)| *id)
            .collect();
        let mut matched: Vec<Upload> = self
            .uploads
            .iter()
            .filter(|u| ids.contains(&u.id))
            .cloned()
            .collect();
        matched.sort_by(|a, b| b.finished_at.cmp(&a.finished_at).then(b.id.cmp(&a.id)));
        Ok(matched)
    }
}

/// Diff fixture keyed on (from, to, path); unregistered combinations act as
/// unchanged files.
#[derive(Default)]
pub(crate) struct FakeDiffSource {
    hunks: HashMap<(String, String, String), Option<Vec<DiffHunk>>>,
}

impl FakeDiffSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_hunks(
        mut self,
        from_commit: &str,
        to_commit: &str,
        path: &str,
        hunks: Option<Vec<DiffHunk>>,
    ) -> Self {
        self.hunks.insert(
            (
                from_commit.to_string(),
                to_commit.to_string(),
                path.to_string(),
            ),
            hunks,
        );
        self
    }
}

#[async_trait]
impl CommitDiffSource for FakeDiffSource {
    async fn hunks(
        &self,
        _repository_id: i64,
        from_commit: &str,
        to_commit: &str,
        path: &str,
    ) -> anyhow::Result<Option<Vec<DiffHunk>>> {
        Ok(self
            .hunks
            .get(&(
                from_commit.to_string(),
                to_commit.to_string(),
                path.to_string(),
            ))
            .cloned()
            .unwrap_or(Some(Vec::new())))
    }
}

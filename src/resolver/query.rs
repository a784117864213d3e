//! Query orchestration.
//!
//! One `QueryResolver` serves one (repository, commit, path) request and
//! composes the pipeline: select uploads, local lookup in selection order
//! with first-non-empty-success winning, then the moniker fallback, then
//! translation of every returned location back into the caller's requested
//! commit. No bundle-local coordinates escape this module.
//!
//! "No data found" after exhausting all stages is a successful empty
//! result; only collaborator failures and ended contexts are errors.

use crate::context::QueryContext;
use crate::position::{Position, Range};
use crate::resolver::local::LocalResolver;
use crate::resolver::moniker::{MonikerResolver, SchemePriority};
use crate::selector::{join_root, UploadSelector};
use crate::store::{BundleStore, CommitDiffSource, UploadStore};
use crate::translate::PositionTranslator;
use crate::upload::{AdjustedUpload, Hover, Location, LocationTable, MonikerKind, Upload};
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Internal cap on moniker-resolved definition searches
const DEFINITIONS_LIMIT: usize = 100;

/// Operations slower than this log a warning
const SLOW_REQUEST_THRESHOLD: Duration = Duration::from_secs(1);

/// One page of reference locations with the merged total and, when more
/// data remains, an opaque cursor for the next page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferencePage {
    pub locations: Vec<Location>,
    pub total: usize,
    pub cursor: Option<String>,
}

impl ReferencePage {
    pub fn empty() -> Self {
        Self {
            locations: Vec::new(),
            total: 0,
            cursor: None,
        }
    }
}

/// Orchestrates hover, definition and reference queries for one
/// (repository, commit, path) triple.
pub struct QueryResolver {
    repository_id: i64,
    commit: String,
    path: String,
    local: LocalResolver,
    selector: UploadSelector,
    monikers: MonikerResolver,
    translator: PositionTranslator,
}

impl QueryResolver {
    pub fn new(
        bundles: Arc<dyn BundleStore>,
        uploads: Arc<dyn UploadStore>,
        diffs: Arc<dyn CommitDiffSource>,
        priority: SchemePriority,
        repository_id: i64,
        commit: impl Into<String>,
        path: impl Into<String>,
    ) -> Self {
        let translator = PositionTranslator::new(diffs);
        let local = LocalResolver::new(bundles);
        let selector = UploadSelector::new(uploads.clone(), translator.clone());
        let monikers = MonikerResolver::new(local.clone(), uploads, priority);
        Self {
            repository_id,
            commit: commit.into(),
            path: path.into(),
            local,
            selector,
            monikers,
            translator,
        }
    }

    /// Hover text for the symbol at `position`.
    ///
    /// Short-circuits on the first upload yielding non-empty text; only
    /// when every candidate misses does it chain through the
    /// definition-via-moniker search and read hover text from the defining
    /// bundle.
    pub async fn hover(&self, ctx: &QueryContext, position: Position) -> Result<Option<Hover>> {
        let started = Instant::now();
        let result = self.hover_inner(ctx, position).await;
        if let Ok(hover) = &result {
            tracing::debug!(
                repository_id = self.repository_id,
                commit = %self.commit,
                path = %self.path,
                line = position.line,
                character = position.character,
                found = hover.is_some(),
                "hover"
            );
        }
        self.log_slow("hover", started);
        result
    }

    async fn hover_inner(&self, ctx: &QueryContext, position: Position) -> Result<Option<Hover>> {
        let adjusted = self.select(ctx, position).await?;

        // Local phase: first upload with non-empty text wins.
        for au in &adjusted {
            let Some((text, range)) = self
                .local
                .hover(ctx, au.upload.id, &au.adjusted_path, au.adjusted_position)
                .await?
            else {
                continue;
            };
            if text.is_empty() {
                continue;
            }
            let range = self
                .range_in_requested_commit(ctx, &au.upload, range, position)
                .await?;
            return Ok(Some(Hover { text, range }));
        }

        // Remote phase: resolve the definition through import monikers and
        // read hover text from the defining bundle.
        let ordered = self
            .monikers
            .monikers_at_position(ctx, &adjusted, &[MonikerKind::Import])
            .await?;
        if ordered.is_empty() {
            return Ok(None);
        }
        let resolved = self
            .monikers
            .resolve_locations(ctx, &ordered, LocationTable::Definitions, DEFINITIONS_LIMIT, 0)
            .await?;
        for definition in &resolved.locations {
            let Some((text, _)) = self
                .local
                .hover(
                    ctx,
                    definition.upload_id,
                    &definition.path,
                    definition.range.start,
                )
                .await?
            else {
                continue;
            };
            if text.is_empty() {
                continue;
            }
            // The defining bundle's range belongs to another document; the
            // highlight collapses onto the requested position.
            return Ok(Some(Hover {
                text,
                range: Range::at(position),
            }));
        }
        Ok(None)
    }

    /// Definition locations for the symbol at `position`, expressed in the
    /// caller's commit for same-repository results.
    pub async fn definitions(
        &self,
        ctx: &QueryContext,
        position: Position,
    ) -> Result<Vec<Location>> {
        let started = Instant::now();
        let result = self.definitions_inner(ctx, position).await;
        if let Ok(locations) = &result {
            tracing::debug!(
                repository_id = self.repository_id,
                commit = %self.commit,
                path = %self.path,
                line = position.line,
                character = position.character,
                num_locations = locations.len(),
                "definitions"
            );
        }
        self.log_slow("definitions", started);
        result
    }

    async fn definitions_inner(
        &self,
        ctx: &QueryContext,
        position: Position,
    ) -> Result<Vec<Location>> {
        let adjusted = self.select(ctx, position).await?;

        for au in &adjusted {
            let locations = self
                .local
                .definitions(ctx, au.upload.id, &au.adjusted_path, au.adjusted_position)
                .await?;
            if locations.is_empty() {
                continue;
            }
            let uploads = upload_map(std::slice::from_ref(au));
            return self.translate_back_all(ctx, &uploads, locations).await;
        }

        let ordered = self
            .monikers
            .monikers_at_position(ctx, &adjusted, &[MonikerKind::Import])
            .await?;
        if ordered.is_empty() {
            return Ok(Vec::new());
        }
        let resolved = self
            .monikers
            .resolve_locations(ctx, &ordered, LocationTable::Definitions, DEFINITIONS_LIMIT, 0)
            .await?;
        self.translate_back_all(ctx, &resolved.uploads, resolved.locations)
            .await
    }

    /// One page of reference locations for the symbol at `position`.
    ///
    /// The local phase applies one global window across the adjusted
    /// uploads in selection order; the moniker phase runs only when the
    /// local phase found nothing at all, and the pagination contract is
    /// always completed - no short-circuit mid-page.
    pub async fn references(
        &self,
        ctx: &QueryContext,
        position: Position,
        limit: usize,
        cursor: Option<&str>,
    ) -> Result<ReferencePage> {
        let started = Instant::now();
        let result = self.references_inner(ctx, position, limit, cursor).await;
        if let Ok(page) = &result {
            tracing::debug!(
                repository_id = self.repository_id,
                commit = %self.commit,
                path = %self.path,
                line = position.line,
                character = position.character,
                num_locations = page.locations.len(),
                total = page.total,
                "references"
            );
        }
        self.log_slow("references", started);
        result
    }

    async fn references_inner(
        &self,
        ctx: &QueryContext,
        position: Position,
        limit: usize,
        cursor: Option<&str>,
    ) -> Result<ReferencePage> {
        let offset = decode_cursor(cursor)?;
        let adjusted = self.select(ctx, position).await?;

        // Local phase: one window over the uploads' merged reference lists.
        let mut page = Vec::new();
        let mut total = 0usize;
        let mut skip = offset;
        for au in &adjusted {
            let remaining = limit.saturating_sub(page.len());
            let (locations, bundle_total) = self
                .local
                .references(
                    ctx,
                    au.upload.id,
                    &au.adjusted_path,
                    au.adjusted_position,
                    remaining,
                    skip,
                )
                .await?;
            total += bundle_total;
            page.extend(locations.into_iter().take(remaining));
            skip = skip.saturating_sub(bundle_total);
        }
        if total > 0 {
            let cursor = next_cursor(offset, page.len(), total);
            let uploads = upload_map(&adjusted);
            let locations = self.translate_back_all(ctx, &uploads, page).await?;
            return Ok(ReferencePage {
                locations,
                total,
                cursor,
            });
        }

        // Remote phase: both moniker kinds participate in a reference search.
        let ordered = self
            .monikers
            .monikers_at_position(ctx, &adjusted, &[MonikerKind::Import, MonikerKind::Export])
            .await?;
        if ordered.is_empty() {
            return Ok(ReferencePage::empty());
        }
        let resolved = self
            .monikers
            .resolve_locations(ctx, &ordered, LocationTable::References, limit, offset)
            .await?;
        let cursor = next_cursor(offset, resolved.locations.len(), resolved.total);
        let locations = self
            .translate_back_all(ctx, &resolved.uploads, resolved.locations)
            .await?;
        Ok(ReferencePage {
            locations,
            total: resolved.total,
            cursor,
        })
    }

    async fn select(&self, ctx: &QueryContext, position: Position) -> Result<Vec<AdjustedUpload>> {
        self.selector
            .select_uploads(ctx, self.repository_id, &self.commit, &self.path, position)
            .await
    }

    /// Re-express locations in coordinates the caller may see: the bundle
    /// root is re-attached to each path, and same-repository locations are
    /// mapped from their indexed commit to the requested commit. A location
    /// without a mapping is dropped, not an error. Cross-repository
    /// locations keep their own repository's indexed-commit coordinates.
    async fn translate_back_all(
        &self,
        ctx: &QueryContext,
        uploads: &HashMap<i64, Upload>,
        locations: Vec<Location>,
    ) -> Result<Vec<Location>> {
        let mut out = Vec::with_capacity(locations.len());
        for location in locations {
            let Some(upload) = uploads.get(&location.upload_id) else {
                continue;
            };
            let path = join_root(&upload.root, &location.path);
            if upload.repository_id != self.repository_id {
                out.push(Location {
                    upload_id: location.upload_id,
                    path,
                    range: location.range,
                });
                continue;
            }
            match self
                .translator
                .translate_range(
                    ctx,
                    self.repository_id,
                    &upload.commit,
                    &self.commit,
                    &path,
                    location.range,
                )
                .await?
            {
                Some(range) => out.push(Location {
                    upload_id: location.upload_id,
                    path,
                    range,
                }),
                None => {
                    tracing::debug!(
                        upload_id = location.upload_id,
                        path = %path,
                        "dropping location without mapping to requested commit"
                    );
                }
            }
        }
        Ok(out)
    }

    /// Map a hover range from an upload's indexed commit back to the
    /// requested commit, collapsing onto the queried position when no
    /// mapping exists.
    async fn range_in_requested_commit(
        &self,
        ctx: &QueryContext,
        upload: &Upload,
        range: Range,
        fallback: Position,
    ) -> Result<Range> {
        let translated = self
            .translator
            .translate_range(
                ctx,
                self.repository_id,
                &upload.commit,
                &self.commit,
                &self.path,
                range,
            )
            .await?;
        Ok(translated.unwrap_or_else(|| Range::at(fallback)))
    }

    fn log_slow(&self, operation: &'static str, started: Instant) {
        let elapsed = started.elapsed();
        if elapsed > SLOW_REQUEST_THRESHOLD {
            tracing::warn!(
                operation,
                repository_id = self.repository_id,
                commit = %self.commit,
                path = %self.path,
                elapsed_ms = elapsed.as_millis() as u64,
                "slow code navigation request"
            );
        }
    }
}

fn upload_map(adjusted: &[AdjustedUpload]) -> HashMap<i64, Upload> {
    adjusted
        .iter()
        .map(|au| (au.upload.id, au.upload.clone()))
        .collect()
}

/// Encode a pagination offset as an opaque cursor. Callers must treat the
/// value as a token; its layout may change.
pub(crate) fn encode_cursor(offset: usize) -> String {
    format!("o{offset:x}")
}

/// Decode a cursor back into an offset; `None` starts at the beginning.
pub(crate) fn decode_cursor(cursor: Option<&str>) -> Result<usize> {
    let Some(cursor) = cursor else {
        return Ok(0);
    };
    cursor
        .strip_prefix('o')
        .and_then(|digits| usize::from_str_radix(digits, 16).ok())
        .ok_or_else(|| Error::InvalidArgument(format!("malformed cursor: {cursor}")))
}

/// Cursor for the page after `fetched` items were served from `offset`,
/// or `None` when the sequence is exhausted.
fn next_cursor(offset: usize, fetched: usize, total: usize) -> Option<String> {
    let consumed = offset.min(total) + fetched;
    if consumed < total {
        Some(encode_cursor(offset + fetched))
    } else {
        None
    }
}

//! Cross-bundle symbol resolution.
//!
//! When no bundle contains an answer at the position itself, the engine
//! falls back to monikers: portable symbol identities joined across
//! bundles, and across repositories, on `(scheme, identifier)`. This is the
//! only place the system crosses repository boundaries.
//!
//! Moniker ordering is deterministic by contract - repeated queries must
//! return identical results across process restarts - so monikers are
//! sorted by an injected scheme-priority table, then by identifier.

use crate::context::QueryContext;
use crate::resolver::local::LocalResolver;
use crate::store::UploadStore;
use crate::upload::{AdjustedUpload, Location, LocationTable, Moniker, MonikerKind, Upload};
use crate::{Error, Result};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

/// Scheme-to-rank table injected into moniker ordering. Lower rank wins;
/// unlisted schemes rank last.
#[derive(Debug, Clone, Default)]
pub struct SchemePriority {
    ranks: HashMap<String, usize>,
}

impl SchemePriority {
    /// Build from schemes listed most preferred first
    pub fn new<I, S>(schemes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let ranks = schemes
            .into_iter()
            .enumerate()
            .map(|(rank, scheme)| (scheme.into(), rank))
            .collect();
        Self { ranks }
    }

    pub fn rank(&self, scheme: &str) -> usize {
        self.ranks.get(scheme).copied().unwrap_or(usize::MAX)
    }
}

/// Deduplicate on `(scheme, identifier)` and order by scheme rank, then
/// scheme name, then identifier. Part of the query contract, not an
/// optimization.
pub fn order_monikers(priority: &SchemePriority, monikers: Vec<Moniker>) -> Vec<Moniker> {
    let mut seen = HashSet::new();
    let mut ordered: Vec<Moniker> = monikers
        .into_iter()
        .filter(|m| seen.insert((m.scheme.clone(), m.identifier.clone())))
        .collect();
    ordered.sort_by(|a, b| {
        priority
            .rank(&a.scheme)
            .cmp(&priority.rank(&b.scheme))
            .then_with(|| a.scheme.cmp(&b.scheme))
            .then_with(|| a.identifier.cmp(&b.identifier))
    });
    ordered
}

/// Locations resolved through the moniker join, together with the metadata
/// of every bundle that contributed, keyed by upload id.
#[derive(Debug)]
pub struct ResolvedLocations {
    pub locations: Vec<Location>,
    pub total: usize,
    pub uploads: HashMap<i64, Upload>,
}

impl ResolvedLocations {
    pub fn empty() -> Self {
        Self {
            locations: Vec::new(),
            total: 0,
            uploads: HashMap::new(),
        }
    }
}

pub struct MonikerResolver {
    local: LocalResolver,
    uploads: Arc<dyn UploadStore>,
    priority: SchemePriority,
}

impl MonikerResolver {
    pub fn new(
        local: LocalResolver,
        uploads: Arc<dyn UploadStore>,
        priority: SchemePriority,
    ) -> Self {
        Self {
            local,
            uploads,
            priority,
        }
    }

    /// Monikers attached to the range covering each adjusted position,
    /// restricted to `kinds`, deduplicated and ordered deterministically.
    pub async fn monikers_at_position(
        &self,
        ctx: &QueryContext,
        adjusted: &[AdjustedUpload],
        kinds: &[MonikerKind],
    ) -> Result<Vec<Moniker>> {
        let mut collected = Vec::new();
        for au in adjusted {
            let monikers = self
                .local
                .monikers_at(ctx, au.upload.id, &au.adjusted_path, au.adjusted_position)
                .await?;
            collected.extend(monikers.into_iter().filter(|m| kinds.contains(&m.kind)));
        }
        Ok(order_monikers(&self.priority, collected))
    }

    /// Fan out to bundles exporting one of `monikers` and page across their
    /// location tables.
    ///
    /// The fan-out is bounded: for definitions it stops at the first
    /// moniker that yields at least one bundle; for references it
    /// accumulates candidate bundles across all monikers and leaves the
    /// bounding to the page window.
    pub async fn resolve_locations(
        &self,
        ctx: &QueryContext,
        monikers: &[Moniker],
        table: LocationTable,
        limit: usize,
        offset: usize,
    ) -> Result<ResolvedLocations> {
        let mut pairs: Vec<(Upload, Moniker)> = Vec::new();
        let mut seen: HashSet<(i64, String, String)> = HashSet::new();

        for moniker in monikers {
            ctx.check()?;
            let candidates = self
                .uploads
                .uploads_with_export_moniker(moniker)
                .await
                .map_err(|source| Error::MetadataStore {
                    operation: "uploads_with_export_moniker",
                    source,
                })?;

            let mut found = false;
            for upload in candidates.into_iter().filter(Upload::is_queryable) {
                if seen.insert((upload.id, moniker.scheme.clone(), moniker.identifier.clone())) {
                    pairs.push((upload, moniker.clone()));
                    found = true;
                }
            }
            if found && table == LocationTable::Definitions {
                break;
            }
        }
        tracing::debug!(
            num_monikers = monikers.len(),
            num_bundles = pairs.len(),
            table = table.as_str(),
            "moniker fan-out"
        );

        let mut uploads = HashMap::new();
        for (upload, _) in &pairs {
            uploads.entry(upload.id).or_insert_with(|| upload.clone());
        }

        let (locations, total) = self.paged_locations(ctx, &pairs, table, limit, offset).await?;
        Ok(ResolvedLocations {
            locations,
            total,
            uploads,
        })
    }

    /// One global `(limit, offset)` window over the concatenation of each
    /// pair's location list, in pair order - stable and reproducible, never
    /// score-sorted. An offset beyond the merged total yields an empty page
    /// with the correct total.
    async fn paged_locations(
        &self,
        ctx: &QueryContext,
        pairs: &[(Upload, Moniker)],
        table: LocationTable,
        limit: usize,
        offset: usize,
    ) -> Result<(Vec<Location>, usize)> {
        let mut locations = Vec::new();
        let mut total = 0usize;
        let mut skip = offset;

        for (upload, moniker) in pairs {
            let remaining = limit.saturating_sub(locations.len());
            let (page, bundle_total) = self
                .local
                .moniker_locations(ctx, upload.id, moniker, table, remaining, skip)
                .await?;
            total += bundle_total;
            locations.extend(page.into_iter().take(remaining));
            skip = skip.saturating_sub(bundle_total);
        }

        Ok((locations, total))
    }
}

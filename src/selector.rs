//! Candidate upload selection.
//!
//! Given a (repository, commit, path, position), produces the ordered list
//! of adjusted uploads the resolver will query: completed uploads whose
//! root covers the path, longest root first to prefer narrower indexes,
//! then most recently completed to prefer fresher ones. The caller's
//! position is translated into each upload's indexed commit; uploads the
//! position does not map into are skipped individually.

use crate::context::QueryContext;
use crate::position::Position;
use crate::store::UploadStore;
use crate::translate::PositionTranslator;
use crate::upload::{AdjustedUpload, Upload};
use crate::{Error, Result};
use std::sync::Arc;

#[derive(Clone)]
pub struct UploadSelector {
    uploads: Arc<dyn UploadStore>,
    translator: PositionTranslator,
}

impl UploadSelector {
    pub fn new(uploads: Arc<dyn UploadStore>, translator: PositionTranslator) -> Self {
        Self { uploads, translator }
    }

    /// Ordered candidate uploads with the caller's position translated into
    /// each one's indexed commit. An empty result is valid and means
    /// "no data", not an error.
    pub async fn select_uploads(
        &self,
        ctx: &QueryContext,
        repository_id: i64,
        commit: &str,
        path: &str,
        position: Position,
    ) -> Result<Vec<AdjustedUpload>> {
        ctx.check()?;
        let mut candidates = self
            .uploads
            .uploads_covering_path(repository_id, path)
            .await
            .map_err(|source| Error::MetadataStore {
                operation: "uploads_covering_path",
                source,
            })?;
        candidates.retain(|upload| upload.is_queryable());
        order_uploads(&mut candidates);

        let mut adjusted = Vec::with_capacity(candidates.len());
        for upload in candidates {
            let Some(adjusted_path) = strip_root(&upload.root, path) else {
                continue;
            };
            match self
                .translator
                .translate_position(ctx, repository_id, commit, &upload.commit, path, position)
                .await?
            {
                Some(adjusted_position) => adjusted.push(AdjustedUpload {
                    upload,
                    adjusted_path,
                    adjusted_position,
                }),
                None => {
                    tracing::debug!(
                        upload_id = upload.id,
                        upload_commit = %upload.commit,
                        "position does not map into upload commit, skipping"
                    );
                }
            }
        }
        tracing::debug!(
            repository_id,
            commit,
            path,
            num_uploads = adjusted.len(),
            "selected uploads"
        );
        Ok(adjusted)
    }
}

/// Deterministic candidate ordering: longest root first, then most recently
/// completed, then newest id as a tiebreak.
pub(crate) fn order_uploads(uploads: &mut [Upload]) {
    uploads.sort_by(|a, b| {
        b.root
            .len()
            .cmp(&a.root.len())
            .then(b.finished_at.cmp(&a.finished_at))
            .then(b.id.cmp(&a.id))
    });
}

/// Rewrite `path` relative to an upload root. Roots are directory prefixes
/// stored with or without a trailing slash; an empty root covers the whole
/// repository. Returns `None` when the root does not actually cover the
/// path.
pub(crate) fn strip_root(root: &str, path: &str) -> Option<String> {
    if root.is_empty() || root == "/" {
        return Some(path.to_string());
    }
    let root = root.trim_end_matches('/');
    let rest = path.strip_prefix(root)?;
    let rest = rest.strip_prefix('/')?;
    Some(rest.to_string())
}

/// Re-attach an upload root to a bundle-relative path.
pub(crate) fn join_root(root: &str, path: &str) -> String {
    let root = root.trim_end_matches('/');
    if root.is_empty() {
        path.to_string()
    } else {
        format!("{}/{}", root, path)
    }
}

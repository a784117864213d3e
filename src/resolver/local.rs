//! Single-bundle lookups.
//!
//! Thin pass-through into the bundle store: no resolution logic beyond
//! cancellation checks and error wrapping. A store failure is annotated
//! with the failing upload id and operation name and propagated, never
//! silently treated as a miss.

use crate::context::QueryContext;
use crate::position::{Position, Range};
use crate::store::BundleStore;
use crate::upload::{Location, LocationTable, Moniker};
use crate::{Error, Result};
use std::sync::Arc;

#[derive(Clone)]
pub struct LocalResolver {
    bundles: Arc<dyn BundleStore>,
}

impl LocalResolver {
    pub fn new(bundles: Arc<dyn BundleStore>) -> Self {
        Self { bundles }
    }

    pub async fn hover(
        &self,
        ctx: &QueryContext,
        upload_id: i64,
        path: &str,
        position: Position,
    ) -> Result<Option<(String, Range)>> {
        ctx.check()?;
        self.bundles
            .hover(upload_id, path, position)
            .await
            .map_err(|source| Error::Store {
                upload_id,
                operation: "hover",
                source,
            })
    }

    pub async fn definitions(
        &self,
        ctx: &QueryContext,
        upload_id: i64,
        path: &str,
        position: Position,
    ) -> Result<Vec<Location>> {
        ctx.check()?;
        self.bundles
            .definitions(upload_id, path, position)
            .await
            .map_err(|source| Error::Store {
                upload_id,
                operation: "definitions",
                source,
            })
    }

    pub async fn references(
        &self,
        ctx: &QueryContext,
        upload_id: i64,
        path: &str,
        position: Position,
        limit: usize,
        offset: usize,
    ) -> Result<(Vec<Location>, usize)> {
        ctx.check()?;
        self.bundles
            .references(upload_id, path, position, limit, offset)
            .await
            .map_err(|source| Error::Store {
                upload_id,
                operation: "references",
                source,
            })
    }

    pub async fn monikers_at(
        &self,
        ctx: &QueryContext,
        upload_id: i64,
        path: &str,
        position: Position,
    ) -> Result<Vec<Moniker>> {
        ctx.check()?;
        self.bundles
            .monikers_at(upload_id, path, position)
            .await
            .map_err(|source| Error::Store {
                upload_id,
                operation: "monikers_at",
                source,
            })
    }

    pub async fn moniker_locations(
        &self,
        ctx: &QueryContext,
        upload_id: i64,
        moniker: &Moniker,
        table: LocationTable,
        limit: usize,
        offset: usize,
    ) -> Result<(Vec<Location>, usize)> {
        ctx.check()?;
        self.bundles
            .moniker_locations(upload_id, moniker, table, limit, offset)
            .await
            .map_err(|source| Error::Store {
                upload_id,
                operation: "moniker_locations",
                source,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    struct BrokenBundleStore;

    #[async_trait]
    impl BundleStore for BrokenBundleStore {
        async fn hover(
            &self,
            _upload_id: i64,
            _path: &str,
            _position: Position,
        ) -> anyhow::Result<Option<(String, Range)>> {
            anyhow::bail!("disk on fire")
        }

        async fn definitions(
            &self,
            _upload_id: i64,
            _path: &str,
            _position: Position,
        ) -> anyhow::Result<Vec<Location>> {
            anyhow::bail!("disk on fire")
        }

        async fn references(
            &self,
            _upload_id: i64,
            _path: &str,
            _position: Position,
            _limit: usize,
            _offset: usize,
        ) -> anyhow::Result<(Vec<Location>, usize)> {
            anyhow::bail!("disk on fire")
        }

        async fn monikers_at(
            &self,
            _upload_id: i64,
            _path: &str,
            _position: Position,
        ) -> anyhow::Result<Vec<Moniker>> {
            anyhow::bail!("disk on fire")
        }

        async fn moniker_locations(
            &self,
            _upload_id: i64,
            _moniker: &Moniker,
            _table: LocationTable,
            _limit: usize,
            _offset: usize,
        ) -> anyhow::Result<(Vec<Location>, usize)> {
            anyhow::bail!("disk on fire")
        }
    }

    #[tokio::test]
    async fn test_store_failures_carry_upload_id_and_operation() {
        let resolver = LocalResolver::new(Arc::new(BrokenBundleStore));
        let ctx = QueryContext::new();

        let err = resolver
            .hover(&ctx, 17, "a.go", Position::new(0, 0))
            .await
            .unwrap_err();
        match &err {
            Error::Store {
                upload_id,
                operation,
                ..
            } => {
                assert_eq!(*upload_id, 17);
                assert_eq!(*operation, "hover");
            }
            other => panic!("expected store error, got {other:?}"),
        }
        assert!(err.is_retryable());
        assert!(err.to_string().contains("upload 17"));
    }

    #[tokio::test]
    async fn test_cancelled_context_short_circuits_before_store_call() {
        let resolver = LocalResolver::new(Arc::new(BrokenBundleStore));
        let ctx = QueryContext::new();
        ctx.cancellation_token().cancel();

        let err = resolver
            .definitions(&ctx, 1, "a.go", Position::new(0, 0))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Cancelled));
    }
}

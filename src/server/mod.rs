use crate::resolver::{QueryResolver, SchemePriority};
use crate::store::{BundleStore, CommitDiffSource, UploadStore};
use crate::QueryContext;
use axum::{routing::get, Router};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub mod routes;

/// Server state
pub struct AppState {
    pub bundles: Arc<dyn BundleStore>,
    pub uploads: Arc<dyn UploadStore>,
    pub diffs: Arc<dyn CommitDiffSource>,
    pub scheme_priority: SchemePriority,
    pub request_timeout: Duration,
}

impl AppState {
    /// A resolver scoped to one request's (repository, commit, path)
    pub fn resolver(&self, repository_id: i64, commit: &str, path: &str) -> QueryResolver {
        QueryResolver::new(
            self.bundles.clone(),
            self.uploads.clone(),
            self.diffs.clone(),
            self.scheme_priority.clone(),
            repository_id,
            commit,
            path,
        )
    }

    /// A fresh per-request context carrying the configured timeout
    pub fn context(&self) -> QueryContext {
        QueryContext::with_timeout(self.request_timeout)
    }
}

pub async fn start_server(port: u16, state: AppState) -> anyhow::Result<()> {
    let app = Router::new()
        .route("/hover", get(routes::get_hover))
        .route("/definitions", get(routes::get_definitions))
        .route("/references", get(routes::get_references))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(Arc::new(state));

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!("Starting server on {}", addr);
    println!("🌍 Server running at http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

//! HTTP server assembly for Outreach.
//!
//! Wires a [`SqliteStore`] into the [`outreach_api`] router under `/api`
//! and wraps it in a per-request trace layer.

pub mod seed;
pub mod settings;

use std::sync::Arc;

use axum::Router;
use outreach_store_sqlite::SqliteStore;
use tower_http::trace::TraceLayer;

pub use settings::{ConfigError, ServerConfig};

/// Build the full application router for `store`.
pub fn app(store: Arc<SqliteStore>, config: &ServerConfig) -> Router {
  Router::new()
    .nest("/api", outreach_api::api_router(store, config.api_config()))
    .layer(TraceLayer::new_for_http())
}

#[cfg(test)]
mod tests {
  use super::*;
  use axum::{
    body::Body,
    http::{Request, StatusCode},
  };
  use tower::ServiceExt as _;

  async fn test_app() -> Router {
    let store = SqliteStore::open_in_memory().await.expect("in-memory store");
    app(Arc::new(store), &ServerConfig::default())
  }

  #[tokio::test]
  async fn api_is_mounted_under_prefix() {
    let app = test_app().await;
    let req = Request::builder().uri("/api/campaigns").body(Body::empty()).unwrap();
    let resp = app.oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
  }

  #[tokio::test]
  async fn unknown_paths_are_404() {
    let app = test_app().await;
    let req = Request::builder().uri("/campaigns").body(Body::empty()).unwrap();
    let resp = app.oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
  }
}

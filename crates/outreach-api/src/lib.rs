//! JSON REST API for Outreach.
//!
//! Exposes an axum [`Router`] backed by any
//! [`outreach_core::store::OutreachStore`]. TLS and transport concerns are
//! the caller's responsibility.
//!
//! # Mounting
//!
//! ```rust,ignore
//! .nest("/api", outreach_api::api_router(store.clone(), ApiConfig::default()))
//! ```

pub mod auth;
pub mod campaigns;
pub mod error;
pub mod leads;


use std::{future::Future, sync::Arc, time::Duration};

use axum::{
  Router,
  routing::{get, patch, post},
};
use outreach_core::store::OutreachStore;
use serde::Serialize;

pub use error::ApiError;

// ─── Configuration ───────────────────────────────────────────────────────────

/// Runtime knobs for the API layer.
#[derive(Debug, Clone)]
pub struct ApiConfig {
  /// Requests without a valid session act as `demo_user_id`.
  pub demo_mode:       bool,
  pub demo_user_id:    Option<String>,
  /// Upper bound on every storage call made while serving a request.
  pub request_timeout: Duration,
  /// Lifetime of sessions opened by sign-up and sign-in.
  pub session_ttl:     chrono::Duration,
}

impl Default for ApiConfig {
  fn default() -> Self {
    Self {
      demo_mode:       false,
      demo_user_id:    None,
      request_timeout: Duration::from_secs(30),
      session_ttl:     chrono::Duration::hours(168),
    }
  }
}

// ─── Application state ───────────────────────────────────────────────────────

/// Shared state threaded through all handlers.
pub struct ApiState<S> {
  pub store:  Arc<S>,
  pub config: Arc<ApiConfig>,
}

impl<S> Clone for ApiState<S> {
  fn clone(&self) -> Self {
    Self { store: Arc::clone(&self.store), config: Arc::clone(&self.config) }
  }
}

impl<S: OutreachStore> ApiState<S> {
  /// Await a store call under the configured request timeout.
  pub async fn bounded<T, F>(&self, call: F) -> Result<T, ApiError>
  where
    F: Future<Output = Result<T, S::Error>>,
  {
    match tokio::time::timeout(self.config.request_timeout, call).await {
      Ok(Ok(value)) => Ok(value),
      Ok(Err(e)) => {
        let core: outreach_core::Error = e.into();
        Err(core.into())
      }
      Err(_) => {
        tracing::warn!(timeout = ?self.config.request_timeout, "store call timed out");
        Err(ApiError::RequestTimeout)
      }
    }
  }
}

/// `{"success": true}`, the body of every successful delete.
#[derive(Debug, Serialize)]
pub struct Deleted {
  pub success: bool,
}

impl Deleted {
  pub const OK: Deleted = Deleted { success: true };
}

// ─── Router ──────────────────────────────────────────────────────────────────

/// Build the API router for `store`.
///
/// The returned `Router<()>` can be nested into any parent router regardless
/// of its own state type.
pub fn api_router<S>(store: Arc<S>, config: ApiConfig) -> Router<()>
where
  S: OutreachStore + 'static,
{
  Router::new()
    // Auth
    .route("/auth/sign-up", post(auth::sign_up::<S>))
    .route("/auth/sign-in", post(auth::sign_in::<S>))
    .route("/auth/sign-out", post(auth::sign_out::<S>))
    .route("/auth/me", get(auth::me).patch(auth::update_me::<S>))
    // Campaigns
    .route("/campaigns", get(campaigns::list::<S>).post(campaigns::create::<S>))
    .route(
      "/campaigns/{id}",
      get(campaigns::get_one::<S>)
        .patch(campaigns::update::<S>)
        .delete(campaigns::delete::<S>),
    )
    .route("/campaigns/{id}/leads", get(campaigns::leads::<S>))
    // Leads
    .route("/leads", get(leads::list::<S>).post(leads::create::<S>))
    .route(
      "/leads/{id}",
      get(leads::get_one::<S>)
        .patch(leads::update::<S>)
        .delete(leads::delete::<S>),
    )
    .route("/leads/{id}/status", patch(leads::set_status::<S>))
    .with_state(ApiState { store, config: Arc::new(config) })
}

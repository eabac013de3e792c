//! JSON REST API for Pathway.
//!
//! Exposes an axum [`Router`] backed by any
//! [`pathway_core::store::EventStore`]. Request bodies are capped at the
//! configured `max_payload_size`; when an `api_key` is configured, write
//! endpoints require it in `X-API-Key`. TLS and transport concerns are the
//! caller's responsibility.
//!
//! # Mounting
//!
//! ```rust,ignore
//! let state = AppState::new(store, config);
//! axum::serve(listener, pathway_api::router(state)).await?;
//! ```

pub mod auth;
pub mod error;
pub mod events;
pub mod sessions;

use std::sync::Arc;

use axum::{
  extract::DefaultBodyLimit,
  routing::{get, post},
  Router,
};
use pathway_core::{store::EventStore, Config};

pub use error::ApiError;

// ─── Application state ───────────────────────────────────────────────────────

/// Shared state threaded through all axum handlers.
#[derive(Clone)]
pub struct AppState<S: EventStore> {
  pub store:  Arc<S>,
  pub config: Arc<Config>,
}

impl<S: EventStore> AppState<S> {
  pub fn new(store: S, config: Config) -> Self {
    Self {
      store:  Arc::new(store),
      config: Arc::new(config),
    }
  }
}

// ─── Router ──────────────────────────────────────────────────────────────────

/// Build a fully-materialised API router for `state`.
pub fn router<S>(state: AppState<S>) -> Router
where
  S: EventStore + Clone + Send + Sync + 'static,
{
  let body_limit = state.config.max_payload_size;

  Router::new()
    .route("/events", post(events::append::<S>))
    .route("/event/{event_id}", get(events::get_one::<S>))
    .route("/session/{session_id}/state", get(sessions::state::<S>))
    .route("/session/{session_id}/events", get(sessions::events::<S>))
    .route("/sessions", get(sessions::list::<S>))
    .with_state(state)
    .layer(DefaultBodyLimit::max(body_limit))
}

// ─── Integration tests ───────────────────────────────────────────────────────


// ─── Shared test helpers ─────────────────────────────────────────────────────

#[cfg(test)]
pub(crate) mod test_helpers {
  use pathway_core::Config;
  use pathway_store_sqlite::SqliteStore;

  use crate::AppState;

  pub(crate) async fn make_state(
    api_key: Option<&str>,
  ) -> AppState<SqliteStore> {
    let store = SqliteStore::open_in_memory().await.unwrap();
    let config = Config {
      db_path: ":memory:".to_string(),
      api_key: api_key.map(str::to_string),
      ..Config::default()
    };
    AppState::new(store, config)
  }
}

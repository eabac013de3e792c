//! Handlers for session endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET` | `/sessions` | Session summaries |
//! | `GET` | `/session/:id/state` | Derived [`SessionState`]; 404 if empty |
//! | `GET` | `/session/:id/events` | Raw events; optional `type`, `head_id`, `seq_min`, `seq_max`, `limit`, `offset`, `order` |

use axum::{
  extract::{Path, Query, State},
  Json,
};
use pathway_core::{
  event::{Event, EventKind},
  reduce::reduce_session_state,
  store::{EventFilter, EventStore, Order, SessionSummary},
  validate,
  view::SessionState,
};
use serde::Deserialize;

use crate::{error::ApiError, AppState};

// ─── State ───────────────────────────────────────────────────────────────────

/// `GET /session/:session_id/state`
pub async fn state<S>(
  State(app): State<AppState<S>>,
  Path(session_id): Path<String>,
) -> Result<Json<SessionState>, ApiError>
where
  S: EventStore + Clone + Send + Sync + 'static,
{
  check_session_id(&app, &session_id)?;

  let events = app
    .store
    .get_events(&session_id, &EventFilter::default())
    .await?;
  if events.is_empty() {
    return Err(ApiError::NotFound(format!(
      "session {session_id} not found"
    )));
  }

  Ok(Json(reduce_session_state(&session_id, &events)))
}

// ─── Events ──────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct EventsParams {
  /// Matches the envelope's wire field name.
  #[serde(rename = "type")]
  pub kind:    Option<EventKind>,
  pub head_id: Option<String>,
  pub seq_min: Option<i64>,
  pub seq_max: Option<i64>,
  pub limit:   Option<usize>,
  pub offset:  Option<usize>,
  pub order:   Option<Order>,
}

/// `GET /session/:session_id/events[?type=...&head_id=...&...]`
pub async fn events<S>(
  State(app): State<AppState<S>>,
  Path(session_id): Path<String>,
  Query(params): Query<EventsParams>,
) -> Result<Json<Vec<Event>>, ApiError>
where
  S: EventStore + Clone + Send + Sync + 'static,
{
  check_session_id(&app, &session_id)?;

  if !app.store.session_exists(&session_id).await? {
    return Err(ApiError::NotFound(format!(
      "session {session_id} not found"
    )));
  }

  let filter = EventFilter {
    kind:    params.kind,
    head_id: params.head_id,
    seq_min: params.seq_min,
    seq_max: params.seq_max,
    limit:   params.limit,
    offset:  params.offset,
    order:   params.order.unwrap_or_default(),
  };

  Ok(Json(app.store.get_events(&session_id, &filter).await?))
}

// ─── List ────────────────────────────────────────────────────────────────────

/// `GET /sessions`
pub async fn list<S>(
  State(app): State<AppState<S>>,
) -> Result<Json<Vec<SessionSummary>>, ApiError>
where
  S: EventStore + Clone + Send + Sync + 'static,
{
  Ok(Json(app.store.list_sessions().await?))
}

// ─── Helpers ─────────────────────────────────────────────────────────────────

fn check_session_id<S: EventStore>(
  app: &AppState<S>,
  session_id: &str,
) -> Result<(), ApiError> {
  validate::validate_session_id_with(
    session_id,
    app.config.session_id_max_length,
  )?;
  Ok(())
}

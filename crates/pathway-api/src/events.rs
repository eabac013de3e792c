//! Handlers for event endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `POST` | `/events` | Body: [`AppendBody`]; returns 201 + stored envelope |
//! | `GET`  | `/event/:id` | Single envelope; 404 if absent |

use axum::{
  extract::{Path, State},
  http::StatusCode,
  response::IntoResponse,
  Json,
};
use chrono::{DateTime, Utc};
use pathway_core::{
  event::{Actor, Event, EventKind, JsonMap},
  store::{EventStore, NewEvent},
  validate,
};
use serde::Deserialize;

use crate::{auth::Authenticated, error::ApiError, AppState};

// ─── Append ──────────────────────────────────────────────────────────────────

/// JSON body accepted by `POST /events`.
///
/// `event_id`, `seq`, `ts`, and `actor` are optional — the store generates
/// them if missing. Seq assignment is atomic, so concurrent posts never
/// collide or leave gaps.
#[derive(Debug, Deserialize)]
pub struct AppendBody {
  pub session_id:      String,
  #[serde(rename = "type")]
  pub kind:            EventKind,
  pub payload:         JsonMap,
  pub head_id:         Option<String>,
  pub parent_event_id: Option<String>,
  pub waypoint_id:     Option<String>,
  pub actor:           Option<Actor>,
  pub ts:              Option<DateTime<Utc>>,
  pub seq:             Option<i64>,
  pub event_id:        Option<String>,
}

impl From<AppendBody> for NewEvent {
  fn from(b: AppendBody) -> Self {
    NewEvent {
      session_id:      b.session_id,
      kind:            b.kind,
      payload:         b.payload,
      head_id:         b.head_id,
      parent_event_id: b.parent_event_id,
      waypoint_id:     b.waypoint_id,
      actor:           b.actor,
      ts:              b.ts,
      seq:             b.seq,
      event_id:        b.event_id,
    }
  }
}

/// `POST /events` — returns 201 + the stored [`Event`].
pub async fn append<S>(
  State(state): State<AppState<S>>,
  _auth: Authenticated,
  Json(body): Json<AppendBody>,
) -> Result<impl IntoResponse, ApiError>
where
  S: EventStore + Clone + Send + Sync + 'static,
{
  // The configured bound may be tighter than the store default.
  validate::validate_session_id_with(
    &body.session_id,
    state.config.session_id_max_length,
  )?;

  let event = state.store.append(NewEvent::from(body)).await?;
  Ok((StatusCode::CREATED, Json(event)))
}

// ─── Get one ─────────────────────────────────────────────────────────────────

/// `GET /event/:event_id`
pub async fn get_one<S>(
  State(state): State<AppState<S>>,
  Path(event_id): Path<String>,
) -> Result<Json<Event>, ApiError>
where
  S: EventStore + Clone + Send + Sync + 'static,
{
  let event = state
    .store
    .get_event(&event_id)
    .await?
    .ok_or_else(|| ApiError::NotFound(format!("event {event_id} not found")))?;
  Ok(Json(event))
}

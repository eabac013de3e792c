//! The `EventStore` trait and supporting query types.
//!
//! The trait is implemented by storage backends (e.g.
//! `pathway-store-sqlite`). Higher layers (`pathway-api`, `pathway-cli`,
//! `pathway-jsonl`) depend on this abstraction, not on any concrete
//! backend.
//!
//! All methods return `Send` futures so the trait can be used in
//! multi-threaded async runtimes (e.g. tokio with `axum`). Every method
//! returns the core [`Error`](crate::Error) taxonomy; backend failures
//! surface as [`Error::StoreFailure`](crate::Error::StoreFailure).

use std::{collections::BTreeMap, future::Future};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
  error::Result,
  event::{Actor, Event, EventKind, JsonMap},
};

// ─── Query types ─────────────────────────────────────────────────────────────

/// Sort order for [`EventStore::get_events`]; always over `seq`.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Order {
  #[default]
  Asc,
  Desc,
}

/// Filters for [`EventStore::get_events`]. The default selects the whole
/// session in ascending seq order.
#[derive(Debug, Clone, Default)]
pub struct EventFilter {
  pub kind:    Option<EventKind>,
  pub head_id: Option<String>,
  /// Inclusive lower bound.
  pub seq_min: Option<i64>,
  /// Inclusive upper bound.
  pub seq_max: Option<i64>,
  pub limit:   Option<usize>,
  pub offset:  Option<usize>,
  pub order:   Order,
}

// ─── Append input ────────────────────────────────────────────────────────────

/// Input to [`EventStore::append`].
///
/// `event_id`, `seq`, `ts`, and `actor` may be omitted; the store fills
/// them in (a fresh id, the next seq, now, and a system actor). An explicit
/// `seq` is accepted only when it equals the next seq for the session —
/// which is how the JSONL importer replays an export verbatim.
#[derive(Debug, Clone)]
pub struct NewEvent {
  pub session_id:      String,
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

impl NewEvent {
  /// Convenience constructor with all optional fields left to the store.
  pub fn new(
    session_id: impl Into<String>,
    kind: EventKind,
    payload: JsonMap,
  ) -> Self {
    Self {
      session_id: session_id.into(),
      kind,
      payload,
      head_id: None,
      parent_event_id: None,
      waypoint_id: None,
      actor: None,
      ts: None,
      seq: None,
      event_id: None,
    }
  }
}

impl From<Event> for NewEvent {
  /// Preserve a stored envelope verbatim — used by the JSONL importer.
  fn from(event: Event) -> Self {
    Self {
      session_id:      event.session_id,
      kind:            event.kind,
      payload:         event.payload,
      head_id:         Some(event.head_id),
      parent_event_id: event.parent_event_id,
      waypoint_id:     event.waypoint_id,
      actor:           Some(event.actor),
      ts:              Some(event.ts),
      seq:             Some(event.seq),
      event_id:        Some(event.event_id),
    }
  }
}

// ─── Session summaries ───────────────────────────────────────────────────────

/// One row of [`EventStore::list_sessions`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSummary {
  pub session_id:  String,
  pub event_count: u64,
  pub latest_seq:  i64,
  pub latest_ts:   DateTime<Utc>,
}

// ─── Trait ───────────────────────────────────────────────────────────────────

/// Abstraction over a Pathway event store backend.
///
/// Writes are append-only; no event is ever updated or deleted. Per
/// session, `seq` assignment is atomic, monotonic, and gapless under
/// concurrent writers: once an `append` returns, all later appends observe
/// its seq as smaller than theirs, and a read started after the return
/// sees the event.
pub trait EventStore: Send + Sync {
  /// Validate, assign `seq` (and `event_id` if absent), and persist.
  ///
  /// A single atomic unit: either the event is durable with its seq, or no
  /// side effect occurred.
  fn append(
    &self,
    input: NewEvent,
  ) -> impl Future<Output = Result<Event>> + Send + '_;

  /// Retrieve a single event by id. `None` if absent.
  fn get_event<'a>(
    &'a self,
    event_id: &'a str,
  ) -> impl Future<Output = Result<Option<Event>>> + Send + 'a;

  /// Events for a session matching `filter`, ordered by seq.
  fn get_events<'a>(
    &'a self,
    session_id: &'a str,
    filter: &'a EventFilter,
  ) -> impl Future<Output = Result<Vec<Event>>> + Send + 'a;

  /// Events whose `parent_event_id` is `event_id`, ordered by seq.
  fn get_children<'a>(
    &'a self,
    event_id: &'a str,
  ) -> impl Future<Output = Result<Vec<Event>>> + Send + 'a;

  /// head_id → tip event id (highest seq on that head).
  fn get_heads<'a>(
    &'a self,
    session_id: &'a str,
  ) -> impl Future<Output = Result<BTreeMap<String, String>>> + Send + 'a;

  /// The seq the next append to `session_id` would receive. Advisory: the
  /// serialized allocation inside [`EventStore::append`] is authoritative.
  fn next_seq<'a>(
    &'a self,
    session_id: &'a str,
  ) -> impl Future<Output = Result<i64>> + Send + 'a;

  /// Whether the session has at least one event.
  fn session_exists<'a>(
    &'a self,
    session_id: &'a str,
  ) -> impl Future<Output = Result<bool>> + Send + 'a;

  /// Summaries of all sessions in the store.
  fn list_sessions(
    &self,
  ) -> impl Future<Output = Result<Vec<SessionSummary>>> + Send + '_;
}

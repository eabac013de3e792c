//! Encoding and decoding helpers between the domain types and the
//! plain-text representations stored in SQLite columns.
//!
//! Timestamps are stored as RFC 3339 strings; the payload column holds the
//! raw JSON object verbatim so unknown fields round-trip untouched.

use chrono::{DateTime, Utc};
use pathway_core::{
  event::{Actor, ActorKind, Event, EventKind, JsonMap},
  Error, Result,
};

// ─── Timestamps ──────────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String {
  dt.to_rfc3339()
}

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::StoreFailure(format!("bad timestamp {s:?}: {e}")))
}

// ─── Actor kind ──────────────────────────────────────────────────────────────

pub fn encode_actor_kind(kind: ActorKind) -> &'static str {
  match kind {
    ActorKind::User => "user",
    ActorKind::System => "system",
  }
}

pub fn decode_actor_kind(s: &str) -> Result<ActorKind> {
  match s {
    "user" => Ok(ActorKind::User),
    "system" => Ok(ActorKind::System),
    other => Err(Error::StoreFailure(format!("unknown actor kind: {other:?}"))),
  }
}

// ─── Row type ────────────────────────────────────────────────────────────────

/// Raw strings read directly from an `events` row.
pub struct RawEvent {
  pub event_id:        String,
  pub session_id:      String,
  pub seq:             i64,
  pub head_id:         String,
  pub parent_event_id: Option<String>,
  pub ts:              String,
  pub kind:            String,
  pub waypoint_id:     Option<String>,
  pub actor_kind:      String,
  pub actor_id:        Option<String>,
  pub payload_json:    String,
}

/// Column list matching [`RawEvent::from_row`] field order.
pub const EVENT_COLUMNS: &str = "event_id, session_id, seq, head_id, \
                                 parent_event_id, ts, kind, waypoint_id, \
                                 actor_kind, actor_id, payload_json";

impl RawEvent {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      event_id:        row.get(0)?,
      session_id:      row.get(1)?,
      seq:             row.get(2)?,
      head_id:         row.get(3)?,
      parent_event_id: row.get(4)?,
      ts:              row.get(5)?,
      kind:            row.get(6)?,
      waypoint_id:     row.get(7)?,
      actor_kind:      row.get(8)?,
      actor_id:        row.get(9)?,
      payload_json:    row.get(10)?,
    })
  }

  pub fn into_event(self) -> Result<Event> {
    let payload: JsonMap = serde_json::from_str(&self.payload_json)?;

    Ok(Event {
      event_id:        self.event_id,
      session_id:      self.session_id,
      seq:             self.seq,
      ts:              decode_dt(&self.ts)?,
      kind:            EventKind::parse(&self.kind)?,
      parent_event_id: self.parent_event_id,
      head_id:         self.head_id,
      waypoint_id:     self.waypoint_id,
      actor:           Actor {
        kind: decode_actor_kind(&self.actor_kind)?,
        id:   self.actor_id,
      },
      payload,
    })
  }
}

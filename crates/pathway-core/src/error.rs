//! The closed error taxonomy surfaced by the Pathway core.
//!
//! Ingest errors abort an append transactionally; reducer anomalies are NOT
//! errors (see [`crate::view::ReducerWarning`]) and never abort a fold.

use thiserror::Error;

use crate::event::EventKind;

#[derive(Debug, Error)]
pub enum Error {
  /// The envelope is missing a required field or has the wrong shape.
  #[error("invalid envelope: {0}")]
  InvalidEnvelope(String),

  /// `type` is not one of the 14 event kinds.
  #[error("unknown event kind: {0:?}")]
  UnknownEventKind(String),

  /// The payload does not conform to the schema of the event's kind.
  #[error("payload does not match the {kind} schema: {detail}")]
  PayloadSchemaMismatch { kind: EventKind, detail: String },

  /// `parent_event_id` or `Backtracked.target_event_id` does not resolve to
  /// an earlier event in the same session.
  #[error("unknown parent event: {0:?}")]
  UnknownParent(String),

  /// The session id violates shape or length rules.
  #[error("invalid session id: {0:?}")]
  SessionIdShape(String),

  /// The event id violates shape or length rules.
  #[error("invalid event id: {0:?}")]
  EventIdShape(String),

  /// An explicitly-supplied seq is not the next seq for the session.
  #[error("seq {seq} conflicts with existing events in session {session_id:?}")]
  SeqConflict { session_id: String, seq: i64 },

  /// The requested event or session does not exist.
  #[error("not found: {0}")]
  NotFound(String),

  /// The underlying store failed; the transaction was rolled back.
  #[error("store failure: {0}")]
  StoreFailure(String),

  #[error("serialization error: {0}")]
  Serialization(#[from] serde_json::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

//! Ingest-time validation shared by the store and the API layer.

use crate::{
  config::DEFAULT_SESSION_ID_MAX_LENGTH,
  error::{Error, Result},
  event::{EventKind, EventPayload, JsonMap},
};

/// Maximum accepted length for event ids and head ids.
pub const ID_MAX_LENGTH: usize = 128;

/// `session_id` must be 1..=`max_length` characters of
/// `[A-Za-z0-9_-]` — nothing else, to keep ids filesystem- and URL-safe.
pub fn validate_session_id_with(id: &str, max_length: usize) -> Result<()> {
  let ok = !id.is_empty()
    && id.len() <= max_length
    && id
      .chars()
      .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
  if ok {
    Ok(())
  } else {
    Err(Error::SessionIdShape(id.to_string()))
  }
}

/// [`validate_session_id_with`] at the default 128-character bound.
pub fn validate_session_id(id: &str) -> Result<()> {
  validate_session_id_with(id, DEFAULT_SESSION_ID_MAX_LENGTH)
}

/// `event_id` is free-form but bounded: 1..=128 characters, no control
/// characters or whitespace.
pub fn validate_event_id(id: &str) -> Result<()> {
  let ok = !id.is_empty()
    && id.len() <= ID_MAX_LENGTH
    && id.chars().all(|c| !c.is_control() && !c.is_whitespace());
  if ok {
    Ok(())
  } else {
    Err(Error::EventIdShape(id.to_string()))
  }
}

/// `head_id` is free-form (slashes and hyphens welcome) but must be
/// non-empty and bounded.
pub fn validate_head_id(id: &str) -> Result<()> {
  if id.is_empty() || id.len() > ID_MAX_LENGTH {
    return Err(Error::InvalidEnvelope(format!("invalid head id: {id:?}")));
  }
  Ok(())
}

/// Parse `payload` under the schema for `kind` and check value ranges.
/// Unknown fields are tolerated (and preserved in the raw envelope).
pub fn validate_payload(
  kind: EventKind,
  payload: &JsonMap,
) -> Result<EventPayload> {
  let typed = EventPayload::from_parts(kind, payload)?;

  if let Some(delta) = typed.confidence_delta()
    && !(-1.0..=1.0).contains(&delta)
  {
    return Err(Error::PayloadSchemaMismatch {
      kind,
      detail: format!("confidence_delta {delta} outside [-1, 1]"),
    });
  }

  Ok(typed)
}

//! Session composer — one pass over the stream, all three reducers.
//!
//! State semantics:
//! - Journey = where you ARE (position and branch tips).
//! - Learned = what you KNOW (global; persists across backtracks).
//! - Artifacts = what you MADE (global, with version history).

use crate::{
  event::Event,
  reduce::{reduce_artifacts, reduce_journey, reduce_learned},
  view::SessionState,
};

/// Compose the full [`SessionState`] from a session's ordered events.
///
/// Pure over the stream: the same events always produce identical state.
pub fn reduce_session_state(
  session_id: &str,
  events: &[Event],
) -> SessionState {
  let journey = reduce_journey(events);
  let learned = reduce_learned(events);
  let (artifacts, warnings) = reduce_artifacts(events);

  let last = events.last();

  SessionState {
    session_id: session_id.to_string(),
    journey,
    learned,
    artifacts,
    event_count: events.len(),
    latest_seq: last.map(|e| e.seq),
    latest_ts: last.map(|e| e.ts),
    warnings,
  }
}

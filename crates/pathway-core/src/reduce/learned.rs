//! Learned reducer — aggregates knowledge about the user.
//!
//! The fold never rewinds on `Backtracked`: what was learned on an
//! abandoned path stays learned. Confidence is clamped to [0, 1] on every
//! update.

use std::collections::{btree_map::Entry, BTreeMap};

use crate::{
  event::{Event, EventPayload},
  view::{ConceptRecord, LearnedRecord, LearnedView},
};

/// Clamp a confidence value into [0, 1].
pub fn clamp(value: f64) -> f64 {
  value.clamp(0.0, 1.0)
}

/// Fold `events` (ordered by seq) into a [`LearnedView`].
pub fn reduce_learned(events: &[Event]) -> LearnedView {
  let mut view = LearnedView::default();

  for event in events {
    match event.typed_payload() {
      Ok(EventPayload::PreferenceLearned(p)) => {
        update_keyed(
          &mut view.preferences,
          p.key,
          p.value,
          p.confidence_delta,
          event.seq,
        );
      }
      Ok(EventPayload::ConstraintLearned(p)) => {
        update_keyed(
          &mut view.constraints,
          p.key,
          p.value,
          p.confidence_delta,
          event.seq,
        );
      }
      Ok(EventPayload::ConceptLearned(p)) => {
        match view.concepts.entry(p.concept_id) {
          Entry::Occupied(mut entry) => {
            let record = entry.get_mut();
            record.confidence = clamp(record.confidence + p.confidence_delta);
            // Latest summary wins.
            record.summary = p.summary;
            if let Some(evidence) = p.evidence_event_id
              && !record.evidence_event_ids.contains(&evidence)
            {
              record.evidence_event_ids.push(evidence);
            }
            record.last_updated_seq = event.seq;
          }
          Entry::Vacant(entry) => {
            entry.insert(ConceptRecord {
              summary:            p.summary,
              confidence:         clamp(p.confidence_delta),
              evidence_event_ids: p.evidence_event_id.into_iter().collect(),
              first_seen_seq:     event.seq,
              last_updated_seq:   event.seq,
            });
          }
        }
      }
      _ => {}
    }
  }

  view
}

/// Shared update rule for preferences and constraints: a repeated value
/// accumulates confidence; a changed value replaces it and resets
/// confidence to `clamp(delta)`. `first_seen_seq` is retained across value
/// changes.
fn update_keyed(
  records: &mut BTreeMap<String, LearnedRecord>,
  key: String,
  value: serde_json::Value,
  delta: f64,
  seq: i64,
) {
  match records.entry(key) {
    Entry::Occupied(mut entry) => {
      let record = entry.get_mut();
      if record.value == value {
        record.confidence = clamp(record.confidence + delta);
      } else {
        record.value = value;
        record.confidence = clamp(delta);
      }
      record.last_updated_seq = seq;
    }
    Entry::Vacant(entry) => {
      entry.insert(LearnedRecord {
        value,
        confidence: clamp(delta),
        first_seen_seq: seq,
        last_updated_seq: seq,
      });
    }
  }
}

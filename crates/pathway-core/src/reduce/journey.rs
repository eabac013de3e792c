//! Journey reducer — computes the navigation state.
//!
//! The JourneyView answers: where is the journey (position), what branches
//! exist (tips), where has it been (visited), and where can it go back to
//! (ancestors of the position).

use std::collections::{HashMap, HashSet};

use crate::{
  event::{Event, EventPayload},
  view::{JourneyView, VisitedWaypoint},
};

/// Fold `events` (ordered by seq) into a [`JourneyView`].
pub fn reduce_journey(events: &[Event]) -> JourneyView {
  let mut view = JourneyView::default();

  let Some(last) = events.last() else {
    return view;
  };

  for event in events {
    // Every event advances the tip of its branch.
    view
      .branch_tips
      .insert(event.head_id.clone(), event.event_id.clone());

    // An envelope-level waypoint pins the position to this event.
    if event.waypoint_id.is_some() {
      view.position_event_id = Some(event.event_id.clone());
    }

    match event.typed_payload() {
      Ok(EventPayload::TrailVersionCreated(p)) => {
        view.active_trail_version = Some(p.version);
      }
      Ok(EventPayload::Replanned(p)) => {
        view.active_trail_version = Some(p.new_trail_version);
      }
      Ok(EventPayload::WaypointEntered(p)) => {
        view.visited.push(VisitedWaypoint {
          waypoint_id: p.waypoint_id,
          event_id:    event.event_id.clone(),
          ts:          event.ts,
        });
        view.position_event_id = Some(event.event_id.clone());
      }
      Ok(EventPayload::Backtracked(p)) => {
        // The branch tip stays on the backtrack event itself; only the
        // logical position moves. Nothing is truncated.
        view.position_event_id = Some(p.target_event_id);
      }
      Ok(EventPayload::Merged(p)) => {
        for head in &p.source_head_ids {
          if head != &p.into_head_id {
            view.branch_tips.remove(head);
          }
        }
      }
      _ => {}
    }
  }

  view.active_head_id = last.head_id.clone();
  view.backtrack_targets =
    ancestor_chain(events, view.position_event_id.as_deref());

  view
}

/// Walk `parent_event_id` links from `position` toward the root, nearest
/// ancestor first. The position itself is excluded.
fn ancestor_chain(events: &[Event], position: Option<&str>) -> Vec<String> {
  let parents: HashMap<&str, Option<&str>> = events
    .iter()
    .map(|e| (e.event_id.as_str(), e.parent_event_id.as_deref()))
    .collect();

  let mut chain = Vec::new();
  let mut seen: HashSet<&str> = HashSet::new();
  let mut current = position;

  while let Some(id) = current {
    if !seen.insert(id) {
      break;
    }
    match parents.get(id) {
      Some(Some(parent)) => {
        chain.push(parent.to_string());
        current = Some(parent);
      }
      _ => break,
    }
  }

  chain
}

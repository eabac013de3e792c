//! Artifact reducer — tracks outputs and their supersedence chains.
//!
//! Anomalies (duplicate creates, dangling or cyclic supersedence) become
//! [`ReducerWarning`]s, never errors: the fold always produces a usable
//! view.

use std::collections::{BTreeMap, HashSet};

use crate::{
  event::{Event, EventPayload},
  view::{ArtifactRecord, ArtifactView, ReducerWarning},
};

/// Fold `events` (ordered by seq) into an [`ArtifactView`] plus the
/// warnings observed along the way.
pub fn reduce_artifacts(
  events: &[Event],
) -> (ArtifactView, Vec<ReducerWarning>) {
  let mut view = ArtifactView::default();
  let mut warnings = Vec::new();

  // Supersedence links whose endpoints have not both appeared yet. A link
  // may legally precede the creation of its `new` artifact in the stream.
  let mut pending: Vec<(String, String)> = Vec::new();

  for event in events {
    match event.typed_payload() {
      Ok(EventPayload::ArtifactCreated(p)) => {
        if view.artifacts.contains_key(&p.artifact_id) {
          // Keep-first: the original entry stays authoritative.
          warnings.push(ReducerWarning::DuplicateArtifact {
            artifact_id: p.artifact_id,
            event_id:    event.event_id.clone(),
          });
        } else {
          view.artifacts.insert(p.artifact_id, ArtifactRecord {
            artifact_type:    p.artifact_type,
            side_effects:     p.side_effects,
            uri:              p.uri,
            created_event_id: event.event_id.clone(),
            created_seq:      event.seq,
            waypoint_id:      event.waypoint_id.clone(),
            superseded_by:    None,
          });
        }
      }
      Ok(EventPayload::ArtifactSuperseded(p)) => {
        pending.push((p.old_artifact_id, p.new_artifact_id));
      }
      _ => {}
    }
  }

  // Apply links in stream order now that the set of artifacts is final.
  // Later links to the same `old` overwrite earlier ones.
  for (old, new) in pending {
    let new_exists = view.artifacts.contains_key(&new);
    match view.artifacts.get_mut(&old) {
      Some(record) if new_exists => record.superseded_by = Some(new),
      _ => warnings.push(ReducerWarning::DanglingSupersedence {
        old_artifact_id: old,
        new_artifact_id: new,
      }),
    }
  }

  view.chains = build_chains(&view.artifacts, &mut warnings);

  (view, warnings)
}

/// Walk supersedence links into ordered chains (oldest → newest).
///
/// Roots are artifacts with an outbound link and no inbound one; rootless
/// components are cycles, entered at their oldest member. A repeated node
/// breaks the walk and yields a [`ReducerWarning::SupersedenceCycle`].
fn build_chains(
  artifacts: &BTreeMap<String, ArtifactRecord>,
  warnings: &mut Vec<ReducerWarning>,
) -> Vec<Vec<String>> {
  let inbound: HashSet<&str> = artifacts
    .values()
    .filter_map(|r| r.superseded_by.as_deref())
    .collect();

  let mut starts: Vec<&String> = artifacts
    .iter()
    .filter(|(id, r)| {
      r.superseded_by.is_some() && !inbound.contains(id.as_str())
    })
    .map(|(id, _)| id)
    .collect();
  starts.sort_by_key(|id| artifacts[*id].created_seq);

  let mut chains = Vec::new();
  let mut visited: HashSet<&str> = HashSet::new();

  for start in starts {
    chains.push(walk_chain(artifacts, start, &mut visited, warnings));
  }

  // Linked artifacts not reachable from any root sit on a cycle.
  let mut cyclic: Vec<&String> = artifacts
    .iter()
    .filter(|(id, r)| {
      r.superseded_by.is_some() && !visited.contains(id.as_str())
    })
    .map(|(id, _)| id)
    .collect();
  cyclic.sort_by_key(|id| artifacts[*id].created_seq);

  for start in cyclic {
    if visited.contains(start.as_str()) {
      continue;
    }
    chains.push(walk_chain(artifacts, start, &mut visited, warnings));
  }

  chains.retain(|c| c.len() >= 2);
  chains
}

fn walk_chain<'a>(
  artifacts: &'a BTreeMap<String, ArtifactRecord>,
  start: &'a String,
  visited: &mut HashSet<&'a str>,
  warnings: &mut Vec<ReducerWarning>,
) -> Vec<String> {
  let mut chain = Vec::new();
  let mut seen: HashSet<&str> = HashSet::new();
  let mut current: Option<&'a String> = Some(start);

  while let Some(id) = current {
    if !seen.insert(id.as_str()) {
      warnings.push(ReducerWarning::SupersedenceCycle {
        artifact_id: id.clone(),
      });
      break;
    }
    visited.insert(id.as_str());
    chain.push(id.clone());
    current = artifacts
      .get(id)
      .and_then(|r| r.superseded_by.as_ref())
      .and_then(|next| artifacts.get_key_value(next).map(|(k, _)| k));
  }

  chain
}

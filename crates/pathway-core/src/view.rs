//! Derived views — the read models computed from the event stream.
//!
//! Views are never stored; they are recomputed by folding the ordered event
//! stream through the reducers in [`crate::reduce`]. Replaying the same
//! events always yields structurally identical views.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::event::{ArtifactType, SideEffects, DEFAULT_HEAD};

// ─── Journey ─────────────────────────────────────────────────────────────────

/// One entry in the append-only visit history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VisitedWaypoint {
  pub waypoint_id: String,
  pub event_id:    String,
  pub ts:          DateTime<Utc>,
}

/// Where the journey is: position, branch tips, visit history, and the
/// events reachable backwards from the current position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JourneyView {
  /// Head of the most recent event; `"main"` for an empty session.
  pub active_head_id:       String,
  /// The event the journey is logically at. A backtrack moves this to an
  /// earlier event without touching history.
  pub position_event_id:    Option<String>,
  /// Version label of the most recent trail version.
  pub active_trail_version: Option<String>,
  /// head_id → event_id of that branch's tip.
  pub branch_tips:          BTreeMap<String, String>,
  /// Append-only; never truncated by backtracking.
  pub visited:              Vec<VisitedWaypoint>,
  /// Ancestors of the current position via parent links, nearest first,
  /// excluding the position itself.
  pub backtrack_targets:    Vec<String>,
}

impl Default for JourneyView {
  fn default() -> Self {
    Self {
      active_head_id:       DEFAULT_HEAD.to_string(),
      position_event_id:    None,
      active_trail_version: None,
      branch_tips:          BTreeMap::new(),
      visited:              Vec::new(),
      backtrack_targets:    Vec::new(),
    }
  }
}

// ─── Learned ─────────────────────────────────────────────────────────────────

/// A learned preference or constraint. Confidence is always in [0, 1].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LearnedRecord {
  pub value:            serde_json::Value,
  pub confidence:       f64,
  pub first_seen_seq:   i64,
  pub last_updated_seq: i64,
}

/// A learned concept, with its supporting evidence in insertion order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConceptRecord {
  pub summary:            String,
  pub confidence:         f64,
  pub evidence_event_ids: Vec<String>,
  pub first_seen_seq:     i64,
  pub last_updated_seq:   i64,
}

/// Everything the session has learned about the user.
///
/// Learned state is global across branches and backtracks: knowledge gained
/// on an abandoned path is kept.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct LearnedView {
  pub preferences: BTreeMap<String, LearnedRecord>,
  pub concepts:    BTreeMap<String, ConceptRecord>,
  pub constraints: BTreeMap<String, LearnedRecord>,
}

// ─── Artifacts ───────────────────────────────────────────────────────────────

/// A produced artifact. Active unless `superseded_by` is set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArtifactRecord {
  pub artifact_type:    ArtifactType,
  pub side_effects:     SideEffects,
  pub uri:              Option<String>,
  pub created_event_id: String,
  pub created_seq:      i64,
  pub waypoint_id:      Option<String>,
  pub superseded_by:    Option<String>,
}

/// All artifacts ever produced, plus the supersedence chains among them.
///
/// Artifacts are never deleted, only superseded.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ArtifactView {
  pub artifacts: BTreeMap<String, ArtifactRecord>,
  /// Ordered oldest → newest; only chains of two or more artifacts.
  pub chains:    Vec<Vec<String>>,
}

impl ArtifactView {
  /// Artifacts with no supersedence link pointing away from them.
  pub fn active(&self) -> impl Iterator<Item = (&String, &ArtifactRecord)> {
    self.artifacts.iter().filter(|(_, r)| r.superseded_by.is_none())
  }

  /// Artifacts that have been replaced by a newer version.
  pub fn superseded(
    &self,
  ) -> impl Iterator<Item = (&String, &ArtifactRecord)> {
    self.artifacts.iter().filter(|(_, r)| r.superseded_by.is_some())
  }
}

// ─── Warnings ────────────────────────────────────────────────────────────────

/// A non-fatal anomaly observed during a fold. The view stays usable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "warning", rename_all = "snake_case")]
pub enum ReducerWarning {
  /// An `ArtifactCreated` reused an existing artifact id; the first entry
  /// is kept.
  DuplicateArtifact { artifact_id: String, event_id: String },
  /// An `ArtifactSuperseded` referenced an artifact that never appeared.
  DanglingSupersedence {
    old_artifact_id: String,
    new_artifact_id: String,
  },
  /// Supersedence links form a cycle; the chain walk broke at this node.
  SupersedenceCycle { artifact_id: String },
}

// ─── Session state ───────────────────────────────────────────────────────────

/// The composite snapshot for one session: all three views plus stream
/// metadata and any warnings collected during the fold.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionState {
  pub session_id:  String,
  pub journey:     JourneyView,
  pub learned:     LearnedView,
  pub artifacts:   ArtifactView,
  pub event_count: usize,
  pub latest_seq:  Option<i64>,
  pub latest_ts:   Option<DateTime<Utc>>,
  pub warnings:    Vec<ReducerWarning>,
}

//! Event types — the fundamental unit of the Pathway log.
//!
//! Every event carries a shared envelope (identity, ordering, parentage,
//! branch) and a kind-specific payload. Events are never updated or deleted
//! after append; corrections are expressed as further events.
//!
//! The envelope keeps its payload as a raw JSON map so that unknown fields
//! round-trip verbatim through storage and the JSONL transport. The typed
//! view of a payload is parsed on demand with [`Event::typed_payload`].

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// A JSON object, as stored in the envelope's `payload` field.
pub type JsonMap = serde_json::Map<String, serde_json::Value>;

/// The branch every session starts on.
pub const DEFAULT_HEAD: &str = "main";

// ─── Event kinds ─────────────────────────────────────────────────────────────

/// The closed set of event kinds. The serialized form is the variant name
/// (`"IntentCreated"`, `"Backtracked"`, …).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventKind {
  IntentCreated,
  TrailVersionCreated,
  WaypointEntered,
  ChoiceMade,
  StepCompleted,
  Blocked,
  Backtracked,
  Replanned,
  Merged,
  ArtifactCreated,
  ArtifactSuperseded,
  PreferenceLearned,
  ConceptLearned,
  ConstraintLearned,
}

impl EventKind {
  /// The discriminant string stored in the `kind` column.
  pub fn as_str(&self) -> &'static str {
    match self {
      Self::IntentCreated => "IntentCreated",
      Self::TrailVersionCreated => "TrailVersionCreated",
      Self::WaypointEntered => "WaypointEntered",
      Self::ChoiceMade => "ChoiceMade",
      Self::StepCompleted => "StepCompleted",
      Self::Blocked => "Blocked",
      Self::Backtracked => "Backtracked",
      Self::Replanned => "Replanned",
      Self::Merged => "Merged",
      Self::ArtifactCreated => "ArtifactCreated",
      Self::ArtifactSuperseded => "ArtifactSuperseded",
      Self::PreferenceLearned => "PreferenceLearned",
      Self::ConceptLearned => "ConceptLearned",
      Self::ConstraintLearned => "ConstraintLearned",
    }
  }

  /// Parse a discriminant string; anything outside the taxonomy is
  /// [`Error::UnknownEventKind`].
  pub fn parse(s: &str) -> Result<Self> {
    match s {
      "IntentCreated" => Ok(Self::IntentCreated),
      "TrailVersionCreated" => Ok(Self::TrailVersionCreated),
      "WaypointEntered" => Ok(Self::WaypointEntered),
      "ChoiceMade" => Ok(Self::ChoiceMade),
      "StepCompleted" => Ok(Self::StepCompleted),
      "Blocked" => Ok(Self::Blocked),
      "Backtracked" => Ok(Self::Backtracked),
      "Replanned" => Ok(Self::Replanned),
      "Merged" => Ok(Self::Merged),
      "ArtifactCreated" => Ok(Self::ArtifactCreated),
      "ArtifactSuperseded" => Ok(Self::ArtifactSuperseded),
      "PreferenceLearned" => Ok(Self::PreferenceLearned),
      "ConceptLearned" => Ok(Self::ConceptLearned),
      "ConstraintLearned" => Ok(Self::ConstraintLearned),
      other => Err(Error::UnknownEventKind(other.to_string())),
    }
  }
}

impl fmt::Display for EventKind {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

// ─── Actor ───────────────────────────────────────────────────────────────────

/// Who or what created the event.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum ActorKind {
  User,
  #[default]
  System,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Actor {
  pub kind: ActorKind,
  #[serde(default)]
  pub id:   Option<String>,
}

// ─── Shared payload sub-types ────────────────────────────────────────────────

/// Types of waypoints in a trail.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum WaypointKind {
  Checkpoint,
  Action,
  Branch,
  Milestone,
}

/// A waypoint in a trail version.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Waypoint {
  pub id:    String,
  #[serde(default)]
  pub title: Option<String>,
  pub kind:  WaypointKind,
}

/// Reference to evidence supporting a step or a learned update.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvidenceRef {
  pub kind: EvidenceKind,
  pub id:   String,
  #[serde(default)]
  pub note: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EvidenceKind {
  Artifact,
  Event,
}

/// Categories of blockers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlockCategory {
  Confusion,
  Tooling,
  RuntimeError,
  MissingInfo,
  ExternalDependency,
}

/// Types of artifacts produced during the journey.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArtifactType {
  Code,
  Doc,
  Config,
  Data,
  Other,
}

/// Side effects of producing an artifact.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum SideEffects {
  #[default]
  None,
  Local,
  Remote,
}

// ─── Payload types for each event kind ───────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntentCreated {
  pub goal:    String,
  #[serde(default)]
  pub context: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrailVersionCreated {
  pub version:   String,
  pub waypoints: Vec<Waypoint>,
  #[serde(default)]
  pub rationale: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WaypointEntered {
  pub waypoint_id: String,
  pub kind:        WaypointKind,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChoiceMade {
  pub options: Vec<String>,
  pub chosen:  String,
  #[serde(default)]
  pub reason:  Option<String>,
}

/// `waypoint_id` may be omitted, in which case the step refers to the
/// waypoint the journey is currently at.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepCompleted {
  #[serde(default)]
  pub waypoint_id: Option<String>,
  #[serde(default)]
  pub artifacts:   Vec<String>,
  #[serde(default)]
  pub evidence:    Vec<EvidenceRef>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Blocked {
  pub category:       BlockCategory,
  pub detail:         String,
  #[serde(default)]
  pub suggested_next: Option<String>,
}

/// The target must already exist in the session with a smaller seq; the
/// store rejects anything else at ingest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Backtracked {
  pub target_event_id: String,
  #[serde(default)]
  pub reason:          Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Replanned {
  pub new_trail_version: String,
  pub reason:            String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Merged {
  pub source_head_ids: Vec<String>,
  pub into_head_id:    String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArtifactCreated {
  pub artifact_id:   String,
  pub artifact_type: ArtifactType,
  #[serde(default)]
  pub side_effects:  SideEffects,
  #[serde(default)]
  pub uri:           Option<String>,
  #[serde(default)]
  pub evidence:      Vec<EvidenceRef>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArtifactSuperseded {
  pub old_artifact_id: String,
  pub new_artifact_id: String,
  #[serde(default)]
  pub reason:          Option<String>,
}

/// `value` is a free JSON scalar (string, number, or bool).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PreferenceLearned {
  pub key:              String,
  pub value:            serde_json::Value,
  pub confidence_delta: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConceptLearned {
  pub concept_id:        String,
  pub summary:           String,
  pub confidence_delta:  f64,
  #[serde(default)]
  pub evidence_event_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConstraintLearned {
  pub key:              String,
  pub value:            serde_json::Value,
  pub confidence_delta: f64,
}

// ─── EventPayload ────────────────────────────────────────────────────────────

/// The typed view of an envelope payload, parsed by kind.
///
/// Parsing tolerates unknown fields — they stay in the envelope's raw map
/// and survive round-trips untouched.
#[derive(Debug, Clone, PartialEq)]
pub enum EventPayload {
  IntentCreated(IntentCreated),
  TrailVersionCreated(TrailVersionCreated),
  WaypointEntered(WaypointEntered),
  ChoiceMade(ChoiceMade),
  StepCompleted(StepCompleted),
  Blocked(Blocked),
  Backtracked(Backtracked),
  Replanned(Replanned),
  Merged(Merged),
  ArtifactCreated(ArtifactCreated),
  ArtifactSuperseded(ArtifactSuperseded),
  PreferenceLearned(PreferenceLearned),
  ConceptLearned(ConceptLearned),
  ConstraintLearned(ConstraintLearned),
}

impl EventPayload {
  /// Parse a raw payload map under the schema that `kind` mandates.
  pub fn from_parts(kind: EventKind, payload: &JsonMap) -> Result<Self> {
    fn parse<T: serde::de::DeserializeOwned>(
      kind: EventKind,
      payload: &JsonMap,
    ) -> Result<T> {
      serde_json::from_value(serde_json::Value::Object(payload.clone()))
        .map_err(|e| Error::PayloadSchemaMismatch {
          kind,
          detail: e.to_string(),
        })
    }

    Ok(match kind {
      EventKind::IntentCreated => {
        Self::IntentCreated(parse(kind, payload)?)
      }
      EventKind::TrailVersionCreated => {
        Self::TrailVersionCreated(parse(kind, payload)?)
      }
      EventKind::WaypointEntered => {
        Self::WaypointEntered(parse(kind, payload)?)
      }
      EventKind::ChoiceMade => Self::ChoiceMade(parse(kind, payload)?),
      EventKind::StepCompleted => Self::StepCompleted(parse(kind, payload)?),
      EventKind::Blocked => Self::Blocked(parse(kind, payload)?),
      EventKind::Backtracked => Self::Backtracked(parse(kind, payload)?),
      EventKind::Replanned => Self::Replanned(parse(kind, payload)?),
      EventKind::Merged => Self::Merged(parse(kind, payload)?),
      EventKind::ArtifactCreated => {
        Self::ArtifactCreated(parse(kind, payload)?)
      }
      EventKind::ArtifactSuperseded => {
        Self::ArtifactSuperseded(parse(kind, payload)?)
      }
      EventKind::PreferenceLearned => {
        Self::PreferenceLearned(parse(kind, payload)?)
      }
      EventKind::ConceptLearned => {
        Self::ConceptLearned(parse(kind, payload)?)
      }
      EventKind::ConstraintLearned => {
        Self::ConstraintLearned(parse(kind, payload)?)
      }
    })
  }

  /// The confidence delta carried by learned-kind payloads, if any.
  pub fn confidence_delta(&self) -> Option<f64> {
    match self {
      Self::PreferenceLearned(p) => Some(p.confidence_delta),
      Self::ConceptLearned(p) => Some(p.confidence_delta),
      Self::ConstraintLearned(p) => Some(p.confidence_delta),
      _ => None,
    }
  }
}

// ─── Event envelope ──────────────────────────────────────────────────────────

/// The common envelope shared by all Pathway events.
///
/// Events form a DAG per session via `parent_event_id`; `head_id` names the
/// branch an event belongs to. `(session_id, seq)` is unique and gapless,
/// starting at 1.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
  pub event_id:        String,
  pub session_id:      String,
  pub seq:             i64,
  pub ts:              DateTime<Utc>,
  #[serde(rename = "type")]
  pub kind:            EventKind,
  #[serde(default)]
  pub parent_event_id: Option<String>,
  #[serde(default = "default_head")]
  pub head_id:         String,
  #[serde(default)]
  pub waypoint_id:     Option<String>,
  #[serde(default)]
  pub actor:           Actor,
  pub payload:         JsonMap,
}

fn default_head() -> String {
  DEFAULT_HEAD.to_string()
}

impl Event {
  /// Parse the raw payload into the typed payload for this event's kind.
  pub fn typed_payload(&self) -> Result<EventPayload> {
    EventPayload::from_parts(self.kind, &self.payload)
  }
}

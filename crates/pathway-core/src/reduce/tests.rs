//! Reducer tests — pure folds over hand-built event streams.

use chrono::{DateTime, TimeZone, Utc};
use serde_json::json;

use crate::{
  event::{Actor, Event, EventKind, JsonMap, DEFAULT_HEAD},
  reduce::{clamp, reduce_artifacts, reduce_journey, reduce_learned,
    reduce_session_state},
  view::ReducerWarning,
};

fn ts(seq: i64) -> DateTime<Utc> {
  Utc.timestamp_opt(1_700_000_000 + seq, 0).unwrap()
}

fn obj(value: serde_json::Value) -> JsonMap {
  match value {
    serde_json::Value::Object(m) => m,
    _ => panic!("expected object"),
  }
}

fn ev(seq: i64, kind: EventKind, payload: serde_json::Value) -> Event {
  Event {
    event_id: format!("e{seq}"),
    session_id: "s".to_string(),
    seq,
    ts: ts(seq),
    kind,
    parent_event_id: None,
    head_id: DEFAULT_HEAD.to_string(),
    waypoint_id: None,
    actor: Actor::default(),
    payload: obj(payload),
  }
}

fn with_parent(mut event: Event, parent: &str) -> Event {
  event.parent_event_id = Some(parent.to_string());
  event
}

fn with_head(mut event: Event, head: &str) -> Event {
  event.head_id = head.to_string();
  event
}

fn entered(seq: i64, waypoint: &str) -> Event {
  let mut event = ev(
    seq,
    EventKind::WaypointEntered,
    json!({ "waypoint_id": waypoint, "kind": "action" }),
  );
  event.waypoint_id = Some(waypoint.to_string());
  event
}

// ─── Boundary behaviors ──────────────────────────────────────────────────────

#[test]
fn empty_session_yields_empty_views() {
  let state = reduce_session_state("s", &[]);
  assert_eq!(state.event_count, 0);
  assert_eq!(state.latest_seq, None);
  assert_eq!(state.latest_ts, None);
  assert_eq!(state.journey.active_head_id, "main");
  assert!(state.journey.branch_tips.is_empty());
  assert!(state.learned.preferences.is_empty());
  assert!(state.artifacts.artifacts.is_empty());
  assert!(state.warnings.is_empty());
}

#[test]
fn single_event_reflected_exactly() {
  let events = vec![ev(1, EventKind::IntentCreated, json!({ "goal": "g" }))];
  let state = reduce_session_state("s", &events);
  assert_eq!(state.event_count, 1);
  assert_eq!(state.latest_seq, Some(1));
  assert_eq!(state.latest_ts, Some(ts(1)));
  assert_eq!(state.journey.branch_tips["main"], "e1");
  assert_eq!(state.journey.position_event_id, None);
}

#[test]
fn replay_is_deterministic() {
  let events = vec![
    ev(1, EventKind::IntentCreated, json!({ "goal": "g" })),
    entered(2, "w1"),
    ev(
      3,
      EventKind::PreferenceLearned,
      json!({ "key": "pace", "value": "small", "confidence_delta": 0.4 }),
    ),
    ev(
      4,
      EventKind::ArtifactCreated,
      json!({ "artifact_id": "a1", "artifact_type": "code" }),
    ),
    ev(
      5,
      EventKind::Backtracked,
      json!({ "target_event_id": "e1" }),
    ),
  ];
  assert_eq!(
    reduce_session_state("s", &events),
    reduce_session_state("s", &events),
  );
}

// ─── Journey ─────────────────────────────────────────────────────────────────

#[test]
fn waypoints_are_visited_in_order() {
  let events = vec![entered(1, "w1"), entered(2, "w2"), entered(3, "w1")];
  let view = reduce_journey(&events);
  let visited: Vec<&str> =
    view.visited.iter().map(|v| v.waypoint_id.as_str()).collect();
  assert_eq!(visited, ["w1", "w2", "w1"]);
  assert_eq!(view.visited[1].event_id, "e2");
  assert_eq!(view.visited[1].ts, ts(2));
  assert_eq!(view.position_event_id.as_deref(), Some("e3"));
}

#[test]
fn divergent_parent_creates_branch() {
  // A (w1), B parent=A on main (w2), C parent=A on alt (w3).
  let a = entered(1, "w1");
  let b = with_parent(entered(2, "w2"), "e1");
  let c = with_head(with_parent(entered(3, "w3"), "e1"), "alt");
  let view = reduce_journey(&[a, b, c]);

  assert_eq!(view.branch_tips.len(), 2);
  assert_eq!(view.branch_tips["main"], "e2");
  assert_eq!(view.branch_tips["alt"], "e3");
  assert_eq!(view.active_head_id, "alt");
}

#[test]
fn backtrack_moves_position_but_keeps_history() {
  let events = vec![
    entered(1, "w1"),
    with_parent(entered(2, "w2"), "e1"),
    with_parent(
      ev(3, EventKind::Backtracked, json!({ "target_event_id": "e1" })),
      "e2",
    ),
  ];
  let view = reduce_journey(&events);

  assert_eq!(view.position_event_id.as_deref(), Some("e1"));
  // The backtrack event itself is the new tip on the branch.
  assert_eq!(view.branch_tips["main"], "e3");
  // Visited is never truncated.
  assert_eq!(view.visited.len(), 2);
}

#[test]
fn backtrack_targets_are_the_ancestor_chain() {
  let events = vec![
    entered(1, "w1"),
    with_parent(entered(2, "w2"), "e1"),
    with_parent(entered(3, "w3"), "e2"),
  ];
  let view = reduce_journey(&events);
  assert_eq!(view.position_event_id.as_deref(), Some("e3"));
  assert_eq!(view.backtrack_targets, ["e2", "e1"]);
}

#[test]
fn backtrack_targets_empty_at_root() {
  let events = vec![
    entered(1, "w1"),
    with_parent(
      ev(2, EventKind::Backtracked, json!({ "target_event_id": "e1" })),
      "e1",
    ),
  ];
  let view = reduce_journey(&events);
  assert_eq!(view.position_event_id.as_deref(), Some("e1"));
  assert!(view.backtrack_targets.is_empty());
}

#[test]
fn merge_collapses_source_tips() {
  let events = vec![
    entered(1, "w1"),
    with_head(with_parent(entered(2, "w2"), "e1"), "alt"),
    with_parent(
      ev(
        3,
        EventKind::Merged,
        json!({ "source_head_ids": ["alt"], "into_head_id": "main" }),
      ),
      "e2",
    ),
  ];
  let view = reduce_journey(&events);
  assert_eq!(view.branch_tips.len(), 1);
  assert_eq!(view.branch_tips["main"], "e3");
}

#[test]
fn trail_versions_tracked_through_replan() {
  let events = vec![
    ev(
      1,
      EventKind::TrailVersionCreated,
      json!({ "version": "v1", "waypoints": [] }),
    ),
    ev(
      2,
      EventKind::Replanned,
      json!({ "new_trail_version": "v2", "reason": "blocked on tooling" }),
    ),
  ];
  let view = reduce_journey(&events);
  assert_eq!(view.active_trail_version.as_deref(), Some("v2"));
  // Neither event moves the position.
  assert_eq!(view.position_event_id, None);
}

// ─── Learned ─────────────────────────────────────────────────────────────────

#[test]
fn clamp_saturates_at_bounds() {
  assert_eq!(clamp(0.5), 0.5);
  assert_eq!(clamp(1.8), 1.0);
  assert_eq!(clamp(-0.2), 0.0);
}

#[test]
fn learning_persists_across_backtrack() {
  let events = vec![
    ev(1, EventKind::IntentCreated, json!({ "goal": "x" })),
    entered(2, "w1"),
    ev(
      3,
      EventKind::PreferenceLearned,
      json!({ "key": "style", "value": "terse", "confidence_delta": 0.5 }),
    ),
    ev(4, EventKind::Backtracked, json!({ "target_event_id": "e1" })),
  ];
  let state = reduce_session_state("s2", &events);

  let style = &state.learned.preferences["style"];
  assert_eq!(style.value, json!("terse"));
  assert_eq!(style.confidence, 0.5);
  assert_eq!(state.journey.position_event_id.as_deref(), Some("e1"));
  assert_eq!(state.journey.visited.len(), 1);
}

#[test]
fn repeated_preference_accumulates_and_clamps() {
  let pref = |seq| {
    ev(
      seq,
      EventKind::PreferenceLearned,
      json!({ "key": "x", "value": "y", "confidence_delta": 0.6 }),
    )
  };
  let view = reduce_learned(&[pref(1), pref(2), pref(3)]);
  let record = &view.preferences["x"];
  assert_eq!(record.confidence, 1.0);
  assert_eq!(record.first_seen_seq, 1);
  assert_eq!(record.last_updated_seq, 3);
}

#[test]
fn positive_deltas_are_monotone() {
  let events: Vec<Event> = (1..=5)
    .map(|seq| {
      ev(
        seq,
        EventKind::PreferenceLearned,
        json!({ "key": "k", "value": "v", "confidence_delta": 0.3 }),
      )
    })
    .collect();

  let mut previous = 0.0;
  for n in 1..=events.len() {
    let view = reduce_learned(&events[..n]);
    let confidence = view.preferences["k"].confidence;
    assert!(confidence >= previous);
    assert!(confidence <= 1.0);
    previous = confidence;
  }
  assert_eq!(previous, 1.0);
}

#[test]
fn value_change_resets_confidence() {
  let events = vec![
    ev(
      1,
      EventKind::PreferenceLearned,
      json!({ "key": "depth", "value": "deep", "confidence_delta": 0.9 }),
    ),
    ev(
      2,
      EventKind::PreferenceLearned,
      json!({ "key": "depth", "value": "minimal", "confidence_delta": 0.2 }),
    ),
  ];
  let view = reduce_learned(&events);
  let record = &view.preferences["depth"];
  assert_eq!(record.value, json!("minimal"));
  assert_eq!(record.confidence, 0.2);
  assert_eq!(record.first_seen_seq, 1);
  assert_eq!(record.last_updated_seq, 2);
}

#[test]
fn negative_delta_decays_but_never_below_zero() {
  let events = vec![
    ev(
      1,
      EventKind::ConstraintLearned,
      json!({ "key": "os", "value": "linux", "confidence_delta": 0.3 }),
    ),
    ev(
      2,
      EventKind::ConstraintLearned,
      json!({ "key": "os", "value": "linux", "confidence_delta": -0.8 }),
    ),
  ];
  let view = reduce_learned(&events);
  assert_eq!(view.constraints["os"].confidence, 0.0);
}

#[test]
fn concept_evidence_is_deduplicated_in_order() {
  let concept = |seq, evidence: &str| {
    ev(
      seq,
      EventKind::ConceptLearned,
      json!({
        "concept_id": "c1",
        "summary": format!("take {seq}"),
        "confidence_delta": 0.25,
        "evidence_event_id": evidence,
      }),
    )
  };
  let view =
    reduce_learned(&[concept(1, "ev-a"), concept(2, "ev-b"), concept(3, "ev-a")]);

  let record = &view.concepts["c1"];
  assert_eq!(record.evidence_event_ids, ["ev-a", "ev-b"]);
  // Latest summary wins; confidence accumulated.
  assert_eq!(record.summary, "take 3");
  assert_eq!(record.confidence, 0.75);
}

#[test]
fn backtrack_never_shrinks_learned_state() {
  let mut events = vec![
    ev(
      1,
      EventKind::ConceptLearned,
      json!({ "concept_id": "c", "summary": "s", "confidence_delta": 0.5 }),
    ),
    ev(
      2,
      EventKind::PreferenceLearned,
      json!({ "key": "p", "value": 1, "confidence_delta": 0.5 }),
    ),
  ];
  let before = reduce_learned(&events);

  events.push(ev(
    3,
    EventKind::Backtracked,
    json!({ "target_event_id": "e1" }),
  ));
  let after = reduce_learned(&events);

  assert!(after.preferences.len() >= before.preferences.len());
  assert!(after.concepts.len() >= before.concepts.len());
  assert_eq!(after.preferences, before.preferences);
}

// ─── Artifacts ───────────────────────────────────────────────────────────────

fn created(seq: i64, id: &str) -> Event {
  ev(
    seq,
    EventKind::ArtifactCreated,
    json!({ "artifact_id": id, "artifact_type": "code" }),
  )
}

fn superseded(seq: i64, old: &str, new: &str) -> Event {
  ev(
    seq,
    EventKind::ArtifactSuperseded,
    json!({ "old_artifact_id": old, "new_artifact_id": new }),
  )
}

#[test]
fn supersedence_chain_is_ordered() {
  let events = vec![
    created(1, "a1"),
    created(2, "a2"),
    superseded(3, "a1", "a2"),
    created(4, "a3"),
    superseded(5, "a2", "a3"),
  ];
  let (view, warnings) = reduce_artifacts(&events);

  assert!(warnings.is_empty());
  assert_eq!(view.chains, vec![vec![
    "a1".to_string(),
    "a2".to_string(),
    "a3".to_string(),
  ]]);

  let active: Vec<&str> = view.active().map(|(id, _)| id.as_str()).collect();
  assert_eq!(active, ["a3"]);
  let superseded: Vec<&str> =
    view.superseded().map(|(id, _)| id.as_str()).collect();
  assert_eq!(superseded, ["a1", "a2"]);
}

#[test]
fn duplicate_create_keeps_first_and_warns() {
  let events = vec![created(1, "a1"), created(2, "a1")];
  let (view, warnings) = reduce_artifacts(&events);

  assert_eq!(view.artifacts["a1"].created_event_id, "e1");
  assert_eq!(warnings, vec![ReducerWarning::DuplicateArtifact {
    artifact_id: "a1".to_string(),
    event_id:    "e2".to_string(),
  }]);
}

#[test]
fn forward_supersedence_resolves_on_later_create() {
  // The link arrives before its replacement exists.
  let events =
    vec![created(1, "a1"), superseded(2, "a1", "a2"), created(3, "a2")];
  let (view, warnings) = reduce_artifacts(&events);

  assert!(warnings.is_empty());
  assert_eq!(view.artifacts["a1"].superseded_by.as_deref(), Some("a2"));
  assert_eq!(view.chains, vec![vec!["a1".to_string(), "a2".to_string()]]);
}

#[test]
fn dangling_supersedence_warns_and_keeps_view_usable() {
  let events = vec![created(1, "a1"), superseded(2, "a1", "ghost")];
  let (view, warnings) = reduce_artifacts(&events);

  assert_eq!(view.artifacts["a1"].superseded_by, None);
  assert_eq!(warnings, vec![ReducerWarning::DanglingSupersedence {
    old_artifact_id: "a1".to_string(),
    new_artifact_id: "ghost".to_string(),
  }]);
  assert_eq!(view.active().count(), 1);
}

#[test]
fn supersedence_cycle_is_detected_not_crashed_on() {
  let events = vec![
    created(1, "a1"),
    created(2, "a2"),
    superseded(3, "a1", "a2"),
    superseded(4, "a2", "a1"),
  ];
  let (view, warnings) = reduce_artifacts(&events);

  assert!(warnings.iter().any(|w| matches!(
    w,
    ReducerWarning::SupersedenceCycle { .. }
  )));
  // The walk broke at the repeat; both artifacts are still in the view.
  assert_eq!(view.artifacts.len(), 2);
  assert_eq!(view.chains, vec![vec!["a1".to_string(), "a2".to_string()]]);
}

#[test]
fn artifact_record_carries_envelope_waypoint() {
  let mut event = created(1, "a1");
  event.waypoint_id = Some("w7".to_string());
  let (view, _) = reduce_artifacts(&[event]);
  assert_eq!(view.artifacts["a1"].waypoint_id.as_deref(), Some("w7"));
}

// ─── Composer ────────────────────────────────────────────────────────────────

#[test]
fn composer_collects_warnings_and_metadata() {
  let events = vec![
    created(1, "a1"),
    created(2, "a1"),
    entered(3, "w1"),
  ];
  let state = reduce_session_state("s", &events);

  assert_eq!(state.session_id, "s");
  assert_eq!(state.event_count, 3);
  assert_eq!(state.latest_seq, Some(3));
  assert_eq!(state.latest_ts, Some(ts(3)));
  assert_eq!(state.warnings.len(), 1);
  assert_eq!(state.journey.position_event_id.as_deref(), Some("e3"));
}

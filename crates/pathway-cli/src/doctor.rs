//! `pathway doctor` — health checks over an existing database.
//!
//! Checks, per session: seq contiguity (1..=N, no gaps or duplicates),
//! parent references resolve in-session, payloads parse under their kind's
//! schema, and a full reducer replay. Reducer warnings are reported but do
//! not fail the diagnosis.

use pathway_core::{
  reduce::reduce_session_state,
  store::{EventFilter, EventStore},
  validate,
};
use pathway_store_sqlite::SqliteStore;

pub async fn run(store: &SqliteStore) -> anyhow::Result<()> {
  let sessions = store.list_sessions().await?;
  println!("Sessions found: {}", sessions.len());

  let mut issues: Vec<String> = Vec::new();
  let mut warnings: Vec<String> = Vec::new();
  let mut total_events = 0usize;

  for summary in &sessions {
    let session_id = &summary.session_id;
    let events = store
      .get_events(session_id, &EventFilter::default())
      .await?;
    total_events += events.len();

    // Seq contiguity: exactly 1..=N in order.
    let seqs: Vec<i64> = events.iter().map(|e| e.seq).collect();
    let expected: Vec<i64> = (1..=events.len() as i64).collect();
    if seqs != expected {
      issues.push(format!(
        "[{session_id}] seqs are not contiguous from 1: {seqs:?}"
      ));
    }

    // Parent references resolve within the session.
    let ids: std::collections::HashSet<&str> =
      events.iter().map(|e| e.event_id.as_str()).collect();
    for event in &events {
      if let Some(parent) = &event.parent_event_id
        && !ids.contains(parent.as_str())
      {
        issues.push(format!(
          "[{session_id}] dangling parent: {} -> {parent}",
          event.event_id
        ));
      }
    }

    // Payloads parse under their kind's schema.
    for event in &events {
      if let Err(e) = validate::validate_payload(event.kind, &event.payload)
      {
        issues.push(format!(
          "[{session_id}] invalid payload in {}: {e}",
          event.event_id
        ));
      }
    }

    // Reducer replay.
    let state = reduce_session_state(session_id, &events);
    for warning in &state.warnings {
      warnings.push(format!("[{session_id}] {warning:?}"));
    }
    println!(
      "  {session_id}: {} events, head={}",
      events.len(),
      state.journey.active_head_id
    );
  }

  println!("Total events: {total_events}");

  if !warnings.is_empty() {
    println!("\nWarnings ({}):", warnings.len());
    for warning in &warnings {
      println!("  [WARN] {warning}");
    }
  }

  if issues.is_empty() {
    println!("\nAll checks passed");
    println!("Diagnosis: HEALTHY");
    Ok(())
  } else {
    println!("\nIssues ({}):", issues.len());
    for issue in &issues {
      println!("  [FAIL] {issue}");
    }
    anyhow::bail!("diagnosis: UNHEALTHY");
  }
}

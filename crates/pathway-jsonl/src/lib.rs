//! JSONL transport for Pathway event stores.
//!
//! One event envelope per line, UTF-8, `payload` nested; file order equals
//! seq order. Export is lossless — the raw payload maps are written back
//! verbatim, so unknown fields survive a round-trip. Import preserves
//! `event_id`, `seq`, and `ts`, optionally rewriting `session_id`; because
//! the store only accepts an explicit seq that is exactly the next one, a
//! well-formed export re-imports gaplessly and anything else fails with
//! its line number.
//!
//! Used for debugging, sharing repros, and migrating data.

pub mod error;

use std::{
  fs::File,
  io::{BufRead, BufReader, BufWriter, Write},
  path::Path,
};

use pathway_core::{
  event::Event,
  store::{EventFilter, EventStore, NewEvent},
};

pub use error::{Error, Result};

// ─── Line codec ──────────────────────────────────────────────────────────────

/// Serialize one envelope as a single JSON line (no trailing newline).
pub fn encode_line(event: &Event) -> Result<String> {
  serde_json::to_string(event)
    .map_err(|e| Error::Store(pathway_core::Error::Serialization(e)))
}

/// Parse one JSON line into an envelope. `line_number` is 1-based and only
/// used for error reporting.
pub fn decode_line(line: &str, line_number: usize) -> Result<Event> {
  serde_json::from_str(line).map_err(|e| Error::Line {
    line:   line_number,
    detail: e.to_string(),
  })
}

// ─── Export ──────────────────────────────────────────────────────────────────

/// Export a session to a JSONL file, in seq order. Returns the number of
/// events written. Parent directories are created as needed.
pub async fn export_session<S: EventStore>(
  store: &S,
  session_id: &str,
  path: impl AsRef<Path>,
) -> Result<usize> {
  let events = store
    .get_events(session_id, &EventFilter::default())
    .await?;

  let path = path.as_ref();
  if let Some(parent) = path.parent()
    && !parent.as_os_str().is_empty()
  {
    std::fs::create_dir_all(parent)?;
  }

  let mut writer = BufWriter::new(File::create(path)?);
  for event in &events {
    writeln!(writer, "{}", encode_line(event)?)?;
  }
  writer.flush()?;

  Ok(events.len())
}

// ─── Import ──────────────────────────────────────────────────────────────────

/// Import events from a JSONL file. Blank lines are skipped. When
/// `session_id_override` is set, every record's `session_id` is replaced;
/// everything else — original seqs included — is preserved.
///
/// Returns the number of events appended. The first bad line aborts the
/// import with [`Error::Line`]; everything appended before it stays.
pub async fn import_session<S: EventStore>(
  store: &S,
  path: impl AsRef<Path>,
  session_id_override: Option<&str>,
) -> Result<usize> {
  let reader = BufReader::new(File::open(path.as_ref())?);
  let mut count = 0;

  for (index, line) in reader.lines().enumerate() {
    let line_number = index + 1;
    let line = line?;
    if line.trim().is_empty() {
      continue;
    }

    let mut event = decode_line(&line, line_number)?;
    if let Some(session_id) = session_id_override {
      event.session_id = session_id.to_string();
    }

    store
      .append(NewEvent::from(event))
      .await
      .map_err(|e| Error::Line {
        line:   line_number,
        detail: e.to_string(),
      })?;
    count += 1;
  }

  Ok(count)
}

// ─── Tests ───────────────────────────────────────────────────────────────────

//! [`SqliteStore`] — the SQLite implementation of [`EventStore`].

use std::{collections::BTreeMap, path::Path, time::Duration};

use chrono::{DateTime, Utc};
use pathway_core::{
  event::{Event, EventPayload, DEFAULT_HEAD},
  store::{EventFilter, EventStore, NewEvent, Order, SessionSummary},
  validate, Error, Result,
};
use rusqlite::{OptionalExtension as _, TransactionBehavior};
use uuid::Uuid;

use crate::{
  encode::{encode_actor_kind, encode_dt, decode_dt, RawEvent, EVENT_COLUMNS},
  schema::SCHEMA,
};

/// Map a database-layer failure into the core taxonomy.
fn db_err(e: tokio_rusqlite::Error) -> Error {
  Error::StoreFailure(e.to_string())
}

// ─── Store ───────────────────────────────────────────────────────────────────

/// A Pathway event store backed by a single SQLite file.
///
/// Cloning is cheap — the inner connection is reference-counted, and all
/// access is serialized onto its dedicated thread.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path)
      .await
      .map_err(db_err)?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store — useful for testing.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory()
      .await
      .map_err(db_err)?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await
      .map_err(db_err)
  }
}

// ─── Append path ─────────────────────────────────────────────────────────────

/// Everything the allocation transaction needs, pre-encoded so the closure
/// owns plain strings.
struct PendingRow {
  event_id:         String,
  session_id:       String,
  explicit_seq:     Option<i64>,
  head_id:          String,
  parent_event_id:  Option<String>,
  ts:               String,
  kind:             &'static str,
  waypoint_id:      Option<String>,
  actor_kind:       &'static str,
  actor_id:         Option<String>,
  payload_json:     String,
  backtrack_target: Option<String>,
  merge_sources:    Option<Vec<String>>,
}

/// `Ok(seq)` when the row went in; `Err` carries an ingest rejection that
/// rolled the transaction back.
type TxOutcome = Result<i64>;

fn is_busy(e: &rusqlite::Error) -> bool {
  matches!(
    e,
    rusqlite::Error::SqliteFailure(err, _)
      if matches!(
        err.code,
        rusqlite::ErrorCode::DatabaseBusy
          | rusqlite::ErrorCode::DatabaseLocked
      )
  )
}

/// Retry the allocation transaction while another writer holds the lock.
/// Observable behavior is as if writers were serialized per session.
fn append_with_retry(
  conn: &mut rusqlite::Connection,
  row: &PendingRow,
) -> std::result::Result<TxOutcome, tokio_rusqlite::Error> {
  let mut delay = Duration::from_millis(10);
  for _ in 0..5 {
    match append_tx(conn, row) {
      Err(e) if is_busy(&e) => {
        std::thread::sleep(delay);
        delay *= 2;
      }
      other => return other.map_err(Into::into),
    }
  }
  append_tx(conn, row).map_err(Into::into)
}

/// One immediate transaction: read the max seq, check references, insert.
fn append_tx(
  conn: &mut rusqlite::Connection,
  row: &PendingRow,
) -> rusqlite::Result<TxOutcome> {
  let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

  // event_id is globally unique.
  let id_taken: bool = tx
    .query_row(
      "SELECT 1 FROM events WHERE event_id = ?1",
      rusqlite::params![row.event_id],
      |_| Ok(true),
    )
    .optional()?
    .unwrap_or(false);
  if id_taken {
    return Ok(Err(Error::InvalidEnvelope(format!(
      "event id {:?} already exists",
      row.event_id
    ))));
  }

  let next_seq: i64 = tx.query_row(
    "SELECT COALESCE(MAX(seq), 0) + 1 FROM events WHERE session_id = ?1",
    rusqlite::params![row.session_id],
    |r| r.get(0),
  )?;

  // An explicit seq must be exactly the next one; anything else would
  // punch a gap or collide.
  let seq = match row.explicit_seq {
    Some(s) if s != next_seq => {
      return Ok(Err(Error::SeqConflict {
        session_id: row.session_id.clone(),
        seq:        s,
      }));
    }
    Some(s) => s,
    None => next_seq,
  };

  if let Some(parent) = &row.parent_event_id {
    match lookup_seq(&tx, &row.session_id, parent)? {
      Some(parent_seq) if parent_seq < seq => {}
      _ => return Ok(Err(Error::UnknownParent(parent.clone()))),
    }
  }

  if let Some(target) = &row.backtrack_target {
    match lookup_seq(&tx, &row.session_id, target)? {
      Some(target_seq) if target_seq < seq => {}
      _ => return Ok(Err(Error::UnknownParent(target.clone()))),
    }
  }

  if let Some(sources) = &row.merge_sources {
    let mut stmt = tx.prepare(
      "SELECT DISTINCT head_id FROM events WHERE session_id = ?1",
    )?;
    let heads = stmt
      .query_map(rusqlite::params![row.session_id], |r| {
        r.get::<_, String>(0)
      })?
      .collect::<rusqlite::Result<Vec<_>>>()?;
    drop(stmt);
    for source in sources {
      if !heads.iter().any(|h| h == source) {
        return Ok(Err(Error::InvalidEnvelope(format!(
          "merge source head {source:?} is not a current branch tip"
        ))));
      }
    }
  }

  tx.execute(
    "INSERT INTO events (
       event_id, session_id, seq, head_id, parent_event_id,
       ts, kind, waypoint_id, actor_kind, actor_id, payload_json
     ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
    rusqlite::params![
      row.event_id,
      row.session_id,
      seq,
      row.head_id,
      row.parent_event_id,
      row.ts,
      row.kind,
      row.waypoint_id,
      row.actor_kind,
      row.actor_id,
      row.payload_json,
    ],
  )?;

  tx.commit()?;
  Ok(Ok(seq))
}

fn lookup_seq(
  tx: &rusqlite::Transaction<'_>,
  session_id: &str,
  event_id: &str,
) -> rusqlite::Result<Option<i64>> {
  tx.query_row(
    "SELECT seq FROM events WHERE event_id = ?1 AND session_id = ?2",
    rusqlite::params![event_id, session_id],
    |r| r.get(0),
  )
  .optional()
}

// ─── EventStore impl ─────────────────────────────────────────────────────────

impl EventStore for SqliteStore {
  async fn append(&self, input: NewEvent) -> Result<Event> {
    validate::validate_session_id(&input.session_id)?;

    let event_id = match input.event_id {
      Some(id) => {
        validate::validate_event_id(&id)?;
        id
      }
      None => Uuid::new_v4().to_string(),
    };
    let head_id = input
      .head_id
      .unwrap_or_else(|| DEFAULT_HEAD.to_string());
    validate::validate_head_id(&head_id)?;
    let ts = input.ts.unwrap_or_else(Utc::now);
    let actor = input.actor.unwrap_or_default();

    let typed = validate::validate_payload(input.kind, &input.payload)?;
    let backtrack_target = match &typed {
      EventPayload::Backtracked(p) => Some(p.target_event_id.clone()),
      _ => None,
    };
    let merge_sources = match &typed {
      EventPayload::Merged(p) => Some(p.source_head_ids.clone()),
      _ => None,
    };

    let row = PendingRow {
      event_id:         event_id.clone(),
      session_id:       input.session_id.clone(),
      explicit_seq:     input.seq,
      head_id:          head_id.clone(),
      parent_event_id:  input.parent_event_id.clone(),
      ts:               encode_dt(ts),
      kind:             input.kind.as_str(),
      waypoint_id:      input.waypoint_id.clone(),
      actor_kind:       encode_actor_kind(actor.kind),
      actor_id:         actor.id.clone(),
      payload_json:     serde_json::Value::Object(input.payload.clone())
        .to_string(),
      backtrack_target,
      merge_sources,
    };

    let seq = self
      .conn
      .call(move |conn| append_with_retry(conn, &row))
      .await
      .map_err(db_err)??;

    Ok(Event {
      event_id,
      session_id: input.session_id,
      seq,
      ts,
      kind: input.kind,
      parent_event_id: input.parent_event_id,
      head_id,
      waypoint_id: input.waypoint_id,
      actor,
      payload: input.payload,
    })
  }

  async fn get_event(&self, event_id: &str) -> Result<Option<Event>> {
    let id = event_id.to_string();
    let sql = format!("SELECT {EVENT_COLUMNS} FROM events WHERE event_id = ?1");

    let raw: Option<RawEvent> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(&sql, rusqlite::params![id], RawEvent::from_row)
            .optional()?,
        )
      })
      .await
      .map_err(db_err)?;

    raw.map(RawEvent::into_event).transpose()
  }

  async fn get_events(
    &self,
    session_id: &str,
    filter: &EventFilter,
  ) -> Result<Vec<Event>> {
    let session = session_id.to_string();
    let kind = filter.kind.map(|k| k.as_str());
    let head = filter.head_id.clone();
    let seq_min = filter.seq_min;
    let seq_max = filter.seq_max;
    // SQLite treats LIMIT -1 as "no limit".
    let limit = filter.limit.map_or(-1, |n| n as i64);
    let offset = filter.offset.map_or(0, |n| n as i64);
    let order = match filter.order {
      Order::Asc => "ASC",
      Order::Desc => "DESC",
    };

    let sql = format!(
      "SELECT {EVENT_COLUMNS} FROM events
       WHERE session_id = ?1
         AND (?2 IS NULL OR kind = ?2)
         AND (?3 IS NULL OR head_id = ?3)
         AND (?4 IS NULL OR seq >= ?4)
         AND (?5 IS NULL OR seq <= ?5)
       ORDER BY seq {order}
       LIMIT ?6 OFFSET ?7"
    );

    let raws: Vec<RawEvent> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map(
            rusqlite::params![
              session, kind, head, seq_min, seq_max, limit, offset
            ],
            RawEvent::from_row,
          )?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await
      .map_err(db_err)?;

    raws.into_iter().map(RawEvent::into_event).collect()
  }

  async fn get_children(&self, event_id: &str) -> Result<Vec<Event>> {
    let id = event_id.to_string();
    let sql = format!(
      "SELECT {EVENT_COLUMNS} FROM events
       WHERE parent_event_id = ?1
       ORDER BY seq"
    );

    let raws: Vec<RawEvent> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map(rusqlite::params![id], RawEvent::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await
      .map_err(db_err)?;

    raws.into_iter().map(RawEvent::into_event).collect()
  }

  async fn get_heads(
    &self,
    session_id: &str,
  ) -> Result<BTreeMap<String, String>> {
    let session = session_id.to_string();

    let rows: Vec<(String, String)> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT head_id, event_id FROM events
           WHERE session_id = ?1
           ORDER BY seq",
        )?;
        let rows = stmt
          .query_map(rusqlite::params![session], |r| {
            Ok((r.get(0)?, r.get(1)?))
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await
      .map_err(db_err)?;

    // Ascending seq order, so the last write per head is its tip.
    let mut heads = BTreeMap::new();
    for (head_id, event_id) in rows {
      heads.insert(head_id, event_id);
    }
    Ok(heads)
  }

  async fn next_seq(&self, session_id: &str) -> Result<i64> {
    let session = session_id.to_string();
    self
      .conn
      .call(move |conn| {
        Ok(conn.query_row(
          "SELECT COALESCE(MAX(seq), 0) + 1 FROM events WHERE session_id = ?1",
          rusqlite::params![session],
          |r| r.get(0),
        )?)
      })
      .await
      .map_err(db_err)
  }

  async fn session_exists(&self, session_id: &str) -> Result<bool> {
    let session = session_id.to_string();
    self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              "SELECT 1 FROM events WHERE session_id = ?1 LIMIT 1",
              rusqlite::params![session],
              |_| Ok(true),
            )
            .optional()?
            .unwrap_or(false),
        )
      })
      .await
      .map_err(db_err)
  }

  async fn list_sessions(&self) -> Result<Vec<SessionSummary>> {
    let rows: Vec<(String, i64, i64, String)> = self
      .conn
      .call(|conn| {
        let mut stmt = conn.prepare(
          "SELECT e.session_id, s.n, s.max_seq, e.ts
           FROM events e
           JOIN (
             SELECT session_id, COUNT(*) AS n, MAX(seq) AS max_seq
             FROM events GROUP BY session_id
           ) s ON s.session_id = e.session_id AND s.max_seq = e.seq
           ORDER BY e.session_id",
        )?;
        let rows = stmt
          .query_map([], |r| {
            Ok((r.get(0)?, r.get(1)?, r.get(2)?, r.get(3)?))
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await
      .map_err(db_err)?;

    rows
      .into_iter()
      .map(|(session_id, n, max_seq, ts)| {
        let latest_ts: DateTime<Utc> = decode_dt(&ts)?;
        Ok(SessionSummary {
          session_id,
          event_count: n as u64,
          latest_seq: max_seq,
          latest_ts,
        })
      })
      .collect()
  }
}

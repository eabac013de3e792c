//! SQL schema for the Pathway SQLite store.
//!
//! Executed once at connection startup; idempotent thanks to
//! `CREATE TABLE IF NOT EXISTS`. The `meta` table records the schema
//! version for future migrations.

/// Full schema DDL.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA busy_timeout = 5000;
PRAGMA foreign_keys = ON;

-- Events are strictly append-only.
-- No UPDATE or DELETE is ever issued against this table.
CREATE TABLE IF NOT EXISTS events (
    event_id        TEXT PRIMARY KEY,
    session_id      TEXT NOT NULL,
    seq             INTEGER NOT NULL,
    head_id         TEXT NOT NULL DEFAULT 'main',
    parent_event_id TEXT,
    ts              TEXT NOT NULL,     -- RFC 3339 UTC
    kind            TEXT NOT NULL,     -- EventKind discriminant
    waypoint_id     TEXT,
    actor_kind      TEXT NOT NULL,     -- 'user' | 'system'
    actor_id        TEXT,
    payload_json    TEXT NOT NULL      -- raw payload object, verbatim
);

CREATE UNIQUE INDEX IF NOT EXISTS idx_events_session_seq
    ON events(session_id, seq);

CREATE INDEX IF NOT EXISTS idx_events_session_head_seq
    ON events(session_id, head_id, seq);

CREATE INDEX IF NOT EXISTS idx_events_session_parent
    ON events(session_id, parent_event_id);

CREATE INDEX IF NOT EXISTS idx_events_session_kind
    ON events(session_id, kind);

CREATE TABLE IF NOT EXISTS meta (
    key   TEXT PRIMARY KEY,
    value TEXT NOT NULL
);

INSERT OR IGNORE INTO meta (key, value) VALUES ('schema_version', '1');
";

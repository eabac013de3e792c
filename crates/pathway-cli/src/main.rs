//! `pathway` — command-line tools for the Pathway event store.
//!
//! # Usage
//!
//! ```text
//! pathway --db journeys.db init
//! pathway --db journeys.db import dump.jsonl --session-id fresh
//! pathway --db journeys.db state my-session
//! pathway --db journeys.db serve --port 8000
//! ```

mod doctor;

use std::path::PathBuf;

use anyhow::{bail, Context as _};
use clap::{Parser, Subcommand};
use pathway_core::{
  reduce::reduce_session_state,
  store::{EventFilter, EventStore},
  view::SessionState,
};
use pathway_store_sqlite::SqliteStore;
use tokio::net::TcpListener;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

// ─── CLI args ────────────────────────────────────────────────────────────────

#[derive(Parser)]
#[command(
  name = "pathway",
  version,
  about = "Append-only event log for learning journeys"
)]
struct Cli {
  /// Path to the SQLite database.
  #[arg(
    long,
    global = true,
    default_value = "pathway.db",
    env = "PATHWAY_DB_PATH"
  )]
  db: PathBuf,

  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand)]
enum Command {
  /// Initialize a new database.
  Init {
    /// Overwrite an existing database.
    #[arg(long)]
    force: bool,
  },
  /// Import events from a JSONL file.
  Import {
    /// Input JSONL file.
    input:      PathBuf,
    /// Rewrite every record's session id on import.
    #[arg(long)]
    session_id: Option<String>,
  },
  /// Export a session to a JSONL file.
  Export {
    session_id: String,
    #[arg(short, long)]
    output:     PathBuf,
  },
  /// Print the derived state for a session.
  State {
    session_id: String,
    /// Output as JSON instead of a summary.
    #[arg(long)]
    json:       bool,
  },
  /// List events for a session.
  Events {
    session_id: String,
    /// Filter by branch.
    #[arg(long)]
    head:       Option<String>,
    #[arg(long)]
    seq_min:    Option<i64>,
    #[arg(long)]
    seq_max:    Option<i64>,
    #[arg(long)]
    json:       bool,
  },
  /// List all sessions.
  Sessions,
  /// Start the API server.
  Serve {
    #[arg(long, default_value = "127.0.0.1")]
    host: String,
    #[arg(long, default_value_t = 8000)]
    port: u16,
  },
  /// Run health checks on the database.
  Doctor,
}

// ─── Entry point ─────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();

  match cli.command {
    Command::Init { force } => cmd_init(&cli.db, force).await,
    Command::Import { input, session_id } => {
      cmd_import(&cli.db, &input, session_id.as_deref()).await
    }
    Command::Export { session_id, output } => {
      cmd_export(&cli.db, &session_id, &output).await
    }
    Command::State { session_id, json } => {
      cmd_state(&cli.db, &session_id, json).await
    }
    Command::Events {
      session_id,
      head,
      seq_min,
      seq_max,
      json,
    } => cmd_events(&cli.db, &session_id, head, seq_min, seq_max, json).await,
    Command::Sessions => cmd_sessions(&cli.db).await,
    Command::Serve { host, port } => cmd_serve(&cli.db, &host, port).await,
    Command::Doctor => cmd_doctor(&cli.db).await,
  }
}

async fn open_store(db: &PathBuf) -> anyhow::Result<SqliteStore> {
  SqliteStore::open(db)
    .await
    .with_context(|| format!("failed to open store at {}", db.display()))
}

// ─── Commands ────────────────────────────────────────────────────────────────

async fn cmd_init(db: &PathBuf, force: bool) -> anyhow::Result<()> {
  if db.exists() {
    if !force {
      bail!(
        "database already exists: {} (use --force to overwrite)",
        db.display()
      );
    }
    std::fs::remove_file(db)
      .with_context(|| format!("removing {}", db.display()))?;
  }

  open_store(db).await?;
  println!("Initialized database: {}", db.display());
  Ok(())
}

async fn cmd_import(
  db: &PathBuf,
  input: &PathBuf,
  session_id: Option<&str>,
) -> anyhow::Result<()> {
  if !input.exists() {
    bail!("input file not found: {}", input.display());
  }

  let store = open_store(db).await?;
  let count = pathway_jsonl::import_session(&store, input, session_id)
    .await
    .context("import failed")?;
  println!("Imported {count} events from {}", input.display());
  Ok(())
}

async fn cmd_export(
  db: &PathBuf,
  session_id: &str,
  output: &PathBuf,
) -> anyhow::Result<()> {
  let store = open_store(db).await?;
  if !store.session_exists(session_id).await? {
    bail!("session not found: {session_id}");
  }

  let count = pathway_jsonl::export_session(&store, session_id, output)
    .await
    .context("export failed")?;
  println!("Exported {count} events to {}", output.display());
  Ok(())
}

async fn cmd_state(
  db: &PathBuf,
  session_id: &str,
  json: bool,
) -> anyhow::Result<()> {
  let store = open_store(db).await?;
  let events = store
    .get_events(session_id, &EventFilter::default())
    .await?;
  if events.is_empty() {
    bail!("session not found: {session_id}");
  }

  let state = reduce_session_state(session_id, &events);
  if json {
    println!("{}", serde_json::to_string_pretty(&state)?);
  } else {
    print_state_summary(&state);
  }
  Ok(())
}

async fn cmd_events(
  db: &PathBuf,
  session_id: &str,
  head: Option<String>,
  seq_min: Option<i64>,
  seq_max: Option<i64>,
  json: bool,
) -> anyhow::Result<()> {
  let store = open_store(db).await?;
  if !store.session_exists(session_id).await? {
    bail!("session not found: {session_id}");
  }

  let filter = EventFilter {
    head_id: head,
    seq_min,
    seq_max,
    ..Default::default()
  };
  let events = store.get_events(session_id, &filter).await?;

  if json {
    println!("{}", serde_json::to_string_pretty(&events)?);
    return Ok(());
  }

  for event in &events {
    println!("[{:04}] {} ({})", event.seq, event.kind, event.head_id);
    println!("       id: {}", event.event_id);
    println!("       ts: {}", event.ts.to_rfc3339());
    if let Some(waypoint) = &event.waypoint_id {
      println!("       waypoint: {waypoint}");
    }
    println!();
  }
  Ok(())
}

async fn cmd_sessions(db: &PathBuf) -> anyhow::Result<()> {
  let store = open_store(db).await?;
  let sessions = store.list_sessions().await?;

  if sessions.is_empty() {
    println!("No sessions found.");
    return Ok(());
  }

  for summary in sessions {
    println!("{}", summary.session_id);
    println!("  Events: {}", summary.event_count);
    println!("  Last: {}", summary.latest_ts.to_rfc3339());
    println!();
  }
  Ok(())
}

async fn cmd_serve(db: &PathBuf, host: &str, port: u16) -> anyhow::Result<()> {
  // Layer: defaults <- optional pathway.toml <- PATHWAY_* env vars.
  // The --db flag (or its default) wins for the database path.
  let settings = config::Config::builder()
    .add_source(config::File::with_name("pathway").required(false))
    .add_source(
      config::Environment::with_prefix("PATHWAY").try_parsing(true),
    )
    .build()
    .context("failed to read configuration")?;

  let mut cfg: pathway_core::Config = settings
    .try_deserialize()
    .context("failed to deserialise configuration")?;
  cfg.db_path = db.to_string_lossy().into_owned();

  let store = open_store(db).await?;
  let state = pathway_api::AppState::new(store, cfg);
  let app = pathway_api::router(state);

  let address = format!("{host}:{port}");
  tracing::info!("Listening on http://{address}");
  tracing::info!("Database: {}", db.display());

  let listener = TcpListener::bind(&address)
    .await
    .with_context(|| format!("failed to bind {address}"))?;
  axum::serve(listener, app).await.context("server error")?;

  Ok(())
}

async fn cmd_doctor(db: &PathBuf) -> anyhow::Result<()> {
  if !db.exists() {
    bail!("database not found: {}", db.display());
  }
  println!("Checking database: {}", db.display());

  let store = open_store(db).await?;
  doctor::run(&store).await
}

// ─── Summary printing ────────────────────────────────────────────────────────

fn print_state_summary(state: &SessionState) {
  println!("Session: {}", state.session_id);
  println!("Events: {}", state.event_count);
  if let Some(seq) = state.latest_seq {
    println!("Last seq: {seq}");
  }
  println!();

  let journey = &state.journey;
  println!("=== Journey ===");
  println!("  Active head: {}", journey.active_head_id);
  println!(
    "  Position: {}",
    journey.position_event_id.as_deref().unwrap_or("(none)")
  );
  println!(
    "  Trail version: {}",
    journey.active_trail_version.as_deref().unwrap_or("(none)")
  );
  println!(
    "  Branches: {:?}",
    journey.branch_tips.keys().collect::<Vec<_>>()
  );
  println!("  Visited waypoints: {}", journey.visited.len());
  println!("  Backtrack targets: {}", journey.backtrack_targets.len());
  println!();

  let learned = &state.learned;
  println!("=== Learned ===");
  println!("  Preferences: {}", learned.preferences.len());
  for (key, record) in &learned.preferences {
    println!(
      "    {key}: {} (conf={:.2})",
      record.value, record.confidence
    );
  }
  println!("  Constraints: {}", learned.constraints.len());
  for (key, record) in &learned.constraints {
    println!(
      "    {key}: {} (conf={:.2})",
      record.value, record.confidence
    );
  }
  println!("  Concepts: {}", learned.concepts.len());
  for (concept_id, record) in &learned.concepts {
    println!("    {concept_id}: conf={:.2}", record.confidence);
  }
  println!();

  let artifacts = &state.artifacts;
  println!("=== Artifacts ===");
  println!("  Total: {}", artifacts.artifacts.len());
  println!("  Active: {}", artifacts.active().count());
  println!("  Superseded: {}", artifacts.superseded().count());
  for (artifact_id, record) in &artifacts.artifacts {
    let status = match &record.superseded_by {
      Some(by) => format!("superseded by {by}"),
      None => "active".to_string(),
    };
    println!("    {artifact_id} ({:?}): {status}", record.artifact_type);
  }

  if !state.warnings.is_empty() {
    println!();
    println!("=== Warnings ===");
    for warning in &state.warnings {
      println!("  {warning:?}");
    }
  }
}

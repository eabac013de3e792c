//! Runtime configuration recognized across the Pathway crates.

use serde::Deserialize;

/// Default cap on accepted event payload bytes (1 MiB).
pub const DEFAULT_MAX_PAYLOAD_SIZE: usize = 1024 * 1024;

/// Default upper bound on session id length.
pub const DEFAULT_SESSION_ID_MAX_LENGTH: usize = 128;

/// Configuration for a Pathway deployment, deserialised from a TOML file
/// and/or `PATHWAY_`-prefixed environment variables by the binary.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
  /// Filesystem path to the store; `":memory:"` is permitted.
  pub db_path:               String,
  /// When set, write endpoints require this key in `X-API-Key`.
  pub api_key:               Option<String>,
  /// Upper bound for accepted request bodies, in bytes.
  pub max_payload_size:      usize,
  pub session_id_max_length: usize,
}

impl Default for Config {
  fn default() -> Self {
    Self {
      db_path:               "pathway.db".to_string(),
      api_key:               None,
      max_payload_size:      DEFAULT_MAX_PAYLOAD_SIZE,
      session_id_max_length: DEFAULT_SESSION_ID_MAX_LENGTH,
    }
  }
}

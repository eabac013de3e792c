//! Error types for the JSONL transport.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("io error: {0}")]
  Io(#[from] std::io::Error),

  /// A specific line could not be parsed or appended. Lines are 1-based.
  #[error("line {line}: {detail}")]
  Line { line: usize, detail: String },

  #[error(transparent)]
  Store(#[from] pathway_core::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

//! API-key extractor for write endpoints.
//!
//! When the configuration carries an `api_key`, writes must present it in
//! the `X-API-Key` header. Reads are always open.

use axum::{
  extract::FromRequestParts,
  http::{request::Parts, HeaderMap},
};
use pathway_core::{store::EventStore, Config};

use crate::{error::ApiError, AppState};

/// Zero-size marker: present in the handler means the request may write.
pub struct Authenticated;

/// Verify the key directly from headers.
pub fn verify_api_key(
  headers: &HeaderMap,
  config: &Config,
) -> Result<(), ApiError> {
  let Some(expected) = &config.api_key else {
    return Ok(());
  };

  match headers.get("x-api-key").and_then(|v| v.to_str().ok()) {
    Some(presented)
      if constant_time_eq(presented.as_bytes(), expected.as_bytes()) =>
    {
      Ok(())
    }
    _ => Err(ApiError::Unauthorized),
  }
}

/// Compare over the full length of both inputs, accumulating differences
/// instead of short-circuiting, so timing does not leak how many leading
/// bytes of the key matched.
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
  let mut diff = a.len() ^ b.len();
  for i in 0..a.len().max(b.len()) {
    let x = a.get(i).copied().unwrap_or(0);
    let y = b.get(i).copied().unwrap_or(0);
    diff |= usize::from(x ^ y);
  }
  diff == 0
}

impl<S> FromRequestParts<AppState<S>> for Authenticated
where
  S: EventStore + Clone + Send + Sync + 'static,
{
  type Rejection = ApiError;

  async fn from_request_parts(
    parts: &mut Parts,
    state: &AppState<S>,
  ) -> Result<Self, Self::Rejection> {
    verify_api_key(&parts.headers, &state.config)?;
    Ok(Authenticated)
  }
}

#[cfg(test)]
mod tests {
  use axum::http::{HeaderMap, HeaderValue};
  use pathway_core::Config;

  use super::*;

  fn config(api_key: Option<&str>) -> Config {
    Config {
      api_key: api_key.map(str::to_string),
      ..Config::default()
    }
  }

  fn headers(key: Option<&str>) -> HeaderMap {
    let mut headers = HeaderMap::new();
    if let Some(key) = key {
      headers.insert("x-api-key", HeaderValue::from_str(key).unwrap());
    }
    headers
  }

  #[test]
  fn open_when_no_key_configured() {
    assert!(verify_api_key(&headers(None), &config(None)).is_ok());
    assert!(verify_api_key(&headers(Some("any")), &config(None)).is_ok());
  }

  #[test]
  fn correct_key_accepted() {
    let cfg = config(Some("sekrit"));
    assert!(verify_api_key(&headers(Some("sekrit")), &cfg).is_ok());
  }

  #[test]
  fn missing_or_wrong_key_rejected() {
    let cfg = config(Some("sekrit"));
    assert!(verify_api_key(&headers(None), &cfg).is_err());
    assert!(verify_api_key(&headers(Some("wrong")), &cfg).is_err());
    // A prefix of the real key is still wrong.
    assert!(verify_api_key(&headers(Some("sek")), &cfg).is_err());
  }

  #[test]
  fn constant_time_eq_covers_lengths_and_content() {
    assert!(constant_time_eq(b"abc", b"abc"));
    assert!(constant_time_eq(b"", b""));
    assert!(!constant_time_eq(b"abc", b"abd"));
    assert!(!constant_time_eq(b"abc", b"ab"));
    assert!(!constant_time_eq(b"", b"x"));
  }
}

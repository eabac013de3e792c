//! Core types and reducers for the Pathway event log.
//!
//! Pathway records a learning journey as an append-only stream of events.
//! Undo is navigation, not erasure: a backtrack is a new event, and learning
//! accumulates across branches and failed paths. All state is derived by
//! folding the event stream through pure reducers.
//!
//! This crate is deliberately free of HTTP and database dependencies.
//! All other crates depend on it; it depends on nothing proprietary.

pub mod config;
pub mod error;
pub mod event;
pub mod reduce;
pub mod store;
pub mod validate;
pub mod view;

pub use config::Config;
pub use error::{Error, Result};

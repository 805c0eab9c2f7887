//! Error types for `tether-core`.
//!
//! [`Failure`] is the classified fault that crosses the public boundary inside
//! [`ResultState::Error`](crate::ResultState::Error). [`Error`] covers the
//! handful of ways the orchestration machinery itself can fail.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

// ─── Classification ──────────────────────────────────────────────────────────

/// Which layer a fault came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
  /// Transport-level fault: unreachable host, timeout, reset connection.
  NetworkFailure,
  /// The remote answered with a non-success response.
  ServerFailure,
  /// Local persistence I/O error.
  StoreFault,
  /// Any other captured fault (e.g. an undecodable payload).
  Unclassified,
}

impl ErrorKind {
  pub fn as_str(self) -> &'static str {
    match self {
      Self::NetworkFailure => "network failure",
      Self::ServerFailure => "server failure",
      Self::StoreFault => "store fault",
      Self::Unclassified => "unclassified",
    }
  }
}

impl fmt::Display for ErrorKind {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

/// A classified fault with a human-readable message.
///
/// Collaborators return this instead of propagating their own error types
/// across the core's public operations.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error("{kind}: {message}")]
pub struct Failure {
  pub kind:    ErrorKind,
  pub message: String,
}

impl Failure {
  pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
    Self { kind, message: message.into() }
  }

  pub fn network(message: impl Into<String>) -> Self {
    Self::new(ErrorKind::NetworkFailure, message)
  }

  pub fn server(message: impl Into<String>) -> Self {
    Self::new(ErrorKind::ServerFailure, message)
  }

  pub fn store(message: impl Into<String>) -> Self {
    Self::new(ErrorKind::StoreFault, message)
  }

  pub fn unclassified(message: impl Into<String>) -> Self {
    Self::new(ErrorKind::Unclassified, message)
  }

  /// Wrap a persistence backend error as a [`ErrorKind::StoreFault`].
  pub fn from_store<E: std::error::Error>(err: E) -> Self {
    Self::store(err.to_string())
  }
}

// ─── Crate error ─────────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum Error {
  /// The adapter's driver task has stopped; no further triggers are accepted.
  #[error("feed driver has shut down")]
  FeedClosed,
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

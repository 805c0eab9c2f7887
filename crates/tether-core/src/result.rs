//! [`ResultState`] — the outcome of an operation as seen by a consumer.

use crate::error::{ErrorKind, Failure};

/// Exactly one of loading, success, error, or "nothing cached".
///
/// A `Loading` emission is always followed by one of the other three for the
/// same logical request, unless the request is logically cancelled by an
/// invalidation.
#[derive(Debug, Clone, PartialEq)]
pub enum ResultState<T> {
  Loading,
  Success(T),
  Error(Failure),
  /// No cached data. Not an error.
  Empty,
}

impl<T> ResultState<T> {
  /// `Success` when `value` is present, otherwise `Empty`.
  pub fn from_option(value: Option<T>) -> Self {
    match value {
      Some(v) => Self::Success(v),
      None => Self::Empty,
    }
  }

  pub fn error(kind: ErrorKind, message: impl Into<String>) -> Self {
    Self::Error(Failure::new(kind, message))
  }

  pub fn is_loading(&self) -> bool { matches!(self, Self::Loading) }

  pub fn is_success(&self) -> bool { matches!(self, Self::Success(_)) }

  pub fn is_empty(&self) -> bool { matches!(self, Self::Empty) }

  /// Anything other than `Loading` ends a request.
  pub fn is_terminal(&self) -> bool { !self.is_loading() }

  pub fn success(self) -> Option<T> {
    match self {
      Self::Success(v) => Some(v),
      _ => None,
    }
  }

  pub fn failure(&self) -> Option<&Failure> {
    match self {
      Self::Error(f) => Some(f),
      _ => None,
    }
  }

  pub fn as_ref(&self) -> ResultState<&T> {
    match self {
      Self::Loading => ResultState::Loading,
      Self::Success(v) => ResultState::Success(v),
      Self::Error(f) => ResultState::Error(f.clone()),
      Self::Empty => ResultState::Empty,
    }
  }

  pub fn map<U>(self, f: impl FnOnce(T) -> U) -> ResultState<U> {
    match self {
      Self::Loading => ResultState::Loading,
      Self::Success(v) => ResultState::Success(f(v)),
      Self::Error(e) => ResultState::Error(e),
      Self::Empty => ResultState::Empty,
    }
  }
}

impl<T> From<Result<T, Failure>> for ResultState<T> {
  fn from(result: Result<T, Failure>) -> Self {
    match result {
      Ok(v) => Self::Success(v),
      Err(f) => Self::Error(f),
    }
  }
}

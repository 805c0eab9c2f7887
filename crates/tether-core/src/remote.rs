//! Remote source contracts.
//!
//! Implementations own their transport and wire schema. Faults are returned
//! as a classified [`Failure`], never propagated as a panic or a foreign
//! error type; timeouts are the implementation's business and surface as
//! [`ErrorKind::NetworkFailure`](crate::ErrorKind::NetworkFailure).

use std::future::Future;

use crate::{entity::Entity, error::Failure, page::PageOutcome};

/// A paginated collection fetched by logical offset.
pub trait PageSource<T: Entity>: Send + Sync {
  /// Fetch the page starting at `offset`.
  ///
  /// The implementation decides `reliable` on the returned outcome and must
  /// document the rule it applies.
  fn fetch_page(
    &self,
    offset: usize,
  ) -> impl Future<Output = Result<PageOutcome<T>, Failure>> + Send + '_;
}

/// A single entity fetched by key.
pub trait EntitySource<T: Entity>: Send + Sync {
  fn fetch<'a>(
    &'a self,
    key: &'a str,
  ) -> impl Future<Output = Result<T, Failure>> + Send + 'a;
}

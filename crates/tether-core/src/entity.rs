//! The [`Entity`] bound shared by every cached record type.

use serde::{Serialize, de::DeserializeOwned};

/// An opaque record identified by a string key.
///
/// The core never inspects fields; stores use the key for upserts and
/// per-key change notification, and persist the record as serialised data.
pub trait Entity:
  Clone + Send + Sync + Serialize + DeserializeOwned + 'static
{
  fn key(&self) -> &str;
}

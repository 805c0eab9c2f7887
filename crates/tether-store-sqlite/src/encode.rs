//! Encoding and decoding helpers between entities and the plain-text
//! representations stored in SQLite columns.
//!
//! Entities are stored as compact JSON. Timestamps are RFC 3339 strings.

use chrono::{DateTime, Utc};
use rusqlite::{Row, types::Type};
use serde::{Serialize, de::DeserializeOwned};

use crate::Result;

// ─── DateTime<Utc> ───────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339() }

// ─── Entities ────────────────────────────────────────────────────────────────

pub fn encode_entity<T: Serialize>(entity: &T) -> Result<String> {
  Ok(serde_json::to_string(entity)?)
}

/// Decode the JSON column at `idx`. Runs inside row-mapping closures, so a
/// malformed payload is reported as a column conversion failure.
pub fn decode_entity<T: DeserializeOwned>(row: &Row<'_>, idx: usize) -> rusqlite::Result<T> {
  let json: String = row.get(idx)?;
  serde_json::from_str(&json)
    .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

//! [`SqliteStore`] — the SQLite implementation of [`PersistentStore`].

use std::{marker::PhantomData, path::Path, sync::Arc};

use chrono::Utc;
use rusqlite::OptionalExtension as _;
use tokio::sync::watch;
use tracing::debug;

use tether_core::{Entity, store::PersistentStore, watchers::Watchers};

use crate::{
  Result,
  encode::{decode_entity, encode_dt, encode_entity},
  schema::{SCHEMA, UPSERT},
};

// ─── Store ───────────────────────────────────────────────────────────────────

/// One resource's entries in a SQLite file.
///
/// Cloning is cheap and clones share change notification. Handles obtained
/// from [`SqliteStore::resource`] share the connection but not notification,
/// so keep a single handle per resource.
pub struct SqliteStore<T> {
  conn:     tokio_rusqlite::Connection,
  resource: Arc<str>,
  watchers: Arc<Watchers<T>>,
  _entity:  PhantomData<fn() -> T>,
}

impl<T> Clone for SqliteStore<T> {
  fn clone(&self) -> Self {
    Self {
      conn:     self.conn.clone(),
      resource: Arc::clone(&self.resource),
      watchers: Arc::clone(&self.watchers),
      _entity:  PhantomData,
    }
  }
}

impl<T: Entity> SqliteStore<T> {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>, resource: &str) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    Self::init(conn, resource).await
  }

  /// Open an in-memory store — useful for testing.
  pub async fn open_in_memory(resource: &str) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    Self::init(conn, resource).await
  }

  async fn init(conn: tokio_rusqlite::Connection, resource: &str) -> Result<Self> {
    conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    debug!(resource, "sqlite store ready");
    Ok(Self::with_connection(conn, resource))
  }

  fn with_connection(conn: tokio_rusqlite::Connection, resource: &str) -> Self {
    Self {
      conn,
      resource: Arc::from(resource),
      watchers: Arc::new(Watchers::new()),
      _entity: PhantomData,
    }
  }

  /// A store for another resource on the same connection.
  pub fn resource<U: Entity>(&self, name: &str) -> SqliteStore<U> {
    SqliteStore::with_connection(self.conn.clone(), name)
  }

  pub fn name(&self) -> &str { &self.resource }
}

// ─── PersistentStore impl ────────────────────────────────────────────────────

impl<T: Entity> PersistentStore<T> for SqliteStore<T> {
  type Error = crate::Error;

  // ── Reads ─────────────────────────────────────────────────────────────────

  async fn read_instant(&self, key: &str) -> Result<Option<T>> {
    let resource = Arc::clone(&self.resource);
    let key = key.to_owned();

    let value = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(
            "SELECT value_json FROM entries WHERE resource = ?1 AND key = ?2",
            rusqlite::params![resource.as_ref(), key],
            |row| decode_entity(row, 0),
          )
          .optional()?)
      })
      .await?;

    Ok(value)
  }

  async fn read_all(&self) -> Result<Vec<T>> {
    let resource = Arc::clone(&self.resource);

    let values = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT value_json FROM entries WHERE resource = ?1 ORDER BY rowid",
        )?;
        let rows = stmt
          .query_map(rusqlite::params![resource.as_ref()], |row| decode_entity(row, 0))?
          .collect::<rusqlite::Result<Vec<T>>>()?;
        Ok(rows)
      })
      .await?;

    Ok(values)
  }

  async fn observe(&self, key: &str) -> Result<watch::Receiver<Option<T>>> {
    let resource = Arc::clone(&self.resource);
    let watchers = Arc::clone(&self.watchers);
    let key = key.to_owned();

    // Read and subscribe on the connection thread, so no write can slip in
    // between the two.
    let rx = self
      .conn
      .call(move |conn| {
        let current: Option<T> = conn
          .query_row(
            "SELECT value_json FROM entries WHERE resource = ?1 AND key = ?2",
            rusqlite::params![resource.as_ref(), key],
            |row| decode_entity(row, 0),
          )
          .optional()?;
        Ok(watchers.subscribe(&key, current))
      })
      .await?;

    Ok(rx)
  }

  // ── Writes ────────────────────────────────────────────────────────────────

  async fn write(&self, entity: T) -> Result<()> {
    let resource = Arc::clone(&self.resource);
    let watchers = Arc::clone(&self.watchers);
    let json = encode_entity(&entity)?;
    let at = encode_dt(Utc::now());

    self
      .conn
      .call(move |conn| {
        let key = entity.key().to_owned();
        conn.execute(UPSERT, rusqlite::params![resource.as_ref(), key, json, at])?;
        watchers.publish(&key, Some(entity));
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn write_all(&self, entities: Vec<T>) -> Result<()> {
    let resource = Arc::clone(&self.resource);
    let watchers = Arc::clone(&self.watchers);
    let encoded = entities
      .iter()
      .map(encode_entity)
      .collect::<Result<Vec<_>>>()?;
    let at = encode_dt(Utc::now());

    self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        {
          let mut stmt = tx.prepare_cached(UPSERT)?;
          for (entity, json) in entities.iter().zip(&encoded) {
            stmt.execute(rusqlite::params![resource.as_ref(), entity.key(), json, at])?;
          }
        }
        tx.commit()?;

        for entity in entities {
          let key = entity.key().to_owned();
          watchers.publish(&key, Some(entity));
        }
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn clear(&self) -> Result<()> {
    let resource = Arc::clone(&self.resource);
    let watchers = Arc::clone(&self.watchers);

    let removed = self
      .conn
      .call(move |conn| {
        let removed = conn.execute(
          "DELETE FROM entries WHERE resource = ?1",
          rusqlite::params![resource.as_ref()],
        )?;
        watchers.publish_cleared();
        Ok(removed)
      })
      .await?;

    debug!(resource = %self.resource, removed, "sqlite resource cleared");
    Ok(())
  }
}

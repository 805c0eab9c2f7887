//! SQL schema for the Tether SQLite store.
//!
//! Executed once at connection startup. Future migrations will be gated on
//! `PRAGMA user_version`.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;

-- One row per cached entity. Upserts keep the rowid, so ordering by rowid
-- yields first-insertion order within a resource.
CREATE TABLE IF NOT EXISTS entries (
    resource    TEXT NOT NULL,   -- namespace, e.g. 'venues' | 'venue_details'
    key         TEXT NOT NULL,   -- Entity::key()
    value_json  TEXT NOT NULL,   -- serialised entity
    updated_at  TEXT NOT NULL,   -- RFC 3339 UTC of the last write
    PRIMARY KEY (resource, key)
);

CREATE INDEX IF NOT EXISTS entries_resource_idx ON entries(resource);

PRAGMA user_version = 1;
";

/// Insert or fully replace one entry.
pub const UPSERT: &str = "
INSERT INTO entries (resource, key, value_json, updated_at)
VALUES (?1, ?2, ?3, ?4)
ON CONFLICT (resource, key) DO UPDATE SET
    value_json = excluded.value_json,
    updated_at = excluded.updated_at
";

//! SQL schema for the Verso SQLite store.
//!
//! Executed once at connection startup via `PRAGMA user_version`. Future
//! migrations will be gated on that version number.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

-- One relation serves every kind of tracked record; rows are keyed by
-- (owner_kind, owner_id, number). Rows are append-only apart from
-- backdating created_at.
CREATE TABLE IF NOT EXISTS versions (
    version_id    TEXT PRIMARY KEY,
    owner_kind    TEXT NOT NULL,
    owner_id      TEXT NOT NULL,
    author_kind   TEXT,            -- set together with author_id
    author_id     TEXT,
    author_name   TEXT,            -- free-text author when no record exists
    modifications TEXT NOT NULL,   -- JSON object {field: [old, new]}
    number        INTEGER NOT NULL CHECK (number > 0),
    reverted_from INTEGER,
    tag           TEXT,
    created_at    TEXT NOT NULL,   -- fixed-width RFC 3339 UTC
    updated_at    TEXT NOT NULL,
    UNIQUE (owner_kind, owner_id, number)
);

CREATE INDEX IF NOT EXISTS versions_created_idx
    ON versions(owner_kind, owner_id, created_at);
CREATE INDEX IF NOT EXISTS versions_tag_idx
    ON versions(owner_kind, owner_id, tag);

PRAGMA user_version = 1;
";

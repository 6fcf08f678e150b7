//! Progress store schema.

/// Current schema version.
pub const SCHEMA_VERSION: u32 = 1;

/// Full DDL for the progress database.
pub const CREATE_SCHEMA: &str = r#"
-- Schema version tracking
CREATE TABLE IF NOT EXISTS schema_version (
    version INTEGER NOT NULL
);

-- Key-value store for runtime state
CREATE TABLE IF NOT EXISTS kv (
    key   TEXT PRIMARY KEY,
    value TEXT NOT NULL
);

-- One row per agent session
CREATE TABLE IF NOT EXISTS sessions (
    id          TEXT PRIMARY KEY,
    started_at  TEXT NOT NULL,
    ended_at    TEXT,
    config_json TEXT NOT NULL DEFAULT '{}'
);

-- Periodic statistics flushes, append-only
CREATE TABLE IF NOT EXISTS stats_records (
    id          TEXT PRIMARY KEY,
    session_id  TEXT NOT NULL REFERENCES sessions(id),
    stats_json  TEXT NOT NULL,
    recorded_at TEXT NOT NULL
);

-- Exported game saves
CREATE TABLE IF NOT EXISTS game_saves (
    id          TEXT PRIMARY KEY,
    session_id  TEXT NOT NULL REFERENCES sessions(id),
    save_data   TEXT NOT NULL,
    saved_at    TEXT NOT NULL
);

-- Indexes
CREATE INDEX IF NOT EXISTS idx_stats_session ON stats_records(session_id, recorded_at);
CREATE INDEX IF NOT EXISTS idx_saves_session ON game_saves(session_id, saved_at);
CREATE INDEX IF NOT EXISTS idx_sessions_started ON sessions(started_at);
"#;

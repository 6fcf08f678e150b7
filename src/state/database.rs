//! SQLite progress store with WAL mode and migration support.

use crate::state::schema;
use crate::types::{SessionRecord, StatsRecord, StatsSnapshot};
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use tracing::info;

/// KV key holding the id of the most recently started session.
pub const LAST_SESSION_KEY: &str = "last_session_id";

/// The agent's progress database.
pub struct Database {
    conn: Connection,
}

fn parse_time(raw: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(raw)
        .map(|d| d.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}

impl Database {
    /// Open (or create) the database at the given path and run migrations.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path).context("Failed to open SQLite database")?;
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL;")?;

        let mut db = Self { conn };
        db.migrate()?;
        Ok(db)
    }

    /// Open an in-memory database (for testing).
    pub fn open_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let mut db = Self { conn };
        db.migrate()?;
        Ok(db)
    }

    fn migrate(&mut self) -> Result<()> {
        let version = self.schema_version();

        if version == 0 {
            info!("Creating database schema v{}", schema::SCHEMA_VERSION);
            self.conn
                .execute_batch(schema::CREATE_SCHEMA)
                .context("Failed to create schema")?;
            self.conn.execute(
                "INSERT INTO schema_version (version) VALUES (?1)",
                params![schema::SCHEMA_VERSION],
            )?;
        } else if version < schema::SCHEMA_VERSION {
            self.conn.execute(
                "UPDATE schema_version SET version = ?1",
                params![schema::SCHEMA_VERSION],
            )?;
        }

        Ok(())
    }

    /// Current schema version (0 if uninitialized).
    pub fn schema_version(&self) -> u32 {
        self.conn
            .query_row("SELECT version FROM schema_version LIMIT 1", [], |row| row.get(0))
            .unwrap_or(0)
    }

    // -----------------------------------------------------------------------
    // Key-value store
    // -----------------------------------------------------------------------

    pub fn kv_get(&self, key: &str) -> Result<Option<String>> {
        let value = self
            .conn
            .query_row("SELECT value FROM kv WHERE key = ?1", params![key], |row| row.get(0))
            .optional()?;
        Ok(value)
    }

    /// Upsert.
    pub fn kv_set(&self, key: &str, value: &str) -> Result<()> {
        self.conn.execute(
            "INSERT INTO kv (key, value) VALUES (?1, ?2)
             ON CONFLICT(key) DO UPDATE SET value = ?2",
            params![key, value],
        )?;
        Ok(())
    }


    // -----------------------------------------------------------------------
    // Sessions
    // -----------------------------------------------------------------------

    /// Open a session row and return its id.
    pub fn begin_session(&self, started_at: DateTime<Utc>, config_json: &str) -> Result<String> {
        let id = ulid::Ulid::new().to_string();
        self.conn.execute(
            "INSERT INTO sessions (id, started_at, config_json) VALUES (?1, ?2, ?3)",
            params![id, started_at.to_rfc3339(), config_json],
        )?;
        Ok(id)
    }

    pub fn end_session(&self, id: &str, ended_at: DateTime<Utc>) -> Result<()> {
        let updated = self.conn.execute(
            "UPDATE sessions SET ended_at = ?2 WHERE id = ?1",
            params![id, ended_at.to_rfc3339()],
        )?;
        anyhow::ensure!(updated == 1, "no session '{id}'");
        Ok(())
    }

    pub fn session_count(&self) -> Result<u64> {
        let count: u64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM sessions", [], |row| row.get(0))?;
        Ok(count)
    }

    /// Most recently started session.
    pub fn last_session(&self) -> Result<Option<SessionRecord>> {
        self.query_session(
            "SELECT id, started_at, ended_at, config_json FROM sessions
             ORDER BY started_at DESC, id DESC LIMIT 1",
            [],
        )
    }

    pub fn session(&self, id: &str) -> Result<Option<SessionRecord>> {
        self.query_session(
            "SELECT id, started_at, ended_at, config_json FROM sessions WHERE id = ?1",
            params![id],
        )
    }

    fn query_session(&self, sql: &str, args: impl rusqlite::Params) -> Result<Option<SessionRecord>> {
        let row = self
            .conn
            .query_row(sql, args, |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, Option<String>>(2)?,
                    row.get::<_, String>(3)?,
                ))
            })
            .optional()?;

        Ok(row.map(|(id, started_at, ended_at, config_json)| SessionRecord {
            id,
            started_at: parse_time(&started_at),
            ended_at: ended_at.as_deref().map(parse_time),
            config_json,
        }))
    }

    // -----------------------------------------------------------------------
    // Statistics
    // -----------------------------------------------------------------------

    /// Append one statistics flush. Earlier rows are never touched.
    pub fn append_stats(
        &self,
        session_id: &str,
        stats: &StatsSnapshot,
        recorded_at: DateTime<Utc>,
    ) -> Result<()> {
        let id = ulid::Ulid::new().to_string();
        let stats_json = serde_json::to_string(stats)?;
        self.conn.execute(
            "INSERT INTO stats_records (id, session_id, stats_json, recorded_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![id, session_id, stats_json, recorded_at.to_rfc3339()],
        )?;
        Ok(())
    }

    /// All flushes of a session, oldest first.
    pub fn stats_records(&self, session_id: &str) -> Result<Vec<StatsRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, session_id, stats_json, recorded_at FROM stats_records
             WHERE session_id = ?1 ORDER BY recorded_at, id",
        )?;
        let rows = stmt.query_map(params![session_id], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, String>(3)?,
            ))
        })?;

        let mut records = Vec::new();
        for row in rows {
            let (id, session_id, stats_json, recorded_at) = row?;
            let stats: StatsSnapshot = serde_json::from_str(&stats_json)
                .with_context(|| format!("Corrupt stats record {id}"))?;
            records.push(StatsRecord {
                id,
                session_id,
                stats,
                recorded_at: parse_time(&recorded_at),
            });
        }
        Ok(records)
    }

    /// Latest flush of a session.
    pub fn latest_stats(&self, session_id: &str) -> Result<Option<StatsRecord>> {
        Ok(self.stats_records(session_id)?.pop())
    }

    // -----------------------------------------------------------------------
    // Saves
    // -----------------------------------------------------------------------

    pub fn append_save(&self, session_id: &str, save_data: &str, saved_at: DateTime<Utc>) -> Result<()> {
        let id = ulid::Ulid::new().to_string();
        self.conn.execute(
            "INSERT INTO game_saves (id, session_id, save_data, saved_at) VALUES (?1, ?2, ?3, ?4)",
            params![id, session_id, save_data, saved_at.to_rfc3339()],
        )?;
        Ok(())
    }

    pub fn latest_save(&self, session_id: &str) -> Result<Option<String>> {
        let save = self
            .conn
            .query_row(
                "SELECT save_data FROM game_saves WHERE session_id = ?1
                 ORDER BY saved_at DESC, id DESC LIMIT 1",
                params![session_id],
                |row| row.get(0),
            )
            .optional()?;
        Ok(save)
    }
}

//! Database module for chatline
//!
//! Provides persistence for users and their chat transcripts.

mod schema;

pub use schema::*;

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DbError {
    #[error("Database error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("User not found: {0}")]
    UserNotFound(String),
    #[error("Transcript version conflict for {user_id}: expected {expected}, found {actual}")]
    VersionConflict {
        user_id: String,
        expected: i64,
        actual: i64,
    },
    #[error("Corrupt message row for {user_id}: {reason}")]
    CorruptRow { user_id: String, reason: String },
    #[error("Database connection lock poisoned")]
    Poisoned,
}

pub type DbResult<T> = Result<T, DbError>;

/// Thread-safe database handle
#[derive(Clone)]
pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

impl Database {
    /// Open or create database at the given path
    pub fn open<P: AsRef<Path>>(path: P) -> DbResult<Self> {
        let conn = Connection::open(path)?;
        let db = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        db.run_migrations()?;
        Ok(db)
    }

    /// Open an in-memory database (for testing)
    #[allow(dead_code)] // Used in tests
    pub fn open_in_memory() -> DbResult<Self> {
        let conn = Connection::open_in_memory()?;
        let db = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        db.run_migrations()?;
        Ok(db)
    }

    fn conn(&self) -> DbResult<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| DbError::Poisoned)
    }

    fn run_migrations(&self) -> DbResult<()> {
        let conn = self.conn()?;
        conn.execute_batch(SCHEMA)?;
        Ok(())
    }

    // ==================== User Operations ====================

    /// Register a user under an already-hashed bearer token
    pub fn create_user(&self, id: &str, name: &str, token_hash: &str) -> DbResult<User> {
        let conn = self.conn()?;
        let now = Utc::now();

        conn.execute(
            "INSERT INTO users (id, name, token_hash, transcript_version, created_at)
             VALUES (?1, ?2, ?3, 0, ?4)",
            params![id, name, token_hash, now.to_rfc3339()],
        )?;

        Ok(User {
            id: id.to_string(),
            name: name.to_string(),
            created_at: now,
        })
    }

    /// Get user by ID
    #[allow(dead_code)] // Used in tests
    pub fn get_user(&self, id: &str) -> DbResult<User> {
        let conn = self.conn()?;
        conn.query_row(
            "SELECT id, name, created_at FROM users WHERE id = ?1",
            params![id],
            |row| {
                Ok(User {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    created_at: parse_datetime(&row.get::<_, String>(2)?),
                })
            },
        )
        .optional()?
        .ok_or_else(|| DbError::UserNotFound(id.to_string()))
    }

    /// Get user by name
    pub fn get_user_by_name(&self, name: &str) -> DbResult<User> {
        let conn = self.conn()?;
        conn.query_row(
            "SELECT id, name, created_at FROM users WHERE name = ?1",
            params![name],
            |row| {
                Ok(User {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    created_at: parse_datetime(&row.get::<_, String>(2)?),
                })
            },
        )
        .optional()?
        .ok_or_else(|| DbError::UserNotFound(name.to_string()))
    }

    /// Resolve a hashed bearer token to its owner
    pub fn find_user_by_token_hash(&self, token_hash: &str) -> DbResult<User> {
        let conn = self.conn()?;
        conn.query_row(
            "SELECT id, name, created_at FROM users WHERE token_hash = ?1",
            params![token_hash],
            |row| {
                Ok(User {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    created_at: parse_datetime(&row.get::<_, String>(2)?),
                })
            },
        )
        .optional()?
        .ok_or_else(|| DbError::UserNotFound("<token>".to_string()))
    }

    // ==================== Transcript Operations ====================

    /// Load a user's transcript in chronological order
    pub fn get_transcript(&self, user_id: &str) -> DbResult<StoredTranscript> {
        let conn = self.conn()?;
        let version = current_version(&conn, user_id)?;

        let mut stmt = conn.prepare(
            "SELECT role, content FROM chat_messages
             WHERE user_id = ?1
             ORDER BY sequence_id ASC",
        )?;

        let rows = stmt.query_map(params![user_id], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?;

        let mut messages = Vec::new();
        for row in rows {
            let (role, content) = row?;
            let role = role.parse::<Role>().map_err(|e| DbError::CorruptRow {
                user_id: user_id.to_string(),
                reason: e.to_string(),
            })?;
            messages.push(Message { role, content });
        }

        Ok(StoredTranscript { messages, version })
    }

    /// Replace the whole transcript in one transaction.
    ///
    /// Succeeds only if the stored version still equals `expected_version`;
    /// returns the new version.
    pub fn replace_transcript(
        &self,
        user_id: &str,
        messages: &[Message],
        expected_version: i64,
    ) -> DbResult<i64> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;

        let actual = current_version(&tx, user_id)?;
        if actual != expected_version {
            return Err(DbError::VersionConflict {
                user_id: user_id.to_string(),
                expected: expected_version,
                actual,
            });
        }

        tx.execute(
            "DELETE FROM chat_messages WHERE user_id = ?1",
            params![user_id],
        )?;

        let now = Utc::now().to_rfc3339();
        {
            let mut insert = tx.prepare(
                "INSERT INTO chat_messages (user_id, sequence_id, role, content, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
            )?;
            for (sequence_id, message) in (1_i64..).zip(messages) {
                insert.execute(params![
                    user_id,
                    sequence_id,
                    message.role.as_str(),
                    message.content,
                    now
                ])?;
            }
        }

        let next = bump_version(&tx, user_id)?;
        tx.commit()?;
        Ok(next)
    }

    /// Unconditionally reset a transcript to empty; returns the new version
    pub fn clear_transcript(&self, user_id: &str) -> DbResult<i64> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;

        // Surface unknown users instead of silently clearing nothing
        current_version(&tx, user_id)?;

        tx.execute(
            "DELETE FROM chat_messages WHERE user_id = ?1",
            params![user_id],
        )?;
        let next = bump_version(&tx, user_id)?;
        tx.commit()?;
        Ok(next)
    }
}

fn current_version(conn: &Connection, user_id: &str) -> DbResult<i64> {
    conn.query_row(
        "SELECT transcript_version FROM users WHERE id = ?1",
        params![user_id],
        |row| row.get(0),
    )
    .optional()?
    .ok_or_else(|| DbError::UserNotFound(user_id.to_string()))
}

fn bump_version(conn: &Connection, user_id: &str) -> DbResult<i64> {
    conn.execute(
        "UPDATE users SET transcript_version = transcript_version + 1 WHERE id = ?1",
        params![user_id],
    )?;
    current_version(conn, user_id)
}

fn parse_datetime(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s).map_or_else(|_| Utc::now(), |dt| dt.with_timezone(&Utc))
}

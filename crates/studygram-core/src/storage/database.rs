//! SQLite-based session log and stats store.
//!
//! Provides persistent storage for:
//! - Completed focus sessions (append-only, per user)
//! - The cumulative stats document (one row per user)
//! - Key-value store for application state (the CLI's focus timer)

use std::path::Path;

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row, TransactionBehavior};
use uuid::Uuid;

use super::{data_dir, migrations};
use crate::accrual::{accrue_days, replay, UserStats};
use crate::calendar::{StudyDate, StudyDays};
use crate::error::{DatabaseError, Result};
use crate::ledger::{AccrualRecord, FocusStore};
use crate::session::FocusSession;

const STATS_COLUMNS: &str =
    "total_minutes, xp, level, current_streak, longest_streak, last_study_date";

/// SQLite database for sessions and stats.
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Get a reference to the underlying SQLite connection.
    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    /// Open the database at `<data_dir>/studygram.db`.
    ///
    /// Creates the database file and schema if they don't exist.
    ///
    /// # Errors
    /// Returns an error if the data directory or database cannot be opened,
    /// or if migration fails.
    pub fn open() -> Result<Self> {
        let path = data_dir()?.join("studygram.db");
        Self::open_at(&path)
    }

    /// Open (or create) the database at an explicit path.
    ///
    /// # Errors
    /// Returns an error if the file cannot be opened or migrated.
    pub fn open_at(path: &Path) -> Result<Self> {
        let conn = Connection::open(path).map_err(|source| DatabaseError::OpenFailed {
            path: path.to_path_buf(),
            source,
        })?;
        // Two terminals completing at once should wait, not fail immediately.
        conn.busy_timeout(std::time::Duration::from_secs(5))?;
        Self::from_connection(conn)
    }

    /// Open an in-memory database (for tests).
    #[cfg(test)]
    pub fn open_memory() -> Result<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self> {
        migrations::migrate(&conn)
            .map_err(|e| DatabaseError::MigrationFailed(e.to_string()))?;
        Ok(Self { conn })
    }

    /// Get a value from the kv store.
    pub fn kv_get(&self, key: &str) -> Result<Option<String>> {
        let value = self
            .conn
            .query_row("SELECT value FROM kv WHERE key = ?1", params![key], |row| {
                row.get::<_, String>(0)
            })
            .optional()?;
        Ok(value)
    }

    /// Set a value in the kv store.
    pub fn kv_set(&self, key: &str, value: &str) -> Result<()> {
        self.conn.execute(
            "INSERT OR REPLACE INTO kv (key, value) VALUES (?1, ?2)",
            params![key, value],
        )?;
        Ok(())
    }
}

fn read_stats(conn: &Connection, user_id: &str) -> rusqlite::Result<Option<UserStats>> {
    conn.query_row(
        &format!("SELECT {STATS_COLUMNS} FROM user_stats WHERE user_id = ?1"),
        params![user_id],
        stats_from_row,
    )
    .optional()
}

fn stats_from_row(row: &Row<'_>) -> rusqlite::Result<UserStats> {
    let raw_date: Option<String> = row.get(5)?;
    let last_study_date = raw_date.and_then(|raw| match StudyDate::parse("last_study_date", &raw) {
        Ok(date) => Some(date),
        Err(e) => {
            // An unreadable date can only restart the streak.
            tracing::warn!(error = %e, "ignoring malformed last_study_date");
            None
        }
    });
    Ok(UserStats {
        total_minutes: row.get(0)?,
        xp: row.get(1)?,
        level: row.get(2)?,
        current_streak: row.get(3)?,
        longest_streak: row.get(4)?,
        last_study_date,
    })
}

fn write_stats(conn: &Connection, user_id: &str, stats: &UserStats) -> rusqlite::Result<()> {
    conn.execute(
        "INSERT INTO user_stats
            (user_id, total_minutes, xp, level, current_streak, longest_streak, last_study_date, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
         ON CONFLICT(user_id) DO UPDATE SET
            total_minutes = excluded.total_minutes,
            xp = excluded.xp,
            level = excluded.level,
            current_streak = excluded.current_streak,
            longest_streak = excluded.longest_streak,
            last_study_date = excluded.last_study_date,
            updated_at = excluded.updated_at",
        params![
            user_id,
            stats.total_minutes,
            stats.xp,
            stats.level,
            stats.current_streak,
            stats.longest_streak,
            stats.last_study_date.map(|d| d.to_string()),
            Utc::now().to_rfc3339(),
        ],
    )?;
    Ok(())
}

fn session_from_row(row: &Row<'_>) -> rusqlite::Result<FocusSession> {
    let id: String = row.get(0)?;
    let completed_at: String = row.get(5)?;
    let date: String = row.get(6)?;
    Ok(FocusSession {
        id: Uuid::parse_str(&id).map_err(|e| conversion_error(0, e))?,
        subject: row.get(1)?,
        goal: row.get(2)?,
        minutes: row.get(3)?,
        earned_xp: row.get(4)?,
        completed_at: DateTime::parse_from_rfc3339(&completed_at)
            .map_err(|e| conversion_error(5, e))?
            .with_timezone(&Utc),
        date: StudyDate::parse("date", &date).map_err(|e| conversion_error(6, e))?,
    })
}

fn read_sessions(
    conn: &Connection,
    user_id: &str,
    limit: Option<usize>,
) -> rusqlite::Result<Vec<FocusSession>> {
    let limit = limit.map_or(-1, |l| i64::try_from(l).unwrap_or(i64::MAX));
    let mut stmt = conn.prepare(
        "SELECT id, subject, goal, minutes, earned_xp, completed_at, date
         FROM focus_sessions
         WHERE user_id = ?1
         ORDER BY completed_at DESC, rowid DESC
         LIMIT ?2",
    )?;
    let rows = stmt.query_map(params![user_id, limit], session_from_row)?;
    rows.collect()
}

fn conversion_error<E>(column: usize, err: E) -> rusqlite::Error
where
    E: std::error::Error + Send + Sync + 'static,
{
    rusqlite::Error::FromSqlConversionFailure(column, rusqlite::types::Type::Text, Box::new(err))
}

impl FocusStore for Database {
    fn load_or_init_stats(&mut self, user_id: &str) -> Result<UserStats> {
        if let Some(stats) = read_stats(&self.conn, user_id)? {
            return Ok(stats);
        }
        let stats = UserStats::default();
        self.conn.execute(
            "INSERT OR IGNORE INTO user_stats (user_id, updated_at) VALUES (?1, ?2)",
            params![user_id, Utc::now().to_rfc3339()],
        )?;
        tracing::debug!(user_id, "created default stats");
        Ok(read_stats(&self.conn, user_id)?.unwrap_or(stats))
    }

    fn record_and_accrue(&mut self, user_id: &str, session: &FocusSession) -> Result<AccrualRecord> {
        let days = StudyDays::ending(session.date)?;

        // IMMEDIATE takes the write lock before the read, so a concurrent
        // completion cannot slip in between read-prior and write-next.
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;

        let prior = read_stats(&tx, user_id)?.unwrap_or_default();
        let next = accrue_days(&prior, u64::from(session.minutes), &days)?;

        tx.execute(
            "INSERT INTO focus_sessions (id, user_id, subject, goal, minutes, earned_xp, completed_at, date)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                session.id.to_string(),
                user_id,
                session.subject,
                session.goal,
                session.minutes,
                session.earned_xp,
                session.completed_at.to_rfc3339(),
                session.date.to_string(),
            ],
        )?;
        write_stats(&tx, user_id, &next)?;
        tx.commit()?;

        Ok(AccrualRecord { prior, next })
    }

    fn recompute_stats(&mut self, user_id: &str) -> Result<(UserStats, usize)> {
        // Same write lock as record_and_accrue: a completion on another
        // handle either lands before the log is read or waits for the commit.
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;

        let sessions = read_sessions(&tx, user_id, None)?;
        let stats = replay(&sessions)?;
        write_stats(&tx, user_id, &stats)?;
        tx.commit()?;

        Ok((stats, sessions.len()))
    }

    fn sessions(&self, user_id: &str, limit: Option<usize>) -> Result<Vec<FocusSession>> {
        Ok(read_sessions(&self.conn, user_id, limit)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calendar::FixedClock;
    use crate::session::SessionDraft;
    use chrono::NaiveDate;

    fn session_on(y: i32, m: u32, d: u32, minutes: u32) -> FocusSession {
        let clock =
            FixedClock::at_local_noon(NaiveDate::from_ymd_opt(y, m, d).unwrap(), 0).unwrap();
        FocusSession::complete(&SessionDraft::new("Physics", None, minutes), &clock).unwrap()
    }

    #[test]
    fn first_read_creates_default_row() {
        let mut db = Database::open_memory().unwrap();
        let stats = db.load_or_init_stats("u1").unwrap();
        assert_eq!(stats, UserStats::default());

        let count: i64 = db
            .conn()
            .query_row("SELECT COUNT(*) FROM user_stats", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 1);
    }

    #[test]
    fn record_and_accrue_persists_both() {
        let mut db = Database::open_memory().unwrap();
        let session = session_on(2024, 1, 10, 25);
        let record = db.record_and_accrue("u1", &session).unwrap();
        assert_eq!(record.prior, UserStats::default());
        assert_eq!(record.next.xp, 25);
        assert_eq!(record.next.current_streak, 1);

        assert_eq!(db.load_or_init_stats("u1").unwrap(), record.next);
        let logged = db.sessions("u1", None).unwrap();
        assert_eq!(logged, vec![session]);
    }

    #[test]
    fn users_are_isolated() {
        let mut db = Database::open_memory().unwrap();
        db.record_and_accrue("u1", &session_on(2024, 1, 10, 25)).unwrap();
        assert_eq!(db.load_or_init_stats("u2").unwrap().xp, 0);
        assert!(db.sessions("u2", None).unwrap().is_empty());
    }

    #[test]
    fn sessions_newest_first_with_limit() {
        let mut db = Database::open_memory().unwrap();
        db.record_and_accrue("u1", &session_on(2024, 1, 10, 15)).unwrap();
        db.record_and_accrue("u1", &session_on(2024, 1, 11, 25)).unwrap();
        db.record_and_accrue("u1", &session_on(2024, 1, 12, 50)).unwrap();

        let latest = db.sessions("u1", Some(2)).unwrap();
        assert_eq!(latest.len(), 2);
        assert_eq!(latest[0].minutes, 50);
        assert_eq!(latest[1].minutes, 25);
    }

    #[test]
    fn failed_insert_leaves_stats_untouched() {
        let mut db = Database::open_memory().unwrap();
        let session = session_on(2024, 1, 10, 25);
        db.record_and_accrue("u1", &session).unwrap();

        // Same id again violates the primary key; the stats write must roll back.
        let err = db.record_and_accrue("u1", &session).unwrap_err();
        assert!(err.is_store_unavailable());
        assert_eq!(db.load_or_init_stats("u1").unwrap().xp, 25);
        assert_eq!(db.sessions("u1", None).unwrap().len(), 1);
    }

    #[test]
    fn malformed_last_date_restarts_streak() {
        let mut db = Database::open_memory().unwrap();
        db.conn()
            .execute(
                "INSERT INTO user_stats (user_id, total_minutes, xp, level, current_streak, longest_streak, last_study_date, updated_at)
                 VALUES ('u1', 100, 100, 1, 4, 4, '10/01/2024', '')",
                [],
            )
            .unwrap();
        let stats = db.load_or_init_stats("u1").unwrap();
        assert_eq!(stats.last_study_date, None);

        let record = db.record_and_accrue("u1", &session_on(2024, 1, 10, 25)).unwrap();
        assert_eq!(record.next.current_streak, 1);
        assert_eq!(record.next.longest_streak, 4);
    }

    #[test]
    fn recompute_repairs_stats_row() {
        let mut db = Database::open_memory().unwrap();
        db.record_and_accrue("u1", &session_on(2024, 1, 10, 25)).unwrap();
        db.record_and_accrue("u1", &session_on(2024, 1, 11, 50)).unwrap();
        let expected = db.load_or_init_stats("u1").unwrap();

        db.conn()
            .execute(
                "UPDATE user_stats SET xp = 0, total_minutes = 0, current_streak = 0 WHERE user_id = 'u1'",
                [],
            )
            .unwrap();
        let (stats, logged) = db.recompute_stats("u1").unwrap();
        assert_eq!(logged, 2);
        assert_eq!(stats, expected);
        assert_eq!(db.load_or_init_stats("u1").unwrap(), expected);
    }

    #[test]
    fn kv_store() {
        let db = Database::open_memory().unwrap();
        assert!(db.kv_get("test").unwrap().is_none());
        db.kv_set("test", "hello").unwrap();
        assert_eq!(db.kv_get("test").unwrap().unwrap(), "hello");
    }
}

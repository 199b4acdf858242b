//! Session completion: record, accrue, persist.
//!
//! [`FocusLedger`] ties a [`Clock`] to a [`FocusStore`]. The store owns the
//! read-modify-write of the stats document and must apply it atomically
//! together with the session append: either both land or neither does, so a
//! retry after a failure re-reads prior stats and never double counts.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::accrual::{accrue_days, replay, StreakChange, UserStats};
use crate::calendar::{Clock, StudyDate, StudyDays};
use crate::error::{DatabaseError, Result};
use crate::events::Event;
use crate::session::{FocusSession, SessionDraft};

/// Stats before and after one accrual.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccrualRecord {
    pub prior: UserStats,
    pub next: UserStats,
}

/// Persistence seam for the session log and the stats document.
pub trait FocusStore {
    /// Current stats, creating the all-zero default on first access.
    fn load_or_init_stats(&mut self, user_id: &str) -> Result<UserStats>;

    /// Append `session` and write the accrued stats as one atomic unit.
    ///
    /// The prior value must be read inside the same unit of work.
    fn record_and_accrue(&mut self, user_id: &str, session: &FocusSession) -> Result<AccrualRecord>;

    /// Rebuild the stats document by replaying the whole session log.
    ///
    /// Reading the log and writing the result must be one atomic unit, so a
    /// completion cannot land in between and be overwritten. Returns the new
    /// stats and the number of sessions replayed.
    fn recompute_stats(&mut self, user_id: &str) -> Result<(UserStats, usize)>;

    /// Logged sessions, newest first.
    fn sessions(&self, user_id: &str, limit: Option<usize>) -> Result<Vec<FocusSession>>;
}

/// Minutes and sessions logged on one local day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DaySummary {
    pub date: StudyDate,
    pub sessions: u32,
    pub minutes: u64,
    pub earned_xp: u64,
}

pub struct FocusLedger<S, C> {
    store: S,
    clock: C,
}

impl<S: FocusStore, C: Clock> FocusLedger<S, C> {
    pub fn new(store: S, clock: C) -> Self {
        Self { store, clock }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn into_store(self) -> S {
        self.store
    }

    pub fn stats(&mut self, user_id: &str) -> Result<UserStats> {
        self.store.load_or_init_stats(user_id)
    }

    /// Record a finished session and accrue it into the user's stats.
    ///
    /// # Errors
    /// `InvalidInput` when the draft is rejected (nothing is written), or
    /// `StoreUnavailable` when the store fails (nothing is written either).
    pub fn complete(&mut self, user_id: &str, draft: &SessionDraft) -> Result<Event> {
        let session = FocusSession::complete(draft, &self.clock)?;
        let record = self.store.record_and_accrue(user_id, &session)?;

        let days = StudyDays::ending(session.date)?;
        let streak = StreakChange::classify(record.prior.last_study_date, &days);
        tracing::info!(
            user_id,
            session_id = %session.id,
            minutes = session.minutes,
            xp = record.next.xp,
            streak = record.next.current_streak,
            "focus session recorded"
        );

        Ok(Event::SessionRecorded {
            session_id: session.id,
            earned_xp: session.earned_xp,
            streak,
            leveled_up: record.next.level > record.prior.level,
            stats: record.next,
            at: session.completed_at,
        })
    }

    pub fn sessions(&self, user_id: &str, limit: Option<usize>) -> Result<Vec<FocusSession>> {
        self.store.sessions(user_id, limit)
    }

    /// Rebuild the stats document from the session log.
    pub fn recompute(&mut self, user_id: &str) -> Result<UserStats> {
        let (stats, sessions) = self.store.recompute_stats(user_id)?;
        tracing::info!(user_id, sessions, xp = stats.xp, "stats recomputed");
        Ok(stats)
    }

    /// Totals for sessions logged on the clock's current local day.
    pub fn today(&self, user_id: &str) -> Result<DaySummary> {
        let today = StudyDays::from_clock(&self.clock)?.today;
        let mut summary = DaySummary {
            date: today,
            sessions: 0,
            minutes: 0,
            earned_xp: 0,
        };
        for session in self.store.sessions(user_id, None)? {
            if session.date == today {
                summary.sessions += 1;
                summary.minutes += u64::from(session.minutes);
                summary.earned_xp += session.earned_xp;
            } else if session.date < today {
                // Newest first, so everything after this is older.
                break;
            }
        }
        Ok(summary)
    }
}

/// In-process store, for tests and embedding.
///
/// Writes can be made to fail to exercise the no-partial-write path.
#[derive(Debug, Default)]
pub struct MemoryStore {
    stats: HashMap<String, UserStats>,
    sessions: HashMap<String, Vec<FocusSession>>,
    fail_writes: bool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_fail_writes(&mut self, fail: bool) {
        self.fail_writes = fail;
    }

    fn check_writable(&self) -> Result<()> {
        if self.fail_writes {
            return Err(DatabaseError::QueryFailed("store is read-only".into()).into());
        }
        Ok(())
    }
}

impl FocusStore for MemoryStore {
    fn load_or_init_stats(&mut self, user_id: &str) -> Result<UserStats> {
        Ok(self.stats.entry(user_id.to_string()).or_default().clone())
    }

    fn record_and_accrue(&mut self, user_id: &str, session: &FocusSession) -> Result<AccrualRecord> {
        self.check_writable()?;
        let days = StudyDays::ending(session.date)?;
        let prior = self.stats.get(user_id).cloned().unwrap_or_default();
        let next = accrue_days(&prior, u64::from(session.minutes), &days)?;

        self.sessions
            .entry(user_id.to_string())
            .or_default()
            .push(session.clone());
        self.stats.insert(user_id.to_string(), next.clone());
        Ok(AccrualRecord { prior, next })
    }

    fn recompute_stats(&mut self, user_id: &str) -> Result<(UserStats, usize)> {
        self.check_writable()?;
        let logged = self.sessions.get(user_id).map_or(&[][..], Vec::as_slice);
        let stats = replay(logged)?;
        let count = logged.len();
        self.stats.insert(user_id.to_string(), stats.clone());
        Ok((stats, count))
    }

    fn sessions(&self, user_id: &str, limit: Option<usize>) -> Result<Vec<FocusSession>> {
        let mut sessions = self.sessions.get(user_id).cloned().unwrap_or_default();
        sessions.sort_by(|a, b| b.completed_at.cmp(&a.completed_at));
        if let Some(limit) = limit {
            sessions.truncate(limit);
        }
        Ok(sessions)
    }
}

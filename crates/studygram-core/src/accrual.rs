//! Streak, XP and level accrual.
//!
//! [`accrue`] turns one completed session plus the prior cumulative stats
//! into the next cumulative stats. It is a pure function: the caller reads
//! the prior value, supplies the local `today`/`yesterday` pair, and is
//! responsible for persisting the result (see [`crate::ledger`]).
//!
//! ## Streak rule
//!
//! ```text
//! last_study_date == today      -> streak unchanged
//! last_study_date == yesterday  -> streak + 1
//! anything else (or absent)     -> streak = 1
//! ```
//!
//! Level is always derived: `xp / 300 + 1`.

use serde::{Deserialize, Serialize};

use crate::calendar::{StudyDate, StudyDays};
use crate::error::ValidationError;
use crate::session::FocusSession;

/// Experience points granted per focused minute.
pub const XP_PER_MINUTE: u64 = 1;

/// Focused minutes needed to climb one level.
pub const MINUTES_PER_LEVEL: u64 = 300;

const XP_PER_LEVEL: u64 = MINUTES_PER_LEVEL * XP_PER_MINUTE;

/// Cumulative focus statistics for one user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserStats {
    pub total_minutes: u64,
    pub xp: u64,
    pub level: u32,
    pub current_streak: u32,
    pub longest_streak: u32,
    pub last_study_date: Option<StudyDate>,
}

impl Default for UserStats {
    fn default() -> Self {
        Self {
            total_minutes: 0,
            xp: 0,
            level: 1,
            current_streak: 0,
            longest_streak: 0,
            last_study_date: None,
        }
    }
}

impl UserStats {
    /// XP still needed to reach the next level.
    pub fn xp_to_next_level(&self) -> u64 {
        XP_PER_LEVEL - self.xp % XP_PER_LEVEL
    }
}

/// Level for a lifetime XP total.
pub fn level_for_xp(xp: u64) -> u32 {
    u32::try_from(xp / XP_PER_LEVEL)
        .unwrap_or(u32::MAX - 1)
        .saturating_add(1)
}

/// How a completion moved the current streak.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StreakChange {
    /// Already studied today.
    Kept,
    /// Studied yesterday, so the run continues.
    Extended,
    /// First session ever, or at least one day was missed.
    Started,
}

impl StreakChange {
    pub fn classify(last: Option<StudyDate>, days: &StudyDays) -> Self {
        match last {
            Some(last) if last == days.today => StreakChange::Kept,
            Some(last) if last == days.yesterday => StreakChange::Extended,
            _ => StreakChange::Started,
        }
    }

    fn apply(self, current: u32) -> u32 {
        match self {
            StreakChange::Kept => current,
            StreakChange::Extended => current.saturating_add(1),
            StreakChange::Started => 1,
        }
    }
}

/// Accrue one session from caller-supplied date strings.
///
/// `minutes` must be positive; `today` and `yesterday` must be normalized
/// `YYYY-MM-DD` dates one calendar day apart.
///
/// # Errors
/// Returns a [`ValidationError`] for non-positive minutes or malformed
/// dates. Nothing should be persisted in that case.
pub fn accrue(
    prior: &UserStats,
    minutes: i64,
    today: &str,
    yesterday: &str,
) -> Result<UserStats, ValidationError> {
    let minutes = u64::try_from(minutes)
        .ok()
        .filter(|m| *m > 0)
        .ok_or(ValidationError::NonPositiveMinutes { minutes })?;
    let days = StudyDays::parse(today, yesterday)?;
    accrue_days(prior, minutes, &days)
}

/// Accrue one session against an already validated day pair.
///
/// # Errors
/// Returns [`ValidationError::NonPositiveMinutes`] when `minutes` is zero.
pub fn accrue_days(
    prior: &UserStats,
    minutes: u64,
    days: &StudyDays,
) -> Result<UserStats, ValidationError> {
    if minutes == 0 {
        return Err(ValidationError::NonPositiveMinutes { minutes: 0 });
    }
    let earned_xp = minutes.saturating_mul(XP_PER_MINUTE);

    let current_streak =
        StreakChange::classify(prior.last_study_date, days).apply(prior.current_streak);
    let xp = prior.xp.saturating_add(earned_xp);

    Ok(UserStats {
        total_minutes: prior.total_minutes.saturating_add(minutes),
        xp,
        level: level_for_xp(xp),
        current_streak,
        longest_streak: prior.longest_streak.max(current_streak),
        last_study_date: Some(days.today),
    })
}

/// Rebuild cumulative stats by folding a session log, oldest first.
///
/// Each session is accrued against its own recorded date, so the result
/// matches what incremental accrual produced for the same log.
///
/// # Errors
/// Returns a [`ValidationError`] if a logged session has zero minutes or a
/// date with no previous day.
pub fn replay<'a, I>(sessions: I) -> Result<UserStats, ValidationError>
where
    I: IntoIterator<Item = &'a FocusSession>,
{
    let mut ordered: Vec<&FocusSession> = sessions.into_iter().collect();
    ordered.sort_by_key(|s| (s.completed_at, s.date));

    ordered.into_iter().try_fold(UserStats::default(), |stats, session| {
        let days = StudyDays::ending(session.date)?;
        accrue_days(&stats, u64::from(session.minutes), &days)
    })
}

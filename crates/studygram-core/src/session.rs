//! Completed focus sessions.
//!
//! A [`SessionDraft`] is what the timer (or a manual log entry) hands over at
//! completion time. Stamping it with the clock produces an immutable
//! [`FocusSession`] that goes into the per-user append-only log.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::accrual::XP_PER_MINUTE;
use crate::calendar::{Clock, StudyDate};
use crate::error::ValidationError;

pub const DEFAULT_SUBJECT: &str = "General";

/// Session details collected before completion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionDraft {
    pub subject: String,
    #[serde(default)]
    pub goal: Option<String>,
    pub minutes: u32,
}

impl SessionDraft {
    pub fn new(subject: impl Into<String>, goal: Option<String>, minutes: u32) -> Self {
        Self {
            subject: subject.into(),
            goal,
            minutes,
        }
    }

    /// Trim free text and reject zero-length sessions.
    ///
    /// A blank subject falls back to [`DEFAULT_SUBJECT`]; a blank goal is
    /// dropped.
    pub fn normalized(&self) -> Result<Self, ValidationError> {
        if self.minutes == 0 {
            return Err(ValidationError::NonPositiveMinutes { minutes: 0 });
        }
        let subject = match self.subject.trim() {
            "" => DEFAULT_SUBJECT.to_string(),
            s => s.to_string(),
        };
        let goal = self
            .goal
            .as_deref()
            .map(str::trim)
            .filter(|g| !g.is_empty())
            .map(str::to_string);
        Ok(Self {
            subject,
            goal,
            minutes: self.minutes,
        })
    }
}

/// One completed session as stored in the log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FocusSession {
    pub id: Uuid,
    pub subject: String,
    pub goal: Option<String>,
    pub minutes: u32,
    pub earned_xp: u64,
    pub completed_at: DateTime<Utc>,
    /// Local calendar date of `completed_at`.
    pub date: StudyDate,
}

impl FocusSession {
    /// Stamp a draft with the clock's current instant and local date.
    pub fn complete(draft: &SessionDraft, clock: &dyn Clock) -> Result<Self, ValidationError> {
        let draft = draft.normalized()?;
        let now = clock.now();
        Ok(Self {
            id: Uuid::new_v4(),
            subject: draft.subject,
            goal: draft.goal,
            minutes: draft.minutes,
            earned_xp: u64::from(draft.minutes) * XP_PER_MINUTE,
            completed_at: now.with_timezone(&Utc),
            date: StudyDate::new(now.date_naive()),
        })
    }
}

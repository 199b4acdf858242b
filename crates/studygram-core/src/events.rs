use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::accrual::{StreakChange, UserStats};
use crate::timer::TimerState;

/// Every state change in the focus flow produces an Event.
/// The CLI prints them as JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    TimerStarted {
        minutes: u32,
        subject: String,
        at: DateTime<Utc>,
    },
    TimerPaused {
        remaining_ms: u64,
        at: DateTime<Utc>,
    },
    TimerResumed {
        remaining_ms: u64,
        at: DateTime<Utc>,
    },
    TimerCompleted {
        minutes: u32,
        at: DateTime<Utc>,
    },
    TimerReset {
        at: DateTime<Utc>,
    },
    /// A completed session was logged and stats accrued.
    SessionRecorded {
        session_id: Uuid,
        earned_xp: u64,
        streak: StreakChange,
        leveled_up: bool,
        stats: UserStats,
        at: DateTime<Utc>,
    },
    StateSnapshot {
        state: TimerState,
        minutes: u32,
        subject: String,
        goal: Option<String>,
        remaining_ms: u64,
        /// `MM:SS`, rounded up to the next whole second.
        remaining: String,
        progress_pct: f64,
        at: DateTime<Utc>,
    },
}

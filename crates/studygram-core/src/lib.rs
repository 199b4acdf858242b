//! # Studygram Core Library
//!
//! Focus-session accounting for Studygram: every completed focus session
//! earns XP, extends (or restarts) a daily streak, and moves the user's
//! level. The CLI is a thin layer over this crate.
//!
//! ## Architecture
//!
//! - **Accrual**: pure streak/XP/level arithmetic over explicit dates
//! - **Calendar**: normalized local dates and an injectable clock
//! - **Ledger**: session completion through an atomic [`FocusStore`]
//! - **Timer**: wall-clock countdown that produces session drafts
//! - **Storage**: SQLite session log and stats, TOML configuration
//!
//! ## Key Components
//!
//! - [`accrue`]: next stats from prior stats and one session
//! - [`FocusLedger`]: record-and-accrue orchestration
//! - [`FocusTimer`]: focus countdown state machine
//! - [`Database`]: SQLite implementation of [`FocusStore`]
//! - [`Config`]: application configuration management

pub mod accrual;
pub mod calendar;
pub mod error;
pub mod events;
pub mod ledger;
pub mod session;
pub mod storage;
pub mod timer;

pub use accrual::{accrue, level_for_xp, replay, StreakChange, UserStats, MINUTES_PER_LEVEL, XP_PER_MINUTE};
pub use calendar::{Clock, FixedClock, StudyDate, StudyDays, SystemClock};
pub use error::{ConfigError, CoreError, DatabaseError, Result, ValidationError};
pub use events::Event;
pub use ledger::{AccrualRecord, DaySummary, FocusLedger, FocusStore, MemoryStore};
pub use session::{FocusSession, SessionDraft};
pub use storage::{Config, Database};
pub use timer::{FocusTimer, TimerState};

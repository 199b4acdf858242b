//! Focus timer.
//!
//! A wall-clock-based countdown. It does not use internal threads - the
//! caller is responsible for calling `tick()` periodically (the CLI ticks
//! once per invocation and persists the timer between runs).
//!
//! ## State Transitions
//!
//! ```text
//! Ready -> Running <-> Paused
//! Running -> Done            (remaining time reaches zero)
//! Done -> Ready              (take_completed)
//! any -> Ready               (reset)
//! ```
//!
//! Subject, goal and duration can only be changed while the timer is not
//! counting down.

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::events::Event;
use crate::session::{SessionDraft, DEFAULT_SUBJECT};

pub const DEFAULT_PRESETS: [u32; 4] = [15, 25, 50, 75];
pub const DEFAULT_MINUTES: u32 = 25;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimerState {
    Ready,
    Running,
    Paused,
    /// Countdown finished; the session is waiting to be saved.
    Done,
}

impl TimerState {
    fn as_str(self) -> &'static str {
        match self {
            TimerState::Ready => "ready",
            TimerState::Running => "running",
            TimerState::Paused => "paused",
            TimerState::Done => "done",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FocusTimer {
    presets: Vec<u32>,
    minutes: u32,
    subject: String,
    #[serde(default)]
    goal: Option<String>,
    state: TimerState,
    /// Remaining time in milliseconds.
    remaining_ms: u64,
    /// Timestamp (ms since epoch) of the last start/resume/tick while running.
    #[serde(default)]
    last_tick_epoch_ms: Option<u64>,
}

impl Default for FocusTimer {
    fn default() -> Self {
        Self::new(DEFAULT_PRESETS.to_vec(), DEFAULT_MINUTES)
    }
}

impl FocusTimer {
    /// Create a timer in the `Ready` state.
    ///
    /// `minutes` falls back to the first preset when it is not one of them.
    pub fn new(presets: Vec<u32>, minutes: u32) -> Self {
        let presets: Vec<u32> = presets.into_iter().filter(|m| *m > 0).collect();
        let presets = if presets.is_empty() {
            DEFAULT_PRESETS.to_vec()
        } else {
            presets
        };
        let minutes = if presets.contains(&minutes) {
            minutes
        } else {
            presets[0]
        };
        Self {
            presets,
            minutes,
            subject: DEFAULT_SUBJECT.to_string(),
            goal: None,
            state: TimerState::Ready,
            remaining_ms: minutes_to_ms(minutes),
            last_tick_epoch_ms: None,
        }
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn state(&self) -> TimerState {
        self.state
    }

    pub fn minutes(&self) -> u32 {
        self.minutes
    }

    pub fn presets(&self) -> &[u32] {
        &self.presets
    }

    pub fn subject(&self) -> &str {
        &self.subject
    }

    pub fn remaining_ms(&self) -> u64 {
        self.remaining_ms
    }

    pub fn total_ms(&self) -> u64 {
        minutes_to_ms(self.minutes)
    }

    /// 0.0 .. 100.0 progress through the current session.
    pub fn progress_pct(&self) -> f64 {
        let total = self.total_ms();
        if total == 0 {
            return 0.0;
        }
        let done = total.saturating_sub(self.remaining_ms) as f64;
        (done / total as f64 * 100.0).clamp(0.0, 100.0)
    }

    /// `MM:SS` rendering of the remaining time.
    pub fn remaining_display(&self) -> String {
        let secs = self.remaining_ms.div_ceil(1000);
        format!("{:02}:{:02}", secs / 60, secs % 60)
    }

    pub fn snapshot(&self) -> Event {
        Event::StateSnapshot {
            state: self.state,
            minutes: self.minutes,
            subject: self.subject.clone(),
            goal: self.goal.clone(),
            remaining_ms: self.remaining_ms,
            remaining: self.remaining_display(),
            progress_pct: self.progress_pct(),
            at: Utc::now(),
        }
    }

    // ── Configuration ────────────────────────────────────────────────

    /// Pick a session length. Resets the countdown to the new length.
    pub fn set_minutes(&mut self, minutes: u32) -> Result<(), ValidationError> {
        self.ensure_editable("change duration")?;
        if !self.presets.contains(&minutes) {
            return Err(ValidationError::InvalidValue {
                field: "minutes".into(),
                message: format!("{minutes} is not one of {:?}", self.presets),
            });
        }
        self.minutes = minutes;
        self.state = TimerState::Ready;
        self.remaining_ms = minutes_to_ms(minutes);
        self.last_tick_epoch_ms = None;
        Ok(())
    }

    /// Builder form of [`set_subject`](Self::set_subject) for a fresh timer.
    pub fn with_subject(mut self, subject: &str) -> Self {
        self.subject = subject.to_string();
        self
    }

    pub fn set_subject(&mut self, subject: &str) -> Result<(), ValidationError> {
        self.ensure_editable("change subject")?;
        self.subject = subject.to_string();
        Ok(())
    }

    pub fn set_goal(&mut self, goal: Option<String>) -> Result<(), ValidationError> {
        self.ensure_editable("change goal")?;
        self.goal = goal;
        Ok(())
    }

    // ── Commands ─────────────────────────────────────────────────────

    pub fn start(&mut self) -> Result<Event, ValidationError> {
        self.start_at(now_ms())
    }

    pub fn pause(&mut self) -> Result<Event, ValidationError> {
        self.pause_at(now_ms())
    }

    pub fn resume(&mut self) -> Result<Event, ValidationError> {
        self.resume_at(now_ms())
    }

    /// Call periodically. Returns `Some(Event::TimerCompleted)` when the
    /// countdown reaches zero.
    pub fn tick(&mut self) -> Option<Event> {
        self.tick_at(now_ms())
    }

    pub fn reset(&mut self) -> Event {
        self.state = TimerState::Ready;
        self.remaining_ms = self.total_ms();
        self.last_tick_epoch_ms = None;
        Event::TimerReset { at: Utc::now() }
    }

    /// Hand over the finished session and return to `Ready`.
    ///
    /// Only valid in `Done`. The goal is cleared for the next session; the
    /// subject and duration are kept.
    pub fn take_completed(&mut self) -> Result<SessionDraft, ValidationError> {
        if self.state != TimerState::Done {
            return Err(self.illegal("save session"));
        }
        let draft = SessionDraft::new(self.subject.clone(), self.goal.take(), self.minutes);
        self.reset();
        Ok(draft)
    }

    pub(crate) fn start_at(&mut self, now: u64) -> Result<Event, ValidationError> {
        match self.state {
            TimerState::Ready => {
                if self.remaining_ms == 0 {
                    self.remaining_ms = self.total_ms();
                }
                self.state = TimerState::Running;
                self.last_tick_epoch_ms = Some(now);
                tracing::debug!(minutes = self.minutes, subject = %self.subject, "focus timer started");
                Ok(Event::TimerStarted {
                    minutes: self.minutes,
                    subject: self.subject.clone(),
                    at: Utc::now(),
                })
            }
            TimerState::Paused => self.resume_at(now),
            TimerState::Running | TimerState::Done => Err(self.illegal("start")),
        }
    }

    pub(crate) fn pause_at(&mut self, now: u64) -> Result<Event, ValidationError> {
        if self.state != TimerState::Running {
            return Err(self.illegal("pause"));
        }
        self.flush_elapsed(now);
        if self.remaining_ms == 0 {
            // Finished before the pause landed.
            self.finish();
            return Err(self.illegal("pause"));
        }
        self.state = TimerState::Paused;
        self.last_tick_epoch_ms = None;
        Ok(Event::TimerPaused {
            remaining_ms: self.remaining_ms,
            at: Utc::now(),
        })
    }

    pub(crate) fn resume_at(&mut self, now: u64) -> Result<Event, ValidationError> {
        if self.state != TimerState::Paused {
            return Err(self.illegal("resume"));
        }
        self.state = TimerState::Running;
        self.last_tick_epoch_ms = Some(now);
        Ok(Event::TimerResumed {
            remaining_ms: self.remaining_ms,
            at: Utc::now(),
        })
    }

    pub(crate) fn tick_at(&mut self, now: u64) -> Option<Event> {
        if self.state != TimerState::Running {
            return None;
        }
        self.flush_elapsed(now);
        if self.remaining_ms > 0 {
            return None;
        }
        self.finish();
        Some(Event::TimerCompleted {
            minutes: self.minutes,
            at: Utc::now(),
        })
    }

    // ── Internal ─────────────────────────────────────────────────────

    fn finish(&mut self) {
        self.state = TimerState::Done;
        self.remaining_ms = 0;
        self.last_tick_epoch_ms = None;
        tracing::debug!(minutes = self.minutes, "focus timer finished");
    }

    fn flush_elapsed(&mut self, now: u64) {
        if let Some(last) = self.last_tick_epoch_ms {
            let elapsed = now.saturating_sub(last);
            self.remaining_ms = self.remaining_ms.saturating_sub(elapsed);
            self.last_tick_epoch_ms = Some(now);
        }
    }

    fn ensure_editable(&self, command: &str) -> Result<(), ValidationError> {
        match self.state {
            TimerState::Ready | TimerState::Paused => Ok(()),
            TimerState::Running | TimerState::Done => Err(self.illegal(command)),
        }
    }

    fn illegal(&self, command: &str) -> ValidationError {
        ValidationError::IllegalTransition {
            command: command.to_string(),
            state: self.state.as_str().to_string(),
        }
    }
}

fn minutes_to_ms(minutes: u32) -> u64 {
    u64::from(minutes) * 60 * 1000
}

fn now_ms() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

use clap::Subcommand;
use studygram_core::{Database, FocusTimer, SessionDraft};

use super::{print_json, CmdResult, Session};

const TIMER_KEY_PREFIX: &str = "focus_timer";

#[derive(Subcommand)]
pub enum FocusAction {
    /// Start (or resume) the focus countdown
    Start {
        /// Session length in minutes (one of the configured presets)
        #[arg(long)]
        minutes: Option<u32>,
        /// What you are studying
        #[arg(long)]
        subject: Option<String>,
        /// What you want to finish in this session
        #[arg(long)]
        goal: Option<String>,
    },
    /// Pause the countdown
    Pause,
    /// Resume a paused countdown
    Resume,
    /// Back to ready with the full duration
    Reset,
    /// Print current timer state as JSON
    Status,
    /// Save the finished session and accrue XP
    Complete,
    /// Record a session without running the timer
    Log {
        #[arg(long)]
        minutes: u32,
        #[arg(long)]
        subject: Option<String>,
        #[arg(long)]
        goal: Option<String>,
    },
}

fn timer_key(user_id: &str) -> String {
    format!("{TIMER_KEY_PREFIX}:{user_id}")
}

fn load_timer(db: &Database, session: &Session) -> FocusTimer {
    match db.kv_get(&timer_key(&session.user_id)) {
        Ok(Some(json)) => match serde_json::from_str::<FocusTimer>(&json) {
            Ok(timer) => return timer,
            Err(e) => tracing::warn!(error = %e, "discarding unreadable timer state"),
        },
        Ok(None) => {}
        Err(e) => tracing::warn!(error = %e, "could not read timer state"),
    }
    session.config.timer()
}

fn save_timer(db: &Database, user_id: &str, timer: &FocusTimer) -> CmdResult {
    db.kv_set(&timer_key(user_id), &serde_json::to_string(timer)?)?;
    Ok(())
}

pub fn run(action: FocusAction, user: Option<&str>) -> CmdResult {
    let mut session = Session::open(user)?;
    let mut timer = load_timer(session.db(), &session);

    match action {
        FocusAction::Start {
            minutes,
            subject,
            goal,
        } => {
            if let Some(minutes) = minutes {
                timer.set_minutes(minutes)?;
            }
            if let Some(subject) = subject {
                timer.set_subject(&subject)?;
            }
            if goal.is_some() {
                timer.set_goal(goal)?;
            }
            print_json(&timer.start()?)?;
        }
        FocusAction::Pause => {
            timer.tick();
            print_json(&timer.pause()?)?;
        }
        FocusAction::Resume => print_json(&timer.resume()?)?,
        FocusAction::Reset => print_json(&timer.reset())?,
        FocusAction::Status => {
            let completed = timer.tick();
            print_json(&timer.snapshot())?;
            if let Some(event) = completed {
                print_json(&event)?;
            }
        }
        FocusAction::Complete => {
            timer.tick();
            // Work on a copy so a failed save leaves the timer in Done for a retry.
            let mut next = timer.clone();
            let draft = next.take_completed()?;
            let event = session.ledger.complete(&session.user_id, &draft)?;
            timer = next;
            print_json(&event)?;
        }
        FocusAction::Log {
            minutes,
            subject,
            goal,
        } => {
            let subject = subject.unwrap_or_else(|| session.config.focus.default_subject.clone());
            let draft = SessionDraft::new(subject, goal, minutes);
            let event = session.ledger.complete(&session.user_id, &draft)?;
            print_json(&event)?;
        }
    }

    save_timer(session.db(), &session.user_id, &timer)?;
    Ok(())
}

use clap::Subcommand;
use serde::Serialize;
use studygram_core::UserStats;

use super::{print_json, CmdResult, Session};

#[derive(Subcommand)]
pub enum StatsAction {
    /// Streak, XP and level
    Show,
    /// Minutes and sessions logged today
    Today,
    /// Recent sessions, newest first
    Sessions {
        #[arg(long, default_value = "20")]
        limit: usize,
    },
    /// Rebuild stats from the session log
    Recompute,
}

#[derive(Serialize)]
struct StatsView {
    user_id: String,
    #[serde(flatten)]
    stats: UserStats,
    xp_to_next_level: u64,
}

pub fn run(action: StatsAction, user: Option<&str>) -> CmdResult {
    let mut session = Session::open(user)?;
    let user_id = session.user_id.clone();

    match action {
        StatsAction::Show => {
            let stats = session.ledger.stats(&user_id)?;
            print_json(&StatsView {
                user_id,
                xp_to_next_level: stats.xp_to_next_level(),
                stats,
            })?;
        }
        StatsAction::Today => print_json(&session.ledger.today(&user_id)?)?,
        StatsAction::Sessions { limit } => {
            print_json(&session.ledger.sessions(&user_id, Some(limit))?)?;
        }
        StatsAction::Recompute => {
            let stats = session.ledger.recompute(&user_id)?;
            print_json(&StatsView {
                user_id,
                xp_to_next_level: stats.xp_to_next_level(),
                stats,
            })?;
        }
    }
    Ok(())
}

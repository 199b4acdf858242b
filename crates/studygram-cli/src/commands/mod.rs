pub mod config;
pub mod focus;
pub mod stats;

use studygram_core::{Config, Database, FocusLedger, SystemClock};

pub type CmdResult = Result<(), Box<dyn std::error::Error>>;

/// Config, resolved user id, and a ledger over the on-disk database.
pub struct Session {
    pub config: Config,
    pub user_id: String,
    pub ledger: FocusLedger<Database, SystemClock>,
}

impl Session {
    pub fn open(user: Option<&str>) -> Result<Self, Box<dyn std::error::Error>> {
        let config = Config::load()?;
        let user_id = match user.map(str::trim) {
            Some(u) if !u.is_empty() => u.to_string(),
            _ => config.profile.user_id.clone(),
        };
        let ledger = FocusLedger::new(Database::open()?, SystemClock);
        Ok(Self {
            config,
            user_id,
            ledger,
        })
    }

    pub fn db(&self) -> &Database {
        self.ledger.store()
    }
}

pub fn print_json<T: serde::Serialize>(value: &T) -> CmdResult {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

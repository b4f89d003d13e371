use clap::Subcommand;
use viewbudget_core::{AccountingEngine, Config, Database, EngineEvent, Event};

use super::common::{now, resolve_origin};
use crate::host::TerminalPage;

#[derive(Subcommand)]
pub enum LimitAction {
    /// Print the daily limit in minutes
    Get {
        /// Page URL
        url: String,
    },
    /// Save a new daily limit in minutes
    Set {
        /// Page URL
        url: String,
        /// New limit (positive whole minutes)
        #[arg(allow_hyphen_values = true)]
        minutes: String,
    },
}

pub fn run(action: LimitAction) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load()?;

    match action {
        LimitAction::Get { url } => {
            let origin = resolve_origin(&config, &url)?;
            let db = Database::open()?;
            let engine = AccountingEngine::from_config(db.scoped(&origin), &config);
            println!("{}", engine.ledger().limit_minutes());
        }
        LimitAction::Set { url, minutes } => {
            let origin = resolve_origin(&config, &url)?;
            let db = Database::open()?;
            let mut engine = AccountingEngine::from_config(db.scoped(&origin), &config);
            let mut page = TerminalPage::new(false);

            // The save control only exists after page start has reset the day.
            let now = now();
            engine.ledger().reset_if_due(&now)?;

            let events = engine.handle(EngineEvent::SaveLimit(minutes), &mut page, now)?;
            match events.first() {
                Some(Event::LimitSaved { .. }) => {}
                Some(Event::LimitRejected { reason, .. }) => {
                    return Err(format!("invalid limit: {reason}").into());
                }
                Some(Event::Blocked { accumulated_ms, limit_ms, .. }) => {
                    return Err(format!(
                        "today's usage ({accumulated_ms} ms) already exceeds the new limit ({limit_ms} ms); limit not saved"
                    )
                    .into());
                }
                _ => return Err("limit not saved".into()),
            }
        }
    }
    Ok(())
}

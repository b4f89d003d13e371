use viewbudget_core::{Config, Database, Ledger};

use super::common::{now, resolve_origin};

pub fn run(url: &str) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load()?;
    let origin = resolve_origin(&config, url)?;
    let db = Database::open()?;
    let ledger = Ledger::with_settings(
        db.scoped(&origin),
        config.limits.default_minutes,
        config.reset_boundary(),
    );

    let applied = ledger.reset_if_due(&now())?;
    let boundary = ledger.boundary();
    let json = serde_json::json!({
        "origin": origin,
        "reset": applied,
        "boundary": format!("{:02}:{:02}", boundary.hour(), boundary.minute()),
        "last_reset": ledger.last_reset(),
    });
    println!("{}", serde_json::to_string_pretty(&json)?);
    Ok(())
}

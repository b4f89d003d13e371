use viewbudget_core::{AccountingEngine, Config, Database};

use super::common::{now, resolve_origin};

pub fn run(url: &str, history: bool) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load()?;
    let origin = resolve_origin(&config, url)?;
    let db = Database::open()?;
    let engine = AccountingEngine::from_config(db.scoped(&origin), &config);

    // Same view a page loaded now would get.
    let now = now();
    let reset = engine.ledger().reset_if_due(&now)?;

    let mut json = serde_json::to_value(engine.snapshot(now))?;
    json["origin"] = origin.into();
    json["reset"] = reset.into();
    if history {
        json["history"] = serde_json::to_value(engine.ledger().usage_history())?;
    }
    println!("{}", serde_json::to_string_pretty(&json)?);
    Ok(())
}

use chrono::{DateTime, FixedOffset, Local};
use viewbudget_core::{origin_of, parse_page_url, Config};

/// Local wall-clock time with its UTC offset.
pub fn now() -> DateTime<FixedOffset> {
    Local::now().fixed_offset()
}

/// Resolve a page URL to its storage origin, refusing pages outside the
/// configured allow-list.
pub fn resolve_origin(config: &Config, raw: &str) -> Result<String, Box<dyn std::error::Error>> {
    let url = parse_page_url(raw)?;
    let matcher = config.site_matcher()?;
    if !matcher.is_match(&url) {
        return Err(format!("{raw} is not covered by sites.patterns").into());
    }
    Ok(origin_of(&url))
}

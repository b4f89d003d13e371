use viewbudget_core::{origin_of, parse_page_url, Config};

pub fn run(url: &str) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load()?;
    let parsed = parse_page_url(url)?;
    let matcher = config.site_matcher()?;
    let pattern = matcher.find(&parsed).map(|p| p.as_str().to_string());

    let json = serde_json::json!({
        "url": url,
        "origin": origin_of(&parsed),
        "matched": pattern.is_some(),
        "pattern": pattern,
    });
    println!("{}", serde_json::to_string_pretty(&json)?);
    Ok(())
}

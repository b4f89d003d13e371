//! Site applicability.
//!
//! The engine only runs on pages whose URL matches one of the configured
//! userscript-style patterns, e.g. `*://*.youtube.com/*`:
//!
//! - scheme: `*` (http or https) or a literal scheme
//! - host: `*` (any), `*.example.com` (the domain and all subdomains) or a
//!   literal host
//! - path: glob where `*` matches any run of characters, checked against the
//!   path plus query string

use std::fmt;
use std::str::FromStr;

use regex::Regex;
use url::Url;

use crate::error::ValidationError;

#[derive(Debug, Clone, PartialEq, Eq)]
enum SchemeMatch {
    /// `*` covers http and https only.
    Web,
    Exact(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum HostMatch {
    Any,
    Exact(String),
    /// Domain itself plus any subdomain.
    Domain(String),
}

/// A single parsed match pattern.
#[derive(Debug, Clone)]
pub struct MatchPattern {
    raw: String,
    scheme: SchemeMatch,
    host: HostMatch,
    path: Regex,
}

impl MatchPattern {
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn matches(&self, url: &Url) -> bool {
        let scheme_ok = match &self.scheme {
            SchemeMatch::Web => matches!(url.scheme(), "http" | "https"),
            SchemeMatch::Exact(s) => url.scheme() == s,
        };
        if !scheme_ok {
            return false;
        }

        let Some(host) = url.host_str() else {
            return false;
        };
        let host = host.to_ascii_lowercase();
        let host_ok = match &self.host {
            HostMatch::Any => true,
            HostMatch::Exact(h) => host == *h,
            HostMatch::Domain(d) => {
                host == *d
                    || host
                        .strip_suffix(d.as_str())
                        .is_some_and(|prefix| prefix.ends_with('.'))
            }
        };
        if !host_ok {
            return false;
        }

        let target = match url.query() {
            Some(q) => format!("{}?{q}", url.path()),
            None => url.path().to_string(),
        };
        self.path.is_match(&target)
    }
}

impl FromStr for MatchPattern {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = |message: &str| ValidationError::InvalidPattern {
            pattern: s.to_string(),
            message: message.to_string(),
        };

        let (scheme, rest) = s
            .split_once("://")
            .ok_or_else(|| invalid("missing '://'"))?;
        let slash = rest.find('/').ok_or_else(|| invalid("missing path"))?;
        let (host, path) = rest.split_at(slash);

        let scheme = match scheme {
            "*" => SchemeMatch::Web,
            "" => return Err(invalid("empty scheme")),
            s if s.chars().all(|c| c.is_ascii_alphanumeric() || "+-.".contains(c)) => {
                SchemeMatch::Exact(s.to_ascii_lowercase())
            }
            _ => return Err(invalid("invalid scheme")),
        };

        let host = host.to_ascii_lowercase();
        let host = if host == "*" {
            HostMatch::Any
        } else if let Some(domain) = host.strip_prefix("*.") {
            if domain.is_empty() || domain.contains('*') {
                return Err(invalid("invalid wildcard host"));
            }
            HostMatch::Domain(domain.to_string())
        } else if host.is_empty() || host.contains('*') {
            return Err(invalid("invalid host"));
        } else {
            HostMatch::Exact(host)
        };

        let path = path_regex(path).map_err(|e| invalid(&e.to_string()))?;

        Ok(Self {
            raw: s.to_string(),
            scheme,
            host,
            path,
        })
    }
}

impl fmt::Display for MatchPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

/// Allow-list of pages the engine runs on.
#[derive(Debug, Clone, Default)]
pub struct SiteMatcher {
    patterns: Vec<MatchPattern>,
}

impl SiteMatcher {
    /// # Errors
    /// Returns an error naming the first pattern that fails to parse.
    pub fn from_patterns<I, P>(patterns: I) -> Result<Self, ValidationError>
    where
        I: IntoIterator<Item = P>,
        P: AsRef<str>,
    {
        let patterns = patterns
            .into_iter()
            .map(|p| p.as_ref().parse())
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { patterns })
    }

    /// The first pattern covering `url`, if any.
    pub fn find(&self, url: &Url) -> Option<&MatchPattern> {
        self.patterns.iter().find(|p| p.matches(url))
    }

    pub fn is_match(&self, url: &Url) -> bool {
        self.find(url).is_some()
    }
}

/// Parse a page URL.
///
/// # Errors
/// Returns an error if `raw` is not an absolute URL.
pub fn parse_page_url(raw: &str) -> Result<Url, ValidationError> {
    Url::parse(raw).map_err(|e| ValidationError::InvalidUrl {
        url: raw.to_string(),
        message: e.to_string(),
    })
}

/// Storage scope of a page, e.g. `https://www.youtube.com`.
pub fn origin_of(url: &Url) -> String {
    url.origin().ascii_serialization()
}

/// Compile a path glob, `*` matching any run of characters, into an
/// anchored regex.
fn path_regex(glob: &str) -> Result<Regex, regex::Error> {
    let body = glob
        .split('*')
        .map(regex::escape)
        .collect::<Vec<_>>()
        .join(".*");
    Regex::new(&format!("^{body}$"))
}

//! User-agent classification.
//!
//! Substrings overlap between vendors (Chromium Edge carries `Chrome`, Chrome
//! carries `Safari`), so the rules are tried in a fixed priority order and the
//! first match wins.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BrowserFamily {
    Chrome,
    Safari,
    Firefox,
    Edge,
    Unknown,
}

impl BrowserFamily {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            BrowserFamily::Chrome => "Chrome",
            BrowserFamily::Safari => "Safari",
            BrowserFamily::Firefox => "Firefox",
            BrowserFamily::Edge => "Edge",
            BrowserFamily::Unknown => "Unknown",
        }
    }
}

impl fmt::Display for BrowserFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BrowserInfo {
    pub family: BrowserFamily,
    /// Major version as a decimal string, `"0"` when it cannot be read.
    pub major: String,
}

impl BrowserInfo {
    fn unknown() -> Self {
        Self {
            family: BrowserFamily::Unknown,
            major: "0".to_string(),
        }
    }
}

struct Rule {
    family: BrowserFamily,
    requires: &'static str,
    excludes: Option<&'static str>,
    version: &'static str,
}

const RULES: [Rule; 4] = [
    Rule {
        family: BrowserFamily::Chrome,
        requires: "Chrome",
        excludes: Some("Edg"),
        version: r"Chrome/(\d+)",
    },
    Rule {
        family: BrowserFamily::Safari,
        requires: "Safari",
        excludes: Some("Chrome"),
        version: r"Version/(\d+)",
    },
    Rule {
        family: BrowserFamily::Firefox,
        requires: "Firefox",
        excludes: None,
        version: r"Firefox/(\d+)",
    },
    Rule {
        family: BrowserFamily::Edge,
        requires: "Edg",
        excludes: None,
        version: r"Edg/(\d+)",
    },
];

/// Version patterns, index-aligned with `RULES`.
static VERSION_PATTERNS: Lazy<Vec<Option<Regex>>> = Lazy::new(|| {
    RULES
        .iter()
        .map(|rule| Regex::new(rule.version).ok())
        .collect()
});

/// Classifies a user-agent string into a browser family and major version.
#[must_use]
pub fn detect(user_agent: &str) -> BrowserInfo {
    let Some((index, rule)) = RULES.iter().enumerate().find(|(_, rule)| {
        user_agent.contains(rule.requires)
            && rule.excludes.map_or(true, |ex| !user_agent.contains(ex))
    }) else {
        return BrowserInfo::unknown();
    };

    let major = VERSION_PATTERNS
        .get(index)
        .and_then(Option::as_ref)
        .and_then(|re| re.captures(user_agent))
        .and_then(|caps| caps.get(1))
        .map_or_else(|| "0".to_string(), |m| m.as_str().to_string());

    BrowserInfo {
        family: rule.family,
        major,
    }
}

// Credential extraction from scraped text
//
// Pure text -> candidate endpoint URLs + bearer tokens. No network, no side
// effects; re-running on the same text yields the same sets.

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    // Cloud-hosted project URL shape
    static ref CLOUD_URL_PATTERN: Regex =
        Regex::new(r"(?i)https://[a-z0-9-]+\.supabase\.co").unwrap();

    // Three-segment signed token, base64url alphabet, fixed first-segment prefix
    static ref BEARER_TOKEN_PATTERN: Regex =
        Regex::new(r"eyJ[A-Za-z0-9_-]+\.[A-Za-z0-9_-]+\.[A-Za-z0-9_-]*").unwrap();

    // Environment-variable-style assignments. Keys may carry bundler
    // public-exposure prefixes and use either snake or camel conventions;
    // the capture group holds the assigned value.
    static ref ENV_ASSIGNMENT_PATTERNS: Vec<Regex> = vec![
        Regex::new(
            r#"(?i)(?:NEXT_PUBLIC_|VITE_|REACT_APP_|PUBLIC_)?SUPABASE[_-]?URL["']?\s*[:=]\s*["']?(https://[^"'\s,]+)"#
        ).unwrap(),
        Regex::new(
            r#"(?i)["']?(?:supabaseUrl|supabase_url|supabaseURL)["']?\s*[:=]\s*["']?(https://[^"'\s,]+)"#
        ).unwrap(),
        Regex::new(
            r#"(?i)(?:NEXT_PUBLIC_|VITE_|REACT_APP_|PUBLIC_)?SUPABASE[_-]?(?:ANON[_-]?)?KEY["']?\s*[:=]\s*["']?(eyJ[A-Za-z0-9_-]+\.[A-Za-z0-9_-]+\.[A-Za-z0-9_-]*)"#
        ).unwrap(),
    ];
}

/// De-duplicated candidate credentials discovered in one text blob
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiscoveredCredentials {
    pub urls: Vec<String>,
    pub tokens: Vec<String>,
}

impl DiscoveredCredentials {
    pub fn is_empty(&self) -> bool {
        self.urls.is_empty() && self.tokens.is_empty()
    }

    /// Merge another discovery into this one, keeping first-seen order
    pub fn merge(&mut self, other: DiscoveredCredentials) {
        for url in other.urls {
            push_unique(&mut self.urls, url);
        }
        for token in other.tokens {
            push_unique(&mut self.tokens, token);
        }
    }
}

fn push_unique(set: &mut Vec<String>, value: String) {
    if !set.contains(&value) {
        set.push(value);
    }
}

/// Extract candidate endpoint URLs and bearer tokens from arbitrary text.
///
/// Three pattern families contribute to the same two sets: cloud URLs,
/// env-var assignments, and raw token matches. Duplicates across families
/// are merged.
pub fn extract_credentials(text: &str) -> DiscoveredCredentials {
    let mut found = DiscoveredCredentials::default();

    for m in CLOUD_URL_PATTERN.find_iter(text) {
        push_unique(&mut found.urls, m.as_str().to_string());
    }

    for pattern in ENV_ASSIGNMENT_PATTERNS.iter() {
        for caps in pattern.captures_iter(text) {
            if let Some(value) = caps.get(1) {
                let extracted = value.as_str().replace(['"', '\''], "");
                if extracted.starts_with("https://") {
                    push_unique(&mut found.urls, extracted);
                } else if extracted.starts_with("eyJ") {
                    push_unique(&mut found.tokens, extracted);
                }
            }
        }
    }

    for m in BEARER_TOKEN_PATTERN.find_iter(text) {
        push_unique(&mut found.tokens, m.as_str().to_string());
    }

    found
}

//! Scrub credentials out of text before it is logged

use once_cell::sync::Lazy;
use regex::Regex;

const MAX_LOGGED_CHARS: usize = 2000;

static PATTERNS: Lazy<Vec<(Regex, &'static str)>> = Lazy::new(|| {
    [
        (r"sk-[A-Za-z0-9_\-\*]{8,}", "sk-REDACTED"),
        (r"(?i)bearer\s+[A-Za-z0-9._\-]{12,}", "Bearer REDACTED"),
        (
            r"(?i)api[_-]?key\s*[:=]?\s*[A-Za-z0-9\-_]{12,}",
            "api_key=REDACTED",
        ),
        (r"eyJ[A-Za-z0-9_\-]+\.[A-Za-z0-9_\-]+\.[A-Za-z0-9_\-]+", "JWT_REDACTED"),
    ]
    .into_iter()
    .filter_map(|(pattern, replacement)| Regex::new(pattern).ok().map(|re| (re, replacement)))
    .collect()
});

/// Replace API keys, bearer tokens and JWTs, and cap the length
pub fn redact_secrets(text: &str) -> String {
    let mut s: String = text.chars().take(MAX_LOGGED_CHARS).collect();
    for (re, replacement) in PATTERNS.iter() {
        s = re.replace_all(&s, *replacement).into_owned();
    }
    s
}

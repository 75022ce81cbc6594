//! Shared input checks

use once_cell::sync::Lazy;
use regex::Regex;

/// Maximum email length accepted anywhere in the site
pub const MAX_EMAIL_LENGTH: usize = 254;

static EMAIL_RE: Lazy<Option<Regex>> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z0-9._%+\-]+@[A-Za-z0-9\-]+(\.[A-Za-z0-9\-]+)*\.[A-Za-z]{2,}$").ok()
});

/// Pragmatic address check: one `@`, a dotted domain, no whitespace
pub fn is_valid_email(email: &str) -> bool {
    email.len() <= MAX_EMAIL_LENGTH
        && EMAIL_RE.as_ref().is_some_and(|re| re.is_match(email))
}

/// Trim and lowercase an email for storage and lookup
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Trimmed value, or `None` when blank or longer than `max` characters
pub fn required_text(value: &str, max: usize) -> Option<String> {
    let value = value.trim();
    if value.is_empty() || value.chars().count() > max {
        None
    } else {
        Some(value.to_string())
    }
}

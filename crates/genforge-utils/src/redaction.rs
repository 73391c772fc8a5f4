//! Secret redaction for error text
//!
//! Error messages from HTTP providers can echo request URLs or keys back to us.
//! Everything that ends up in logs or in a [`ClassifiedError`](crate::error::ClassifiedError)
//! goes through [`redact_error_message`] first.

use once_cell::sync::Lazy;
use regex::Regex;

/// Pattern to match URLs with embedded credentials
static URL_WITH_CREDS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(https?://)[^:@\s]+:[^@\s]+@").expect("valid regex"));

/// Query-string credentials (`?key=...`, `&api_key=...`)
static QUERY_KEY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"([?&](?:key|api_key|apikey|token)=)[^&\s]+").expect("valid regex")
});

/// Sequences of 32+ key-like characters
static POTENTIAL_KEY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?:^|[^A-Za-z0-9_-])[A-Za-z0-9_-]{32,}(?:[^A-Za-z0-9_-]|$)").expect("valid regex")
});

/// Redact credentials from an error message while keeping enough context to debug.
#[must_use]
pub fn redact_error_message(message: &str) -> String {
    let redacted = URL_WITH_CREDS.replace_all(message, "$1[REDACTED]@");
    let redacted = QUERY_KEY.replace_all(&redacted, "$1[REDACTED]");
    let redacted = POTENTIAL_KEY.replace_all(&redacted, "[REDACTED_KEY]");
    redacted.to_string()
}

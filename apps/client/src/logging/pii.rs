//! Redaction of emails and bearer credentials before they reach a log line.

use std::fmt;
use std::sync::LazyLock;

use regex::{Captures, Regex};

/// Vetted literal patterns, compiled once.
struct Patterns {
    email: Regex,
    jwt: Regex,
    opaque_token: Regex,
}

static PATTERNS: LazyLock<Patterns> = LazyLock::new(|| {
    #[allow(clippy::unwrap_used)]
    let patterns = Patterns {
        email: Regex::new(r"\b[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{1,}\b").unwrap(),
        // header.payload.signature, each segment base64url
        jwt: Regex::new(r"\b[A-Za-z0-9_-]{8,}\.[A-Za-z0-9_-]{8,}\.[A-Za-z0-9_-]+").unwrap(),
        // base64 / base64url runs of 16+ characters
        opaque_token: Regex::new(r"\b[A-Za-z0-9+/_-]{16,}={0,2}").unwrap(),
    };
    patterns
});

pub const REDACTED_TOKEN: &str = "[REDACTED_TOKEN]";

/// Mask emails (first character of the local part kept, domain kept) and
/// replace credential-looking runs with [`REDACTED_TOKEN`].
///
/// Emails are handled first so their domains are never mistaken for token
/// segments.
pub fn redact(input: &str) -> String {
    let patterns = &*PATTERNS;

    let masked = patterns.email.replace_all(input, |caps: &Captures| {
        let found = &caps[0];
        match found.split_once('@') {
            Some((local, domain)) => match local.chars().next() {
                Some(first) => format!("{first}***@{domain}"),
                None => format!("@{domain}"),
            },
            None => found.to_string(),
        }
    });
    let masked = patterns.jwt.replace_all(&masked, REDACTED_TOKEN);
    patterns
        .opaque_token
        .replace_all(&masked, REDACTED_TOKEN)
        .into_owned()
}

/// Display/Debug wrapper that redacts on format.
pub struct Redacted<'a>(pub &'a str);

impl fmt::Display for Redacted<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&redact(self.0))
    }
}

impl fmt::Debug for Redacted<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&redact(self.0))
    }
}

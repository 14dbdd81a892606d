// SPDX-License-Identifier: MIT
//! Credential redaction for diagnostic output.
//!
//! The license key is an opaque bearer credential. Every outgoing URL and
//! every response body that reaches a log line must pass through [`redact`]
//! first — a key must never appear in a diagnostic sink, not even partially.

use once_cell::sync::Lazy;
use regex::Regex;

/// Marker substituted for credential material.
pub const REDACTION_MARKER: &str = "[REDACTED]";

/// `key=...` query parameter values, scrubbed from text where the literal
/// key value is not known at the call site (e.g. URLs echoed back by the
/// server inside an error body).
static KEY_PARAM: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\bkey=[^&\s\x22']+").expect("regex: key param"));

/// Replace every occurrence of `key` in `text` with [`REDACTION_MARKER`].
///
/// An empty key redacts nothing. When the marker itself contains the key
/// (degenerate keys like `"RED"`), occurrences are removed outright instead,
/// so the output can never contain the credential.
pub fn redact(text: &str, key: &str) -> String {
    if key.is_empty() {
        return text.to_string();
    }
    let marker = if REDACTION_MARKER.contains(key) {
        ""
    } else {
        REDACTION_MARKER
    };

    let mut out = text.replace(key, marker);
    // Replacement boundaries can re-form the key (e.g. key "a[" inside "aa[").
    // Repeat until no occurrence survives; once the pass counter trips, switch
    // to plain removal, which strictly shrinks the string and must terminate.
    let mut passes = 0u8;
    while out.contains(key) {
        passes += 1;
        out = out.replace(key, if passes < 4 { marker } else { "" });
    }
    out
}

/// Scrub any `key=` query parameter value from `text`, regardless of what
/// the value is. Used on response bodies, which occasionally echo the full
/// request URL back in prose error messages.
pub fn scrub_key_params(text: &str) -> String {
    KEY_PARAM
        .replace_all(text, format!("key={REDACTION_MARKER}"))
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn replaces_every_occurrence() {
        let key = "ABCD-1234-EFGH";
        let text = format!("url?key={key}&cmd=getMember and again {key}");
        let out = redact(&text, key);
        assert!(!out.contains(key));
        assert_eq!(out.matches(REDACTION_MARKER).count(), 2);
    }

    #[test]
    fn empty_key_is_a_no_op() {
        assert_eq!(redact("nothing to hide", ""), "nothing to hide");
    }

    #[test]
    fn key_that_is_part_of_the_marker_is_removed() {
        // "RED" is a substring of "[REDACTED]" — substitution would re-introduce it.
        let out = redact("colour RED here", "RED");
        assert!(!out.contains("RED"));
    }

    #[test]
    fn boundary_reformation_is_eliminated() {
        // Replacing "a[" in "aa[" yields "a" + marker, which starts with "a[" again.
        let out = redact("aa[", "a[");
        assert!(!out.contains("a["));
    }

    #[test]
    fn scrubs_unknown_key_params() {
        let out = scrub_key_params("bad request for key=SOMETHING-SECRET&cmd=getMember");
        assert!(!out.contains("SOMETHING-SECRET"));
        assert!(out.contains("key=[REDACTED]"));
    }
}

//! Turns symbolic tokens from step text into literals.
//!
//! Token grammar, checked in order:
//!
//! 1. `pass_rand` (whole token): a fresh random password.
//! 2. contains `_rand`: every occurrence becomes its own random lowercase word.
//! 3. contains `RAND_`: the text after the marker names a key; a random number
//!    replaces `RAND_<key>`, and is stored under both `<key>` and the whole
//!    token for later steps.
//! 4. otherwise the token is looked up in the scenario's [`TestData`], then
//!    `${name}` placeholders are interpolated; anything left is a literal.
//!
//! A token that resolves to nothing is passed through unchanged. That also
//! hides a misspelt key, so the pass-through is logged at debug level.

use super::generator;
use super::store::TestData;
use regex::{Captures, Regex};
use std::sync::OnceLock;

pub const PASSWORD_TOKEN: &str = "pass_rand";
pub const ALPHA_MARKER: &str = "_rand";
pub const NUMERIC_MARKER: &str = "RAND_";

fn placeholder_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\$\{([a-zA-Z0-9_.\-]+)\}").expect("valid placeholder regex"))
}

#[derive(Debug, Clone)]
pub struct DataResolver {
    pub password_length: usize,
    pub alpha_length: usize,
    pub numeric_length: usize,
}

impl Default for DataResolver {
    fn default() -> Self {
        Self {
            password_length: 12,
            alpha_length: 6,
            numeric_length: 10,
        }
    }
}

impl DataResolver {
    pub fn resolve(&self, token: &str, data: &mut TestData) -> String {
        if token == PASSWORD_TOKEN {
            return generator::password(self.password_length);
        }

        if token.contains(ALPHA_MARKER) {
            return self.replace_alpha_markers(token);
        }

        if let Some(idx) = token.find(NUMERIC_MARKER) {
            let prefix = &token[..idx];
            let key = &token[idx + NUMERIC_MARKER.len()..];
            let key = if key.is_empty() { token } else { key };

            let value = generator::numeric(self.numeric_length);
            data.set_field(key, value.as_str());
            if key != token {
                data.set_field(token, value.as_str());
            }
            log::debug!("Generated '{}' for {} (stored as '{}')", value, token, key);
            return format!("{}{}", prefix, value);
        }

        if let Some(stored) = data.get_field(token) {
            return stored.to_string();
        }

        if token.contains("${") {
            return interpolate(token, data);
        }

        log::debug!("Token '{}' is not stored, using it as a literal", token);
        token.to_string()
    }

    fn replace_alpha_markers(&self, token: &str) -> String {
        let mut parts = token.split(ALPHA_MARKER);
        let mut out = parts.next().unwrap_or_default().to_string();
        for rest in parts {
            out.push_str(&generator::alphabetic(self.alpha_length));
            out.push_str(rest);
        }
        out
    }
}

/// Replace `${name}` with stored values or the `date`/`time`/`timestamp`
/// built-ins. Unknown names stay verbatim.
pub fn interpolate(text: &str, data: &TestData) -> String {
    placeholder_regex()
        .replace_all(text, |caps: &Captures| {
            let name = &caps[1];
            if let Some(value) = data.get_field(name) {
                return value.to_string();
            }
            match name {
                "time" => chrono::Local::now().format("%H:%M:%S").to_string(),
                "date" => chrono::Local::now().format("%Y-%m-%d").to_string(),
                "timestamp" => chrono::Utc::now().timestamp().to_string(),
                _ => caps[0].to_string(),
            }
        })
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::generator::PASSWORD_SYMBOLS;

    #[test]
    fn test_password_token() {
        let mut data = TestData::new();
        let resolver = DataResolver::default();
        for _ in 0..10 {
            let p = resolver.resolve("pass_rand", &mut data);
            assert_ne!(p, "pass_rand");
            assert_eq!(p.len(), 12);
            assert!(p.chars().any(|c| c.is_ascii_uppercase()));
            assert!(p.chars().any(|c| c.is_ascii_lowercase()));
            assert!(p.chars().any(|c| c.is_ascii_digit()));
            assert!(p.bytes().any(|c| PASSWORD_SYMBOLS.contains(&c)));
        }
        assert!(data.is_empty());
    }

    #[test]
    fn test_every_rand_marker_is_replaced() {
        let mut data = TestData::new();
        let resolver = DataResolver::default();
        let out = resolver.resolve("foo_rand_bar_rand", &mut data);

        assert!(!out.contains("_rand"));
        assert!(out.starts_with("foo"));
        assert_eq!(out.len(), "foo".len() + 6 + "_bar".len() + 6);

        let first = &out[3..9];
        let second = &out[13..19];
        assert_eq!(&out[9..13], "_bar");
        assert!(first.chars().all(|c| c.is_ascii_lowercase()));
        assert!(second.chars().all(|c| c.is_ascii_lowercase()));
    }

    #[test]
    fn test_numeric_marker_stores_value() {
        let mut data = TestData::new();
        let resolver = DataResolver::default();
        let out = resolver.resolve("RAND_order", &mut data);

        assert_eq!(out.len(), 10);
        assert!(out.chars().all(|c| c.is_ascii_digit()));
        assert_eq!(data.get_field("order").map(|v| v.to_string()), Some(out.clone()));
        assert_eq!(data.get_field("RAND_order").map(|v| v.to_string()), Some(out.clone()));

        // later steps read the same value back
        assert_eq!(resolver.resolve("order", &mut data), out);
    }

    #[test]
    fn test_numeric_marker_keeps_prefix() {
        let mut data = TestData::new();
        let resolver = DataResolver::default();
        let out = resolver.resolve("PO-RAND_po", &mut data);
        assert!(out.starts_with("PO-"));
        assert_eq!(data.get_field("po").map(|v| v.to_string()).as_deref(), Some(&out[3..]));
    }

    #[test]
    fn test_stored_lookup_and_literal_fallback() {
        let mut data = TestData::new();
        data.set_field("requestId", "REQ-77");
        let resolver = DataResolver::default();

        assert_eq!(resolver.resolve("requestId", &mut data), "REQ-77");
        assert_eq!(resolver.resolve("Submit order", &mut data), "Submit order");
    }

    #[test]
    fn test_interpolation() {
        let mut data = TestData::new();
        data.set_field("requestId", "42");
        let resolver = DataResolver::default();

        assert_eq!(
            resolver.resolve("Request ${requestId} created", &mut data),
            "Request 42 created"
        );
        assert_eq!(
            resolver.resolve("Hello ${unknown}", &mut data),
            "Hello ${unknown}"
        );
        let dated = resolver.resolve("${date}", &mut data);
        assert_eq!(dated.len(), 10);
    }
}

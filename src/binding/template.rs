//! Template Interpolation - `{{identifier}}` substitution
//!
//! Plain string substitution against a flat value scope: no escaping,
//! no recursion, no conditionals. A token missing from the scope becomes
//! the empty string and is reported as a warning, never an error.
//!
//! Single-pass resolution with Cow<str> (zero-alloc when no tokens).

use std::borrow::Cow;
use std::collections::{BTreeMap, HashMap};
use std::hash::BuildHasher;

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::warn;

/// Pre-compiled regex for {{identifier}} tokens
static TOKEN_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{\{([A-Za-z0-9_]+)\}\}").unwrap());

/// Read-only lookup used by the interpolator
pub trait ValueScope {
    fn lookup(&self, name: &str) -> Option<&str>;
}

impl<S: BuildHasher> ValueScope for HashMap<String, String, S> {
    fn lookup(&self, name: &str) -> Option<&str> {
        self.get(name).map(String::as_str)
    }
}

impl ValueScope for BTreeMap<String, String> {
    fn lookup(&self, name: &str) -> Option<&str> {
        self.get(name).map(String::as_str)
    }
}

/// Interpolation result with the tokens that did not resolve
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Interpolation<'a> {
    pub text: Cow<'a, str>,
    pub missing: Vec<String>,
}

/// Substitute `{{identifier}}` tokens, logging a warning per missing token
///
/// Example: `interpolate("Hi {{name}} from {{city}}", {name: "Ann"})` → `"Hi Ann from "`
pub fn interpolate<'a, S>(template: &'a str, scope: &S) -> Cow<'a, str>
where
    S: ValueScope + ?Sized,
{
    let Interpolation { text, missing } = interpolate_report(template, scope);
    for token in &missing {
        warn!(token = %token, "template token not in scope, substituting empty string");
    }
    text
}

/// Substitute tokens and report misses instead of logging them
pub fn interpolate_report<'a, S>(template: &'a str, scope: &S) -> Interpolation<'a>
where
    S: ValueScope + ?Sized,
{
    if !template.contains("{{") {
        return Interpolation {
            text: Cow::Borrowed(template),
            missing: Vec::new(),
        };
    }

    let mut result = String::with_capacity(template.len() + 64);
    let mut missing = Vec::new();
    let mut last_end = 0;
    let mut substituted = false;

    for cap in TOKEN_RE.captures_iter(template) {
        let m = cap.get(0).unwrap();
        let name = &cap[1];

        result.push_str(&template[last_end..m.start()]);
        match scope.lookup(name) {
            Some(value) => result.push_str(value),
            None => {
                if !missing.iter().any(|t| t == name) {
                    missing.push(name.to_string());
                }
            }
        }
        last_end = m.end();
        substituted = true;
    }

    if !substituted {
        return Interpolation {
            text: Cow::Borrowed(template),
            missing,
        };
    }

    result.push_str(&template[last_end..]);
    Interpolation {
        text: Cow::Owned(result),
        missing,
    }
}

/// All token names in a template, in order of appearance (duplicates kept)
pub fn extract_tokens(template: &str) -> Vec<&str> {
    TOKEN_RE
        .captures_iter(template)
        .filter_map(|cap| cap.get(1).map(|m| m.as_str()))
        .collect()
}

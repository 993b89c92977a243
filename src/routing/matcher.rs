//! Whitelist matching logic.
//!
//! # Responsibilities
//! - Decide whether a route may expose a discovered action
//! - Support `**` / `*.*`, `service.*`, `*.action` and regular expressions
//! - Combine patterns with OR semantics
//!
//! # Design Decisions
//! - Patterns compiled once when the whitelist is built
//! - A pattern that is not a valid regex never matches (logged at build)
//! - Regexes are tested unanchored against the full action name

use regex::Regex;

use crate::broker::ActionName;

/// A single compiled whitelist entry.
#[derive(Debug, Clone)]
enum Pattern {
    /// `**` or `*.*`.
    Any,
    /// `service.*`.
    Service(String),
    /// `*.action`.
    Action(String),
    /// Any other pattern, compiled as a regex.
    Regex(Regex),
    /// Failed to compile as a regex.
    Invalid,
}

impl Pattern {
    fn compile(raw: &str) -> Self {
        if raw == "**" || raw == "*.*" {
            return Pattern::Any;
        }
        if let Some(service) = raw.strip_suffix(".*") {
            if !service.is_empty() {
                return Pattern::Service(service.to_string());
            }
        }
        if let Some(action) = raw.strip_prefix("*.") {
            if !action.is_empty() {
                return Pattern::Action(action.to_string());
            }
        }
        match Regex::new(raw) {
            Ok(re) => Pattern::Regex(re),
            Err(e) => {
                tracing::warn!(pattern = %raw, error = %e, "Whitelist pattern is not a valid regex, it will never match");
                Pattern::Invalid
            }
        }
    }

    fn matches(&self, action: &ActionName) -> bool {
        match self {
            Pattern::Any => true,
            Pattern::Service(service) => action.service() == Some(service.as_str()),
            Pattern::Action(name) => action.action() == Some(name.as_str()),
            Pattern::Regex(re) => re.is_match(action.as_str()),
            Pattern::Invalid => false,
        }
    }
}

/// An ordered set of compiled whitelist patterns.
#[derive(Debug, Clone)]
pub struct Whitelist {
    patterns: Vec<Pattern>,
}

impl Whitelist {
    /// Compile the given patterns.
    pub fn new<I, S>(patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            patterns: patterns
                .into_iter()
                .map(|p| Pattern::compile(p.as_ref()))
                .collect(),
        }
    }

    /// Returns true if any pattern permits the action.
    pub fn matches(&self, action: &ActionName) -> bool {
        self.patterns.iter().any(|p| p.matches(action))
    }

    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }
}

/// One-shot form of [`Whitelist::matches`].
pub fn matches<S: AsRef<str>>(whitelist: &[S], action: &ActionName) -> bool {
    Whitelist::new(whitelist).matches(action)
}

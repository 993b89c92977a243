//! Alias parsing.
//!
//! An alias replaces the path derived from an action name, optionally
//! pinning the endpoint to a single HTTP method:
//!
//! ```text
//! "/sum"         → any default method, path /sum
//! "GET /sum"     → GET only, path /sum
//! "FETCH /sum"   → unknown method, any default method
//! "GET /a /b"    → invalid alias format
//! ```

use std::collections::BTreeMap;

use axum::http::Method;

use crate::broker::ActionName;
use crate::config::ConfigError;

/// Methods an endpoint accepts when no usable method is declared.
pub const DEFAULT_METHODS: [Method; 5] = [
    Method::GET,
    Method::POST,
    Method::PUT,
    Method::PATCH,
    Method::DELETE,
];

/// Parsed form of an alias key.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AliasSpec {
    /// Uppercased method token, if one was given.
    pub method: Option<String>,
    /// Path token. Empty when the alias is blank.
    pub path: String,
}

impl AliasSpec {
    /// Parse `"path"` or `"METHOD path"`.
    pub fn parse(raw: &str) -> Result<Self, ConfigError> {
        let parts: Vec<&str> = raw.split_whitespace().collect();
        match parts.as_slice() {
            [] => Ok(Self::default()),
            [path] => Ok(Self {
                method: None,
                path: (*path).to_string(),
            }),
            [method, path] => Ok(Self {
                method: Some(method.to_uppercase()),
                path: (*path).to_string(),
            }),
            _ => Err(ConfigError::InvalidAlias(raw.to_string())),
        }
    }

    /// True when the alias provides a path of its own.
    pub fn has_path(&self) -> bool {
        !self.path.is_empty()
    }

    /// The declared method if it is one of the recognised verbs.
    pub fn recognised_method(&self) -> Option<Method> {
        let method = self.method.as_deref()?;
        DEFAULT_METHODS.iter().find(|m| m.as_str() == method).cloned()
    }

    /// Either exactly the declared method or the full default set.
    pub fn accepted_methods(&self) -> Vec<Method> {
        match self.recognised_method() {
            Some(method) => vec![method],
            None => DEFAULT_METHODS.to_vec(),
        }
    }

    /// Rebuild the alias string this value was parsed from.
    pub fn to_alias_string(&self) -> String {
        match &self.method {
            Some(method) => format!("{} {}", method, self.path),
            None => self.path.clone(),
        }
    }
}

/// Invert an alias → action map into action → alias.
///
/// When several aliases target the same action the last one visited wins.
/// Aliases are kept in a sorted map, so that is the greatest alias key.
pub fn invert_aliases(aliases: &BTreeMap<String, String>) -> BTreeMap<ActionName, String> {
    let mut out = BTreeMap::new();
    for (alias, action) in aliases {
        out.insert(ActionName::new(action.as_str()), alias.clone());
    }
    out
}

/// Path derived from the action name: `calc.add` → `calc/add`.
pub fn action_path(action: &ActionName) -> String {
    action.as_str().replace('.', "/")
}

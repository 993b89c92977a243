//! Endpoint table construction.
//!
//! # Responsibilities
//! - Filter discovered actions through each route's whitelist
//! - Apply the route's mapping policy
//! - Resolve path and accepted methods for every exposed action
//!
//! # Design Decisions
//! - Built once at startup from one registry snapshot, immutable afterwards
//! - Routes are processed independently and in declaration order
//! - Duplicate paths across routes are kept; the router decides precedence
//! - A malformed alias fails the whole build
//! - Paths the router would read as captures: an error when they come from
//!   configuration, a skipped action when they come from the registry

use std::collections::BTreeSet;
use std::sync::{Arc, OnceLock};

use axum::http::Method;

use crate::broker::ActionName;
use crate::config::{ConfigError, MappingPolicy, RouteConfig};
use crate::routing::alias::{action_path, invert_aliases, AliasSpec, DEFAULT_METHODS};
use crate::routing::matcher::Whitelist;

/// A resolved endpoint ready to be installed on the router.
#[derive(Debug)]
pub struct EndpointBinding {
    path: String,
    action: ActionName,
    alias: Option<String>,
    spec: Option<AliasSpec>,
    route: Arc<RouteConfig>,
    methods: OnceLock<Vec<Method>>,
}

impl EndpointBinding {
    fn new(base_path: &str, route: Arc<RouteConfig>, action: ActionName, alias: Option<String>) -> Result<Self, ConfigError> {
        let spec = alias.as_deref().map(AliasSpec::parse).transpose()?;

        let leaf = match &spec {
            Some(spec) if spec.has_path() => spec.path.clone(),
            _ => action_path(&action),
        };
        let path = join_paths(&[base_path, &route.path, &leaf]);

        Ok(Self {
            path,
            action,
            alias,
            spec,
            route,
            methods: OnceLock::new(),
        })
    }

    /// Resolved URL path.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Bound action.
    pub fn action(&self) -> &ActionName {
        &self.action
    }

    /// Raw alias string, if the action is aliased in its route.
    pub fn alias(&self) -> Option<&str> {
        self.alias.as_deref()
    }

    /// Owning route.
    pub fn route(&self) -> &RouteConfig {
        &self.route
    }

    /// Methods the endpoint answers to. Computed on first use.
    pub fn accepted_methods(&self) -> &[Method] {
        self.methods.get_or_init(|| match &self.spec {
            Some(spec) => spec.accepted_methods(),
            None => DEFAULT_METHODS.to_vec(),
        })
    }
}

/// Build the endpoint table for all routes.
pub fn build_endpoints(
    base_path: &str,
    routes: &[RouteConfig],
    discovered: &BTreeSet<ActionName>,
) -> Result<Vec<EndpointBinding>, ConfigError> {
    let mut endpoints = Vec::new();
    for route in routes {
        endpoints.extend(build_route(base_path, route, discovered)?);
    }
    Ok(endpoints)
}

/// Build the bindings of a single route.
pub fn build_route(
    base_path: &str,
    route: &RouteConfig,
    discovered: &BTreeSet<ActionName>,
) -> Result<Vec<EndpointBinding>, ConfigError> {
    let prefix = join_paths(&[base_path, &route.path]);
    if unsupported_segment(&prefix).is_some() {
        return Err(ConfigError::UnsupportedPath {
            route: route.name.clone(),
            path: prefix,
        });
    }

    // Reject malformed aliases up front, even ones whose action is absent
    for alias in route.aliases.keys() {
        let spec = AliasSpec::parse(alias)?;
        if unsupported_segment(&spec.path).is_some() {
            return Err(ConfigError::UnsupportedPath {
                route: route.name.clone(),
                path: spec.path,
            });
        }
    }

    let whitelist = Whitelist::new(&route.whitelist);
    let action_to_alias = invert_aliases(&route.aliases);
    let shared = Arc::new(route.clone());

    let mut endpoints = Vec::new();
    for action in discovered.iter().filter(|a| whitelist.matches(a)) {
        let alias = action_to_alias.get(action).cloned();

        if alias.is_none() && route.mapping_policy == MappingPolicy::Restrict {
            continue;
        }

        let binding = EndpointBinding::new(base_path, shared.clone(), action.clone(), alias)?;

        // Prefix and alias paths are checked above, so only the action name is left
        if let Some(segment) = unsupported_segment(binding.path()) {
            tracing::warn!(
                route = %route.name,
                action = %action,
                segment = %segment,
                "Skipping action whose name cannot be used as a path"
            );
            continue;
        }

        endpoints.push(binding);
    }

    Ok(endpoints)
}

/// First path segment the router would read as a capture.
///
/// Segments starting with `:` or `*`, and any `{` or `}`, are refused.
pub fn unsupported_segment(path: &str) -> Option<&str> {
    path.split('/').find(|segment| {
        segment.starts_with(':') || segment.starts_with('*') || segment.contains(['{', '}'])
    })
}

/// Join path fragments with `/` and collapse repeated separators.
pub fn join_paths(parts: &[&str]) -> String {
    let joined = format!("/{}", parts.join("/"));
    let mut path = String::with_capacity(joined.len());
    for c in joined.chars() {
        if c == '/' && path.ends_with('/') {
            continue;
        }
        path.push(c);
    }
    path
}

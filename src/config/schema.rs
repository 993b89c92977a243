//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the gateway.
//! All types derive Serde traits for deserialization from config files.
//! Missing fields fall back to the defaults below, which is how user
//! settings are merged over the built-in settings table.

use std::collections::BTreeMap;
use std::net::SocketAddr;

use serde::{Deserialize, Serialize};

use crate::http::hooks::RouteHooks;

/// Root configuration for the gateway service.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct GatewayConfig {
    /// Exposed port.
    pub port: u16,

    /// Exposed IP.
    pub ip: String,

    /// Base path prepended to every route group.
    pub path: String,

    /// Route groups, processed in declaration order.
    pub routes: Vec<RouteConfig>,

    /// Level used to log each request.
    pub log_request: LogLevel,

    /// Level used to log the extracted call parameters.
    pub log_request_params: LogLevel,

    /// Level used to log each response status.
    pub log_response: LogLevel,

    /// Level used to log the raw call result.
    pub log_response_data: LogLevel,

    /// Level used to log failed calls and rejected requests.
    pub log_4xx_responses: LogLevel,

    /// Level used to log route registration and alias activity.
    pub log_route_registration: LogLevel,

    /// Install endpoints in sorted path order.
    pub optimize_order: bool,

    /// Maximum request body size in bytes.
    pub max_body_size: usize,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            port: 5000,
            ip: "0.0.0.0".to_string(),
            path: "/".to_string(),
            routes: vec![RouteConfig::default()],
            log_request: LogLevel::Debug,
            log_request_params: LogLevel::Info,
            log_response: LogLevel::Info,
            log_response_data: LogLevel::Info,
            log_4xx_responses: LogLevel::Info,
            log_route_registration: LogLevel::Info,
            optimize_order: true,
            max_body_size: 2 * 1024 * 1024, // 2MB
            observability: ObservabilityConfig::default(),
        }
    }
}

impl GatewayConfig {
    /// The `ip:port` pair the HTTP listener binds to.
    pub fn address(&self) -> String {
        format!("{}:{}", self.ip, self.port)
    }

    /// Parsed bind address.
    pub fn socket_addr(&self) -> Result<SocketAddr, std::net::AddrParseError> {
        self.address().parse()
    }

    /// The per-request logging taps.
    pub fn log_settings(&self) -> LogSettings {
        LogSettings {
            request: self.log_request,
            request_params: self.log_request_params,
            response: self.log_response,
            response_data: self.log_response_data,
            client_errors: self.log_4xx_responses,
        }
    }
}

/// Whether a route exposes every whitelisted action or only aliased ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MappingPolicy {
    /// Expose all whitelisted actions, aliased or not.
    #[default]
    All,
    /// Expose only actions that have an alias in the route.
    Restrict,
}

/// A named route group.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RouteConfig {
    /// Route identifier for logging.
    pub name: String,

    /// URL prefix of the group.
    pub path: String,

    /// Patterns selecting which discovered actions the route may expose.
    /// Accepts `**`, `*.*`, `service.*`, `*.action` or a regular expression.
    pub whitelist: Vec<String>,

    /// Inclusion policy.
    pub mapping_policy: MappingPolicy,

    /// Alias (`"path"` or `"METHOD path"`) to action name.
    pub aliases: BTreeMap<String, String>,

    /// Run the authentication hook for this route.
    pub authentication: bool,

    /// Run the authorization hook for this route.
    pub authorization: bool,

    /// Before/after call hooks. Set programmatically.
    #[serde(skip)]
    pub hooks: RouteHooks,
}

impl Default for RouteConfig {
    fn default() -> Self {
        Self {
            name: "base-routes".to_string(),
            path: "/".to_string(),
            whitelist: vec!["**".to_string()],
            mapping_policy: MappingPolicy::All,
            aliases: BTreeMap::new(),
            authentication: false,
            authorization: false,
            hooks: RouteHooks::default(),
        }
    }
}

impl RouteConfig {
    /// Create a route with defaults for everything but name and path.
    pub fn new(name: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            ..Self::default()
        }
    }

    pub fn whitelist<I, S>(mut self, patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.whitelist = patterns.into_iter().map(Into::into).collect();
        self
    }

    pub fn mapping_policy(mut self, policy: MappingPolicy) -> Self {
        self.mapping_policy = policy;
        self
    }

    /// Add an alias for an action.
    pub fn alias(mut self, alias: impl Into<String>, action: impl Into<String>) -> Self {
        self.aliases.insert(alias.into(), action.into());
        self
    }

    pub fn authentication(mut self, enabled: bool) -> Self {
        self.authentication = enabled;
        self
    }

    pub fn authorization(mut self, enabled: bool) -> Self {
        self.authorization = enabled;
        self
    }

    pub fn hooks(mut self, hooks: RouteHooks) -> Self {
        self.hooks = hooks;
        self
    }
}

/// Level selector for an individual logging tap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Tap disabled.
    Off,
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

/// Resolved logging taps used by the request dispatcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LogSettings {
    pub request: LogLevel,
    pub request_params: LogLevel,
    pub response: LogLevel,
    pub response_data: LogLevel,
    pub client_errors: LogLevel,
}

impl Default for LogSettings {
    fn default() -> Self {
        GatewayConfig::default().log_settings()
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_settings_table() {
        let config = GatewayConfig::default();
        assert_eq!(config.port, 5000);
        assert_eq!(config.address(), "0.0.0.0:5000");
        assert_eq!(config.routes.len(), 1);
        assert_eq!(config.routes[0].whitelist, vec!["**"]);
        assert_eq!(config.routes[0].mapping_policy, MappingPolicy::All);
        assert_eq!(config.log_request, LogLevel::Debug);
        assert!(config.optimize_order);
    }

    #[test]
    fn test_partial_toml_merges_over_defaults() {
        let config: GatewayConfig = toml::from_str(
            r#"
            port = 5001
            log_response = "off"

            [[routes]]
            name = "api"
            path = "/api"
            mapping_policy = "restrict"
            authentication = true

            [routes.aliases]
            "GET /sum" = "calc.add"
            "#,
        )
        .unwrap();

        assert_eq!(config.port, 5001);
        assert_eq!(config.ip, "0.0.0.0");
        assert_eq!(config.log_response, LogLevel::Off);
        assert_eq!(config.log_4xx_responses, LogLevel::Info);

        let route = &config.routes[0];
        assert_eq!(route.whitelist, vec!["**"]);
        assert_eq!(route.mapping_policy, MappingPolicy::Restrict);
        assert!(route.authentication);
        assert!(!route.authorization);
        assert_eq!(route.aliases.get("GET /sum").map(String::as_str), Some("calc.add"));
    }

    #[test]
    fn test_route_builder() {
        let route = RouteConfig::new("api", "/api")
            .whitelist(["billing.*"])
            .mapping_policy(MappingPolicy::Restrict)
            .alias("POST /charge", "billing.charge")
            .authorization(true);

        assert_eq!(route.name, "api");
        assert_eq!(route.whitelist, vec!["billing.*"]);
        assert_eq!(route.aliases.len(), 1);
        assert!(route.authorization);
        assert!(!route.authentication);
    }

    #[test]
    fn test_error_tap_level_from_toml() {
        let config: GatewayConfig = toml::from_str(r#"log_4xx_responses = "warn""#).unwrap();
        assert_eq!(config.log_4xx_responses, LogLevel::Warn);
        assert_eq!(config.log_settings().client_errors, LogLevel::Warn);
    }
}

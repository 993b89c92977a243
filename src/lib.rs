//! HTTP gateway exposing service-mesh actions as REST endpoints.
//!
//! Actions are named `"<service>.<action>"` and discovered once from a
//! [`broker::Registry`]. Route groups whitelist actions with glob-like or
//! regex patterns, optionally rename them through aliases, and every
//! resulting endpoint forwards its request parameters to a
//! [`broker::ActionCaller`] and answers with the JSON result.

pub mod broker;
pub mod config;
pub mod error;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod routing;

pub use broker::{ActionCaller, ActionError, ActionName, LocalBroker, Registry};
pub use config::{GatewayConfig, MappingPolicy, RouteConfig};
pub use error::GatewayError;
pub use http::{GatewayHooks, HttpServer, RouteHooks};
pub use lifecycle::{GatewayService, Shutdown};

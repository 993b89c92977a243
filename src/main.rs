//! Action gateway demo binary.
//!
//! # Architecture Overview
//!
//! ```text
//!                         ┌──────────────────────────────────────────────┐
//!                         │                  GATEWAY                     │
//!                         │                                              │
//!     Client Request      │  ┌────────┐    ┌──────────┐    ┌──────────┐  │
//!     ────────────────────┼─▶│  http  │───▶│ dispatch │───▶│  broker  │──┼──▶ Action
//!                         │  │ server │    │ pipeline │    │  caller  │  │
//!                         │  └────────┘    └──────────┘    └──────────┘  │
//!                         │       ▲                                      │
//!                         │       │ built once on start                  │
//!                         │  ┌────┴─────┐   ┌─────────┐   ┌──────────┐   │
//!                         │  │ routing  │◀──│ matcher │◀──│ registry │   │
//!                         │  │  table   │   │ + alias │   │ snapshot │   │
//!                         │  └──────────┘   └─────────┘   └──────────┘   │
//!                         └──────────────────────────────────────────────┘
//! ```
//!
//! Serves an in-process `calculator` service under two route groups:
//! every action under `/`, and a restricted `/api` group that only exposes
//! aliased actions and requires a `Bearer 123` token.

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use axum::http::{header, StatusCode};
use clap::Parser;
use serde_json::{json, Value};

use action_gateway::broker::{ActionError, LocalBroker};
use action_gateway::config::{load_config, GatewayConfig, MappingPolicy, RouteConfig};
use action_gateway::http::{Authenticator, Authorizer, GatewayHooks, Rejection, RequestContext, RouteHooks};
use action_gateway::lifecycle::{shutdown_signal, GatewayService};
use action_gateway::observability::{logging, metrics};
use action_gateway::routing::AliasSpec;

#[derive(Parser)]
#[command(name = "action-gateway")]
#[command(about = "Expose service actions as HTTP endpoints", long_about = None)]
struct Cli {
    /// TOML configuration file, merged over the defaults
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the listening port
    #[arg(short, long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => load_config(path)?,
        None => demo_config(),
    };
    if let Some(port) = cli.port {
        config.port = port;
    }
    attach_route_hooks(&mut config);

    logging::init_tracing(&config.observability);
    tracing::info!("action-gateway v{} starting", env!("CARGO_PKG_VERSION"));

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(e) => tracing::error!(
                address = %config.observability.metrics_address,
                error = %e,
                "Invalid metrics address"
            ),
        }
    }

    let broker = Arc::new(calculator());
    let hooks = GatewayHooks::new()
        .authenticator(TokenAuthenticator)
        .authorizer(RequireUser)
        .on_error(|_ctx: &RequestContext, err: &ActionError| {
            let status = err
                .code
                .and_then(|code| StatusCode::from_u16(code).ok())
                .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
            (status, json!({ "error": err.message, "type": err.kind }))
        });

    let mut service = GatewayService::new(config, broker.clone(), broker)?.with_hooks(hooks);

    tracing::info!(
        port = service.config().port,
        routes = service.config().routes.len(),
        "Configuration loaded"
    );

    service.start().await?;

    shutdown_signal().await;

    service.stop().await?;
    tracing::info!("Shutdown complete");
    Ok(())
}

/// Settings used when no configuration file is given.
fn demo_config() -> GatewayConfig {
    GatewayConfig {
        routes: vec![
            RouteConfig::default(),
            RouteConfig::new("api", "/api")
                .mapping_policy(MappingPolicy::Restrict)
                .alias("POST /calculators/get", "calculator.add")
                .alias("GET /calculators/hello", "calculator.hello")
                .authentication(true)
                .authorization(true),
        ],
        ..GatewayConfig::default()
    }
}

/// Route hooks cannot come from a file, so they are attached here.
fn attach_route_hooks(config: &mut GatewayConfig) {
    for route in &mut config.routes {
        route.hooks = RouteHooks::new().before_call(|ctx: &RequestContext, route: &RouteConfig, alias: Option<&str>| {
            let alias = alias
                .and_then(|a| AliasSpec::parse(a).ok())
                .map(|spec| spec.to_alias_string());
            tracing::debug!(route = %route.name, alias = ?alias, uri = %ctx.uri, "Before call");
        });
    }
}

fn calculator() -> LocalBroker {
    let broker = LocalBroker::new();
    broker.register("calculator", "add", |params, _meta| async move {
        Ok(json!(number(&params, "a")? + number(&params, "b")?))
    });
    broker.register("calculator", "sub", |params, _meta| async move {
        Ok(json!(number(&params, "a")? - number(&params, "b")?))
    });
    broker.register("calculator", "hello", |_params, meta| async move {
        let name = meta
            .user
            .as_ref()
            .and_then(|u| u.get("name"))
            .and_then(Value::as_str)
            .unwrap_or("Anonymous")
            .to_string();
        Ok(json!(format!("Hello {}", name)))
    });
    broker
}

/// Read a numeric parameter sent either as JSON number or form string.
fn number(params: &Value, key: &str) -> Result<f64, ActionError> {
    let value = &params[key];
    value
        .as_f64()
        .or_else(|| value.as_str().and_then(|s| s.trim().parse().ok()))
        .ok_or_else(|| {
            ActionError::new(format!("Parameter '{}' must be a number", key))
                .with_code(422)
                .with_kind("ValidationError")
        })
}

/// Accepts the fixed demo token `Bearer 123`.
struct TokenAuthenticator;

#[async_trait]
impl Authenticator for TokenAuthenticator {
    async fn authenticate(&self, ctx: &RequestContext, _alias: Option<&str>) -> Option<Value> {
        let token = ctx
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())?
            .strip_prefix("Bearer ")?;
        (token == "123").then(|| json!({ "id": 1, "name": "John Doe" }))
    }
}

/// Rejects anonymous callers.
struct RequireUser;

#[async_trait]
impl Authorizer for RequireUser {
    async fn authorize(&self, ctx: &RequestContext, _alias: Option<&str>) -> Result<(), Rejection> {
        match ctx.meta.user {
            Some(_) => Ok(()),
            None => Err(Rejection::unauthorized("Unauthorized")),
        }
    }
}

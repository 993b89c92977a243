//! Startup orchestration.
//!
//! # Responsibilities
//! - Fetch the registry once
//! - Build the endpoint table from the configured routes
//! - Bind the listener
//!
//! # Design Decisions
//! - Fail fast: a malformed alias or a bind failure aborts the start
//! - An unreachable registry is not fatal; the gateway serves no endpoints
//! - Listeners start last (traffic only when the table is ready)

use tokio::net::TcpListener;

use crate::broker::{discover_actions, Registry};
use crate::config::GatewayConfig;
use crate::error::{GatewayError, Result};
use crate::routing::{build_endpoints, EndpointBinding};

/// Discover actions and build the endpoint table.
pub async fn build_table(config: &GatewayConfig, registry: &dyn Registry) -> Result<Vec<EndpointBinding>> {
    let discovered = discover_actions(registry).await;
    tracing::debug!(actions = discovered.len(), "Registry snapshot loaded");

    let endpoints = build_endpoints(&config.path, &config.routes, &discovered)?;

    for route in &config.routes {
        let count = endpoints.iter().filter(|e| e.route().name == route.name).count();
        tracing::info!(
            route = %route.name,
            path = %route.path,
            policy = ?route.mapping_policy,
            endpoints = count,
            "Route built"
        );
    }

    Ok(endpoints)
}

/// Bind the configured address.
pub async fn bind(config: &GatewayConfig) -> Result<TcpListener> {
    let address = config.address();
    TcpListener::bind(&address)
        .await
        .map_err(|source| GatewayError::Bind { address, source })
}

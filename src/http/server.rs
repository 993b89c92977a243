//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create the Axum Router from the endpoint table
//! - Wire up middleware (tracing, body limit, request ID)
//! - Bind server to listener
//! - Stop accepting on the shutdown broadcast and drain in-flight requests
//!
//! # Design Decisions
//! - One MethodRouter per path; the binding installed last wins per method
//! - Unmatched paths fall through to Axum's 404, wrong methods to its 405
//! - Endpoints are installed in sorted path order when `optimize_order` is set

use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    body::Body,
    http::{Method, Request},
    routing::{MethodFilter, MethodRouter},
    Router,
};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::{limit::RequestBodyLimitLayer, trace::TraceLayer};

use crate::config::GatewayConfig;
use crate::http::dispatch::{ActionHandler, DispatchContext};
use crate::http::request::{propagate_request_id_layer, set_request_id_layer};
use crate::log_at;
use crate::observability::metrics;
use crate::routing::EndpointBinding;

/// HTTP server for the gateway.
pub struct HttpServer {
    router: Router,
    endpoints: usize,
}

impl HttpServer {
    /// Create a server exposing `endpoints`.
    pub fn new(config: &GatewayConfig, endpoints: Vec<EndpointBinding>, context: DispatchContext) -> Self {
        let count = endpoints.len();
        let router = build_router(config, endpoints, context);
        Self {
            router,
            endpoints: count,
        }
    }

    /// Number of endpoints installed on the router.
    pub fn endpoint_count(&self) -> usize {
        self.endpoints
    }

    /// The assembled router, for in-process use.
    pub fn into_router(self) -> Router {
        self.router
    }

    /// Run the server, accepting connections on the given listener until
    /// the shutdown broadcast fires.
    pub async fn run(self, listener: TcpListener, mut shutdown: broadcast::Receiver<()>) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            endpoints = self.endpoints,
            "HTTP server starting"
        );

        let app = self.router.into_make_service_with_connect_info::<SocketAddr>();

        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Shutdown signal received, draining connections");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

/// Build the Axum router with all middleware layers.
pub fn build_router(config: &GatewayConfig, endpoints: Vec<EndpointBinding>, context: DispatchContext) -> Router {
    let context = Arc::new(context);
    let level = config.log_route_registration;

    // path -> method -> handler, paths kept in first-seen order
    let mut order: Vec<String> = Vec::new();
    let mut table: BTreeMap<String, BTreeMap<String, (Method, Arc<ActionHandler>)>> = BTreeMap::new();

    for binding in endpoints {
        let binding = Arc::new(binding);
        let handler = Arc::new(ActionHandler::new(binding.clone(), context.clone()));

        if !table.contains_key(binding.path()) {
            order.push(binding.path().to_string());
        }
        let methods = table.entry(binding.path().to_string()).or_default();

        for method in binding.accepted_methods() {
            if let Some((_, previous)) = methods.insert(method.to_string(), (method.clone(), handler.clone())) {
                tracing::warn!(
                    path = %binding.path(),
                    method = %method,
                    previous = %previous.binding().action(),
                    action = %binding.action(),
                    route = %binding.route().name,
                    "Endpoint overrides an earlier binding"
                );
            }
        }

        match binding.alias() {
            Some(alias) => log_at!(
                level,
                route = %binding.route().name,
                "  {} => {}  ({})",
                alias,
                binding.action(),
                binding.path()
            ),
            None => log_at!(
                level,
                route = %binding.route().name,
                "  {} {} => {}",
                method_list(binding.accepted_methods()),
                binding.path(),
                binding.action()
            ),
        }
    }

    if config.optimize_order {
        order.sort();
    }

    let mut router = Router::new();
    let mut installed = 0;
    for path in order {
        let Some(methods) = table.remove(&path) else {
            continue;
        };
        let mut method_router: MethodRouter = MethodRouter::new();
        for (method, handler) in methods.into_values() {
            let filter = match MethodFilter::try_from(method.clone()) {
                Ok(filter) => filter,
                Err(e) => {
                    tracing::warn!(path = %path, method = %method, error = %e, "Skipping unsupported method");
                    continue;
                }
            };
            method_router = method_router.on(filter, move |request: Request<Body>| async move {
                handler.handle(request).await
            });
        }
        router = router.route(&path, method_router);
        installed += 1;
    }

    metrics::record_endpoints(installed);
    tracing::info!(paths = installed, "Routes registered");

    router
        .layer(RequestBodyLimitLayer::new(config.max_body_size))
        .layer(propagate_request_id_layer())
        .layer(TraceLayer::new_for_http())
        .layer(set_request_id_layer())
}

fn method_list(methods: &[Method]) -> String {
    methods.iter().map(Method::as_str).collect::<Vec<_>>().join("|")
}

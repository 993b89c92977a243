//! The gateway service and its lifecycle.
//!
//! # States
//! ```text
//! Created ──start()──▶ Started ──stop()──▶ Stopped
//! ```
//!
//! # Design Decisions
//! - Configuration is validated on creation, the table is built on start
//! - The table is discarded on stop; a later start fetches the registry again
//! - Stop waits a fixed grace period for in-flight requests

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

use crate::broker::{ActionCaller, Registry};
use crate::config::validation::validate_config;
use crate::config::{ConfigError, GatewayConfig};
use crate::error::{GatewayError, Result};
use crate::http::dispatch::DispatchContext;
use crate::http::hooks::GatewayHooks;
use crate::http::server::HttpServer;
use crate::lifecycle::shutdown::Shutdown;
use crate::lifecycle::startup;

/// How long `stop()` waits for the server to drain.
pub const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

/// Service name reported in metadata and logs.
pub const SERVICE_NAME: &str = "gateway";

/// Descriptive metadata of the gateway service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ServiceMetadata {
    pub name: &'static str,
    pub category: &'static str,
    pub description: &'static str,
    pub package: &'static str,
    pub version: &'static str,
}

struct Running {
    shutdown: Shutdown,
    handle: JoinHandle<std::result::Result<(), std::io::Error>>,
    local_addr: SocketAddr,
    endpoints: usize,
}

/// Exposes registry actions over HTTP.
pub struct GatewayService {
    config: GatewayConfig,
    registry: Arc<dyn Registry>,
    caller: Arc<dyn ActionCaller>,
    hooks: GatewayHooks,
    running: Option<Running>,
}

impl GatewayService {
    /// Create the service. Fails on an invalid configuration.
    pub fn new(config: GatewayConfig, registry: Arc<dyn Registry>, caller: Arc<dyn ActionCaller>) -> Result<Self> {
        validate_config(&config).map_err(ConfigError::Validation)?;

        for route in &config.routes {
            tracing::debug!(route = %route.name, path = %route.path, aliases = route.aliases.len(), "Route configured");
        }

        Ok(Self {
            config,
            registry,
            caller,
            hooks: GatewayHooks::default(),
            running: None,
        })
    }

    /// Attach the service-level hooks.
    pub fn with_hooks(mut self, hooks: GatewayHooks) -> Self {
        self.hooks = hooks;
        self
    }

    pub fn name(&self) -> &'static str {
        SERVICE_NAME
    }

    pub fn metadata(&self) -> ServiceMetadata {
        ServiceMetadata {
            name: SERVICE_NAME,
            category: "gateway",
            description: "Exposes registry actions as HTTP endpoints",
            package: env!("CARGO_PKG_NAME"),
            version: env!("CARGO_PKG_VERSION"),
        }
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    pub fn is_running(&self) -> bool {
        self.running.is_some()
    }

    /// Address the server is listening on, once started.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.running.as_ref().map(|r| r.local_addr)
    }

    /// Number of endpoints installed by the last start.
    pub fn endpoint_count(&self) -> Option<usize> {
        self.running.as_ref().map(|r| r.endpoints)
    }

    /// Fetch the registry, build the table and serve on the configured address.
    pub async fn start(&mut self) -> Result<SocketAddr> {
        if self.running.is_some() {
            return Err(GatewayError::AlreadyStarted);
        }
        let listener = startup::bind(&self.config).await?;
        self.start_on(listener).await
    }

    /// Like [`start`](Self::start) on an already bound listener.
    pub async fn start_on(&mut self, listener: TcpListener) -> Result<SocketAddr> {
        if self.running.is_some() {
            return Err(GatewayError::AlreadyStarted);
        }

        let endpoints = startup::build_table(&self.config, self.registry.as_ref()).await?;

        let context = DispatchContext {
            caller: self.caller.clone(),
            hooks: self.hooks.clone(),
            log: self.config.log_settings(),
            max_body_size: self.config.max_body_size,
        };
        let server = HttpServer::new(&self.config, endpoints, context);
        let endpoints = server.endpoint_count();

        let local_addr = listener.local_addr()?;
        let shutdown = Shutdown::new();
        let handle = tokio::spawn(server.run(listener, shutdown.subscribe()));

        tracing::info!(address = %local_addr, endpoints, "API Gateway listening on http://{}", local_addr);

        self.running = Some(Running {
            shutdown,
            handle,
            local_addr,
            endpoints,
        });
        Ok(local_addr)
    }

    /// Stop accepting connections and wait for in-flight requests.
    ///
    /// Stopping a service that is not running is a no-op.
    pub async fn stop(&mut self) -> Result<()> {
        let Some(running) = self.running.take() else {
            return Ok(());
        };

        running.shutdown.trigger();
        let mut handle = running.handle;

        match tokio::time::timeout(SHUTDOWN_GRACE, &mut handle).await {
            Ok(Ok(Ok(()))) => {
                tracing::info!("API Gateway stopped");
                Ok(())
            }
            Ok(Ok(Err(e))) => Err(GatewayError::Server(e)),
            Ok(Err(e)) => Err(GatewayError::Task(e.to_string())),
            Err(_) => {
                handle.abort();
                tracing::error!(grace_secs = SHUTDOWN_GRACE.as_secs(), "API Gateway did not stop in time");
                Err(GatewayError::ShutdownTimeout(SHUTDOWN_GRACE.as_secs()))
            }
        }
    }
}

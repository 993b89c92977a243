//! Shared utilities for integration and load testing.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::Arc;

use action_gateway::broker::{ActionCaller, ActionError, LocalBroker, Registry};
use action_gateway::config::GatewayConfig;
use action_gateway::http::GatewayHooks;
use action_gateway::lifecycle::GatewayService;
use serde_json::{json, Value};
use tokio::net::TcpListener;

/// A started gateway on an ephemeral local port.
pub struct TestGateway {
    pub service: GatewayService,
    pub addr: SocketAddr,
    pub client: reqwest::Client,
}

impl TestGateway {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    pub async fn stop(mut self) {
        self.service.stop().await.unwrap();
    }
}

/// In-process `calculator` service used by most tests.
pub fn calculator() -> LocalBroker {
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
    broker.register("calculator", "echo", |params, _meta| async move { Ok(params) });
    broker.register("calculator", "fail", |_params, _meta| async move {
        Err(ActionError::new("hello world").with_code(422).with_kind("ValidationError"))
    });
    broker
}

fn number(params: &Value, key: &str) -> Result<i64, ActionError> {
    let value = &params[key];
    value
        .as_i64()
        .or_else(|| value.as_str().and_then(|s| s.parse().ok()))
        .ok_or_else(|| ActionError::new(format!("'{}' is not a number", key)).with_code(422))
}

/// Start a gateway with separate registry and caller.
pub async fn start_with(
    mut config: GatewayConfig,
    registry: Arc<dyn Registry>,
    caller: Arc<dyn ActionCaller>,
    hooks: GatewayHooks,
) -> TestGateway {
    config.ip = "127.0.0.1".into();
    config.port = 0;

    let mut service = GatewayService::new(config, registry, caller).unwrap().with_hooks(hooks);
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = service.start_on(listener).await.unwrap();

    let client = reqwest::Client::builder().no_proxy().build().unwrap();

    TestGateway { service, addr, client }
}

/// Start a gateway backed by `broker`.
pub async fn start_gateway(config: GatewayConfig, broker: LocalBroker, hooks: GatewayHooks) -> TestGateway {
    let broker = Arc::new(broker);
    start_with(config, broker.clone(), broker, hooks).await
}

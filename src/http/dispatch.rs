//! Per-endpoint request dispatch.
//!
//! # Data Flow
//! ```text
//! Request
//!     → before_call hook
//!     → authenticate (route.authentication && authenticator)
//!     → authorize    (route.authorization && authorizer)
//!     → params.rs (form values or JSON body)
//!     → ActionCaller::call (awaited, no timeout added here)
//!     → after_call hook
//!     → response.rs (status + JSON body)
//! ```
//!
//! # Design Decisions
//! - Linear pipeline; only an authorization rejection ends it early
//! - Parameter failures are forwarded to the call, not answered here
//! - Logging taps never change the outcome

use std::sync::Arc;
use std::time::Instant;

use axum::body::Body;
use axum::http::Request;
use axum::response::Response;

use crate::broker::ActionCaller;
use crate::config::LogSettings;
use crate::http::hooks::{GatewayHooks, RequestContext};
use crate::http::params::extract_params;
use crate::http::response::{encode_result, error_body, json_response};
use crate::log_at;
use crate::observability::metrics;
use crate::routing::EndpointBinding;

/// Everything the dispatcher shares across endpoints.
#[derive(Clone)]
pub struct DispatchContext {
    pub caller: Arc<dyn ActionCaller>,
    pub hooks: GatewayHooks,
    pub log: LogSettings,
    pub max_body_size: usize,
}

/// The handler installed for one endpoint.
pub struct ActionHandler {
    binding: Arc<EndpointBinding>,
    context: Arc<DispatchContext>,
}

impl ActionHandler {
    pub fn new(binding: Arc<EndpointBinding>, context: Arc<DispatchContext>) -> Self {
        Self { binding, context }
    }

    pub fn binding(&self) -> &EndpointBinding {
        &self.binding
    }

    /// Run the full pipeline for one request.
    pub async fn handle(&self, request: Request<Body>) -> Response {
        let start = Instant::now();
        let binding = &self.binding;
        let route = binding.route();
        let hooks = &self.context.hooks;
        let log = self.context.log;
        let action = binding.action();
        let alias = binding.alias();

        let (parts, body) = request.into_parts();
        let mut ctx = RequestContext::from_parts(&parts);

        if let Some(hook) = &route.hooks.before_call {
            hook.before_call(&ctx, route, alias);
        }

        if route.authentication {
            if let Some(authenticator) = &hooks.authenticator {
                match authenticator.authenticate(&ctx, alias).await {
                    Some(user) => {
                        tracing::debug!(user = %user, "Authenticated user");
                        ctx.meta.user = Some(user);
                    }
                    None => {
                        tracing::debug!("Anonymous user");
                        ctx.meta.user = None;
                    }
                }
            }
        }

        if route.authorization {
            if let Some(authorizer) = &hooks.authorizer {
                if let Err(rejection) = authorizer.authorize(&ctx, alias).await {
                    log_at!(
                        log.client_errors,
                        action = %action,
                        status = rejection.status.as_u16(),
                        reason = %rejection.message,
                        "Request rejected by authorizer"
                    );
                    metrics::record_request(action.as_str(), parts.method.as_str(), rejection.status.as_u16(), start);
                    return json_response(rejection.status, &error_body(&rejection.message));
                }
            }
        }

        log_at!(log.request, action = %action, method = %parts.method, path = %parts.uri.path(), "Call '{}' action", action);

        let params = extract_params(&parts, body, self.context.max_body_size).await;

        log_at!(log.request_params, action = %action, params = %params, "Params");

        let result = self.context.caller.call(action, params, ctx.meta.clone()).await;

        match &result {
            Ok(data) => log_at!(log.response_data, action = %action, data = %data, "Data"),
            Err(err) => log_at!(log.response_data, action = %action, error = %err, "Data"),
        }

        if let Some(hook) = &route.hooks.after_call {
            hook.after_call(&ctx, route, &result);
        }

        let (status, body) = encode_result(&ctx, &result, hooks.on_error.as_deref());

        if let Err(err) = &result {
            log_at!(log.client_errors, action = %action, status = status.as_u16(), error = %err, "Gateway request error");
        }

        log_at!(
            log.response,
            action = %action,
            status = status.as_u16(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Response sent"
        );
        metrics::record_request(action.as_str(), parts.method.as_str(), status.as_u16(), start);

        json_response(status, &body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;
    use std::io;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    use async_trait::async_trait;
    use axum::body::to_bytes;
    use axum::http::StatusCode;
    use serde_json::{json, Value};

    use crate::broker::{ActionError, ActionName, CallResult, LocalBroker};
    use crate::config::{LogLevel, MappingPolicy, RouteConfig};
    use crate::http::hooks::{Authenticator, Authorizer, Rejection, RouteHooks};
    use crate::routing::build_endpoints;

    fn broker() -> LocalBroker {
        let broker = LocalBroker::new();
        broker.register("calc", "add", |params, _meta| async move {
            let a: i64 = params["a"].as_str().and_then(|v| v.parse().ok()).unwrap_or_default();
            let b: i64 = params["b"].as_str().and_then(|v| v.parse().ok()).unwrap_or_default();
            Ok(json!(a + b))
        });
        broker.register("calc", "fail", |_params, _meta| async move {
            Err(ActionError::new("hello world").with_code(422))
        });
        broker.register("calc", "whoami", |_params, meta| async move {
            Ok(meta.user.unwrap_or(Value::Null))
        });
        broker
    }

    fn handler(route: RouteConfig, action: &str, hooks: GatewayHooks) -> ActionHandler {
        let discovered: BTreeSet<ActionName> = [ActionName::new(action)].into_iter().collect();
        let binding = build_endpoints("/", &[route], &discovered).unwrap().remove(0);
        let context = DispatchContext {
            caller: Arc::new(broker()),
            hooks,
            log: LogSettings::default(),
            max_body_size: 1024,
        };
        ActionHandler::new(Arc::new(binding), Arc::new(context))
    }

    async fn body_json(response: Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    struct StaticUser;

    #[async_trait]
    impl Authenticator for StaticUser {
        async fn authenticate(&self, ctx: &RequestContext, _alias: Option<&str>) -> Option<Value> {
            ctx.headers
                .get("authorization")
                .map(|_| json!({"name": "Benjamin"}))
        }
    }

    struct RequireUser;

    #[async_trait]
    impl Authorizer for RequireUser {
        async fn authorize(&self, ctx: &RequestContext, _alias: Option<&str>) -> Result<(), Rejection> {
            match ctx.meta.user {
                Some(_) => Ok(()),
                None => Err(Rejection::unauthorized("login required")),
            }
        }
    }

    #[tokio::test]
    async fn test_success_pipeline() {
        let handler = handler(RouteConfig::default(), "calc.add", GatewayHooks::new());
        let response = handler
            .handle(Request::get("/calc/add?a=2&b=3").body(Body::empty()).unwrap())
            .await;

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()["content-type"], "application/json; charset=utf-8");
        assert_eq!(body_json(response).await, json!(5));
    }

    #[tokio::test]
    async fn test_error_without_override() {
        let handler = handler(RouteConfig::default(), "calc.fail", GatewayHooks::new());
        let response = handler
            .handle(Request::post("/calc/fail").body(Body::empty()).unwrap())
            .await;

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(response.headers()["content-type"], "application/json; charset=utf-8");
        assert_eq!(body_json(response).await, json!({"error": "hello world"}));
    }

    #[tokio::test]
    async fn test_error_with_override() {
        let hooks = GatewayHooks::new().on_error(|_ctx: &RequestContext, err: &ActionError| {
            (StatusCode::BAD_REQUEST, json!({"error": err.message, "code": err.code}))
        });
        let handler = handler(RouteConfig::default(), "calc.fail", hooks);
        let response = handler
            .handle(Request::get("/calc/fail").body(Body::empty()).unwrap())
            .await;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(response.headers()["content-type"], "application/json; charset=utf-8");
        assert_eq!(body_json(response).await, json!({"error": "hello world", "code": 422}));
    }

    #[tokio::test]
    async fn test_invalid_params_flow_into_call() {
        let handler = handler(RouteConfig::default(), "calc.add", GatewayHooks::new());
        let response = handler
            .handle(Request::post("/calc/add").body(Body::from("{oops")).unwrap())
            .await;

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = body_json(response).await;
        assert!(body["error"].as_str().unwrap().starts_with("Error trying to parse request body"));
    }

    #[tokio::test]
    async fn test_authentication_attaches_user() {
        let route = RouteConfig::default().authentication(true);
        let hooks = GatewayHooks::new().authenticator(StaticUser);
        let handler = handler(route, "calc.whoami", hooks);

        let response = handler
            .handle(
                Request::get("/calc/whoami")
                    .header("authorization", "Bearer token")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await;
        assert_eq!(body_json(response).await, json!({"name": "Benjamin"}));

        let anonymous = handler
            .handle(Request::get("/calc/whoami").body(Body::empty()).unwrap())
            .await;
        assert_eq!(anonymous.status(), StatusCode::OK);
        assert_eq!(body_json(anonymous).await, Value::Null);
    }

    #[tokio::test]
    async fn test_authentication_skipped_when_route_disabled() {
        let hooks = GatewayHooks::new().authenticator(StaticUser);
        let handler = handler(RouteConfig::default(), "calc.whoami", hooks);
        let response = handler
            .handle(
                Request::get("/calc/whoami")
                    .header("authorization", "Bearer token")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await;
        assert_eq!(body_json(response).await, Value::Null);
    }

    #[tokio::test]
    async fn test_authorization_rejection_short_circuits() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let route = RouteConfig::new("api", "/api")
            .mapping_policy(MappingPolicy::Restrict)
            .alias("GET /me", "calc.whoami")
            .authentication(true)
            .authorization(true)
            .hooks(RouteHooks::new().after_call(move |_ctx: &RequestContext, _route: &RouteConfig, _result: &CallResult| {
                counter.fetch_add(1, Ordering::SeqCst);
            }));
        let hooks = GatewayHooks::new().authenticator(StaticUser).authorizer(RequireUser);
        let handler = handler(route, "calc.whoami", hooks);

        let denied = handler
            .handle(Request::get("/api/me").body(Body::empty()).unwrap())
            .await;
        assert_eq!(denied.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(denied.headers()["content-type"], "application/json; charset=utf-8");
        assert_eq!(body_json(denied).await, json!({"error": "login required"}));
        assert_eq!(calls.load(Ordering::SeqCst), 0);

        let allowed = handler
            .handle(
                Request::get("/api/me")
                    .header("authorization", "Bearer token")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await;
        assert_eq!(allowed.status(), StatusCode::OK);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_hooks_run_in_order() {
        let events = Arc::new(Mutex::new(Vec::new()));
        let before = events.clone();
        let after = events.clone();
        let route = RouteConfig::new("api", "/api")
            .mapping_policy(MappingPolicy::Restrict)
            .alias("GET /sum", "calc.add")
            .hooks(
                RouteHooks::new()
                    .before_call(move |_ctx: &RequestContext, route: &RouteConfig, alias: Option<&str>| {
                        before
                            .lock()
                            .unwrap()
                            .push(format!("before {} {}", route.name, alias.unwrap_or("-")));
                    })
                    .after_call(move |_ctx: &RequestContext, _route: &RouteConfig, result: &CallResult| {
                        after.lock().unwrap().push(format!("after {}", result.as_ref().unwrap()));
                    }),
            );
        let handler = handler(route, "calc.add", GatewayHooks::new());

        let response = handler
            .handle(Request::get("/api/sum?a=1&b=1").body(Body::empty()).unwrap())
            .await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            *events.lock().unwrap(),
            vec!["before api GET /sum".to_string(), "after 2".to_string()]
        );
    }

    /// Collects formatted log lines for the current thread.
    #[derive(Clone, Default)]
    struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

    impl io::Write for CapturedLogs {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl CapturedLogs {
        fn contents(&self) -> String {
            String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
        }
    }

    #[tokio::test]
    async fn test_error_results_reach_error_tap_with_default_encoder() {
        let logs = CapturedLogs::default();
        let writer = logs.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::TRACE)
            .with_ansi(false)
            .with_writer(move || writer.clone())
            .finish();
        let _guard = tracing::subscriber::set_default(subscriber);

        let mut handler = handler(RouteConfig::default(), "calc.fail", GatewayHooks::new());
        Arc::get_mut(&mut handler.context).unwrap().log = LogSettings {
            client_errors: LogLevel::Warn,
            ..LogSettings::default()
        };

        let response = handler
            .handle(Request::get("/calc/fail").body(Body::empty()).unwrap())
            .await;
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let output = logs.contents();
        let line = output
            .lines()
            .find(|line| line.contains("Gateway request error"))
            .expect("error tap should fire for a 500 response");
        assert!(line.contains("WARN"));
        assert!(line.contains("status=500"));
        assert!(line.contains("hello world"));
    }

    #[tokio::test]
    async fn test_error_tap_respects_off() {
        let logs = CapturedLogs::default();
        let writer = logs.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::TRACE)
            .with_ansi(false)
            .with_writer(move || writer.clone())
            .finish();
        let _guard = tracing::subscriber::set_default(subscriber);

        let mut handler = handler(RouteConfig::default(), "calc.fail", GatewayHooks::new());
        Arc::get_mut(&mut handler.context).unwrap().log = LogSettings {
            client_errors: LogLevel::Off,
            ..LogSettings::default()
        };

        handler
            .handle(Request::get("/calc/fail").body(Body::empty()).unwrap())
            .await;
        assert!(!logs.contents().contains("Gateway request error"));
    }
}

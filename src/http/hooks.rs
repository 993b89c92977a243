//! Extension points invoked by the request dispatcher.
//!
//! Every hook is optional. Route-level hooks (`BeforeCall`, `AfterCall`)
//! live on the route; service-level hooks (`Authenticator`, `Authorizer`,
//! `ErrorResponder`) are shared by every endpoint.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use axum::http::{request::Parts, HeaderMap, Method, StatusCode, Uri};
use serde_json::Value;

use crate::broker::{ActionError, CallMeta, CallResult};
use crate::config::RouteConfig;

/// What hooks get to see of the inbound request.
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub method: Method,
    pub uri: Uri,
    pub headers: HeaderMap,
    /// Metadata forwarded with the call. Authentication fills `user`.
    pub meta: CallMeta,
}

impl RequestContext {
    pub fn from_parts(parts: &Parts) -> Self {
        let request_id = parts
            .headers
            .get(crate::http::request::X_REQUEST_ID)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        Self {
            method: parts.method.clone(),
            uri: parts.uri.clone(),
            headers: parts.headers.clone(),
            meta: CallMeta {
                user: None,
                request_id,
            },
        }
    }
}

/// Runs before authentication. Side effects only.
pub trait BeforeCall: Send + Sync {
    fn before_call(&self, ctx: &RequestContext, route: &RouteConfig, alias: Option<&str>);
}

impl<F> BeforeCall for F
where
    F: Fn(&RequestContext, &RouteConfig, Option<&str>) + Send + Sync,
{
    fn before_call(&self, ctx: &RequestContext, route: &RouteConfig, alias: Option<&str>) {
        self(ctx, route, alias)
    }
}

/// Observes the call result before it is encoded.
pub trait AfterCall: Send + Sync {
    fn after_call(&self, ctx: &RequestContext, route: &RouteConfig, result: &CallResult);
}

impl<F> AfterCall for F
where
    F: Fn(&RequestContext, &RouteConfig, &CallResult) + Send + Sync,
{
    fn after_call(&self, ctx: &RequestContext, route: &RouteConfig, result: &CallResult) {
        self(ctx, route, result)
    }
}

/// Resolves the caller. `None` means anonymous.
#[async_trait]
pub trait Authenticator: Send + Sync {
    async fn authenticate(&self, ctx: &RequestContext, alias: Option<&str>) -> Option<Value>;
}

/// Decides whether the (possibly anonymous) caller may proceed.
#[async_trait]
pub trait Authorizer: Send + Sync {
    async fn authorize(&self, ctx: &RequestContext, alias: Option<&str>) -> Result<(), Rejection>;
}

/// Replaces the default error encoding. Owns both status and body.
pub trait ErrorResponder: Send + Sync {
    fn respond(&self, ctx: &RequestContext, error: &ActionError) -> (StatusCode, Value);
}

impl<F> ErrorResponder for F
where
    F: Fn(&RequestContext, &ActionError) -> (StatusCode, Value) + Send + Sync,
{
    fn respond(&self, ctx: &RequestContext, error: &ActionError) -> (StatusCode, Value) {
        self(ctx, error)
    }
}

/// Refusal returned by an [`Authorizer`]. Ends the request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rejection {
    pub status: StatusCode,
    pub message: String,
}

impl Rejection {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, message)
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(StatusCode::FORBIDDEN, message)
    }
}

/// Hooks attached to a single route.
#[derive(Clone, Default)]
pub struct RouteHooks {
    pub before_call: Option<Arc<dyn BeforeCall>>,
    pub after_call: Option<Arc<dyn AfterCall>>,
}

impl RouteHooks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn before_call(mut self, hook: impl BeforeCall + 'static) -> Self {
        self.before_call = Some(Arc::new(hook));
        self
    }

    pub fn after_call(mut self, hook: impl AfterCall + 'static) -> Self {
        self.after_call = Some(Arc::new(hook));
        self
    }
}

impl fmt::Debug for RouteHooks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RouteHooks")
            .field("before_call", &self.before_call.is_some())
            .field("after_call", &self.after_call.is_some())
            .finish()
    }
}

/// Hooks shared by every endpoint of the gateway.
#[derive(Clone, Default)]
pub struct GatewayHooks {
    pub authenticator: Option<Arc<dyn Authenticator>>,
    pub authorizer: Option<Arc<dyn Authorizer>>,
    pub on_error: Option<Arc<dyn ErrorResponder>>,
}

impl GatewayHooks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn authenticator(mut self, hook: impl Authenticator + 'static) -> Self {
        self.authenticator = Some(Arc::new(hook));
        self
    }

    pub fn authorizer(mut self, hook: impl Authorizer + 'static) -> Self {
        self.authorizer = Some(Arc::new(hook));
        self
    }

    pub fn on_error(mut self, hook: impl ErrorResponder + 'static) -> Self {
        self.on_error = Some(Arc::new(hook));
        self
    }
}

impl fmt::Debug for GatewayHooks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GatewayHooks")
            .field("authenticator", &self.authenticator.is_some())
            .field("authorizer", &self.authorizer.is_some())
            .field("on_error", &self.on_error.is_some())
            .finish()
    }
}

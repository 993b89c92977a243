//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, one MethodRouter per endpoint path)
//!     → request.rs (assign and echo x-request-id)
//!     → dispatch.rs (hooks, auth, call)
//!         → params.rs (form values or JSON body)
//!         → response.rs (status + JSON body)
//!     → Send to client
//! ```

pub mod dispatch;
pub mod hooks;
pub mod params;
pub mod request;
pub mod response;
pub mod server;

pub use dispatch::{ActionHandler, DispatchContext};
pub use hooks::{
    AfterCall, Authenticator, Authorizer, BeforeCall, ErrorResponder, GatewayHooks, Rejection, RequestContext,
    RouteHooks,
};
pub use request::X_REQUEST_ID;
pub use server::{build_router, HttpServer};

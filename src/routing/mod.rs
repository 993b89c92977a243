//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Route Compilation (at startup):
//!     RouteConfig[] + discovered ActionName set
//!     → matcher.rs (whitelist filter)
//!     → alias.rs (alias parsing, action → alias inversion)
//!     → table.rs (mapping policy, path + method resolution)
//!     → EndpointBinding[] installed on the HTTP router
//! ```
//!
//! # Design Decisions
//! - Endpoints compiled at startup, immutable at runtime
//! - Deterministic: same snapshot always yields the same table
//! - Routes processed in declaration order, never merged

pub mod alias;
pub mod matcher;
pub mod table;

pub use alias::{AliasSpec, DEFAULT_METHODS};
pub use matcher::Whitelist;
pub use table::{build_endpoints, EndpointBinding};

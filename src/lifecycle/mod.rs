//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Create (service.rs):
//!     Merge config over defaults → Validate
//!
//! Start (startup.rs):
//!     Fetch registry once → Build endpoint table → Bind → Serve
//!
//! Stop (shutdown.rs):
//!     Broadcast → Stop accepting → Drain connections (5s grace)
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → Binary calls stop()
//! ```
//!
//! # Design Decisions
//! - Ordered startup: config first, then table, then listener
//! - Shutdown has timeout: the server task is aborted after the deadline

pub mod service;
pub mod shutdown;
pub mod signals;
pub mod startup;

pub use service::{GatewayService, ServiceMetadata, SHUTDOWN_GRACE};
pub use shutdown::Shutdown;
pub use signals::shutdown_signal;

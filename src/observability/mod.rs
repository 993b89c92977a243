//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Dispatcher / lifecycle produce:
//!     → logging.rs (structured log events, per-tap levels)
//!     → metrics.rs (counters, histograms)
//!
//! Consumers:
//!     → stdout via tracing-subscriber
//!     → Metrics endpoint (Prometheus scrape), when enabled
//! ```

pub mod logging;
pub mod metrics;

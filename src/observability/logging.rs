//! Structured logging.
//!
//! # Responsibilities
//! - Initialize the tracing subscriber for the binary
//! - Route the per-request logging taps to the configured level
//!
//! # Design Decisions
//! - Uses tracing crate for structured logging
//! - `RUST_LOG` wins over the configured level when set
//! - Each tap has its own level; `off` disables it

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::ObservabilityConfig;

/// Emit a tracing event at a level chosen at runtime.
///
/// ```ignore
/// log_at!(settings.request, action = %name, "Call action");
/// ```
#[macro_export]
macro_rules! log_at {
    ($level:expr, $($arg:tt)+) => {
        match $level {
            $crate::config::LogLevel::Off => {}
            $crate::config::LogLevel::Trace => ::tracing::trace!($($arg)+),
            $crate::config::LogLevel::Debug => ::tracing::debug!($($arg)+),
            $crate::config::LogLevel::Info => ::tracing::info!($($arg)+),
            $crate::config::LogLevel::Warn => ::tracing::warn!($($arg)+),
            $crate::config::LogLevel::Error => ::tracing::error!($($arg)+),
        }
    };
}

/// Install the global subscriber. Safe to call more than once.
pub fn init_tracing(config: &ObservabilityConfig) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        format!("action_gateway={},tower_http={}", config.log_level, config.log_level).into()
    });

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .try_init();
}

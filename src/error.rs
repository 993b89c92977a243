//! Top-level error type for the gateway lifecycle.

use thiserror::Error;

use crate::config::ConfigError;

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("failed to bind {address}: {source}")]
    Bind {
        address: String,
        #[source]
        source: std::io::Error,
    },

    #[error("server error: {0}")]
    Server(#[from] std::io::Error),

    #[error("gateway is already started")]
    AlreadyStarted,

    #[error("server did not stop within {0}s")]
    ShutdownTimeout(u64),

    #[error("server task failed: {0}")]
    Task(String),
}

pub type Result<T> = std::result::Result<T, GatewayError>;

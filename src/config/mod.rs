//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize, defaults fill missing fields)
//!     → validation.rs (semantic checks)
//!     → GatewayConfig (validated, immutable)
//!     → owned by the gateway service
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; changes require a restart
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, ConfigError};
pub use schema::{GatewayConfig, LogLevel, LogSettings, MappingPolicy, ObservabilityConfig, RouteConfig};
pub use validation::ValidationError;

//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Reject malformed aliases before any endpoint is built
//! - Validate the bind address
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: GatewayConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use thiserror::Error;

use crate::config::schema::GatewayConfig;
use crate::routing::alias::AliasSpec;
use crate::routing::table::unsupported_segment;

/// A single semantic problem in the configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("invalid bind address '{0}'")]
    InvalidAddress(String),

    #[error("route '{route}': invalid alias format '{alias}'")]
    InvalidAlias { route: String, alias: String },

    #[error("route '{route}': alias '{alias}' has an empty action name")]
    EmptyAliasTarget { route: String, alias: String },

    #[error("route '{route}': path '{path}' contains an unsupported segment (':', '*', '{{' or '}}')")]
    UnsupportedPathSegment { route: String, path: String },
}

/// Validate a merged configuration.
pub fn validate_config(config: &GatewayConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.socket_addr().is_err() {
        errors.push(ValidationError::InvalidAddress(config.address()));
    }

    if has_unsupported_segment(&config.path) {
        errors.push(ValidationError::UnsupportedPathSegment {
            route: "<base>".to_string(),
            path: config.path.clone(),
        });
    }

    for route in &config.routes {
        if has_unsupported_segment(&route.path) {
            errors.push(ValidationError::UnsupportedPathSegment {
                route: route.name.clone(),
                path: route.path.clone(),
            });
        }

        for (alias, action) in &route.aliases {
            if action.trim().is_empty() {
                errors.push(ValidationError::EmptyAliasTarget {
                    route: route.name.clone(),
                    alias: alias.clone(),
                });
            }

            match AliasSpec::parse(alias) {
                Ok(spec) => {
                    if has_unsupported_segment(&spec.path) {
                        errors.push(ValidationError::UnsupportedPathSegment {
                            route: route.name.clone(),
                            path: spec.path,
                        });
                    }
                }
                Err(_) => errors.push(ValidationError::InvalidAlias {
                    route: route.name.clone(),
                    alias: alias.clone(),
                }),
            }
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Capture segments are not part of the alias language.
fn has_unsupported_segment(path: &str) -> bool {
    unsupported_segment(path).is_some()
}

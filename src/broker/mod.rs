//! Contracts with the service registry and the remote-call transport.
//!
//! # Data Flow
//! ```text
//! Startup:
//!     Registry::services({only_available, with_actions})
//!     → ServiceDescriptor[] → discovered ActionName set
//!
//! Per request:
//!     ActionCaller::call(action, params, meta)
//!     → Ok(result) | Err(ActionError)
//! ```
//!
//! # Design Decisions
//! - Both collaborators are trait objects supplied by the host
//! - No retries, balancing or timeouts here; the transport owns those
//! - `local` provides an in-process implementation of both

pub mod local;
pub mod types;

use std::collections::BTreeSet;

use async_trait::async_trait;
use serde_json::Value;

pub use local::LocalBroker;
pub use types::{
    ActionError, ActionInfo, ActionName, BrokerError, CallMeta, CallResult, Params, ServiceDescriptor,
    ServiceQuery,
};

/// Source of the services and actions currently reachable.
#[async_trait]
pub trait Registry: Send + Sync {
    async fn services(&self, query: ServiceQuery) -> Result<Vec<ServiceDescriptor>, BrokerError>;
}

/// Transport used to invoke an action.
#[async_trait]
pub trait ActionCaller: Send + Sync {
    async fn call(&self, action: &ActionName, params: Params, meta: CallMeta) -> Result<Value, ActionError>;
}

/// Fetch the registry once and flatten it into a sorted action set.
///
/// A failed fetch is logged and yields no actions.
pub async fn discover_actions(registry: &dyn Registry) -> BTreeSet<ActionName> {
    match registry.services(ServiceQuery::default()).await {
        Ok(services) => services
            .into_iter()
            .flat_map(|service| service.actions.into_values())
            .map(|info| info.name)
            .collect(),
        Err(e) => {
            tracing::error!(error = %e, "Could not load the list of services/actions from the registry");
            BTreeSet::new()
        }
    }
}

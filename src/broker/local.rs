//! In-process broker.
//!
//! Implements both [`Registry`] and [`ActionCaller`] over handlers
//! registered in memory. Used by the binary and by tests.

use std::collections::BTreeMap;
use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use futures_util::future::BoxFuture;
use serde_json::Value;

use crate::broker::types::{
    ActionError, ActionInfo, ActionName, BrokerError, CallMeta, CallResult, Params, ServiceDescriptor,
    ServiceQuery,
};
use crate::broker::{ActionCaller, Registry};

type ActionFn = Arc<dyn Fn(Value, CallMeta) -> BoxFuture<'static, CallResult> + Send + Sync>;

struct LocalService {
    available: bool,
    actions: BTreeMap<String, ActionFn>,
}

impl Default for LocalService {
    fn default() -> Self {
        Self {
            available: true,
            actions: BTreeMap::new(),
        }
    }
}

/// A registry and transport backed by in-memory handlers.
#[derive(Clone, Default)]
pub struct LocalBroker {
    services: Arc<DashMap<String, LocalService>>,
}

impl LocalBroker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `service.action`. Replaces an existing handler of the same name.
    pub fn register<F, Fut>(&self, service: &str, action: &str, handler: F)
    where
        F: Fn(Value, CallMeta) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = CallResult> + Send + 'static,
    {
        let boxed: ActionFn = Arc::new(move |params: Value, meta: CallMeta| -> BoxFuture<'static, CallResult> {
            Box::pin(handler(params, meta))
        });
        self.services
            .entry(service.to_string())
            .or_default()
            .actions
            .insert(action.to_string(), boxed);
    }

    /// Mark a service as (un)available. Unavailable services are hidden
    /// from `only_available` queries and refuse calls.
    pub fn set_available(&self, service: &str, available: bool) {
        if let Some(mut entry) = self.services.get_mut(service) {
            entry.available = available;
        }
    }

    fn lookup(&self, action: &ActionName) -> Result<ActionFn, BrokerError> {
        let (service, name) = action
            .as_str()
            .rsplit_once('.')
            .ok_or_else(|| BrokerError::ActionNotFound(action.clone()))?;

        let entry = self
            .services
            .get(service)
            .ok_or_else(|| BrokerError::ActionNotFound(action.clone()))?;

        if !entry.available {
            return Err(BrokerError::ServiceUnavailable(service.to_string()));
        }

        entry
            .actions
            .get(name)
            .cloned()
            .ok_or_else(|| BrokerError::ActionNotFound(action.clone()))
    }
}

#[async_trait]
impl Registry for LocalBroker {
    async fn services(&self, query: ServiceQuery) -> Result<Vec<ServiceDescriptor>, BrokerError> {
        let mut services: Vec<ServiceDescriptor> = self
            .services
            .iter()
            .filter(|entry| !query.only_available || entry.available)
            .map(|entry| {
                let actions = if query.with_actions {
                    entry
                        .actions
                        .keys()
                        .map(|name| {
                            let info = ActionInfo {
                                name: ActionName::new(format!("{}.{}", entry.key(), name)),
                            };
                            (name.clone(), info)
                        })
                        .collect()
                } else {
                    BTreeMap::new()
                };
                ServiceDescriptor {
                    name: entry.key().clone(),
                    actions,
                }
            })
            .collect();

        services.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(services)
    }
}

#[async_trait]
impl ActionCaller for LocalBroker {
    async fn call(&self, action: &ActionName, params: Params, meta: CallMeta) -> Result<Value, ActionError> {
        let handler = self.lookup(action)?;

        match params {
            Params::Data(value) => handler(value, meta).await,
            Params::Invalid(message) => Err(ActionError::new(message)
                .with_code(400)
                .with_kind("InvalidParams")),
        }
    }
}

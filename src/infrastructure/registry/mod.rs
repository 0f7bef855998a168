//! Service registry - owns handler and behavior instances and their lifetimes

pub mod builder;

pub use builder::MediatorBuilder;

use std::any::TypeId;
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};

use crate::application::errors::ConfigError;
use crate::application::pipeline::OpenBehavior;
use crate::domain::traits::{service_key, HandlerRegistry, ServiceInstance};

/// How long a resolved instance lives
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServiceLifetime {
    /// A fresh instance on every resolution
    #[default]
    Transient,
    /// One shared instance, created on first resolution
    Singleton,
}

impl fmt::Display for ServiceLifetime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ServiceLifetime::Transient => write!(f, "transient"),
            ServiceLifetime::Singleton => write!(f, "singleton"),
        }
    }
}

impl FromStr for ServiceLifetime {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "transient" => Ok(ServiceLifetime::Transient),
            "singleton" => Ok(ServiceLifetime::Singleton),
            other => Err(ConfigError::InvalidValue(format!(
                "service-lifetime must be transient or singleton, got {}",
                other
            ))),
        }
    }
}

type Factory = Arc<dyn Fn() -> ServiceInstance + Send + Sync>;

/// Closes an open behavior over one concrete message type
pub type Closer = fn(&OpenBehavior) -> Option<ServiceInstance>;

struct Registration {
    order: usize,
    factory: Factory,
}

/// In-memory [`HandlerRegistry`].
///
/// Registrations are numbered as they arrive, so closed and open behaviors
/// resolve in one combined registration order.
#[derive(Default)]
pub struct ServiceRegistry {
    services: HashMap<TypeId, Vec<Registration>>,
    open: Vec<(usize, OpenBehavior)>,
    closers: HashMap<TypeId, Closer>,
    next_order: usize,
}

impl ServiceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a factory for the service `S`
    pub fn register<S>(&mut self, lifetime: ServiceLifetime, make: impl Fn() -> Arc<S> + Send + Sync + 'static)
    where
        S: ?Sized + Send + Sync + 'static,
    {
        let factory: Factory = match lifetime {
            ServiceLifetime::Transient => Arc::new(move || Box::new(make()) as ServiceInstance),
            ServiceLifetime::Singleton => {
                let instance: OnceCell<Arc<S>> = OnceCell::new();
                Arc::new(move || Box::new(Arc::clone(instance.get_or_init(&make))) as ServiceInstance)
            }
        };

        let order = self.next_order();
        self.services
            .entry(service_key::<S>())
            .or_default()
            .push(Registration { order, factory });
    }

    /// Register a behavior applied to every message type with a closer
    pub fn register_open(&mut self, behavior: OpenBehavior) {
        let order = self.next_order();
        self.open.push((order, behavior));
    }

    /// Resolve open behaviors under `service` by closing them with `closer`
    pub fn register_closer(&mut self, service: TypeId, closer: Closer) {
        self.closers.insert(service, closer);
    }

    /// Number of registrations under the service `S`, open behaviors excluded
    pub fn count<S: ?Sized + 'static>(&self) -> usize {
        self.services.get(&service_key::<S>()).map_or(0, Vec::len)
    }

    fn next_order(&mut self) -> usize {
        let order = self.next_order;
        self.next_order += 1;
        order
    }
}

impl HandlerRegistry for ServiceRegistry {
    fn resolve_all(&self, service: TypeId) -> Vec<ServiceInstance> {
        let mut resolved: Vec<(usize, ServiceInstance)> = self
            .services
            .get(&service)
            .map(|registrations| {
                registrations
                    .iter()
                    .map(|registration| (registration.order, (registration.factory)()))
                    .collect()
            })
            .unwrap_or_default();

        if let Some(close) = self.closers.get(&service) {
            resolved.extend(
                self.open
                    .iter()
                    .filter_map(|(order, behavior)| close(behavior).map(|instance| (*order, instance))),
            );
            resolved.sort_by_key(|(order, _)| *order);
        }

        resolved.into_iter().map(|(_, instance)| instance).collect()
    }

    fn resolve_last(&self, service: TypeId) -> Option<ServiceInstance> {
        if self.closers.contains_key(&service) {
            return self.resolve_all(service).pop();
        }
        self.services
            .get(&service)
            .and_then(|registrations| registrations.last())
            .map(|registration| (registration.factory)())
    }
}

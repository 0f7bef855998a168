//! Handler registry - the resolution capability the dispatch core consumes

use std::any::{Any, TypeId};
use std::sync::Arc;

/// A resolved service instance: a boxed `Arc<S>` for the requested service `S`
pub type ServiceInstance = Box<dyn Any + Send>;

/// Key under which instances of the service `S` are registered and resolved
pub fn service_key<S: ?Sized + 'static>() -> TypeId {
    TypeId::of::<Arc<S>>()
}

/// Resolves handler and behavior instances by service type.
///
/// The registry owns instance lifetimes; the dispatch core only asks for
/// instances once per invocation and never caches them.
pub trait HandlerRegistry: Send + Sync {
    /// Every instance registered under `service`, in registration order
    fn resolve_all(&self, service: TypeId) -> Vec<ServiceInstance>;

    /// The instance registered last under `service`
    fn resolve_last(&self, service: TypeId) -> Option<ServiceInstance> {
        self.resolve_all(service).pop()
    }
}

/// Typed resolution on top of [`HandlerRegistry`]
pub trait ResolveExt {
    /// All instances of `S`, in registration order (possibly empty)
    fn services<S: ?Sized + Send + Sync + 'static>(&self) -> Vec<Arc<S>>;

    /// The single instance of `S` a caller depends on (last registration wins)
    fn required_service<S: ?Sized + Send + Sync + 'static>(&self) -> Option<Arc<S>>;
}

impl<T: HandlerRegistry + ?Sized> ResolveExt for T {
    fn services<S: ?Sized + Send + Sync + 'static>(&self) -> Vec<Arc<S>> {
        self.resolve_all(service_key::<S>())
            .into_iter()
            .filter_map(downcast::<S>)
            .collect()
    }

    fn required_service<S: ?Sized + Send + Sync + 'static>(&self) -> Option<Arc<S>> {
        self.resolve_last(service_key::<S>()).and_then(downcast::<S>)
    }
}

fn downcast<S: ?Sized + Send + Sync + 'static>(instance: ServiceInstance) -> Option<Arc<S>> {
    match instance.downcast::<Arc<S>>() {
        Ok(service) => Some(*service),
        Err(_) => {
            tracing::warn!(
                "Registry returned an instance that is not a {}, skipping",
                std::any::type_name::<S>()
            );
            None
        }
    }
}

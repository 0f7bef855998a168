//! Mediator builder - records registrations and wires a mediator from them

use std::any::TypeId;
use std::collections::HashSet;
use std::sync::Arc;

use tracing::{debug, info, warn};

use super::{ServiceLifetime, ServiceRegistry};
use crate::application::dispatch::{DispatchTable, HandlerDescriptor, Mediator};
use crate::application::errors::MediatorResult;
use crate::application::pipeline::open::{close_request, close_stream};
use crate::application::pipeline::{Executors, NotificationPublisher, OpenBehavior};
use crate::domain::entities::{Notification, Request, StreamRequest};
use crate::domain::traits::{
    service_key, NotificationHandler, OpenPipelineBehavior, OpenStreamPipelineBehavior,
    PipelineBehavior, RequestHandler, StreamPipelineBehavior, StreamRequestHandler,
};
use crate::infrastructure::config::MediatorConfig;

/// Builds a [`Mediator`] from handler and behavior registrations.
///
/// Handlers and behaviors are prototypes: the configured
/// [`ServiceLifetime`] decides whether each resolution clones a fresh one or
/// shares a single instance.
pub struct MediatorBuilder {
    config: MediatorConfig,
    registry: ServiceRegistry,
    descriptors: Vec<HandlerDescriptor>,
    handled: HashSet<TypeId>,
    behavior_targets: Vec<(TypeId, &'static str)>,
    publisher: Option<Arc<dyn NotificationPublisher>>,
}

impl MediatorBuilder {
    pub fn new(config: MediatorConfig) -> Self {
        Self {
            config,
            registry: ServiceRegistry::new(),
            descriptors: Vec::new(),
            handled: HashSet::new(),
            behavior_targets: Vec::new(),
            publisher: None,
        }
    }

    fn lifetime(&self) -> ServiceLifetime {
        self.config.service_lifetime
    }

    /// Register the handler of the request type `R`; a later registration
    /// for the same request replaces this one
    pub fn request_handler<R, H>(mut self, handler: H) -> Self
    where
        R: Request,
        H: RequestHandler<R> + Clone + 'static,
    {
        let lifetime = self.lifetime();
        self.registry
            .register::<dyn RequestHandler<R>>(lifetime, move || -> Arc<dyn RequestHandler<R>> {
                Arc::new(handler.clone())
            });
        self.registry
            .register_closer(service_key::<dyn PipelineBehavior<R>>(), close_request::<R>);
        self.descriptors.push(HandlerDescriptor::request::<R>());
        self.handled.insert(TypeId::of::<R>());
        debug!("Registered request handler for {}", std::any::type_name::<R>());
        self
    }

    /// Add a listener of the notification type `N`
    pub fn notification_handler<N, H>(mut self, handler: H) -> Self
    where
        N: Notification,
        H: NotificationHandler<N> + Clone + 'static,
    {
        let lifetime = self.lifetime();
        self.registry
            .register::<dyn NotificationHandler<N>>(lifetime, move || -> Arc<dyn NotificationHandler<N>> {
                Arc::new(handler.clone())
            });
        self.descriptors.push(HandlerDescriptor::notification::<N>());
        debug!("Registered listener for {}", std::any::type_name::<N>());
        self
    }

    /// Register the handler of the stream request type `R`
    pub fn stream_handler<R, H>(mut self, handler: H) -> Self
    where
        R: StreamRequest,
        H: StreamRequestHandler<R> + Clone + 'static,
    {
        let lifetime = self.lifetime();
        self.registry
            .register::<dyn StreamRequestHandler<R>>(lifetime, move || -> Arc<dyn StreamRequestHandler<R>> {
                Arc::new(handler.clone())
            });
        self.registry
            .register_closer(service_key::<dyn StreamPipelineBehavior<R>>(), close_stream::<R>);
        self.descriptors.push(HandlerDescriptor::stream::<R>());
        self.handled.insert(TypeId::of::<R>());
        debug!("Registered stream handler for {}", std::any::type_name::<R>());
        self
    }

    /// Wrap the handler of `R` in `behavior`, inside every behavior
    /// registered before it
    pub fn behavior<R, B>(mut self, behavior: B) -> Self
    where
        R: Request,
        B: PipelineBehavior<R> + Clone + 'static,
    {
        let lifetime = self.lifetime();
        self.registry
            .register::<dyn PipelineBehavior<R>>(lifetime, move || -> Arc<dyn PipelineBehavior<R>> {
                Arc::new(behavior.clone())
            });
        self.behavior_targets
            .push((TypeId::of::<R>(), std::any::type_name::<R>()));
        self
    }

    /// Wrap the stream handler of `R` in `behavior`
    pub fn stream_behavior<R, B>(mut self, behavior: B) -> Self
    where
        R: StreamRequest,
        B: StreamPipelineBehavior<R> + Clone + 'static,
    {
        let lifetime = self.lifetime();
        self.registry
            .register::<dyn StreamPipelineBehavior<R>>(lifetime, move || -> Arc<dyn StreamPipelineBehavior<R>> {
                Arc::new(behavior.clone())
            });
        self.behavior_targets
            .push((TypeId::of::<R>(), std::any::type_name::<R>()));
        self
    }

    /// Apply `behavior` to every request type
    pub fn open_behavior(mut self, behavior: impl OpenPipelineBehavior + 'static) -> Self {
        self.registry
            .register_open(OpenBehavior::Request(Arc::new(behavior)));
        self
    }

    /// Apply `behavior` to every stream request type
    pub fn open_stream_behavior(mut self, behavior: impl OpenStreamPipelineBehavior + 'static) -> Self {
        self.registry
            .register_open(OpenBehavior::Stream(Arc::new(behavior)));
        self
    }

    /// Use `publisher` instead of the configured strategy
    pub fn publisher(mut self, publisher: impl NotificationPublisher + 'static) -> Self {
        self.publisher = Some(Arc::new(publisher));
        self
    }

    /// Build the dispatch table and the executors
    pub fn build(self) -> MediatorResult<Mediator> {
        for (target, name) in &self.behavior_targets {
            if !self.handled.contains(target) {
                warn!("Behavior registered for {} which has no handler", name);
            }
        }

        let table = DispatchTable::build(self.descriptors)?;
        let publisher = match self.publisher {
            Some(publisher) => publisher,
            None => self.config.publisher.publisher(),
        };

        info!(
            "Mediator ready: {} request, {} notification, {} stream routes ({} publisher, {} handlers)",
            table.request_routes(),
            table.notification_routes(),
            table.stream_routes(),
            self.config.publisher,
            self.config.service_lifetime
        );
        Ok(Mediator::new(
            table,
            Executors::new(Arc::new(self.registry), publisher),
        ))
    }
}

impl Default for MediatorBuilder {
    fn default() -> Self {
        Self::new(MediatorConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::errors::MediatorError;
    use crate::application::pipeline::PublisherStrategy;
    use crate::domain::traits::Next;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio_util::sync::CancellationToken;

    #[derive(Debug)]
    struct Add(i32, i32);

    impl Request for Add {
        type Response = i32;
    }

    #[derive(Clone)]
    struct Adder(i32);

    #[async_trait]
    impl RequestHandler<Add> for Adder {
        async fn handle(&self, request: &Add, _token: CancellationToken) -> MediatorResult<i32> {
            Ok(request.0 + request.1 + self.0)
        }
    }

    #[derive(Default)]
    struct Counting {
        clones: Arc<AtomicUsize>,
    }

    impl Clone for Counting {
        fn clone(&self) -> Self {
            self.clones.fetch_add(1, Ordering::SeqCst);
            Self {
                clones: self.clones.clone(),
            }
        }
    }

    #[async_trait]
    impl RequestHandler<Add> for Counting {
        async fn handle(&self, request: &Add, _token: CancellationToken) -> MediatorResult<i32> {
            Ok(request.0 + request.1)
        }
    }

    #[derive(Clone)]
    struct Negate;

    #[async_trait]
    impl PipelineBehavior<Add> for Negate {
        async fn handle(
            &self,
            _request: &Add,
            next: Next<'_, Add>,
            token: CancellationToken,
        ) -> MediatorResult<i32> {
            Ok(-next.run(token).await?)
        }
    }

    #[test]
    fn test_empty_builder_fails() {
        let err = MediatorBuilder::default().build().err().unwrap();
        assert!(matches!(err, MediatorError::Config(_)));
    }

    #[tokio::test]
    async fn test_last_request_handler_wins() {
        let mediator = MediatorBuilder::default()
            .request_handler::<Add, _>(Adder(0))
            .request_handler::<Add, _>(Adder(100))
            .build()
            .unwrap();

        let sum = mediator.send(Add(1, 2), CancellationToken::new()).await.unwrap();

        assert_eq!(sum, 103);
        assert_eq!(mediator.table().request_routes(), 1);
    }

    #[tokio::test]
    async fn test_behavior_wraps_handler() {
        let mediator = MediatorBuilder::default()
            .request_handler::<Add, _>(Adder(0))
            .behavior::<Add, _>(Negate)
            .build()
            .unwrap();

        let sum = mediator.send(Add(1, 2), CancellationToken::new()).await.unwrap();

        assert_eq!(sum, -3);
    }

    async fn clones_after_three_sends(service_lifetime: ServiceLifetime) -> usize {
        let config = MediatorConfig {
            publisher: PublisherStrategy::Concurrent,
            service_lifetime,
        };
        let handler = Counting::default();
        let clones = handler.clones.clone();
        let mediator = MediatorBuilder::new(config)
            .request_handler::<Add, _>(handler)
            .build()
            .unwrap();

        for _ in 0..3 {
            assert_eq!(mediator.send(Add(2, 2), CancellationToken::new()).await.unwrap(), 4);
        }
        clones.load(Ordering::SeqCst)
    }

    #[tokio::test]
    async fn test_transient_handler_is_cloned_per_send() {
        assert_eq!(clones_after_three_sends(ServiceLifetime::Transient).await, 3);
    }

    #[tokio::test]
    async fn test_singleton_handler_is_created_once() {
        assert_eq!(clones_after_three_sends(ServiceLifetime::Singleton).await, 1);
    }
}

//! Mediator - the front door for requests, notifications and streams

use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use super::table::DispatchTable;
use crate::application::errors::{check_cancelled, HandlerKind, MediatorError, MediatorResult};
use crate::application::pipeline::Executors;
use crate::domain::entities::{
    BoxedNotification, BoxedRequest, BoxedStreamRequest, Notification, Request, StreamRequest,
};
use crate::domain::traits::ItemStream;

/// Routes messages to their pipelines.
///
/// Cheap to clone; every clone shares the same dispatch table and executors.
#[derive(Clone)]
pub struct Mediator {
    table: Arc<DispatchTable>,
    executors: Arc<Executors>,
}

impl Mediator {
    pub fn new(table: DispatchTable, executors: Executors) -> Self {
        Self {
            table: Arc::new(table),
            executors: Arc::new(executors),
        }
    }

    /// Send a request to its single handler and return the response
    pub async fn send<R: Request>(&self, request: R, token: CancellationToken) -> MediatorResult<R::Response> {
        let request: BoxedRequest<R::Response> = Box::new(request);
        self.send_dyn(Some(request), token).await
    }

    /// Send a request whose concrete type is only known at runtime.
    ///
    /// `None` is rejected before any lookup. The handler is looked up by the
    /// request's runtime type together with the response type `T`.
    pub async fn send_dyn<T: Send + 'static>(
        &self,
        request: Option<BoxedRequest<T>>,
        token: CancellationToken,
    ) -> MediatorResult<T> {
        let request = request.ok_or_else(|| MediatorError::Validation("request must not be absent".to_string()))?;
        check_cancelled(&token)?;

        let message_name = (*request).message_name();
        let invoke = self
            .table
            .request::<T>((*request).message_type())
            .ok_or_else(|| MediatorError::not_found::<T>(HandlerKind::Request, message_name))?;

        debug!("Sending {}", message_name);
        invoke(&self.executors, request.into_any(), token).await
    }

    /// Publish a notification to all of its listeners
    pub async fn publish<N: Notification>(&self, notification: N, token: CancellationToken) -> MediatorResult<()> {
        let notification: BoxedNotification = Box::new(notification);
        self.publish_dyn(Some(notification), token).await
    }

    /// Publish a notification whose concrete type is only known at runtime.
    ///
    /// A notification type nobody listens to completes successfully.
    pub async fn publish_dyn(
        &self,
        notification: Option<BoxedNotification>,
        token: CancellationToken,
    ) -> MediatorResult<()> {
        let notification = notification
            .ok_or_else(|| MediatorError::Validation("notification must not be absent".to_string()))?;
        check_cancelled(&token)?;

        let message_name = (*notification).message_name();
        match self.table.notification((*notification).message_type()) {
            Some(invoke) => {
                debug!("Publishing {}", message_name);
                invoke(&self.executors, notification.into_any(), token).await
            }
            None => {
                debug!("No listeners registered for {}", message_name);
                Ok(())
            }
        }
    }

    /// Open the lazy item stream of a stream request
    pub fn create_stream<R: StreamRequest>(
        &self,
        request: R,
        token: CancellationToken,
    ) -> MediatorResult<ItemStream<R::Item>> {
        let request: BoxedStreamRequest<R::Item> = Box::new(request);
        self.create_stream_dyn(Some(request), token)
    }

    /// Open the item stream of a stream request whose concrete type is only
    /// known at runtime
    pub fn create_stream_dyn<T: Send + 'static>(
        &self,
        request: Option<BoxedStreamRequest<T>>,
        token: CancellationToken,
    ) -> MediatorResult<ItemStream<T>> {
        let request =
            request.ok_or_else(|| MediatorError::Validation("stream request must not be absent".to_string()))?;

        let message_name = (*request).message_name();
        let invoke = self
            .table
            .stream::<T>((*request).message_type())
            .ok_or_else(|| MediatorError::not_found::<T>(HandlerKind::Stream, message_name))?;

        debug!("Opening stream for {}", message_name);
        invoke(&self.executors, request.into_any(), token)
    }

    /// The routing table this mediator dispatches through
    pub fn table(&self) -> &DispatchTable {
        &self.table
    }
}

/// Publish-only access to a mediator
#[async_trait]
pub trait Publisher: Send + Sync {
    async fn publish_dyn(
        &self,
        notification: Option<BoxedNotification>,
        token: CancellationToken,
    ) -> MediatorResult<()>;
}

#[async_trait]
impl Publisher for Mediator {
    async fn publish_dyn(
        &self,
        notification: Option<BoxedNotification>,
        token: CancellationToken,
    ) -> MediatorResult<()> {
        Mediator::publish_dyn(self, notification, token).await
    }
}

impl dyn Publisher {
    /// Publish a statically-typed notification
    pub async fn publish<N: Notification>(&self, notification: N, token: CancellationToken) -> MediatorResult<()> {
        let notification: BoxedNotification = Box::new(notification);
        self.publish_dyn(Some(notification), token).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::dispatch::table::HandlerDescriptor;
    use crate::application::pipeline::SequentialPublisher;
    use crate::domain::traits::{NotificationHandler, RequestHandler, SyncNotificationHandler};
    use crate::infrastructure::registry::{ServiceLifetime, ServiceRegistry};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    #[derive(Debug)]
    struct Echo(String);

    impl Request for Echo {
        type Response = String;
    }

    #[derive(Debug)]
    struct Unrouted;

    impl Request for Unrouted {
        type Response = u8;
    }

    #[derive(Debug)]
    struct Said(String);

    impl Notification for Said {}

    #[derive(Debug)]
    struct Ignored;

    impl Notification for Ignored {}

    #[derive(Clone, Default)]
    struct EchoHandler {
        calls: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl RequestHandler<Echo> for EchoHandler {
        async fn handle(&self, request: &Echo, _token: CancellationToken) -> MediatorResult<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(request.0.clone())
        }
    }

    #[derive(Clone, Default)]
    struct Transcript(Arc<Mutex<Vec<String>>>);

    impl SyncNotificationHandler<Said> for Transcript {
        fn handle_sync(&self, notification: &Said) -> MediatorResult<()> {
            self.0.lock().unwrap().push(notification.0.clone());
            Ok(())
        }
    }

    fn mediator(echo: EchoHandler, transcript: Transcript) -> Mediator {
        let mut registry = ServiceRegistry::new();
        registry.register::<dyn RequestHandler<Echo>>(ServiceLifetime::Transient, move || {
            Arc::new(echo.clone())
        });
        registry.register::<dyn NotificationHandler<Said>>(ServiceLifetime::Transient, move || {
            Arc::new(transcript.clone())
        });
        let table = DispatchTable::build(vec![
            HandlerDescriptor::request::<Echo>(),
            HandlerDescriptor::notification::<Said>(),
        ])
        .unwrap();
        Mediator::new(table, Executors::new(Arc::new(registry), Arc::new(SequentialPublisher)))
    }

    #[tokio::test]
    async fn test_send_routes_by_runtime_type() {
        let mediator = mediator(EchoHandler::default(), Transcript::default());

        let typed = mediator.send(Echo("x".into()), CancellationToken::new()).await.unwrap();
        let boxed: BoxedRequest<String> = Box::new(Echo("y".into()));
        let dynamic = mediator.send_dyn(Some(boxed), CancellationToken::new()).await.unwrap();

        assert_eq!(typed, "x");
        assert_eq!(dynamic, "y");
    }

    #[tokio::test]
    async fn test_absent_request_fails_before_resolution() {
        let echo = EchoHandler::default();
        let mediator = mediator(echo.clone(), Transcript::default());

        let err = mediator
            .send_dyn::<String>(None, CancellationToken::new())
            .await
            .unwrap_err();

        assert!(matches!(err, MediatorError::Validation(_)));
        assert_eq!(echo.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_unrouted_request_names_both_types() {
        let mediator = mediator(EchoHandler::default(), Transcript::default());

        let err = mediator.send(Unrouted, CancellationToken::new()).await.unwrap_err();

        let text = err.to_string();
        assert!(text.contains("Unrouted"), "{}", text);
        assert!(text.contains("u8"), "{}", text);
    }

    #[tokio::test]
    async fn test_cancelled_token_fails_fast() {
        let echo = EchoHandler::default();
        let mediator = mediator(echo.clone(), Transcript::default());
        let token = CancellationToken::new();
        token.cancel();

        let err = mediator.send(Echo("x".into()), token.clone()).await.unwrap_err();
        assert!(err.is_cancelled());
        assert_eq!(echo.calls.load(Ordering::SeqCst), 0);

        let err = mediator.publish(Said("x".into()), token).await.unwrap_err();
        assert!(err.is_cancelled());
    }

    #[tokio::test]
    async fn test_publish_reaches_listener_and_ignores_unrouted() {
        let transcript = Transcript::default();
        let mediator = mediator(EchoHandler::default(), transcript.clone());

        mediator.publish(Said("hi".into()), CancellationToken::new()).await.unwrap();
        mediator.publish(Ignored, CancellationToken::new()).await.unwrap();

        assert_eq!(*transcript.0.lock().unwrap(), vec!["hi"]);
    }

    #[tokio::test]
    async fn test_publisher_capability() {
        let transcript = Transcript::default();
        let publisher: Arc<dyn Publisher> = Arc::new(mediator(EchoHandler::default(), transcript.clone()));

        publisher.publish(Said("via capability".into()), CancellationToken::new()).await.unwrap();
        let err = publisher.publish_dyn(None, CancellationToken::new()).await.unwrap_err();

        assert!(matches!(err, MediatorError::Validation(_)));
        assert_eq!(*transcript.0.lock().unwrap(), vec!["via capability"]);
    }

    #[tokio::test]
    async fn test_stateless_handler_is_idempotent() {
        let mediator = mediator(EchoHandler::default(), Transcript::default());

        let first = mediator.send(Echo("same".into()), CancellationToken::new()).await.unwrap();
        let second = mediator.send(Echo("same".into()), CancellationToken::new()).await.unwrap();

        assert_eq!(first, second);
    }
}

//! Dispatch table - maps runtime message types to monomorphized invokers

use std::any::{Any, TypeId};
use std::collections::HashMap;

use futures::future::BoxFuture;
use futures::FutureExt;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::application::errors::{MediatorError, MediatorResult};
use crate::application::pipeline::Executors;
use crate::domain::entities::{AnyMessage, Message, Notification, Request, StreamRequest};
use crate::domain::traits::ItemStream;

/// Runs a boxed request whose response type is `T`
pub type RequestInvoker<T> =
    for<'a> fn(&'a Executors, AnyMessage, CancellationToken) -> BoxFuture<'a, MediatorResult<T>>;

/// Runs a boxed notification
pub type NotificationInvoker =
    for<'a> fn(&'a Executors, AnyMessage, CancellationToken) -> BoxFuture<'a, MediatorResult<()>>;

/// Opens the stream of a boxed stream request whose item type is `T`
pub type StreamInvoker<T> = fn(&Executors, AnyMessage, CancellationToken) -> MediatorResult<ItemStream<T>>;

fn unbox<M: Message>(message: AnyMessage) -> MediatorResult<M> {
    message.downcast::<M>().map(|message| *message).map_err(|_| {
        MediatorError::Config(format!(
            "dispatch entry for {} received a message of another type",
            std::any::type_name::<M>()
        ))
    })
}

fn invoke_request<R: Request>(
    executors: &Executors,
    message: AnyMessage,
    token: CancellationToken,
) -> BoxFuture<'_, MediatorResult<R::Response>> {
    async move {
        let request = unbox::<R>(message)?;
        executors.request.execute(request, token).await
    }
    .boxed()
}

fn invoke_notification<N: Notification>(
    executors: &Executors,
    message: AnyMessage,
    token: CancellationToken,
) -> BoxFuture<'_, MediatorResult<()>> {
    async move {
        let notification = unbox::<N>(message)?;
        executors.notification.execute(notification, token).await
    }
    .boxed()
}

fn invoke_stream<R: StreamRequest>(
    executors: &Executors,
    message: AnyMessage,
    token: CancellationToken,
) -> MediatorResult<ItemStream<R::Item>> {
    let request = unbox::<R>(message)?;
    executors.stream.execute(request, token)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum Route {
    Request { message: TypeId, response: TypeId },
    Notification(TypeId),
    Stream { message: TypeId, item: TypeId },
}

/// One registered handler, reduced to its routing key and invoker
pub struct HandlerDescriptor {
    route: Route,
    message_name: &'static str,
    invoker: Box<dyn Any + Send + Sync>,
}

impl HandlerDescriptor {
    /// Descriptor of a handler for the request type `R`
    pub fn request<R: Request>() -> Self {
        let invoker: RequestInvoker<R::Response> = invoke_request::<R>;
        Self {
            route: Route::Request {
                message: TypeId::of::<R>(),
                response: TypeId::of::<R::Response>(),
            },
            message_name: std::any::type_name::<R>(),
            invoker: Box::new(invoker),
        }
    }

    /// Descriptor of one listener of the notification type `N`
    pub fn notification<N: Notification>() -> Self {
        let invoker: NotificationInvoker = invoke_notification::<N>;
        Self {
            route: Route::Notification(TypeId::of::<N>()),
            message_name: std::any::type_name::<N>(),
            invoker: Box::new(invoker),
        }
    }

    /// Descriptor of a handler for the stream request type `R`
    pub fn stream<R: StreamRequest>() -> Self {
        let invoker: StreamInvoker<R::Item> = invoke_stream::<R>;
        Self {
            route: Route::Stream {
                message: TypeId::of::<R>(),
                item: TypeId::of::<R::Item>(),
            },
            message_name: std::any::type_name::<R>(),
            invoker: Box::new(invoker),
        }
    }

    pub fn message_name(&self) -> &'static str {
        self.message_name
    }
}

struct NotificationRoute {
    invoker: NotificationInvoker,
    listeners: usize,
}

/// Immutable routing table built once from the registered handlers
pub struct DispatchTable {
    requests: HashMap<(TypeId, TypeId), Box<dyn Any + Send + Sync>>,
    notifications: HashMap<TypeId, NotificationRoute>,
    streams: HashMap<(TypeId, TypeId), Box<dyn Any + Send + Sync>>,
}

impl DispatchTable {
    /// Build the table from every registered handler descriptor.
    ///
    /// A later request or stream descriptor for the same key replaces the
    /// earlier one. Notification descriptors accumulate per type.
    pub fn build(descriptors: impl IntoIterator<Item = HandlerDescriptor>) -> MediatorResult<Self> {
        let mut table = Self {
            requests: HashMap::new(),
            notifications: HashMap::new(),
            streams: HashMap::new(),
        };
        let mut total = 0;

        for descriptor in descriptors {
            total += 1;
            match descriptor.route {
                Route::Request { message, response } => {
                    if table.requests.insert((message, response), descriptor.invoker).is_some() {
                        debug!("Replacing request handler for {}", descriptor.message_name);
                    }
                }
                Route::Stream { message, item } => {
                    if table.streams.insert((message, item), descriptor.invoker).is_some() {
                        debug!("Replacing stream handler for {}", descriptor.message_name);
                    }
                }
                Route::Notification(message) => {
                    let invoker = descriptor
                        .invoker
                        .downcast_ref::<NotificationInvoker>()
                        .copied()
                        .ok_or_else(|| {
                            MediatorError::Config(format!(
                                "malformed notification descriptor for {}",
                                descriptor.message_name
                            ))
                        })?;
                    table
                        .notifications
                        .entry(message)
                        .or_insert(NotificationRoute { invoker, listeners: 0 })
                        .listeners += 1;
                }
            }
        }

        if total == 0 {
            return Err(MediatorError::Config(
                "nothing to dispatch: no handlers were registered".to_string(),
            ));
        }

        debug!(
            "Dispatch table built: {} request routes, {} notification routes, {} stream routes",
            table.requests.len(),
            table.notifications.len(),
            table.streams.len()
        );
        Ok(table)
    }

    /// Invoker for the request type `message` answering with `T`
    pub fn request<T: 'static>(&self, message: TypeId) -> Option<RequestInvoker<T>> {
        self.requests
            .get(&(message, TypeId::of::<T>()))
            .and_then(|invoker| invoker.downcast_ref::<RequestInvoker<T>>())
            .copied()
    }

    /// Invoker for the notification type `message`
    pub fn notification(&self, message: TypeId) -> Option<NotificationInvoker> {
        self.notifications.get(&message).map(|route| route.invoker)
    }

    /// Invoker for the stream request type `message` yielding `T`
    pub fn stream<T: 'static>(&self, message: TypeId) -> Option<StreamInvoker<T>> {
        self.streams
            .get(&(message, TypeId::of::<T>()))
            .and_then(|invoker| invoker.downcast_ref::<StreamInvoker<T>>())
            .copied()
    }

    pub fn request_routes(&self) -> usize {
        self.requests.len()
    }

    pub fn notification_routes(&self) -> usize {
        self.notifications.len()
    }

    pub fn stream_routes(&self) -> usize {
        self.streams.len()
    }

    /// Number of listeners registered for the notification type `message`
    pub fn listener_count(&self, message: TypeId) -> usize {
        self.notifications
            .get(&message)
            .map(|route| route.listeners)
            .unwrap_or(0)
    }
}

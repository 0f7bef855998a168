//! cqbus - in-process mediator
//!
//! Requests go to exactly one handler, notifications fan out to every
//! listener and stream requests produce lazy item streams. Each kind runs
//! through an ordered chain of behaviors before reaching its handler.

pub mod application;
pub mod domain;
pub mod infrastructure;

pub use application::dispatch::{DispatchTable, HandlerDescriptor, Mediator, Publisher};
pub use application::errors::{check_cancelled, BoxError, ConfigError, HandlerKind, MediatorError, MediatorResult};
pub use application::pipeline::{
    ConcurrentPublisher, Delivery, NotificationPublisher, PublisherStrategy, SequentialPublisher,
};
pub use domain::entities::{
    AnyMessage, BoxedNotification, BoxedRequest, BoxedStreamRequest, Message, Notification,
    Request, StreamRequest, Unit,
};
pub use domain::traits::{
    AnyItem, AnyResponse, ErasedNext, ErasedStreamNext, HandlerRegistry, ItemStream, Next,
    NotificationHandler, OpenPipelineBehavior, OpenStreamPipelineBehavior, PipelineBehavior,
    RequestHandler, ResolveExt, StreamNext, StreamPipelineBehavior, StreamRequestHandler,
    SyncNotificationHandler,
};
pub use infrastructure::config::MediatorConfig;
pub use infrastructure::registry::{MediatorBuilder, ServiceLifetime, ServiceRegistry};

//! Pipelines - Run messages through their behaviors to their handlers
//!
//! One executor per message shape. Executors resolve handlers and behaviors
//! from the registry on every call and never cache them.

pub mod notification;
pub mod open;
pub mod publisher;
pub mod request;
pub mod stream;

use std::sync::Arc;

pub use notification::NotificationExecutor;
pub use open::{OpenBehavior, OpenBehaviorAdapter, OpenStreamBehaviorAdapter};
pub use publisher::{
    ConcurrentPublisher, Delivery, NotificationPublisher, PublisherStrategy, SequentialPublisher,
};
pub use request::RequestExecutor;
pub use stream::{CancellableStream, StreamExecutor};

use crate::domain::traits::HandlerRegistry;

/// The three executors sharing one registry
pub struct Executors {
    pub request: RequestExecutor,
    pub notification: NotificationExecutor,
    pub stream: StreamExecutor,
}

impl Executors {
    pub fn new(registry: Arc<dyn HandlerRegistry>, publisher: Arc<dyn NotificationPublisher>) -> Self {
        Self {
            request: RequestExecutor::new(registry.clone()),
            notification: NotificationExecutor::new(registry.clone(), publisher),
            stream: StreamExecutor::new(registry),
        }
    }
}

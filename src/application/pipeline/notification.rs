//! Notification fan-out - hands every listener's delivery to the publisher

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::debug;

use super::publisher::{Delivery, NotificationPublisher};
use crate::application::errors::MediatorResult;
use crate::domain::entities::Notification;
use crate::domain::traits::{HandlerRegistry, NotificationHandler, ResolveExt};

/// Executes notifications
pub struct NotificationExecutor {
    registry: Arc<dyn HandlerRegistry>,
    publisher: Arc<dyn NotificationPublisher>,
}

impl NotificationExecutor {
    pub fn new(registry: Arc<dyn HandlerRegistry>, publisher: Arc<dyn NotificationPublisher>) -> Self {
        Self { registry, publisher }
    }

    /// Deliver `notification` to every listener registered for it.
    ///
    /// Listeners are resolved in registration order; how their deliveries run
    /// is up to the publisher.
    pub async fn execute<N: Notification>(
        &self,
        notification: N,
        token: CancellationToken,
    ) -> MediatorResult<()> {
        let handlers = self.registry.services::<dyn NotificationHandler<N>>();
        if handlers.is_empty() {
            debug!("No listeners for {}", std::any::type_name::<N>());
            return Ok(());
        }

        debug!(
            "Publishing {} to {} listeners",
            std::any::type_name::<N>(),
            handlers.len()
        );
        let deliveries: Vec<Delivery<'_>> = handlers
            .iter()
            .map(|handler| handler.handle(&notification, token.clone()))
            .collect();

        self.publisher.publish(deliveries).await
    }
}

use std::sync::Arc;

use async_trait::async_trait;
use futures::stream::BoxStream;
use tokio_util::sync::CancellationToken;

use crate::application::errors::MediatorResult;
use crate::domain::entities::{Notification, Request, StreamRequest};

/// Lazy, single-pass sequence produced by stream handlers and behaviors
pub type ItemStream<T> = BoxStream<'static, MediatorResult<T>>;

/// Terminal handler of a request
#[async_trait]
pub trait RequestHandler<R: Request>: Send + Sync {
    async fn handle(&self, request: &R, token: CancellationToken) -> MediatorResult<R::Response>;
}

/// Listener of a notification
#[async_trait]
pub trait NotificationHandler<N: Notification>: Send + Sync {
    async fn handle(&self, notification: &N, token: CancellationToken) -> MediatorResult<()>;
}

/// Listener that finishes its work without suspending.
///
/// Every implementor is a [`NotificationHandler`]; the token is not forwarded
/// because there is no suspension point at which to observe it.
pub trait SyncNotificationHandler<N: Notification>: Send + Sync {
    fn handle_sync(&self, notification: &N) -> MediatorResult<()>;
}

#[async_trait]
impl<N, H> NotificationHandler<N> for H
where
    N: Notification,
    H: SyncNotificationHandler<N>,
{
    async fn handle(&self, notification: &N, _token: CancellationToken) -> MediatorResult<()> {
        self.handle_sync(notification)
    }
}

/// Terminal handler of a stream request.
///
/// The returned stream must be lazy: no item may be computed before the
/// consumer polls for it.
pub trait StreamRequestHandler<R: StreamRequest>: Send + Sync {
    fn handle(&self, request: Arc<R>, token: CancellationToken) -> ItemStream<R::Item>;
}

//! Stream pipeline - lazily relays a stream request through its behaviors

use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use futures::future::BoxFuture;
use futures::{Future, FutureExt, Stream, StreamExt};
use tokio_util::sync::CancellationToken;
use tracing::trace;

use crate::application::errors::{HandlerKind, MediatorError, MediatorResult};
use crate::domain::entities::StreamRequest;
use crate::domain::traits::{
    HandlerRegistry, ItemStream, ResolveExt, StreamNext, StreamPipelineBehavior,
    StreamRequestHandler,
};

/// Executes stream requests
pub struct StreamExecutor {
    registry: Arc<dyn HandlerRegistry>,
}

impl StreamExecutor {
    pub fn new(registry: Arc<dyn HandlerRegistry>) -> Self {
        Self { registry }
    }

    /// Build the behavior chain for `request` and return its outermost stream.
    ///
    /// Nothing is pulled from the handler until the returned stream is polled.
    /// Once `token` is cancelled the next poll yields
    /// [`MediatorError::Cancelled`] and the stream ends.
    pub fn execute<R: StreamRequest>(
        &self,
        request: R,
        token: CancellationToken,
    ) -> MediatorResult<ItemStream<R::Item>> {
        let behaviors = self.registry.services::<dyn StreamPipelineBehavior<R>>();
        let handler = self
            .registry
            .required_service::<dyn StreamRequestHandler<R>>()
            .ok_or_else(|| {
                MediatorError::not_found::<R::Item>(HandlerKind::Stream, std::any::type_name::<R>())
            })?;

        let request = Arc::new(request);
        let stream = if behaviors.is_empty() {
            handler.handle(request, token.clone())
        } else {
            trace!(
                "Streaming {} through {} behaviors",
                std::any::type_name::<R>(),
                behaviors.len()
            );
            StreamNext::new(request, behaviors.into(), handler).run(token.clone())
        };

        Ok(CancellableStream::new(stream, token).boxed())
    }
}

/// Ends a stream at the first poll after its token is cancelled.
///
/// The inner stream is dropped as soon as it is exhausted, fails with a
/// cancellation, or the token fires, releasing every stage of the chain.
pub struct CancellableStream<T> {
    inner: Option<ItemStream<T>>,
    cancelled: BoxFuture<'static, ()>,
}

impl<T> CancellableStream<T> {
    pub fn new(inner: ItemStream<T>, token: CancellationToken) -> Self {
        Self {
            inner: Some(inner),
            cancelled: token.cancelled_owned().boxed(),
        }
    }
}

impl<T> Stream for CancellableStream<T> {
    type Item = MediatorResult<T>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        let Some(inner) = this.inner.as_mut() else {
            return Poll::Ready(None);
        };

        if this.cancelled.as_mut().poll(cx).is_ready() {
            this.inner = None;
            return Poll::Ready(Some(Err(MediatorError::Cancelled)));
        }

        match inner.as_mut().poll_next(cx) {
            Poll::Ready(None) => {
                this.inner = None;
                Poll::Ready(None)
            }
            Poll::Ready(Some(Err(error))) if error.is_cancelled() => {
                this.inner = None;
                Poll::Ready(Some(Err(error)))
            }
            poll => poll,
        }
    }
}

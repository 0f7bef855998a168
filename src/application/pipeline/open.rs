//! Open behaviors - close type-erased behaviors over concrete message types

use std::marker::PhantomData;
use std::sync::Arc;

use async_trait::async_trait;
use futures::{FutureExt, StreamExt, TryFutureExt, TryStreamExt};
use tokio_util::sync::CancellationToken;

use crate::application::errors::{MediatorError, MediatorResult};
use crate::domain::entities::{Message, Request, StreamRequest};
use crate::domain::traits::{
    AnyItem, AnyResponse, ErasedNext, ErasedStreamNext, ItemStream, Next, OpenPipelineBehavior,
    OpenStreamPipelineBehavior, PipelineBehavior, ServiceInstance, StreamNext,
    StreamPipelineBehavior,
};

/// An open behavior as registered, before it is closed over a message type
#[derive(Clone)]
pub enum OpenBehavior {
    Request(Arc<dyn OpenPipelineBehavior>),
    Stream(Arc<dyn OpenStreamPipelineBehavior>),
}

/// Closes an open request behavior over the request type `R`
pub struct OpenBehaviorAdapter<R> {
    inner: Arc<dyn OpenPipelineBehavior>,
    _request: PhantomData<fn() -> R>,
}

impl<R> OpenBehaviorAdapter<R> {
    pub fn new(inner: Arc<dyn OpenPipelineBehavior>) -> Self {
        Self {
            inner,
            _request: PhantomData,
        }
    }
}

#[async_trait]
impl<R: Request> PipelineBehavior<R> for OpenBehaviorAdapter<R> {
    async fn handle(
        &self,
        request: &R,
        next: Next<'_, R>,
        token: CancellationToken,
    ) -> MediatorResult<R::Response> {
        let erased = ErasedNext::new(move |token| {
            next.run(token)
                .map_ok(|response| Box::new(response) as AnyResponse)
                .boxed()
        });

        let response = self.inner.handle(request, erased, token).await?;
        response
            .downcast::<R::Response>()
            .map(|response| *response)
            .map_err(|_| mistyped::<R::Response>(std::any::type_name::<R>()))
    }
}

/// Closes an open stream behavior over the stream request type `R`
pub struct OpenStreamBehaviorAdapter<R> {
    inner: Arc<dyn OpenStreamPipelineBehavior>,
    _request: PhantomData<fn() -> R>,
}

impl<R> OpenStreamBehaviorAdapter<R> {
    pub fn new(inner: Arc<dyn OpenStreamPipelineBehavior>) -> Self {
        Self {
            inner,
            _request: PhantomData,
        }
    }
}

impl<R: StreamRequest> StreamPipelineBehavior<R> for OpenStreamBehaviorAdapter<R> {
    fn handle(
        &self,
        request: Arc<R>,
        next: StreamNext<R>,
        token: CancellationToken,
    ) -> ItemStream<R::Item> {
        let erased = ErasedStreamNext::new(move |token| {
            next.clone()
                .run(token)
                .map_ok(|item| Box::new(item) as AnyItem)
                .boxed()
        });

        let request: Arc<dyn Message> = request;
        self.inner
            .handle(request, erased, token)
            .map(|item| {
                item.and_then(|item| {
                    item.downcast::<R::Item>()
                        .map(|item| *item)
                        .map_err(|_| mistyped::<R::Item>(std::any::type_name::<R>()))
                })
            })
            .boxed()
    }
}

fn mistyped<T>(message_type: &'static str) -> MediatorError {
    MediatorError::Config(format!(
        "open behavior returned a value that is not a {} for {}",
        std::any::type_name::<T>(),
        message_type
    ))
}

/// Close `behavior` over the request type `R`, as a `dyn PipelineBehavior<R>` instance
pub(crate) fn close_request<R: Request>(behavior: &OpenBehavior) -> Option<ServiceInstance> {
    match behavior {
        OpenBehavior::Request(inner) => {
            let closed: Arc<dyn PipelineBehavior<R>> =
                Arc::new(OpenBehaviorAdapter::<R>::new(Arc::clone(inner)));
            Some(Box::new(closed))
        }
        OpenBehavior::Stream(_) => None,
    }
}

/// Close `behavior` over the stream request type `R`, as a
/// `dyn StreamPipelineBehavior<R>` instance
pub(crate) fn close_stream<R: StreamRequest>(behavior: &OpenBehavior) -> Option<ServiceInstance> {
    match behavior {
        OpenBehavior::Stream(inner) => {
            let closed: Arc<dyn StreamPipelineBehavior<R>> =
                Arc::new(OpenStreamBehaviorAdapter::<R>::new(Arc::clone(inner)));
            Some(Box::new(closed))
        }
        OpenBehavior::Request(_) => None,
    }
}

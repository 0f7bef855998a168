//! Pipeline behaviors and the continuations they receive

use std::any::Any;
use std::sync::Arc;

use async_trait::async_trait;
use futures::future::BoxFuture;
use tokio_util::sync::CancellationToken;

use super::handler::{ItemStream, RequestHandler, StreamRequestHandler};
use crate::application::errors::MediatorResult;
use crate::domain::entities::{Message, Request, StreamRequest};

/// Response of a request with its type erased
pub type AnyResponse = Box<dyn Any + Send>;

/// Stream item with its type erased
pub type AnyItem = Box<dyn Any + Send>;

/// Cross-cutting step wrapped around a request handler
#[async_trait]
pub trait PipelineBehavior<R: Request>: Send + Sync {
    /// Run this step. Calling `next.run` continues the chain; returning
    /// without calling it short-circuits every inner behavior and the handler.
    async fn handle(
        &self,
        request: &R,
        next: Next<'_, R>,
        token: CancellationToken,
    ) -> MediatorResult<R::Response>;
}

/// Continuation of a request pipeline.
///
/// Holds the behaviors that have not run yet and the terminal handler.
/// It is `Copy`, so a behavior may run the rest of the chain more than once.
pub struct Next<'a, R: Request> {
    request: &'a R,
    behaviors: &'a [Arc<dyn PipelineBehavior<R>>],
    handler: &'a dyn RequestHandler<R>,
}

impl<R: Request> Clone for Next<'_, R> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<R: Request> Copy for Next<'_, R> {}

impl<'a, R: Request> Next<'a, R> {
    pub(crate) fn new(
        request: &'a R,
        behaviors: &'a [Arc<dyn PipelineBehavior<R>>],
        handler: &'a dyn RequestHandler<R>,
    ) -> Self {
        Self {
            request,
            behaviors,
            handler,
        }
    }

    /// Invoke the next behavior, or the handler once every behavior has run
    pub fn run(self, token: CancellationToken) -> BoxFuture<'a, MediatorResult<R::Response>> {
        match self.behaviors.split_first() {
            Some((current, rest)) => current.handle(
                self.request,
                Next {
                    behaviors: rest,
                    ..self
                },
                token,
            ),
            None => self.handler.handle(self.request, token),
        }
    }

    /// Number of behaviors still ahead of the handler
    pub fn remaining(&self) -> usize {
        self.behaviors.len()
    }
}

/// Cross-cutting step wrapped around a stream handler
pub trait StreamPipelineBehavior<R: StreamRequest>: Send + Sync {
    /// Produce the sequence seen by the outer stage. Relaying `next.run`
    /// continues the chain; returning another stream short-circuits it.
    fn handle(
        &self,
        request: Arc<R>,
        next: StreamNext<R>,
        token: CancellationToken,
    ) -> ItemStream<R::Item>;
}

/// Continuation of a stream pipeline
pub struct StreamNext<R: StreamRequest> {
    request: Arc<R>,
    behaviors: Arc<[Arc<dyn StreamPipelineBehavior<R>>]>,
    index: usize,
    handler: Arc<dyn StreamRequestHandler<R>>,
}

impl<R: StreamRequest> Clone for StreamNext<R> {
    fn clone(&self) -> Self {
        Self {
            request: Arc::clone(&self.request),
            behaviors: Arc::clone(&self.behaviors),
            index: self.index,
            handler: Arc::clone(&self.handler),
        }
    }
}

impl<R: StreamRequest> StreamNext<R> {
    pub(crate) fn new(
        request: Arc<R>,
        behaviors: Arc<[Arc<dyn StreamPipelineBehavior<R>>]>,
        handler: Arc<dyn StreamRequestHandler<R>>,
    ) -> Self {
        Self {
            request,
            behaviors,
            index: 0,
            handler,
        }
    }

    /// Sequence of the next behavior, or of the handler once every behavior
    /// has been applied
    pub fn run(self, token: CancellationToken) -> ItemStream<R::Item> {
        match self.behaviors.get(self.index).cloned() {
            Some(current) => {
                let request = Arc::clone(&self.request);
                let next = StreamNext {
                    index: self.index + 1,
                    ..self
                };
                current.handle(request, next, token)
            }
            None => self.handler.handle(self.request, token),
        }
    }
}

/// Type-erased continuation handed to open request behaviors
#[derive(Clone)]
pub struct ErasedNext<'a> {
    run: Arc<dyn Fn(CancellationToken) -> BoxFuture<'a, MediatorResult<AnyResponse>> + Send + Sync + 'a>,
}

impl<'a> ErasedNext<'a> {
    pub fn new<F>(run: F) -> Self
    where
        F: Fn(CancellationToken) -> BoxFuture<'a, MediatorResult<AnyResponse>> + Send + Sync + 'a,
    {
        Self { run: Arc::new(run) }
    }

    pub fn run(&self, token: CancellationToken) -> BoxFuture<'a, MediatorResult<AnyResponse>> {
        (self.run)(token)
    }
}

/// Behavior applied uniformly to every request type.
///
/// The request is only visible through [`Message`] and the response stays
/// opaque; an open behavior must return the continuation's response (or its
/// own error), never a value of another type.
#[async_trait]
pub trait OpenPipelineBehavior: Send + Sync {
    async fn handle(
        &self,
        request: &dyn Message,
        next: ErasedNext<'_>,
        token: CancellationToken,
    ) -> MediatorResult<AnyResponse>;
}

/// Type-erased continuation handed to open stream behaviors
#[derive(Clone)]
pub struct ErasedStreamNext {
    run: Arc<dyn Fn(CancellationToken) -> ItemStream<AnyItem> + Send + Sync>,
}

impl ErasedStreamNext {
    pub fn new<F>(run: F) -> Self
    where
        F: Fn(CancellationToken) -> ItemStream<AnyItem> + Send + Sync + 'static,
    {
        Self { run: Arc::new(run) }
    }

    pub fn run(&self, token: CancellationToken) -> ItemStream<AnyItem> {
        (self.run)(token)
    }
}

/// Behavior applied uniformly to every stream request type
pub trait OpenStreamPipelineBehavior: Send + Sync {
    fn handle(
        &self,
        request: Arc<dyn Message>,
        next: ErasedStreamNext,
        token: CancellationToken,
    ) -> ItemStream<AnyItem>;
}

//! Behaviors applied to every request and stream of the demo

use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use futures::StreamExt;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use uuid::Uuid;

use cqbus::{
    AnyItem, AnyResponse, ErasedNext, ErasedStreamNext, ItemStream, MediatorResult, Message,
    OpenPipelineBehavior, OpenStreamPipelineBehavior,
};

/// Last path segment of a type name
fn short_name(type_name: &str) -> &str {
    type_name.rsplit("::").next().unwrap_or(type_name)
}

/// Logs each request before and after its handler, under a correlation id
#[derive(Clone)]
pub struct LoggingBehavior;

#[async_trait]
impl OpenPipelineBehavior for LoggingBehavior {
    async fn handle(
        &self,
        request: &dyn Message,
        next: ErasedNext<'_>,
        token: CancellationToken,
    ) -> MediatorResult<AnyResponse> {
        let name = short_name(request.message_name());
        let id = Uuid::new_v4();
        let started = Instant::now();

        info!("Handling: {} {:?} [{}]", name, request, id);
        let response = next.run(token).await?;
        info!("Handled: {} [{}] in {:?}", name, id, started.elapsed());

        Ok(response)
    }
}

/// Logs failures that reach the outside of the pipeline
#[derive(Clone)]
pub struct UnhandledErrorBehavior;

#[async_trait]
impl OpenPipelineBehavior for UnhandledErrorBehavior {
    async fn handle(
        &self,
        request: &dyn Message,
        next: ErasedNext<'_>,
        token: CancellationToken,
    ) -> MediatorResult<AnyResponse> {
        let result = next.run(token).await;
        if let Err(e) = &result {
            if !e.is_cancelled() {
                error!(
                    "Unhandled error for {} {:?}: {}",
                    short_name(request.message_name()),
                    request,
                    e
                );
            }
        }
        result
    }
}

#[derive(Clone)]
pub struct StreamLoggingBehavior;

impl OpenStreamPipelineBehavior for StreamLoggingBehavior {
    fn handle(
        &self,
        request: Arc<dyn Message>,
        next: ErasedStreamNext,
        token: CancellationToken,
    ) -> ItemStream<AnyItem> {
        let name = short_name((*request).message_name());
        info!("Stream handling: {} {:?}", name, request);
        let stream = next.run(token);
        info!("Stream handled: {} {:?}", name, request);
        stream
    }
}

#[derive(Clone)]
pub struct StreamUnhandledErrorBehavior;

impl OpenStreamPipelineBehavior for StreamUnhandledErrorBehavior {
    fn handle(
        &self,
        request: Arc<dyn Message>,
        next: ErasedStreamNext,
        token: CancellationToken,
    ) -> ItemStream<AnyItem> {
        next.run(token)
            .inspect(move |item| {
                if let Err(e) = item {
                    if !e.is_cancelled() {
                        error!(
                            "Unhandled error for {} {:?}: {}",
                            short_name((*request).message_name()),
                            request,
                            e
                        );
                    }
                }
            })
            .boxed()
    }
}

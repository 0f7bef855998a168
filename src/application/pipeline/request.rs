//! Request pipeline - runs one request through its behaviors to its handler

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::trace;

use crate::application::errors::{HandlerKind, MediatorError, MediatorResult};
use crate::domain::entities::Request;
use crate::domain::traits::{HandlerRegistry, Next, PipelineBehavior, RequestHandler, ResolveExt};

/// Executes requests: resolves the handler and behaviors, then runs the chain
pub struct RequestExecutor {
    registry: Arc<dyn HandlerRegistry>,
}

impl RequestExecutor {
    pub fn new(registry: Arc<dyn HandlerRegistry>) -> Self {
        Self { registry }
    }

    /// Run `request` through its behaviors, first registered outermost.
    ///
    /// With no behaviors the handler is called directly. Errors from any link
    /// are returned unchanged.
    pub async fn execute<R: Request>(
        &self,
        request: R,
        token: CancellationToken,
    ) -> MediatorResult<R::Response> {
        let behaviors = self.registry.services::<dyn PipelineBehavior<R>>();
        let handler = self
            .registry
            .required_service::<dyn RequestHandler<R>>()
            .ok_or_else(|| {
                MediatorError::not_found::<R::Response>(HandlerKind::Request, std::any::type_name::<R>())
            })?;

        if behaviors.is_empty() {
            return handler.handle(&request, token).await;
        }

        trace!(
            "Running {} through {} behaviors",
            std::any::type_name::<R>(),
            behaviors.len()
        );
        Next::new(&request, &behaviors, &*handler).run(token).await
    }
}

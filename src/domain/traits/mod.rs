//! Domain traits - Contracts implemented by application code and by the registry

pub mod behavior;
pub mod handler;
pub mod registry;

pub use behavior::{
    AnyItem, AnyResponse, ErasedNext, ErasedStreamNext, Next, OpenPipelineBehavior,
    OpenStreamPipelineBehavior, PipelineBehavior, StreamNext, StreamPipelineBehavior,
};
pub use handler::{
    ItemStream, NotificationHandler, RequestHandler, StreamRequestHandler, SyncNotificationHandler,
};
pub use registry::{service_key, HandlerRegistry, ResolveExt, ServiceInstance};

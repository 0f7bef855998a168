//! Domain entities - The message model

pub mod message;

pub use message::{
    AnyMessage, BoxedNotification, BoxedRequest, BoxedStreamRequest, Message, Notification,
    Request, StreamRequest, Unit,
};

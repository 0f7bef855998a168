use std::any::{Any, TypeId};
use std::fmt;

use serde::{Deserialize, Serialize};

/// Boxed message whose concrete type is only known at runtime
pub type AnyMessage = Box<dyn Any + Send>;

/// Base contract of everything that travels through the mediator.
///
/// Implemented for every `'static` type that is `Debug + Send + Sync`, so
/// message types only implement one of [`Request`], [`Notification`] or
/// [`StreamRequest`]. The methods are available on trait objects and always
/// report the concrete type behind them.
pub trait Message: Any + fmt::Debug + Send + Sync {
    /// Runtime identity of the concrete message type
    fn message_type(&self) -> TypeId;

    /// Fully qualified name of the concrete message type, for diagnostics
    fn message_name(&self) -> &'static str;

    /// Hand over ownership as a type-erased box
    fn into_any(self: Box<Self>) -> AnyMessage;
}

impl<T> Message for T
where
    T: Any + fmt::Debug + Send + Sync,
{
    fn message_type(&self) -> TypeId {
        TypeId::of::<T>()
    }

    fn message_name(&self) -> &'static str {
        std::any::type_name::<T>()
    }

    fn into_any(self: Box<Self>) -> AnyMessage {
        self
    }
}

/// A message expecting exactly one response from exactly one handler
pub trait Request: Message {
    type Response: Send + 'static;
}

/// A message with zero or more listeners and no response
pub trait Notification: Message {}

/// A message expecting a lazily produced, ordered sequence of items
pub trait StreamRequest: Message {
    type Item: Send + 'static;
}

/// Request whose concrete type is only known at runtime
pub type BoxedRequest<T> = Box<dyn Request<Response = T>>;

/// Notification whose concrete type is only known at runtime
pub type BoxedNotification = Box<dyn Notification>;

/// Stream request whose concrete type is only known at runtime
pub type BoxedStreamRequest<T> = Box<dyn StreamRequest<Item = T>>;

/// The "no value" response of void-like requests
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Unit;

impl Unit {
    pub const VALUE: Unit = Unit;
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "()")
    }
}

impl From<()> for Unit {
    fn from(_: ()) -> Self {
        Unit
    }
}

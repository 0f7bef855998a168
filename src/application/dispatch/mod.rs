//! Dispatch - The mediator front door and its routing table

pub mod mediator;
pub mod table;

pub use mediator::{Mediator, Publisher};
pub use table::{DispatchTable, HandlerDescriptor, NotificationInvoker, RequestInvoker, StreamInvoker};

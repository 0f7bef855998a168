//! Application layer - Dispatch and pipeline execution
//! 
//! This layer contains:
//! - Dispatch: The mediator and its routing table
//! - Pipeline: Request, notification and stream executors
//! - Errors: Mediator and configuration errors

pub mod dispatch;
pub mod errors;
pub mod pipeline;

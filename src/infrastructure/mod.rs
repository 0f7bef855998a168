//! Infrastructure layer - Concerns around the dispatch core
//! 
//! This layer contains:
//! - Config: Configuration loading
//! - Registry: Service registration, lifetimes and the mediator builder

pub mod config;
pub mod registry;

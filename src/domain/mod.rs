//! Domain layer - Message model and the contracts around it
//! 
//! This layer contains:
//! - Entities: The three message shapes and the `Unit` response
//! - Traits: Handlers, behaviors and the handler registry capability

pub mod entities;
pub mod traits;

//! World error types

use crate::entity::Entity;
use thiserror::Error;

/// Errors returned by World operations
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WorldError {
    #[error("entity {0} does not exist")]
    NoSuchEntity(Entity),

    #[error("entity {0} already exists")]
    EntityExists(Entity),

    #[error("component '{name}' appears more than once in a single bundle")]
    DuplicateComponent { name: &'static str },

    #[error("entity id space exhausted")]
    IdSpaceExhausted,
}

/// Result type for World operations
pub type Result<T> = std::result::Result<T, WorldError>;

//! Scheduler error types

use crate::system::SystemId;
use thiserror::Error;

/// Reasons a set of systems cannot be ordered.
///
/// A failed resolution never changes the current schedule.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScheduleError {
    #[error("system '{system}' runs after {dependency}, which is not scheduled")]
    UnknownDependency { system: String, dependency: SystemId },

    #[error("system '{system}' on event '{event}' runs after '{dependency}' on event '{dependency_event}'")]
    CrossEventDependency {
        system: String,
        event: String,
        dependency: String,
        dependency_event: String,
    },

    #[error(
        "system '{system}' (priority {priority}) runs after '{dependency}' \
         which has the higher priority value {dependency_priority}"
    )]
    PriorityInversion {
        system: String,
        priority: i32,
        dependency: String,
        dependency_priority: i32,
    },

    #[error("dependency cycle on event '{event}' between: {}", .systems.join(", "))]
    Cycle { event: String, systems: Vec<String> },

    #[error("system '{name}' ({id}) is already scheduled")]
    DuplicateSystem { id: SystemId, name: String },

    #[error("{0} is not scheduled")]
    SystemNotScheduled(SystemId),
}

/// Loop-level errors
#[derive(Debug, Error)]
pub enum LoopError {
    #[error(transparent)]
    Schedule(#[from] ScheduleError),

    #[error("loop is busy running a frame")]
    Busy,

    #[error("invalid loop configuration: {0}")]
    Config(#[from] toml::de::Error),

    #[error("invalid loop configuration: {field} {reason}")]
    InvalidConfig { field: &'static str, reason: String },
}

/// Result type for loop operations
pub type Result<T> = std::result::Result<T, LoopError>;

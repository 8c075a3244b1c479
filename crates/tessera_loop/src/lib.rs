//! # tessera_loop - Frame Scheduler
//!
//! Runs user systems against shared state once per occurrence of a named
//! event:
//! - Dependency and priority ordering, resolved per event
//! - Per-system hook state keyed by call site, swept when unused
//! - Middleware wrapping each frame
//! - Failure isolation: an erroring or panicking system never stops the frame
//!
//! ## Frame Flow
//!
//! ```text
//! EventSource fires ──► Loop frame ──► middleware chain ──► systems in order
//!                                                             │
//!                                                             ▼
//!                                                   HookContext per system
//!                                                             │
//!                                                             ▼
//!                                                    sweep untouched hooks
//! ```
//!
//! ## Key Invariants
//!
//! 1. **Schedules are all-or-nothing** - A rejected change keeps the old order
//! 2. **Hook state belongs to one system** - Replacing a system carries it over
//! 3. **One frame at a time** - Nested frames of the same loop are skipped

pub mod config;
pub mod context;
pub mod error;
pub mod frame;
pub mod hooks;
pub mod middleware;
pub mod runtime;
pub mod schedule;
pub mod signal;
pub mod system;

pub use config::{LoopConfig, DEFAULT_EVENT};
pub use context::HookContext;
pub use error::{LoopError, Result, ScheduleError};
pub use frame::{FrameClock, FrameState};
pub use hooks::{HookCleanup, HookKey, HookStorage};
pub use middleware::Middleware;
pub use runtime::Loop;
pub use schedule::{resolve, Schedule, SystemDescriptor};
pub use signal::{Connection, ConnectionGuard, EventSource, Signal};
pub use system::{IntoSystemResult, System, SystemFailure, SystemId};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::hook_key;
    pub use crate::{
        EventSource, HookCleanup, HookContext, HookKey, Loop, LoopConfig, LoopError, Signal, System,
        SystemId,
    };
}

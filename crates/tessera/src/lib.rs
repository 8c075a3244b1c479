//! # tessera - Entity Storage and Frame Scheduling
//!
//! Ties the two halves of the workspace together:
//! - [`ecs`]: the World, its live queries and change readers
//! - [`scheduler`]: the Loop, its systems, hook state and middleware
//!
//! ## Example
//!
//! ```ignore
//! use tessera::prelude::*;
//!
//! #[derive(Clone, Debug)]
//! struct Position { x: f32, y: f32 }
//! impl Component for Position {}
//!
//! #[derive(Clone, Debug)]
//! struct Velocity { x: f32, y: f32 }
//! impl Component for Velocity {}
//!
//! let lp = Loop::new(World::new());
//! lp.schedule_system(System::new("movement", |world: &mut World, ctx: &mut HookContext<'_>| {
//!     let dt = ctx.delta_time() as f32;
//!     let mut cursor = Query::<(Position, Velocity)>::new();
//!     while let Some((entity, (pos, vel))) = cursor.next(world) {
//!         let moved = pos.patch(|p| { p.x += vel.x * dt; p.y += vel.y * dt; });
//!         world.insert(entity, (moved,))?;
//!     }
//!     Ok::<(), WorldError>(())
//! }))?;
//!
//! let heartbeat = Signal::<()>::new();
//! let connections = lp.begin([("default", &heartbeat as &dyn EventSource)])?;
//! heartbeat.fire(&());
//! ```

pub use tessera_ecs as ecs;
pub use tessera_loop as scheduler;

pub use tessera_ecs::{Component, Entity, Query, World, WorldError};
pub use tessera_loop::{hook_key, HookContext, HookKey, Loop, LoopConfig, LoopError, System, SystemId};

/// Prelude for convenient imports
pub mod prelude {
    pub use tessera_ecs::prelude::*;
    pub use tessera_loop::prelude::*;
}

//! # tessera_ecs - Archetype-based Entity Storage
//!
//! In-process entity/component store with:
//! - Archetype storage keyed by component-type set, O(types) relocation
//! - Immutable, shared component records with `patch` for updates
//! - Live query cursors that tolerate mutation between steps
//! - Per-type change logs with independent readers
//!
//! ## Example
//!
//! ```ignore
//! use tessera_ecs::prelude::*;
//!
//! #[derive(Clone, Debug)]
//! struct Position { x: f32, y: f32 }
//! impl Component for Position {}
//!
//! #[derive(Clone, Debug)]
//! struct Velocity { x: f32, y: f32 }
//! impl Component for Velocity {}
//!
//! let mut world = World::new();
//! let entity = world.spawn((Position { x: 0.0, y: 0.0 }, Velocity { x: 1.0, y: 0.5 }))?;
//!
//! let mut cursor = Query::<(Position, Velocity)>::new();
//! while let Some((entity, (pos, vel))) = cursor.next(&world) {
//!     let moved = pos.patch(|p| { p.x += vel.x; p.y += vel.y; });
//!     world.insert(entity, (moved,))?;
//! }
//! ```

pub mod archetype;
pub mod change;
pub mod component;
pub mod entity;
pub mod error;
pub mod query;
pub mod world;

pub use archetype::{Archetype, ArchetypeEdge, ArchetypeId, Archetypes};
pub use change::{ChangeLog, ChangeReader, ChangeRecord, Changed, ReaderId};
pub use component::{Bundle, Component, ComponentId, ComponentInfo, ComponentRegistry, ComponentSet, ErasedComponent};
pub use entity::{Entity, EntityAllocator};
pub use error::{Result, WorldError};
pub use query::{Query, QueryIter, QueryState};
pub use world::{EntityLocation, World};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::{Bundle, ChangeReader, ChangeRecord, Component, Entity, Query, World, WorldError};
}

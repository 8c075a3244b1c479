//! Query - Iteration over entities holding a set of components
//!
//! Two front ends share one cursor:
//!
//! - [`QueryIter`] borrows the World and implements `Iterator`.
//! - [`Query`] is detached and borrows the World only for each `next` call,
//!   so the caller may mutate the World between steps. Rows are read at the
//!   moment they are visited, so later rows observe earlier mutations.
//!
//! A cursor never yields an entity twice, and never skips an entity that
//! matched for the whole traversal. Archetypes are walked in order and rows
//! within an archetype from last to first, so swap-removes caused by the
//! caller only ever move already-visited rows. A final sweep catches entities
//! the caller moved into an archetype that had already been walked.

use crate::archetype::{Archetype, ArchetypeId};
use crate::component::{ComponentId, ComponentSet};
use crate::entity::Entity;
use crate::world::World;
use std::any::TypeId;
use std::collections::HashSet;
use std::marker::PhantomData;

/// Archetype-level matching state for a query
#[derive(Clone, Debug)]
pub struct QueryState {
    /// Types every match must hold
    required: Vec<TypeId>,
    /// Types no match may hold
    excluded: Vec<TypeId>,
    /// Resolved IDs of `required`, once all are registered
    required_ids: Option<Vec<ComponentId>>,
    /// Resolved IDs of the registered subset of `excluded`
    excluded_ids: Vec<ComponentId>,
    /// Matched archetype IDs
    matched: Vec<ArchetypeId>,
    /// Last archetype count when matched
    last_archetype_count: usize,
    /// Layout generation the matches belong to
    generation: u64,
}

impl QueryState {
    /// Create a new query state
    pub fn new(required: Vec<TypeId>) -> Self {
        Self {
            required,
            excluded: Vec::new(),
            required_ids: None,
            excluded_ids: Vec::new(),
            matched: Vec::new(),
            last_archetype_count: 0,
            generation: 0,
        }
    }

    /// Exclude archetypes holding any of these types
    pub fn exclude(&mut self, types: Vec<TypeId>) {
        self.excluded.extend(types);
        self.excluded_ids.clear();
        self.reset();
    }

    fn reset(&mut self) {
        self.matched.clear();
        self.last_archetype_count = 0;
    }

    /// Check if an archetype matches this query
    pub fn matches_archetype(&self, archetype: &Archetype) -> bool {
        let Some(required) = &self.required_ids else {
            return false;
        };

        required.iter().all(|&c| archetype.has_component(c))
            && !self.excluded_ids.iter().any(|&c| archetype.has_component(c))
    }

    /// Update matched archetypes.
    ///
    /// Returns true if earlier matches were invalidated and traversal must
    /// start over.
    pub fn update(&mut self, world: &World) -> bool {
        let registry = world.components();
        let mut invalidated = false;

        if world.layout_generation() != self.generation {
            self.generation = world.layout_generation();
            self.reset();
            invalidated = true;
        }

        if self.required_ids.is_none() {
            self.required_ids = self
                .required
                .iter()
                .map(|&type_id| registry.id_of_type(type_id))
                .collect();
        }

        // Types registered later only appear in archetypes created later,
        // so existing matches stay valid.
        if self.excluded_ids.len() < self.excluded.len() {
            self.excluded_ids = self
                .excluded
                .iter()
                .filter_map(|&type_id| registry.id_of_type(type_id))
                .collect();
        }

        let archetypes = world.archetypes();
        if archetypes.len() != self.last_archetype_count {
            for archetype in archetypes.iter().skip(self.last_archetype_count) {
                if self.matches_archetype(archetype) {
                    self.matched.push(archetype.id());
                }
            }
            self.last_archetype_count = archetypes.len();
        }

        invalidated
    }

    /// Get matched archetype IDs
    #[inline]
    pub fn matched_archetypes(&self) -> &[ArchetypeId] {
        &self.matched
    }

    /// Resolved required component IDs
    #[inline]
    pub fn required_ids(&self) -> Option<&[ComponentId]> {
        self.required_ids.as_deref()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Phase {
    /// First walk over every matched archetype
    Walk,
    /// Second walk, limited to entities that existed when iteration began
    Sweep,
    Done,
}

/// Detached query cursor.
///
/// ```ignore
/// let mut cursor = Query::<(Position,)>::new();
/// while let Some((entity, (pos,))) = cursor.next(&world) {
///     world.insert(entity, (Position { x: pos.x + 1.0, ..*pos },))?;
/// }
/// ```
pub struct Query<Q: ComponentSet> {
    state: QueryState,
    phase: Phase,
    /// Index into the matched archetypes
    archetype_index: usize,
    /// Rows of the current archetype still to visit
    remaining: Option<usize>,
    visited: HashSet<Entity>,
    /// Entities with ids at or above this were spawned during iteration.
    /// Unbounded when the id space was already exhausted
    horizon: Option<u64>,
    started: bool,
    _marker: PhantomData<fn() -> Q>,
}

impl<Q: ComponentSet> Query<Q> {
    /// Create a new cursor
    pub fn new() -> Self {
        Self {
            state: QueryState::new(Q::type_ids()),
            phase: Phase::Walk,
            archetype_index: 0,
            remaining: None,
            visited: HashSet::new(),
            horizon: None,
            started: false,
            _marker: PhantomData,
        }
    }

    /// Skip entities holding any component in `F`
    pub fn without<F: ComponentSet>(mut self) -> Self {
        self.state.exclude(F::type_ids());
        self.archetype_index = 0;
        self.remaining = None;
        self
    }

    /// Advance the cursor
    pub fn next(&mut self, world: &World) -> Option<(Entity, Q::Values)> {
        if !self.started {
            self.horizon = world.next_entity_id();
            self.started = true;
        }

        loop {
            if self.phase == Phase::Done {
                return None;
            }

            if self.state.update(world) {
                self.archetype_index = 0;
                self.remaining = None;
            }

            let Some(&archetype_id) = self.state.matched_archetypes().get(self.archetype_index) else {
                self.phase = match self.phase {
                    Phase::Walk => Phase::Sweep,
                    _ => Phase::Done,
                };
                self.archetype_index = 0;
                self.remaining = None;
                continue;
            };

            if let Some(archetype) = world.archetypes().get(archetype_id) {
                let mut row = self.remaining.unwrap_or(archetype.len()).min(archetype.len());

                while row > 0 {
                    row -= 1;
                    let entity = archetype.entities()[row];
                    let spawned_since = self.horizon.is_some_and(|horizon| entity.id() >= horizon);
                    if self.phase == Phase::Sweep && spawned_since {
                        continue;
                    }
                    if !self.visited.insert(entity) {
                        continue;
                    }

                    self.remaining = Some(row);
                    if let Some(values) = self.fetch(archetype, row) {
                        return Some((entity, values));
                    }
                }
            }

            self.archetype_index += 1;
            self.remaining = None;
        }
    }

    /// Drain the remaining matches into a Vec that no longer tracks the World
    pub fn snapshot(&mut self, world: &World) -> Vec<(Entity, Q::Values)> {
        let mut out = Vec::new();
        while let Some(item) = self.next(world) {
            out.push(item);
        }
        out
    }

    fn fetch(&self, archetype: &Archetype, row: usize) -> Option<Q::Values> {
        let ids = self.state.required_ids()?;
        let values = ids
            .iter()
            .map(|&component| archetype.get(component, row).cloned())
            .collect();
        Q::require(Q::from_erased(values))
    }
}

impl<Q: ComponentSet> Default for Query<Q> {
    fn default() -> Self {
        Self::new()
    }
}

/// Query iterator borrowing the World
pub struct QueryIter<'w, Q: ComponentSet> {
    world: &'w World,
    cursor: Query<Q>,
}

impl<'w, Q: ComponentSet> QueryIter<'w, Q> {
    /// Create a new query iterator
    pub fn new(world: &'w World) -> Self {
        Self {
            world,
            cursor: Query::new(),
        }
    }

    /// Skip entities holding any component in `F`
    pub fn without<F: ComponentSet>(self) -> Self {
        Self {
            world: self.world,
            cursor: self.cursor.without::<F>(),
        }
    }

    /// Collect every remaining match
    pub fn snapshot(self) -> Vec<(Entity, Q::Values)> {
        self.collect()
    }

    /// Release the World borrow, keeping the position
    pub fn into_cursor(self) -> Query<Q> {
        self.cursor
    }
}

impl<'w, Q: ComponentSet> Iterator for QueryIter<'w, Q> {
    type Item = (Entity, Q::Values);

    fn next(&mut self) -> Option<Self::Item> {
        self.cursor.next(self.world)
    }
}

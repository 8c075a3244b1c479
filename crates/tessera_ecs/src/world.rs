//! World - Container for all entity data
//!
//! The World owns every entity and its component records. All structural
//! changes go through it so that entity locations, archetype storage and the
//! change log stay in agreement.

use crate::archetype::{ArchetypeId, Archetypes};
use crate::change::{ChangeLog, ChangeReader, Changed};
use crate::component::{Bundle, Component, ComponentId, ComponentRegistry, ComponentSet, ErasedComponent};
use crate::entity::{Entity, EntityAllocator};
use crate::error::{Result, WorldError};
use crate::query::QueryIter;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

/// Location of an entity in archetype storage
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EntityLocation {
    /// Archetype containing the entity
    pub archetype_id: ArchetypeId,
    /// Row index within the archetype
    pub row: usize,
}

impl EntityLocation {
    /// Create a new entity location
    pub const fn new(archetype_id: ArchetypeId, row: usize) -> Self {
        Self { archetype_id, row }
    }
}

/// The World - container for all simulation data
#[derive(Default)]
pub struct World {
    /// Entity id allocator
    allocator: EntityAllocator,
    /// Entity locations
    locations: HashMap<Entity, EntityLocation>,
    /// Component registry
    components: ComponentRegistry,
    /// Archetype storage
    archetypes: Archetypes,
    /// Change detection logs
    changes: ChangeLog,
    /// Bumped whenever archetype ids are invalidated
    layout_generation: u64,
}

impl World {
    /// Create a new empty world
    pub fn new() -> Self {
        Self::default()
    }

    // ========== Entity Management ==========

    /// Spawn a new entity with the given components
    pub fn spawn<B: Bundle>(&mut self, bundle: B) -> Result<Entity> {
        let values = self.prepare(bundle)?;
        let entity = self.allocator.allocate().ok_or(WorldError::IdSpaceExhausted)?;
        self.place_new(entity, values);
        Ok(entity)
    }

    /// Spawn an entity with a caller-chosen id.
    ///
    /// Later `spawn` calls never return this id.
    pub fn spawn_at<B: Bundle>(&mut self, entity: Entity, bundle: B) -> Result<Entity> {
        if self.contains(entity) {
            return Err(WorldError::EntityExists(entity));
        }

        let values = self.prepare(bundle)?;
        if self.allocator.claim(entity) {
            match self.allocator.next_id() {
                Some(next) => log::debug!("spawn_at({}) advanced next entity id to {}", entity, next),
                None => log::warn!("spawn_at({}) took the last entity id; spawn will fail", entity),
            }
        }
        self.place_new(entity, values);
        Ok(entity)
    }

    /// Replace an entity's entire component set
    pub fn replace<B: Bundle>(&mut self, entity: Entity, bundle: B) -> Result<()> {
        let location = self.location(entity)?;
        let values = self.prepare(bundle)?;

        let mut old: BTreeMap<ComponentId, ErasedComponent> =
            self.take_row(location).into_iter().collect();

        for (component, value) in &values {
            let previous = old.remove(component);
            self.changes.record(*component, entity, Some(value.clone()), previous);
        }
        for (component, previous) in old {
            self.changes.record(component, entity, None, Some(previous));
        }

        self.place(entity, values);
        Ok(())
    }

    /// Despawn an entity, reporting each of its components as removed
    pub fn despawn(&mut self, entity: Entity) -> Result<()> {
        let location = self.location(entity)?;

        for (component, previous) in self.take_row(location) {
            self.changes.record(component, entity, None, Some(previous));
        }
        self.locations.remove(&entity);

        Ok(())
    }

    /// Remove every entity.
    ///
    /// Does not record change events.
    pub fn clear(&mut self) {
        self.archetypes = Archetypes::new();
        self.locations.clear();
        self.layout_generation += 1;
    }

    /// Check if an entity exists
    #[inline]
    pub fn contains(&self, entity: Entity) -> bool {
        self.locations.contains_key(&entity)
    }

    /// Number of live entities
    #[inline]
    pub fn len(&self) -> usize {
        self.locations.len()
    }

    /// Check if there are no entities
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.locations.is_empty()
    }

    /// Iterate over live entities
    pub fn entities(&self) -> impl Iterator<Item = Entity> + '_ {
        self.archetypes
            .iter()
            .flat_map(|archetype| archetype.entities().iter().copied())
    }

    /// Get entity location
    pub fn entity_location(&self, entity: Entity) -> Option<EntityLocation> {
        self.locations.get(&entity).copied()
    }

    /// Next id `spawn` would hand out, `None` once the id space is used up
    #[inline]
    pub fn next_entity_id(&self) -> Option<u64> {
        self.allocator.next_id()
    }

    // ========== Component Access ==========

    /// Get several components of an entity at once, in the requested order.
    ///
    /// ```ignore
    /// let (pos, vel) = world.get::<(Position, Velocity)>(entity)?;
    /// ```
    pub fn get<Q: ComponentSet>(&self, entity: Entity) -> Result<Q::Optional> {
        let location = self.location(entity)?;
        let archetype = self.archetypes.get(location.archetype_id);

        let values = Q::type_ids()
            .into_iter()
            .map(|type_id| {
                let component = self.components.id_of_type(type_id)?;
                archetype?.get(component, location.row).cloned()
            })
            .collect();

        Ok(Q::from_erased(values))
    }

    /// Get a single component of an entity
    pub fn get_one<T: Component>(&self, entity: Entity) -> Result<Option<Arc<T>>> {
        self.get::<(T,)>(entity).map(|(value,)| value)
    }

    /// Add or overwrite components on an entity
    pub fn insert<B: Bundle>(&mut self, entity: Entity, bundle: B) -> Result<()> {
        let location = self.location(entity)?;
        let values = self.prepare(bundle)?;

        let mut additions = Vec::new();
        for (component, value) in values {
            let previous = self
                .archetypes
                .get_mut(location.archetype_id)
                .and_then(|archetype| archetype.set(component, location.row, value.clone()));

            match previous {
                Some(previous) => self.changes.record(component, entity, Some(value), Some(previous)),
                None => additions.push((component, value)),
            }
        }

        if additions.is_empty() {
            return Ok(());
        }

        let target = match additions.as_slice() {
            [(component, _)] => self.archetypes.transition(location.archetype_id, *component, true),
            _ => None,
        };

        let mut row = self.take_row(location);
        for (component, value) in &additions {
            self.changes.record(*component, entity, Some(value.clone()), None);
        }
        row.extend(additions);
        row.sort_by_key(|(component, _)| *component);

        match target {
            Some(target) => self.place_in(entity, target, row),
            None => self.place(entity, row),
        }
        Ok(())
    }

    /// Remove components from an entity, returning the removed records.
    ///
    /// Types the entity does not hold come back as `None` and are otherwise
    /// ignored.
    pub fn remove<Q: ComponentSet>(&mut self, entity: Entity) -> Result<Q::Optional> {
        let location = self.location(entity)?;

        let requested: Vec<Option<ComponentId>> = Q::type_ids()
            .into_iter()
            .map(|type_id| self.components.id_of_type(type_id))
            .collect();

        let held: Vec<ComponentId> = match self.archetypes.get(location.archetype_id) {
            Some(archetype) => {
                let mut held: Vec<ComponentId> = requested
                    .iter()
                    .flatten()
                    .copied()
                    .filter(|&component| archetype.has_component(component))
                    .collect();
                held.sort();
                held.dedup();
                held
            }
            None => Vec::new(),
        };

        if held.is_empty() {
            return Ok(Q::from_erased(vec![None; requested.len()]));
        }

        let target = match held.as_slice() {
            [component] => self.archetypes.transition(location.archetype_id, *component, false),
            _ => None,
        };

        let (removed, kept): (Vec<_>, Vec<_>) = self
            .take_row(location)
            .into_iter()
            .partition(|(component, _)| held.binary_search(component).is_ok());

        let removed: BTreeMap<ComponentId, ErasedComponent> = removed.into_iter().collect();
        for (component, previous) in &removed {
            self.changes.record(*component, entity, None, Some(previous.clone()));
        }

        match target {
            Some(target) => self.place_in(entity, target, kept),
            None => self.place(entity, kept),
        }

        let values = requested
            .into_iter()
            .map(|component| component.and_then(|c| removed.get(&c).cloned()))
            .collect();
        Ok(Q::from_erased(values))
    }

    /// Names of the component types an entity holds
    pub fn component_names(&self, entity: Entity) -> Result<Vec<&'static str>> {
        let location = self.location(entity)?;
        Ok(self
            .archetypes
            .get(location.archetype_id)
            .map(|archetype| {
                archetype
                    .components()
                    .iter()
                    .map(|&component| self.components.name(component))
                    .collect()
            })
            .unwrap_or_default())
    }

    // ========== Queries ==========

    /// Iterate over every entity holding all of `Q`'s component types.
    ///
    /// ```ignore
    /// for (entity, (pos, vel)) in world.query::<(Position, Velocity)>() {
    ///     // ...
    /// }
    /// ```
    pub fn query<Q: ComponentSet>(&self) -> QueryIter<'_, Q> {
        QueryIter::new(self)
    }

    /// Open an independent change reader for component type `T`.
    ///
    /// The first drain reports every entity currently holding `T` as an
    /// addition.
    pub fn change_reader<T: Component>(&mut self) -> ChangeReader<T> {
        let component = self.components.register::<T>();
        let population = self
            .archetypes
            .iter()
            .filter(|archetype| archetype.has_component(component))
            .flat_map(|archetype| {
                archetype
                    .entities()
                    .iter()
                    .enumerate()
                    .filter_map(move |(row, &entity)| {
                        archetype.get(component, row).map(|value| (entity, value.clone()))
                    })
            })
            .collect();

        self.changes.open_reader(component, population)
    }

    /// Drain every change to `T` that `reader` has not seen yet
    pub fn query_changed<T: Component>(&mut self, reader: &ChangeReader<T>) -> Changed<T> {
        self.changes.drain(reader)
    }

    // ========== Maintenance ==========

    /// Compact storage. Never changes what any query returns.
    pub fn optimize_queries(&mut self) {
        let dropped = self.archetypes.compact();

        self.locations.clear();
        for archetype in self.archetypes.iter() {
            for (row, &entity) in archetype.entities().iter().enumerate() {
                self.locations
                    .insert(entity, EntityLocation::new(archetype.id(), row));
            }
        }
        self.locations.shrink_to_fit();
        self.changes.compact();
        self.layout_generation += 1;

        log::debug!(
            "optimize_queries: dropped {} empty archetypes, {} remain",
            dropped,
            self.archetypes.len()
        );
    }

    /// Get archetypes
    #[inline]
    pub fn archetypes(&self) -> &Archetypes {
        &self.archetypes
    }

    /// Get the component registry
    #[inline]
    pub fn components(&self) -> &ComponentRegistry {
        &self.components
    }

    /// Changes whenever previously handed-out archetype ids become invalid
    #[inline]
    pub fn layout_generation(&self) -> u64 {
        self.layout_generation
    }

    // ========== Internals ==========

    fn location(&self, entity: Entity) -> Result<EntityLocation> {
        self.locations
            .get(&entity)
            .copied()
            .ok_or(WorldError::NoSuchEntity(entity))
    }

    /// Register a bundle's types and sort its records, rejecting duplicates
    fn prepare<B: Bundle>(&mut self, bundle: B) -> Result<Vec<(ComponentId, ErasedComponent)>> {
        let ids = B::register(&mut self.components);
        let mut values: Vec<(ComponentId, ErasedComponent)> =
            ids.into_iter().zip(bundle.into_values()).collect();
        values.sort_by_key(|(component, _)| *component);

        if let Some(pair) = values.windows(2).find(|pair| pair[0].0 == pair[1].0) {
            return Err(WorldError::DuplicateComponent {
                name: self.components.name(pair[0].0),
            });
        }

        Ok(values)
    }

    /// Take an entity's row out of storage, fixing up the swapped entity.
    /// The entity keeps a stale location until it is placed again.
    fn take_row(&mut self, location: EntityLocation) -> Vec<(ComponentId, ErasedComponent)> {
        let Some((values, swapped)) = self
            .archetypes
            .get_mut(location.archetype_id)
            .and_then(|archetype| archetype.take_row(location.row))
        else {
            return Vec::new();
        };

        if let Some(swapped) = swapped {
            if let Some(swapped_location) = self.locations.get_mut(&swapped) {
                swapped_location.row = location.row;
            }
        }

        values
    }

    fn place_new(&mut self, entity: Entity, values: Vec<(ComponentId, ErasedComponent)>) {
        for (component, value) in &values {
            self.changes.record(*component, entity, Some(value.clone()), None);
        }
        self.place(entity, values);
    }

    fn place(&mut self, entity: Entity, values: Vec<(ComponentId, ErasedComponent)>) {
        let signature: Vec<ComponentId> = values.iter().map(|(component, _)| *component).collect();
        let target = self.archetypes.get_or_create(&signature);
        self.place_in(entity, target, values);
    }

    fn place_in(&mut self, entity: Entity, target: ArchetypeId, values: Vec<(ComponentId, ErasedComponent)>) {
        if let Some(archetype) = self.archetypes.get_mut(target) {
            let row = archetype.push(entity, values);
            self.locations.insert(entity, EntityLocation::new(target, row));
        }
    }
}

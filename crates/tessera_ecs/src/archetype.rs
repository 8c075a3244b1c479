//! Archetype - Groups of entities with the same component types
//!
//! Every distinct set of component types gets one archetype. Rows are stored
//! column-wise, so moving an entity between archetypes costs one swap-remove
//! plus one append per component type it holds, independent of how many
//! entities exist.

use crate::component::{ComponentId, ErasedComponent};
use crate::entity::Entity;
use std::collections::{BTreeMap, HashMap};

/// Unique identifier for an archetype
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ArchetypeId(pub u32);

impl ArchetypeId {
    /// Create a new archetype ID
    #[inline]
    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    /// Get the raw ID
    #[inline]
    pub const fn id(&self) -> u32 {
        self.0
    }
}

/// Cached transitions to neighbouring archetypes
#[derive(Clone, Copy, Debug, Default)]
pub struct ArchetypeEdge {
    /// Archetype reached by adding the component
    pub add: Option<ArchetypeId>,
    /// Archetype reached by removing the component
    pub remove: Option<ArchetypeId>,
}

/// An archetype stores entities with the same component set
#[derive(Debug)]
pub struct Archetype {
    /// Unique identifier
    id: ArchetypeId,
    /// Component IDs in this archetype (sorted)
    components: Vec<ComponentId>,
    /// ComponentId -> column index mapping
    component_indices: BTreeMap<ComponentId, usize>,
    /// One column per component, parallel to `entities`
    columns: Vec<Vec<ErasedComponent>>,
    /// Entities in this archetype
    entities: Vec<Entity>,
    /// Graph edges for archetype transitions
    edges: BTreeMap<ComponentId, ArchetypeEdge>,
}

impl Archetype {
    /// Create a new archetype for a sorted, deduplicated component signature
    pub fn new(id: ArchetypeId, components: Vec<ComponentId>) -> Self {
        debug_assert!(components.windows(2).all(|w| w[0] < w[1]));

        let component_indices = components
            .iter()
            .enumerate()
            .map(|(idx, &component)| (component, idx))
            .collect();
        let columns = components.iter().map(|_| Vec::new()).collect();

        Self {
            id,
            components,
            component_indices,
            columns,
            entities: Vec::new(),
            edges: BTreeMap::new(),
        }
    }

    /// Get archetype ID
    #[inline]
    pub fn id(&self) -> ArchetypeId {
        self.id
    }

    /// Get component IDs (sorted)
    #[inline]
    pub fn components(&self) -> &[ComponentId] {
        &self.components
    }

    /// Check if archetype has a component
    #[inline]
    pub fn has_component(&self, component_id: ComponentId) -> bool {
        self.component_indices.contains_key(&component_id)
    }

    /// Get number of entities
    #[inline]
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    /// Check if empty
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Get entities
    #[inline]
    pub fn entities(&self) -> &[Entity] {
        &self.entities
    }

    /// Get a component record at a row
    pub fn get(&self, component_id: ComponentId, row: usize) -> Option<&ErasedComponent> {
        let &column = self.component_indices.get(&component_id)?;
        self.columns[column].get(row)
    }

    /// Overwrite a record in place, returning the previous one
    pub fn set(
        &mut self,
        component_id: ComponentId,
        row: usize,
        value: ErasedComponent,
    ) -> Option<ErasedComponent> {
        let &column = self.component_indices.get(&component_id)?;
        let slot = self.columns[column].get_mut(row)?;
        Some(std::mem::replace(slot, value))
    }

    /// Append an entity. `values` must be sorted by component and match this
    /// archetype's signature exactly.
    ///
    /// Returns the new row.
    pub fn push(&mut self, entity: Entity, values: Vec<(ComponentId, ErasedComponent)>) -> usize {
        debug_assert_eq!(values.len(), self.columns.len());

        let row = self.entities.len();
        self.entities.push(entity);

        for (column, (component, value)) in self.columns.iter_mut().zip(values) {
            debug_assert!(self.component_indices.contains_key(&component));
            column.push(value);
        }

        row
    }

    /// Remove an entity by row index (swap-remove), handing back its records
    /// sorted by component.
    ///
    /// Also returns the entity that was swapped into this position (if any).
    pub fn take_row(&mut self, row: usize) -> Option<(Vec<(ComponentId, ErasedComponent)>, Option<Entity>)> {
        if row >= self.entities.len() {
            return None;
        }

        let last_row = self.entities.len() - 1;
        let swapped_entity = if row != last_row {
            Some(self.entities[last_row])
        } else {
            None
        };

        self.entities.swap_remove(row);
        let values = self
            .components
            .iter()
            .zip(self.columns.iter_mut())
            .map(|(&component, column)| (component, column.swap_remove(row)))
            .collect();

        Some((values, swapped_entity))
    }

    /// Get an edge for a component
    pub fn edge(&self, component_id: ComponentId) -> Option<&ArchetypeEdge> {
        self.edges.get(&component_id)
    }

    /// Get or create an edge for a component
    pub fn edge_mut(&mut self, component_id: ComponentId) -> &mut ArchetypeEdge {
        self.edges.entry(component_id).or_default()
    }

    /// Release spare capacity in every column
    fn shrink_to_fit(&mut self) {
        self.entities.shrink_to_fit();
        for column in &mut self.columns {
            column.shrink_to_fit();
        }
    }
}

/// Archetype storage and management
#[derive(Debug, Default)]
pub struct Archetypes {
    /// All archetypes
    archetypes: Vec<Archetype>,
    /// Component signature -> archetype ID mapping
    signature_map: HashMap<Vec<ComponentId>, ArchetypeId>,
}

impl Archetypes {
    /// Create a new archetype storage
    pub fn new() -> Self {
        Self {
            archetypes: Vec::new(),
            signature_map: HashMap::new(),
        }
    }

    /// Get an archetype by ID
    #[inline]
    pub fn get(&self, id: ArchetypeId) -> Option<&Archetype> {
        self.archetypes.get(id.0 as usize)
    }

    /// Get an archetype mutably by ID
    #[inline]
    pub fn get_mut(&mut self, id: ArchetypeId) -> Option<&mut Archetype> {
        self.archetypes.get_mut(id.0 as usize)
    }

    /// Get or create the archetype for a sorted component signature
    pub fn get_or_create(&mut self, signature: &[ComponentId]) -> ArchetypeId {
        if let Some(&id) = self.signature_map.get(signature) {
            return id;
        }

        let id = ArchetypeId::new(self.archetypes.len() as u32);
        self.archetypes.push(Archetype::new(id, signature.to_vec()));
        self.signature_map.insert(signature.to_vec(), id);

        id
    }

    /// Archetype reached from `from` by adding or removing one component,
    /// going through the edge cache.
    pub fn transition(&mut self, from: ArchetypeId, component: ComponentId, add: bool) -> Option<ArchetypeId> {
        let source = self.get(from)?;
        let cached = source
            .edge(component)
            .and_then(|edge| if add { edge.add } else { edge.remove });
        if let Some(target) = cached {
            return Some(target);
        }

        let mut signature = source.components().to_vec();
        match (signature.binary_search(&component), add) {
            (Err(pos), true) => signature.insert(pos, component),
            (Ok(pos), false) => {
                signature.remove(pos);
            }
            _ => return Some(from),
        }

        let target = self.get_or_create(&signature);
        if let Some(source) = self.get_mut(from) {
            let edge = source.edge_mut(component);
            if add {
                edge.add = Some(target);
            } else {
                edge.remove = Some(target);
            }
        }

        Some(target)
    }

    /// Drop empty archetypes, renumber the survivors and forget cached edges.
    ///
    /// Archetype IDs are not stable across a compaction.
    pub fn compact(&mut self) -> usize {
        let before = self.archetypes.len();
        let survivors: Vec<Archetype> = std::mem::take(&mut self.archetypes)
            .into_iter()
            .filter(|archetype| !archetype.is_empty())
            .collect();

        self.signature_map.clear();
        for (idx, mut archetype) in survivors.into_iter().enumerate() {
            archetype.id = ArchetypeId::new(idx as u32);
            archetype.edges.clear();
            archetype.shrink_to_fit();
            self.signature_map.insert(archetype.components.clone(), archetype.id);
            self.archetypes.push(archetype);
        }
        self.archetypes.shrink_to_fit();

        before - self.archetypes.len()
    }

    /// Get number of archetypes
    #[inline]
    pub fn len(&self) -> usize {
        self.archetypes.len()
    }

    /// Check if empty
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.archetypes.is_empty()
    }

    /// Iterate over all archetypes
    pub fn iter(&self) -> impl Iterator<Item = &Archetype> {
        self.archetypes.iter()
    }
}

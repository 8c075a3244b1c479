//! Component - Immutable value records attached to entities
//!
//! A component type is any `Send + Sync + 'static` type implementing
//! [`Component`]. Records are stored shared behind an `Arc` and are never
//! mutated in place; "changing" a component means inserting a new record,
//! usually built with [`Component::patch`].
//!
//! Component types are identified by their Rust type, not by name. Each
//! World interns the types it sees into dense [`ComponentId`]s.

use std::any::{Any, TypeId};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Type-erased shared component record
pub type ErasedComponent = Arc<dyn Any + Send + Sync>;

/// Unique identifier for a component type within one World
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ComponentId(pub u32);

impl ComponentId {
    /// Create a new component ID
    #[inline]
    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    /// Get the raw ID value
    #[inline]
    pub const fn id(&self) -> u32 {
        self.0
    }
}

/// Information about a registered component type
#[derive(Clone, Debug)]
pub struct ComponentInfo {
    /// Interned ID
    pub id: ComponentId,
    /// Display name, used in errors and debugging
    pub name: &'static str,
    /// Rust type of the component
    pub type_id: TypeId,
}

/// Trait for component types
///
/// ```ignore
/// #[derive(Clone, Debug, PartialEq)]
/// struct Health { current: u32, max: u32 }
///
/// impl Component for Health {}
///
/// let healed = health.patch(|h| h.current = h.max);
/// ```
pub trait Component: Any + Send + Sync + 'static {
    /// Display name for this component type
    fn name() -> &'static str
    where
        Self: Sized,
    {
        std::any::type_name::<Self>()
    }

    /// Produce a new record with some fields overridden.
    ///
    /// The receiver is left untouched. Optional fields are `Option`s;
    /// setting one to `None` leaves it absent in the result.
    fn patch(&self, f: impl FnOnce(&mut Self)) -> Self
    where
        Self: Clone + Sized,
    {
        let mut next = self.clone();
        f(&mut next);
        next
    }
}

/// Registry for component types
#[derive(Debug, Default)]
pub struct ComponentRegistry {
    /// Registered components by ID
    infos: Vec<ComponentInfo>,
    /// TypeId to ComponentId mapping
    type_map: BTreeMap<TypeId, ComponentId>,
}

impl ComponentRegistry {
    /// Create a new component registry
    pub fn new() -> Self {
        Self {
            infos: Vec::new(),
            type_map: BTreeMap::new(),
        }
    }

    /// Register a component type, returning its existing ID if already known
    pub fn register<T: Component>(&mut self) -> ComponentId {
        let type_id = TypeId::of::<T>();

        if let Some(&id) = self.type_map.get(&type_id) {
            return id;
        }

        let id = ComponentId::new(self.infos.len() as u32);
        self.infos.push(ComponentInfo {
            id,
            name: T::name(),
            type_id,
        });
        self.type_map.insert(type_id, id);

        id
    }

    /// Get the ID of a component type, if registered
    #[inline]
    pub fn id_of<T: Component>(&self) -> Option<ComponentId> {
        self.id_of_type(TypeId::of::<T>())
    }

    /// Get the ID for a raw TypeId, if registered
    #[inline]
    pub fn id_of_type(&self, type_id: TypeId) -> Option<ComponentId> {
        self.type_map.get(&type_id).copied()
    }

    /// Get component info
    #[inline]
    pub fn info(&self, id: ComponentId) -> Option<&ComponentInfo> {
        self.infos.get(id.0 as usize)
    }

    /// Display name of a registered component
    pub fn name(&self, id: ComponentId) -> &'static str {
        self.info(id).map(|info| info.name).unwrap_or("<unregistered>")
    }

    /// Number of registered types
    #[inline]
    pub fn len(&self) -> usize {
        self.infos.len()
    }

    /// Check if no types are registered
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.infos.is_empty()
    }

    /// Iterate over all registered types
    pub fn iter(&self) -> impl Iterator<Item = &ComponentInfo> {
        self.infos.iter()
    }
}

/// A set of component records inserted together.
///
/// Implemented for tuples of up to eight components. A single component is
/// written as a one-element tuple: `(Position { .. },)`.
pub trait Bundle: Send + 'static {
    /// Register every type in the bundle, in tuple order
    fn register(registry: &mut ComponentRegistry) -> Vec<ComponentId>;

    /// Convert into erased records, in tuple order
    fn into_values(self) -> Vec<ErasedComponent>;
}

impl Bundle for () {
    fn register(_registry: &mut ComponentRegistry) -> Vec<ComponentId> {
        Vec::new()
    }

    fn into_values(self) -> Vec<ErasedComponent> {
        Vec::new()
    }
}

/// A set of component types named at the type level, used by `get`,
/// `remove` and queries.
pub trait ComponentSet: 'static {
    /// Records of every type, all present
    type Values;
    /// Records of every type, each possibly absent
    type Optional;

    /// Rust types in tuple order
    fn type_ids() -> Vec<TypeId>;

    /// Downcast erased records given in tuple order
    fn from_erased(values: Vec<Option<ErasedComponent>>) -> Self::Optional;

    /// Succeeds only if every record is present
    fn require(values: Self::Optional) -> Option<Self::Values>;
}

macro_rules! impl_component_tuple {
    ($($name:ident $idx:tt),+) => {
        impl<$($name: Component),+> Bundle for ($($name,)+) {
            fn register(registry: &mut ComponentRegistry) -> Vec<ComponentId> {
                vec![$(registry.register::<$name>()),+]
            }

            fn into_values(self) -> Vec<ErasedComponent> {
                vec![$(Arc::new(self.$idx) as ErasedComponent),+]
            }
        }

        impl<$($name: Component),+> ComponentSet for ($($name,)+) {
            type Values = ($(Arc<$name>,)+);
            type Optional = ($(Option<Arc<$name>>,)+);

            fn type_ids() -> Vec<TypeId> {
                vec![$(TypeId::of::<$name>()),+]
            }

            fn from_erased(mut values: Vec<Option<ErasedComponent>>) -> Self::Optional {
                ($(
                    values
                        .get_mut($idx)
                        .and_then(Option::take)
                        .and_then(|value| value.downcast::<$name>().ok()),
                )+)
            }

            fn require(values: Self::Optional) -> Option<Self::Values> {
                Some(($(values.$idx?,)+))
            }
        }
    };
}

impl_component_tuple!(A 0);
impl_component_tuple!(A 0, B 1);
impl_component_tuple!(A 0, B 1, C 2);
impl_component_tuple!(A 0, B 1, C 2, D 3);
impl_component_tuple!(A 0, B 1, C 2, D 3, E 4);
impl_component_tuple!(A 0, B 1, C 2, D 3, E 4, F 5);
impl_component_tuple!(A 0, B 1, C 2, D 3, E 4, F 5, G 6);
impl_component_tuple!(A 0, B 1, C 2, D 3, E 4, F 5, G 6, H 7);

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Clone, Debug, PartialEq)]
    struct Position {
        x: f32,
        y: f32,
    }

    impl Component for Position {}

    #[derive(Clone, Debug, PartialEq)]
    struct Label {
        text: String,
        color: Option<u32>,
    }

    impl Component for Label {
        fn name() -> &'static str {
            "Label"
        }
    }

    #[test]
    fn test_registry_interns_types() {
        let mut registry = ComponentRegistry::new();
        let pos_id = registry.register::<Position>();
        let label_id = registry.register::<Label>();

        assert_ne!(pos_id, label_id);
        assert_eq!(registry.register::<Position>(), pos_id);
        assert_eq!(registry.id_of::<Label>(), Some(label_id));
        assert_eq!(registry.name(label_id), "Label");
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_patch_leaves_original_untouched() {
        let original = Label {
            text: "hello".into(),
            color: Some(3),
        };

        let patched = original.patch(|label| {
            label.text = "bye".into();
            label.color = None;
        });

        assert_eq!(original.text, "hello");
        assert_eq!(original.color, Some(3));
        assert_eq!(patched.text, "bye");
        assert_eq!(patched.color, None);
    }

    #[test]
    fn test_component_set_downcast() {
        let values: Vec<Option<ErasedComponent>> = vec![
            Some(Arc::new(Position { x: 1.0, y: 2.0 })),
            None,
        ];

        let (pos, label) = <(Position, Label)>::from_erased(values);
        assert_eq!(*pos.clone().unwrap(), Position { x: 1.0, y: 2.0 });
        assert!(label.is_none());
        assert!(<(Position, Label)>::require((pos, label)).is_none());
    }
}

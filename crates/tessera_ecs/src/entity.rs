//! Entity - Unique identifiers for simulation objects
//!
//! Entities are plain, strictly increasing integer ids. An id handed out by
//! [`EntityAllocator::allocate`] is never handed out again, even after the
//! entity is despawned.

use std::fmt;

/// Entity identifier
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Entity(u64);

impl Entity {
    /// Create an entity handle from a raw id
    #[inline]
    pub const fn from_raw(id: u64) -> Self {
        Self(id)
    }

    /// Get the raw id
    #[inline]
    pub const fn id(&self) -> u64 {
        self.0
    }
}

impl fmt::Debug for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Entity({})", self.0)
    }
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Monotonic entity id allocator
#[derive(Debug)]
pub struct EntityAllocator {
    /// Next id handed out by `allocate`; `None` once `u64::MAX` is taken
    next_id: Option<u64>,
}

impl Default for EntityAllocator {
    fn default() -> Self {
        Self::new()
    }
}

impl EntityAllocator {
    /// Create a new allocator starting at id 0
    pub fn new() -> Self {
        Self { next_id: Some(0) }
    }

    /// Allocate the next unused id, or `None` if the id space is used up
    pub fn allocate(&mut self) -> Option<Entity> {
        let id = self.next_id?;
        self.next_id = id.checked_add(1);
        Some(Entity(id))
    }

    /// Claim a caller-chosen id, moving the counter past it.
    ///
    /// Returns true if the counter advanced. Claiming `u64::MAX` exhausts
    /// the allocator.
    pub fn claim(&mut self, entity: Entity) -> bool {
        match self.next_id {
            Some(next) if entity.0 >= next => {
                self.next_id = entity.0.checked_add(1);
                true
            }
            _ => false,
        }
    }

    /// Next id `allocate` would hand out
    #[inline]
    pub fn next_id(&self) -> Option<u64> {
        self.next_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allocator_starts_at_zero() {
        let mut allocator = EntityAllocator::new();

        assert_eq!(allocator.allocate(), Some(Entity::from_raw(0)));
        assert_eq!(allocator.allocate(), Some(Entity::from_raw(1)));
        assert_eq!(allocator.next_id(), Some(2));
    }

    #[test]
    fn test_claim_moves_counter_forward_only() {
        let mut allocator = EntityAllocator::new();

        assert!(allocator.claim(Entity::from_raw(10)));
        assert_eq!(allocator.allocate(), Some(Entity::from_raw(11)));

        // Claiming below the counter leaves it alone
        assert!(!allocator.claim(Entity::from_raw(3)));
        assert_eq!(allocator.allocate(), Some(Entity::from_raw(12)));
    }

    #[test]
    fn test_claiming_last_id_exhausts() {
        let mut allocator = EntityAllocator::new();

        assert!(allocator.claim(Entity::from_raw(u64::MAX)));
        assert_eq!(allocator.next_id(), None);
        assert_eq!(allocator.allocate(), None);
        assert!(!allocator.claim(Entity::from_raw(5)));
    }

    #[test]
    fn test_allocate_up_to_last_id() {
        let mut allocator = EntityAllocator::new();
        allocator.claim(Entity::from_raw(u64::MAX - 2));

        assert_eq!(allocator.allocate(), Some(Entity::from_raw(u64::MAX - 1)));
        assert_eq!(allocator.allocate(), Some(Entity::from_raw(u64::MAX)));
        assert_eq!(allocator.allocate(), None);
    }

    #[test]
    fn test_entity_formatting() {
        let entity = Entity::from_raw(42);
        assert_eq!(format!("{:?}", entity), "Entity(42)");
        assert_eq!(entity.to_string(), "42");
    }
}

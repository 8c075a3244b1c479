//! Change detection - per-component-type logs of added, changed and removed
//! records.
//!
//! Every World mutation that touches a component appends a
//! `(entity, new, old)` event to that type's log. Readers are independent
//! cursors into the log: each sees every event recorded after it was created
//! exactly once, no matter how often other readers drain. Events are kept
//! only while some live reader has not consumed them.
//!
//! Draining coalesces events per entity: the reported `old` is the value
//! before the first unread event and `new` is the value after the last one.
//! An entity whose coalesced `old` and `new` are both absent is skipped.

use crate::component::{Component, ComponentId, ErasedComponent};
use crate::entity::Entity;
use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::marker::PhantomData;
use std::sync::{Arc, Weak};

/// Identifier of one change reader
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ReaderId(pub u64);

/// One coalesced change, as seen by a reader
pub struct ChangeRecord<T> {
    /// Current record, or `None` if the component was removed
    pub new: Option<Arc<T>>,
    /// Record before the change, or `None` if the component was added
    pub old: Option<Arc<T>>,
}

impl<T> ChangeRecord<T> {
    /// Component was added since the last read
    #[inline]
    pub fn is_added(&self) -> bool {
        self.old.is_none() && self.new.is_some()
    }

    /// Component was removed since the last read
    #[inline]
    pub fn is_removed(&self) -> bool {
        self.new.is_none()
    }
}

impl<T> Clone for ChangeRecord<T> {
    fn clone(&self) -> Self {
        Self {
            new: self.new.clone(),
            old: self.old.clone(),
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for ChangeRecord<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChangeRecord")
            .field("new", &self.new)
            .field("old", &self.old)
            .finish()
    }
}

/// Handle to an independent read cursor over one component type's changes.
///
/// Created by `World::change_reader`. Dropping the handle releases the
/// cursor and lets the World discard events only it was holding back.
pub struct ChangeReader<T: Component> {
    id: ReaderId,
    component: ComponentId,
    /// Keeps the World-side cursor alive
    _token: Arc<()>,
    _marker: PhantomData<fn() -> T>,
}

impl<T: Component> ChangeReader<T> {
    pub(crate) fn new(id: ReaderId, component: ComponentId, token: Arc<()>) -> Self {
        Self {
            id,
            component,
            _token: token,
            _marker: PhantomData,
        }
    }

    /// Reader ID
    #[inline]
    pub fn id(&self) -> ReaderId {
        self.id
    }

    /// Component type this reader follows
    #[inline]
    pub fn component(&self) -> ComponentId {
        self.component
    }
}

impl<T: Component> fmt::Debug for ChangeReader<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChangeReader")
            .field("id", &self.id)
            .field("component", &T::name())
            .finish()
    }
}

/// Drained changes for one component type, in first-change order
pub struct Changed<T> {
    records: std::vec::IntoIter<(Entity, ChangeRecord<T>)>,
}

impl<T> Iterator for Changed<T> {
    type Item = (Entity, ChangeRecord<T>);

    fn next(&mut self) -> Option<Self::Item> {
        self.records.next()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.records.size_hint()
    }
}

impl<T> ExactSizeIterator for Changed<T> {}

impl<T> Changed<T> {
    /// No changes
    pub fn empty() -> Self {
        Self {
            records: Vec::new().into_iter(),
        }
    }
}

/// A raw change event
#[derive(Clone)]
struct ChangeEvent {
    entity: Entity,
    new: Option<ErasedComponent>,
    old: Option<ErasedComponent>,
}

/// Per-reader cursor state
struct ReaderSlot {
    /// Sequence number of the next unread shared event
    position: u64,
    /// Private events queued before the shared log (initial population)
    seeded: Vec<ChangeEvent>,
    /// Liveness of the reader handle
    alive: Weak<()>,
}

/// Log for one component type
#[derive(Default)]
struct TypeLog {
    /// Unconsumed events
    events: VecDeque<ChangeEvent>,
    /// Sequence number of `events[0]`
    head: u64,
    /// Live readers
    readers: HashMap<ReaderId, ReaderSlot>,
}

impl TypeLog {
    /// Sequence number one past the newest event
    fn tail(&self) -> u64 {
        self.head + self.events.len() as u64
    }

    fn prune_readers(&mut self) {
        self.readers.retain(|_, slot| slot.alive.strong_count() > 0);
        if self.readers.is_empty() {
            self.head = self.tail();
            self.events.clear();
        }
    }

    /// Discard events every reader has consumed
    fn truncate(&mut self) {
        let Some(min) = self.readers.values().map(|slot| slot.position).min() else {
            return;
        };
        while self.head < min && self.events.pop_front().is_some() {
            self.head += 1;
        }
    }
}

/// Change logs for every component type of one World
#[derive(Default)]
pub struct ChangeLog {
    logs: HashMap<ComponentId, TypeLog>,
    next_reader: u64,
}

impl ChangeLog {
    /// Create an empty change log
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one change. Dropped immediately if nobody is reading.
    pub fn record(
        &mut self,
        component: ComponentId,
        entity: Entity,
        new: Option<ErasedComponent>,
        old: Option<ErasedComponent>,
    ) {
        let Some(log) = self.logs.get_mut(&component) else {
            return;
        };
        log.prune_readers();
        if log.readers.is_empty() {
            return;
        }
        log.events.push_back(ChangeEvent { entity, new, old });
    }

    /// Open a reader whose first drain reports `population` as additions
    pub fn open_reader<T: Component>(
        &mut self,
        component: ComponentId,
        population: Vec<(Entity, ErasedComponent)>,
    ) -> ChangeReader<T> {
        let id = ReaderId(self.next_reader);
        self.next_reader += 1;

        let token = Arc::new(());
        let log = self.logs.entry(component).or_default();
        log.prune_readers();

        let seeded = population
            .into_iter()
            .map(|(entity, value)| ChangeEvent {
                entity,
                new: Some(value),
                old: None,
            })
            .collect();
        log.readers.insert(
            id,
            ReaderSlot {
                position: log.tail(),
                seeded,
                alive: Arc::downgrade(&token),
            },
        );

        ChangeReader::new(id, component, token)
    }

    /// Drain everything `reader` has not seen yet
    pub fn drain<T: Component>(&mut self, reader: &ChangeReader<T>) -> Changed<T> {
        let Some(log) = self.logs.get_mut(&reader.component) else {
            return Changed::empty();
        };
        let tail = log.tail();
        let head = log.head;
        let Some(slot) = log.readers.get_mut(&reader.id) else {
            return Changed::empty();
        };

        let mut pending = std::mem::take(&mut slot.seeded);
        let start = slot.position.saturating_sub(head) as usize;
        pending.extend(log.events.iter().skip(start).cloned());
        slot.position = tail;

        log.truncate();

        Changed {
            records: coalesce::<T>(pending).into_iter(),
        }
    }

    /// Forget dead readers and consumed events
    pub fn compact(&mut self) {
        for log in self.logs.values_mut() {
            log.prune_readers();
            log.truncate();
            log.events.shrink_to_fit();
        }
    }

    /// Number of events retained across all types
    pub fn retained(&self) -> usize {
        self.logs.values().map(|log| log.events.len()).sum()
    }
}

fn coalesce<T: Component>(events: Vec<ChangeEvent>) -> Vec<(Entity, ChangeRecord<T>)> {
    let mut order: Vec<ChangeEvent> = Vec::new();
    let mut index: HashMap<Entity, usize> = HashMap::new();

    for event in events {
        match index.get(&event.entity) {
            Some(&slot) => order[slot].new = event.new,
            None => {
                index.insert(event.entity, order.len());
                order.push(event);
            }
        }
    }

    order
        .into_iter()
        .filter(|event| event.new.is_some() || event.old.is_some())
        .map(|event| {
            let record = ChangeRecord {
                new: event.new.and_then(|value| value.downcast::<T>().ok()),
                old: event.old.and_then(|value| value.downcast::<T>().ok()),
            };
            (event.entity, record)
        })
        .collect()
}

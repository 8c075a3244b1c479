//! Hook state - per-system, per-call-site persistent storage
//!
//! Each system owns a table of cells keyed by [`HookKey`]. A cell is created
//! the first time its key is used and survives for as long as the system
//! keeps touching it. After every successful run, cells the run did not touch
//! are swept: a cell with a cleanup callback asks it whether to stay, any
//! other cell is dropped, which runs the value's `Drop`. After a failed run
//! only cells left idle for a whole window of recent runs are swept.

use crate::system::SystemId;
use std::any::Any;
use std::collections::hash_map::DefaultHasher;
use std::collections::HashMap;
use std::fmt;
use std::hash::{Hash, Hasher};

/// Key identifying one hook cell within a system.
///
/// Built from a call site with [`hook_key!`](crate::hook_key); the optional
/// discriminator separates several cells created from the same site, for
/// instance one per entity inside a loop.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct HookKey {
    site: &'static str,
    discriminator: Option<u64>,
}

impl HookKey {
    /// Key for a call site
    pub const fn new(site: &'static str) -> Self {
        Self {
            site,
            discriminator: None,
        }
    }

    /// Same site, separated by a discriminator value.
    ///
    /// Chained calls combine: `key.with(&a).with(&b)` differs from both
    /// `key.with(&a)` and `key.with(&b)`.
    pub fn with<D: Hash + ?Sized>(self, discriminator: &D) -> Self {
        let mut hasher = DefaultHasher::new();
        self.discriminator.hash(&mut hasher);
        discriminator.hash(&mut hasher);
        Self {
            site: self.site,
            discriminator: Some(hasher.finish()),
        }
    }

    /// Call site string
    #[inline]
    pub fn site(&self) -> &'static str {
        self.site
    }
}

impl fmt::Debug for HookKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.discriminator {
            Some(d) => write!(f, "HookKey({}#{:x})", self.site, d),
            None => write!(f, "HookKey({})", self.site),
        }
    }
}

/// Build a [`HookKey`] for the current source location.
///
/// ```ignore
/// let counter = ctx.use_hook_state(hook_key!(), || 0u32);
/// for entity in targets {
///     let seen = ctx.use_hook_state(hook_key!(entity), || false);
/// }
/// ```
#[macro_export]
macro_rules! hook_key {
    () => {
        $crate::HookKey::new(concat!(file!(), ":", line!(), ":", column!()))
    };
    ($discriminator:expr) => {
        $crate::hook_key!().with(&$discriminator)
    };
}

/// Decision returned by a cleanup callback for an untouched cell
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HookCleanup {
    /// Drop the cell
    Dispose,
    /// Keep the cell for at least another run
    Retain,
}

/// Erased cleanup callback
pub(crate) type CleanupFn = Box<dyn FnMut(&mut dyn Any) -> HookCleanup>;

/// One stored hook value
pub(crate) struct HookCell {
    value: Box<dyn Any>,
    /// Tick of the last run that used this cell
    touched: u64,
    cleanup: Option<CleanupFn>,
}

impl HookCell {
    pub(crate) fn new<T: 'static>(value: T, touched: u64, cleanup: Option<CleanupFn>) -> Self {
        Self {
            value: Box::new(value),
            touched,
            cleanup,
        }
    }

    #[inline]
    pub(crate) fn holds<T: 'static>(&self) -> bool {
        self.value.is::<T>()
    }

    #[inline]
    pub(crate) fn touch(&mut self, tick: u64) {
        self.touched = tick;
    }

    #[inline]
    pub(crate) fn downcast_mut<T: 'static>(&mut self) -> Option<&mut T> {
        self.value.downcast_mut::<T>()
    }
}

/// Cells of one system
pub(crate) type HookCells = HashMap<HookKey, HookCell>;

/// Hook cells of every scheduled system
#[derive(Default)]
pub struct HookStorage {
    systems: HashMap<SystemId, HookCells>,
}

impl HookStorage {
    /// Create empty storage
    pub fn new() -> Self {
        Self::default()
    }

    /// Cell table of a system, created on first use
    pub(crate) fn cells_mut(&mut self, system: SystemId) -> &mut HookCells {
        self.systems.entry(system).or_default()
    }

    /// Sweep cells of `system` not touched at `tick`.
    ///
    /// Returns the number of cells dropped.
    pub fn sweep(&mut self, system: SystemId, tick: u64) -> usize {
        self.sweep_unless(system, |touched| touched == tick)
    }

    /// Sweep cells of `system` last touched before `since`.
    ///
    /// Returns the number of cells dropped.
    pub fn sweep_idle(&mut self, system: SystemId, since: u64) -> usize {
        self.sweep_unless(system, |touched| touched >= since)
    }

    fn sweep_unless(&mut self, system: SystemId, fresh: impl Fn(u64) -> bool) -> usize {
        let Some(cells) = self.systems.get_mut(&system) else {
            return 0;
        };

        let before = cells.len();
        cells.retain(|_, cell| {
            if fresh(cell.touched) {
                return true;
            }
            match cell.cleanup.as_mut() {
                Some(cleanup) => cleanup(cell.value.as_mut()) == HookCleanup::Retain,
                None => false,
            }
        });

        let dropped = before - cells.len();
        if dropped > 0 {
            log::trace!("swept {} hook cells of {}", dropped, system);
        }
        dropped
    }

    /// Move every cell of `from` to `to`
    pub fn transfer(&mut self, from: SystemId, to: SystemId) {
        if let Some(cells) = self.systems.remove(&from) {
            log::debug!("moving {} hook cells from {} to {}", cells.len(), from, to);
            self.systems.insert(to, cells);
        }
    }

    /// Drop every cell of a system
    pub fn release(&mut self, system: SystemId) {
        self.systems.remove(&system);
    }

    /// Drop every cell
    pub fn clear(&mut self) {
        self.systems.clear();
    }

    /// Number of cells held for a system
    pub fn len(&self, system: SystemId) -> usize {
        self.systems.get(&system).map_or(0, HashMap::len)
    }
}

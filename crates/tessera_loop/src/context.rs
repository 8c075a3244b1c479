//! HookContext - what a running system sees of the loop
//!
//! A fresh context is built for every system invocation. It exposes the
//! frame state, the identity of the running system, and that system's hook
//! cells. The stateful helpers (`use_throttle`, `use_event`,
//! `query_changed`) are all built on [`HookContext::use_hook_state`].

use crate::frame::FrameState;
use crate::hooks::{CleanupFn, HookCell, HookCells, HookCleanup, HookKey};
use crate::signal::{ConnectionGuard, Signal};
use crate::system::SystemId;
use std::any::Any;
use std::cell::RefCell;
use std::collections::hash_map::Entry;
use std::collections::VecDeque;
use std::fmt;
use std::rc::Rc;
use tessera_ecs::{ChangeReader, Changed, Component, World};

/// Execution context of one system run
pub struct HookContext<'a> {
    system: SystemId,
    name: &'a str,
    frame: &'a FrameState,
    cells: &'a mut HookCells,
}

impl<'a> HookContext<'a> {
    pub(crate) fn new(system: SystemId, name: &'a str, frame: &'a FrameState, cells: &'a mut HookCells) -> Self {
        Self {
            system,
            name,
            frame,
            cells,
        }
    }

    /// ID of the running system
    #[inline]
    pub fn system_id(&self) -> SystemId {
        self.system
    }

    /// Name of the running system
    #[inline]
    pub fn system_name(&self) -> &str {
        self.name
    }

    /// Current frame
    #[inline]
    pub fn frame(&self) -> &FrameState {
        self.frame
    }

    /// Seconds since the previous frame
    #[inline]
    pub fn delta_time(&self) -> f64 {
        self.frame.delta_time
    }

    /// Log a message tagged with the running system's name
    pub fn log(&self, message: impl fmt::Display) {
        log::info!(target: "tessera::system", "[{}] {}", self.name, message);
    }

    /// State stored under `key` for this system, created with `init` on
    /// first use.
    ///
    /// The cell persists across runs as long as every run touches it. It is
    /// dropped after the first successful run that does not.
    pub fn use_hook_state<T: 'static>(&mut self, key: HookKey, init: impl FnOnce() -> T) -> &mut T {
        self.hook_cell(key, init, None)
    }

    /// Like [`use_hook_state`](Self::use_hook_state), but consults `cleanup`
    /// before dropping an untouched cell. Returning
    /// [`HookCleanup::Retain`] keeps the cell for another run.
    pub fn use_hook_state_with<T: 'static>(
        &mut self,
        key: HookKey,
        init: impl FnOnce() -> T,
        mut cleanup: impl FnMut(&mut T) -> HookCleanup + 'static,
    ) -> &mut T {
        let erased: CleanupFn = Box::new(move |value: &mut dyn Any| match value.downcast_mut::<T>() {
            Some(value) => cleanup(value),
            None => HookCleanup::Dispose,
        });
        self.hook_cell(key, init, Some(erased))
    }

    fn hook_cell<T: 'static>(&mut self, key: HookKey, init: impl FnOnce() -> T, cleanup: Option<CleanupFn>) -> &mut T {
        let tick = self.frame.tick;
        let cell = match self.cells.entry(key) {
            Entry::Occupied(entry) if entry.get().holds::<T>() => entry.into_mut(),
            Entry::Occupied(mut entry) => {
                log::warn!(
                    "system '{}' reused {:?} with a different type; state reset",
                    self.name,
                    key
                );
                entry.insert(HookCell::new(init(), tick, cleanup));
                entry.into_mut()
            }
            Entry::Vacant(entry) => entry.insert(HookCell::new(init(), tick, cleanup)),
        };

        cell.touch(tick);
        match cell.downcast_mut::<T>() {
            Some(value) => value,
            None => unreachable!("hook cell type checked above"),
        }
    }

    /// True on first use, then at most once every `seconds` of frame time
    pub fn use_throttle(&mut self, key: HookKey, seconds: f64) -> bool {
        let now = self.frame.elapsed;
        let last = self.use_hook_state(key, || None::<f64>);

        match *last {
            Some(previous) if now - previous < seconds => false,
            _ => {
                *last = Some(now);
                true
            }
        }
    }

    /// Payloads fired on `signal` since the previous poll from this key,
    /// numbered from 1 in firing order.
    ///
    /// Each signal (and its clones) gets its own buffer under `key`. The
    /// first poll connects and returns nothing. The connection is dropped
    /// with the cell once a run stops polling.
    pub fn use_event<A: Clone + 'static>(&mut self, key: HookKey, signal: &Signal<A>) -> Vec<(usize, A)> {
        let key = key.with(&signal.source_id());
        let poll = self.use_hook_state(key, || EventPoll::connect(signal));
        poll.drain()
    }

    /// Changes to `T` since this system last polled from `key`.
    ///
    /// The first poll reports every entity currently holding `T` as added.
    pub fn query_changed<T: Component>(&mut self, key: HookKey, world: &mut World) -> Changed<T> {
        let reader = self.use_hook_state(key, || world.change_reader::<T>());
        world.query_changed(reader)
    }
}

impl fmt::Debug for HookContext<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HookContext")
            .field("system", &self.system)
            .field("name", &self.name)
            .field("frame", &self.frame)
            .field("cells", &self.cells.len())
            .finish()
    }
}

/// Buffered subscription behind `use_event`
struct EventPoll<A> {
    queue: Rc<RefCell<VecDeque<A>>>,
    received: usize,
    _connection: ConnectionGuard,
    /// Keeps the signal's identity from being reused while this poll lives
    _source: Signal<A>,
}

impl<A: Clone + 'static> EventPoll<A> {
    fn connect(signal: &Signal<A>) -> Self {
        let queue = Rc::new(RefCell::new(VecDeque::new()));
        let sink = queue.clone();
        let connection = signal.connect(move |payload: &A| sink.borrow_mut().push_back(payload.clone()));

        Self {
            queue,
            received: 0,
            _connection: ConnectionGuard::new(connection),
            _source: signal.clone(),
        }
    }

    fn drain(&mut self) -> Vec<(usize, A)> {
        let mut out = Vec::new();
        for payload in self.queue.borrow_mut().drain(..) {
            self.received += 1;
            out.push((self.received, payload));
        }
        out
    }
}

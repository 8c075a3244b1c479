//! Signals - single-threaded event sources
//!
//! A [`Signal`] holds a list of callbacks and invokes them in connection
//! order when fired. Connecting returns a [`Connection`]; disconnecting stops
//! future invocations, including later ones within a fire already in
//! progress. Callbacks may connect or disconnect while the signal is firing.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

/// Anything the loop can subscribe a frame callback to
pub trait EventSource {
    /// Connect a callback invoked once per occurrence of the event
    fn connect_frame(&self, callback: Box<dyn FnMut()>) -> Connection;
}

/// Handle to one connected callback
#[derive(Debug, Clone)]
pub struct Connection {
    active: Rc<Cell<bool>>,
}

impl Connection {
    fn new() -> Self {
        Self {
            active: Rc::new(Cell::new(true)),
        }
    }

    /// Stop future invocations
    pub fn disconnect(&self) {
        self.active.set(false);
    }

    /// Check if still connected
    #[inline]
    pub fn is_connected(&self) -> bool {
        self.active.get()
    }
}

/// Connection that disconnects when dropped
#[derive(Debug)]
pub struct ConnectionGuard(Connection);

impl ConnectionGuard {
    /// Wrap a connection
    pub fn new(connection: Connection) -> Self {
        Self(connection)
    }

    /// Underlying connection
    #[inline]
    pub fn connection(&self) -> &Connection {
        &self.0
    }
}

impl Drop for ConnectionGuard {
    fn drop(&mut self) {
        self.0.disconnect();
    }
}

type Slot<A> = (Rc<Cell<bool>>, Rc<RefCell<dyn FnMut(&A)>>);

/// Event source carrying a payload of type `A`
pub struct Signal<A> {
    slots: Rc<RefCell<Vec<Slot<A>>>>,
}

impl<A: 'static> Signal<A> {
    /// Create a signal with no connections
    pub fn new() -> Self {
        Self {
            slots: Rc::new(RefCell::new(Vec::new())),
        }
    }

    /// Connect a callback
    pub fn connect(&self, callback: impl FnMut(&A) + 'static) -> Connection {
        let connection = Connection::new();
        let callback: Rc<RefCell<dyn FnMut(&A)>> = Rc::new(RefCell::new(callback));
        self.slots
            .borrow_mut()
            .push((connection.active.clone(), callback));
        connection
    }

    /// Invoke every connected callback with `payload`.
    ///
    /// A callback that is already running (the signal fired from inside its
    /// own callback) is skipped for the nested fire.
    pub fn fire(&self, payload: &A) {
        let slots: Vec<Slot<A>> = {
            let mut slots = self.slots.borrow_mut();
            slots.retain(|(active, _)| active.get());
            slots.clone()
        };

        for (active, callback) in slots {
            if !active.get() {
                continue;
            }
            match callback.try_borrow_mut() {
                Ok(mut callback) => (*callback)(payload),
                Err(_) => log::warn!("signal fired re-entrantly; skipping a running callback"),
            }
        }
    }

    /// Identity shared by this signal and its clones
    pub(crate) fn source_id(&self) -> usize {
        Rc::as_ptr(&self.slots) as *const () as usize
    }

    /// Number of live connections
    pub fn connection_count(&self) -> usize {
        self.slots
            .borrow()
            .iter()
            .filter(|(active, _)| active.get())
            .count()
    }
}

impl<A: 'static> Default for Signal<A> {
    fn default() -> Self {
        Self::new()
    }
}

impl<A> Clone for Signal<A> {
    fn clone(&self) -> Self {
        Self {
            slots: self.slots.clone(),
        }
    }
}

impl<A: 'static> EventSource for Signal<A> {
    fn connect_frame(&self, mut callback: Box<dyn FnMut()>) -> Connection {
        self.connect(move |_: &A| callback())
    }
}

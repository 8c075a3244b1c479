//! System - Callables scheduled by the loop
//!
//! A system is a closure over the loop state plus scheduling metadata: the
//! event it runs on, a priority, and the systems it must run after. Every
//! system gets a process-unique [`SystemId`] at construction, which is how
//! `after` edges and hook state refer to it.

use crate::context::HookContext;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_SYSTEM_ID: AtomicU64 = AtomicU64::new(0);

/// Unique identifier for a system
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SystemId(u64);

impl SystemId {
    fn next() -> Self {
        Self(NEXT_SYSTEM_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Get the raw ID
    #[inline]
    pub const fn to_bits(&self) -> u64 {
        self.0
    }
}

impl fmt::Debug for SystemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SystemId({})", self.0)
    }
}

impl fmt::Display for SystemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "system #{}", self.0)
    }
}

/// Conversion of a system's return value into success or a failure message
pub trait IntoSystemResult {
    fn into_system_result(self) -> Result<(), String>;
}

impl IntoSystemResult for () {
    #[inline]
    fn into_system_result(self) -> Result<(), String> {
        Ok(())
    }
}

impl<E: fmt::Display> IntoSystemResult for Result<(), E> {
    #[inline]
    fn into_system_result(self) -> Result<(), String> {
        self.map_err(|e| e.to_string())
    }
}

/// Erased system body
pub(crate) type SystemFn<S> = Box<dyn FnMut(&mut S, &mut HookContext<'_>) -> Result<(), String>>;

/// A schedulable system over loop state `S`
pub struct System<S> {
    id: SystemId,
    name: String,
    event: Option<String>,
    priority: i32,
    after: Vec<SystemId>,
    run: SystemFn<S>,
}

impl<S: 'static> System<S> {
    /// Create a new system.
    ///
    /// `f` may return `()` or `Result<(), E>`; an `Err` is reported as a
    /// failure of this system without affecting the rest of the frame.
    pub fn new<F, R>(name: impl Into<String>, mut f: F) -> Self
    where
        F: FnMut(&mut S, &mut HookContext<'_>) -> R + 'static,
        R: IntoSystemResult,
    {
        let run: SystemFn<S> =
            Box::new(move |state: &mut S, ctx: &mut HookContext<'_>| f(state, ctx).into_system_result());

        Self {
            id: SystemId::next(),
            name: name.into(),
            event: None,
            priority: 0,
            after: Vec::new(),
            run,
        }
    }

    /// Run on a named event instead of the default one
    pub fn on_event(mut self, event: impl Into<String>) -> Self {
        self.event = Some(event.into());
        self
    }

    /// Set the priority. Lower values run first.
    pub fn priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    /// System must run after another
    pub fn after(mut self, system: SystemId) -> Self {
        if !self.after.contains(&system) {
            self.after.push(system);
        }
        self
    }

    /// System must run after several others
    pub fn after_all(mut self, systems: impl IntoIterator<Item = SystemId>) -> Self {
        for system in systems {
            self = self.after(system);
        }
        self
    }
}

impl<S> System<S> {
    /// Get the system ID
    #[inline]
    pub fn id(&self) -> SystemId {
        self.id
    }

    /// Get the system name
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Requested event, if any
    #[inline]
    pub fn event(&self) -> Option<&str> {
        self.event.as_deref()
    }

    /// Get the priority
    #[inline]
    pub fn get_priority(&self) -> i32 {
        self.priority
    }

    /// Systems this one runs after
    #[inline]
    pub fn dependencies(&self) -> &[SystemId] {
        &self.after
    }

    pub(crate) fn into_parts(self) -> (SystemId, String, Option<String>, i32, Vec<SystemId>, SystemFn<S>) {
        (self.id, self.name, self.event, self.priority, self.after, self.run)
    }
}

impl<S> fmt::Debug for System<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("System")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("event", &self.event)
            .field("priority", &self.priority)
            .field("after", &self.after)
            .finish()
    }
}

/// A system run that returned an error or panicked
#[derive(Debug, Clone, PartialEq)]
pub struct SystemFailure {
    /// Failing system
    pub system: SystemId,
    /// Its name at the time
    pub name: String,
    /// Event being processed
    pub event: String,
    /// Frame tick
    pub tick: u64,
    /// Error or panic message
    pub message: String,
    /// Whether the system panicked rather than returning `Err`
    pub panicked: bool,
}

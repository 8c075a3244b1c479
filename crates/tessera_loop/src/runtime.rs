//! Loop - owns the systems, their schedule and their hook state
//!
//! The loop is driven by the host: either by connecting it to event sources
//! with [`Loop::begin`], or by calling [`Loop::step`] directly. Each frame
//! runs the event's systems in resolved order, each inside its own hook
//! context and failure boundary, wrapped by any registered middleware.
//!
//! # Lifecycle
//!
//! 1. `Loop::new(state)` creates an empty loop owning the state
//! 2. `schedule_systems` / `schedule_system` add systems
//! 3. `begin` connects event sources; frames now run as events fire
//! 4. `evict_system` / `replace_system` change the schedule between frames
//! 5. `shutdown` disconnects everything and hands the state back

use crate::config::LoopConfig;
use crate::context::HookContext;
use crate::error::{LoopError, Result, ScheduleError};
use crate::frame::{FrameClock, FrameState};
use crate::hooks::HookStorage;
use crate::middleware::{run_chain, Middleware};
use crate::schedule::{resolve, Schedule, SystemDescriptor};
use crate::signal::{Connection, EventSource};
use crate::system::{System, SystemFailure, SystemFn, SystemId};
use std::any::Any;
use std::cell::{RefCell, RefMut};
use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};
use std::panic::{self, AssertUnwindSafe};
use std::rc::Rc;
use std::time::Instant;

/// Callable half of a scheduled system
struct SystemRunner<S> {
    name: String,
    run: SystemFn<S>,
    /// Ticks of the most recent runs, oldest first
    recent_runs: VecDeque<u64>,
}

impl<S> SystemRunner<S> {
    fn new(name: String, run: SystemFn<S>) -> Self {
        Self {
            name,
            run,
            recent_runs: VecDeque::new(),
        }
    }
}

struct LoopInner<S> {
    config: LoopConfig,
    state: S,
    /// Scheduling metadata, in declaration order
    descriptors: Vec<SystemDescriptor>,
    runners: HashMap<SystemId, SystemRunner<S>>,
    schedule: Schedule,
    hooks: HookStorage,
    middlewares: Vec<Middleware<S>>,
    clock: FrameClock,
    failures: VecDeque<SystemFailure>,
    connections: Vec<Connection>,
    next_seq: u64,
}

impl<S> LoopInner<S> {
    fn commit(&mut self, descriptors: Vec<SystemDescriptor>, schedule: Schedule) {
        log::debug!(
            "schedule resolved: {}",
            schedule
                .iter()
                .map(|(event, order)| format!("{}={}", event, order.len()))
                .collect::<Vec<_>>()
                .join(", ")
        );
        self.descriptors = descriptors;
        self.schedule = schedule;
    }

    fn run_frame(&mut self, event: &str, delta_time: f64) {
        let Some(order) = self.schedule.get(event).cloned() else {
            log::trace!("no systems on event '{}'", event);
            return;
        };

        let frame = self.clock.advance(event, delta_time);
        let mut middlewares = std::mem::take(&mut self.middlewares);

        let outcome = {
            let LoopInner {
                config,
                state,
                runners,
                hooks,
                failures,
                ..
            } = self;

            let mut run_systems = |state: &mut S| {
                for id in &order {
                    if let Some(runner) = runners.get_mut(id) {
                        run_system(*id, runner, state, hooks, &frame, config, failures);
                    }
                }
            };
            panic::catch_unwind(AssertUnwindSafe(|| {
                run_chain(&mut middlewares, event, state, &mut run_systems)
            }))
        };

        // Restored before any panic continues, so the next frame is wrapped again
        self.middlewares = middlewares;
        if let Err(payload) = outcome {
            panic::resume_unwind(payload);
        }
    }
}

fn run_system<S>(
    id: SystemId,
    runner: &mut SystemRunner<S>,
    state: &mut S,
    hooks: &mut HookStorage,
    frame: &FrameState,
    config: &LoopConfig,
    failures: &mut VecDeque<SystemFailure>,
) {
    runner.recent_runs.push_back(frame.tick);
    while runner.recent_runs.len() > config.failed_run_hook_window.max(1) {
        runner.recent_runs.pop_front();
    }

    let outcome = {
        let mut ctx = HookContext::new(id, &runner.name, frame, hooks.cells_mut(id));
        let run = &mut runner.run;
        if config.catch_panics {
            panic::catch_unwind(AssertUnwindSafe(|| run(state, &mut ctx)))
        } else {
            Ok(run(state, &mut ctx))
        }
    };

    let (message, panicked) = match outcome {
        Ok(Ok(())) => {
            hooks.sweep(id, frame.tick);
            return;
        }
        Ok(Err(message)) => (message, false),
        Err(payload) => (panic_message(payload.as_ref()), true),
    };

    // Cells from a streak of failed runs would otherwise pile up
    let window = config.failed_run_hook_window;
    if window > 0 && runner.recent_runs.len() >= window {
        if let Some(&oldest) = runner.recent_runs.front() {
            hooks.sweep_idle(id, oldest);
        }
    }

    log::error!(
        "system '{}' {} on event '{}': {}",
        runner.name,
        if panicked { "panicked" } else { "failed" },
        frame.event,
        message
    );

    failures.push_back(SystemFailure {
        system: id,
        name: runner.name.clone(),
        event: frame.event.clone(),
        tick: frame.tick,
        message,
        panicked,
    });
    while failures.len() > config.max_recorded_failures {
        failures.pop_front();
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "Unknown panic".to_string()
    }
}

/// Frame scheduler over loop state `S`
pub struct Loop<S> {
    inner: Rc<RefCell<LoopInner<S>>>,
}

impl<S: 'static> Loop<S> {
    /// Create a loop with the default configuration
    pub fn new(state: S) -> Self {
        Self::with_config(state, LoopConfig::default())
    }

    /// Create a loop with a custom configuration.
    ///
    /// An out-of-range `max_delta_time` is replaced by the default.
    pub fn with_config(state: S, mut config: LoopConfig) -> Self {
        if let Err(err) = config.validate() {
            let fallback = LoopConfig::default().max_delta_time;
            log::warn!("{}; using max_delta_time = {}", err, fallback);
            config.max_delta_time = fallback;
        }
        let clock = FrameClock::new(config.max_delta_time);
        Self {
            inner: Rc::new(RefCell::new(LoopInner {
                config,
                state,
                descriptors: Vec::new(),
                runners: HashMap::new(),
                schedule: Schedule::new(),
                hooks: HookStorage::new(),
                middlewares: Vec::new(),
                clock,
                failures: VecDeque::new(),
                connections: Vec::new(),
                next_seq: 0,
            })),
        }
    }

    fn borrow_mut(&self) -> Result<RefMut<'_, LoopInner<S>>> {
        self.inner.try_borrow_mut().map_err(|_| LoopError::Busy)
    }

    // ========== Scheduling ==========

    /// Add systems and reschedule everything.
    ///
    /// On error nothing is added and the current schedule is kept.
    pub fn schedule_systems(&self, systems: Vec<System<S>>) -> Result<()> {
        let mut inner = self.borrow_mut()?;

        let mut candidate = inner.descriptors.clone();
        let mut known: HashSet<SystemId> = candidate.iter().map(|desc| desc.id).collect();
        let mut added = Vec::with_capacity(systems.len());
        let mut seq = inner.next_seq;

        for system in systems {
            let (id, name, event, priority, after, run) = system.into_parts();
            if !known.insert(id) {
                return Err(ScheduleError::DuplicateSystem { id, name }.into());
            }

            candidate.push(SystemDescriptor {
                id,
                name: name.clone(),
                event: event.unwrap_or_else(|| inner.config.default_event.clone()),
                priority,
                after,
                seq,
            });
            seq += 1;
            added.push((id, SystemRunner::new(name, run)));
        }

        let schedule = resolve(&candidate)?;
        inner.commit(candidate, schedule);
        inner.next_seq = seq;
        inner.runners.extend(added);

        Ok(())
    }

    /// Add one system and reschedule everything
    pub fn schedule_system(&self, system: System<S>) -> Result<()> {
        self.schedule_systems(vec![system])
    }

    /// Remove a system and release its hook state.
    ///
    /// Fails if another system still runs after it.
    pub fn evict_system(&self, id: SystemId) -> Result<()> {
        let mut inner = self.borrow_mut()?;
        if !inner.runners.contains_key(&id) {
            return Err(ScheduleError::SystemNotScheduled(id).into());
        }

        let candidate: Vec<SystemDescriptor> = inner
            .descriptors
            .iter()
            .filter(|desc| desc.id != id)
            .cloned()
            .collect();
        let schedule = resolve(&candidate)?;

        inner.commit(candidate, schedule);
        inner.runners.remove(&id);
        inner.hooks.release(id);

        Ok(())
    }

    /// Swap a scheduled system for a new one.
    ///
    /// The new system takes the old one's place in declaration order,
    /// inherits its hook state, and every `after` edge pointing at the old
    /// system now points at the new one.
    pub fn replace_system(&self, old: SystemId, new: System<S>) -> Result<()> {
        let mut inner = self.borrow_mut()?;
        if !inner.runners.contains_key(&old) {
            return Err(ScheduleError::SystemNotScheduled(old).into());
        }

        let (id, name, event, priority, after, run) = new.into_parts();
        if id != old && inner.runners.contains_key(&id) {
            return Err(ScheduleError::DuplicateSystem { id, name }.into());
        }

        let retarget = |edges: &[SystemId]| -> Vec<SystemId> {
            let mut out: Vec<SystemId> = Vec::with_capacity(edges.len());
            for &edge in edges {
                let edge = if edge == old { id } else { edge };
                if !out.contains(&edge) {
                    out.push(edge);
                }
            }
            out
        };

        let default_event = inner.config.default_event.clone();
        let candidate: Vec<SystemDescriptor> = inner
            .descriptors
            .iter()
            .map(|desc| {
                if desc.id == old {
                    SystemDescriptor {
                        id,
                        name: name.clone(),
                        event: event.clone().unwrap_or_else(|| default_event.clone()),
                        priority,
                        after: retarget(&after),
                        seq: desc.seq,
                    }
                } else {
                    SystemDescriptor {
                        after: retarget(&desc.after),
                        ..desc.clone()
                    }
                }
            })
            .collect();
        let schedule = resolve(&candidate)?;

        inner.commit(candidate, schedule);
        let mut runner = SystemRunner::new(name, run);
        if let Some(previous) = inner.runners.remove(&old) {
            runner.recent_runs = previous.recent_runs;
        }
        inner.runners.insert(id, runner);
        inner.hooks.transfer(old, id);

        Ok(())
    }

    /// Add a middleware.
    ///
    /// `outer` runs once, now, and returns the per-frame function. Later
    /// middleware wraps earlier middleware.
    pub fn add_middleware<F, M>(&self, outer: F) -> Result<()>
    where
        F: FnOnce() -> M,
        M: FnMut(&str, &mut S, &mut dyn FnMut(&mut S)) + 'static,
    {
        let mut inner = self.borrow_mut()?;
        inner.middlewares.push(Box::new(outer()));
        Ok(())
    }

    // ========== Running ==========

    /// Connect to event sources.
    ///
    /// Only events that have at least one scheduled system right now are
    /// connected. Each connection runs a frame of its event every time the
    /// source fires, timing the frame from the previous one (or from this
    /// call). A frame requested while another frame of this loop is running
    /// is skipped.
    pub fn begin<'a, I>(&self, events: I) -> Result<BTreeMap<String, Connection>>
    where
        I: IntoIterator<Item = (&'a str, &'a dyn EventSource)>,
    {
        let mut inner = self.borrow_mut()?;
        let mut connections = BTreeMap::new();
        inner.connections.retain(Connection::is_connected);

        for (event, source) in events {
            if !inner.schedule.get(event).is_some_and(|order| !order.is_empty()) {
                log::debug!("event '{}' has no systems; not connecting", event);
                continue;
            }

            let weak = Rc::downgrade(&self.inner);
            let name = event.to_string();
            let mut last_frame = Instant::now();

            let connection = source.connect_frame(Box::new(move || {
                let Some(inner) = weak.upgrade() else {
                    return;
                };
                let Ok(mut inner) = inner.try_borrow_mut() else {
                    log::warn!("skipping re-entrant '{}' frame", name);
                    return;
                };

                let now = Instant::now();
                let delta_time = now.duration_since(last_frame).as_secs_f64();
                last_frame = now;
                inner.run_frame(&name, delta_time);
            }));

            inner.connections.push(connection.clone());
            connections.insert(event.to_string(), connection);
        }

        Ok(connections)
    }

    /// Run one frame of `event` with an explicit delta time
    pub fn step(&self, event: &str, delta_time: f64) -> Result<()> {
        self.borrow_mut()?.run_frame(event, delta_time);
        Ok(())
    }

    /// Access the loop state between frames
    pub fn with_state<R>(&self, f: impl FnOnce(&mut S) -> R) -> Result<R> {
        let mut inner = self.borrow_mut()?;
        Ok(f(&mut inner.state))
    }

    // ========== Introspection ==========

    /// Resolved run order of an event
    pub fn order(&self, event: &str) -> Result<Vec<SystemId>> {
        let inner = self.inner.try_borrow().map_err(|_| LoopError::Busy)?;
        Ok(inner.schedule.get(event).cloned().unwrap_or_default())
    }

    /// Number of scheduled systems
    pub fn system_count(&self) -> Result<usize> {
        let inner = self.inner.try_borrow().map_err(|_| LoopError::Busy)?;
        Ok(inner.runners.len())
    }

    /// Frames run so far
    pub fn tick(&self) -> Result<u64> {
        let inner = self.inner.try_borrow().map_err(|_| LoopError::Busy)?;
        Ok(inner.clock.tick())
    }

    /// Drain the recorded system failures, oldest first
    pub fn take_failures(&self) -> Result<Vec<SystemFailure>> {
        let mut inner = self.borrow_mut()?;
        Ok(inner.failures.drain(..).collect())
    }

    /// Disconnect every event source, drop all hook state and return the
    /// loop state.
    pub fn shutdown(self) -> Result<S> {
        let inner = Rc::try_unwrap(self.inner).map_err(|_| LoopError::Busy)?;
        let mut inner = inner.into_inner();

        for connection in inner.connections.drain(..) {
            connection.disconnect();
        }
        inner.hooks.clear();
        inner.middlewares.clear();

        log::info!(
            "loop shut down after {} frames with {} systems",
            inner.clock.tick(),
            inner.runners.len()
        );
        Ok(inner.state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hook_key;
    use crate::signal::Signal;
    use std::cell::Cell;

    fn init_logging() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    fn names(lp: &Loop<Vec<String>>, event: &str, systems: &[(SystemId, &str)]) -> Vec<String> {
        lp.order(event)
            .unwrap()
            .iter()
            .map(|id| {
                systems
                    .iter()
                    .find(|(sid, _)| sid == id)
                    .map(|(_, name)| name.to_string())
                    .unwrap()
            })
            .collect()
    }

    fn recorder(name: &'static str) -> System<Vec<String>> {
        System::new(name, move |log: &mut Vec<String>, _ctx: &mut HookContext<'_>| log.push(name.to_string()))
    }

    #[test]
    fn test_step_runs_in_resolved_order() {
        let lp = Loop::new(Vec::new());
        let a = recorder("a").priority(1);
        let b = recorder("b");
        let c = recorder("c").after(b.id());
        let ids = [(a.id(), "a"), (b.id(), "b"), (c.id(), "c")];

        lp.schedule_systems(vec![a, b, c]).unwrap();
        assert_eq!(names(&lp, "default", &ids), vec!["b", "c", "a"]);

        lp.step("default", 0.016).unwrap();
        let log = lp.with_state(|log| log.clone()).unwrap();
        assert_eq!(log, vec!["b", "c", "a"]);
    }

    #[test]
    fn test_failed_schedule_changes_nothing() {
        let lp = Loop::new(Vec::new());
        let a = recorder("a");
        let a_id = a.id();
        lp.schedule_system(a).unwrap();

        let b = recorder("b").priority(-1).after(a_id);
        assert!(matches!(
            lp.schedule_system(b),
            Err(LoopError::Schedule(ScheduleError::PriorityInversion { .. }))
        ));
        assert_eq!(lp.system_count().unwrap(), 1);
        assert_eq!(lp.order("default").unwrap(), vec![a_id]);
    }

    #[test]
    fn test_failure_isolated() {
        init_logging();
        let lp = Loop::new(Vec::new());
        let failing = System::new("failing", |_: &mut Vec<String>, _: &mut HookContext<'_>| -> std::result::Result<(), String> {
            Err("nope".into())
        });
        let panicking = System::new("panicking", |_: &mut Vec<String>, _: &mut HookContext<'_>| -> std::result::Result<(), String> {
            panic!("boom")
        });
        lp.schedule_systems(vec![failing, panicking, recorder("after")]).unwrap();

        lp.step("default", 0.016).unwrap();

        assert_eq!(lp.with_state(|log| log.clone()).unwrap(), vec!["after"]);
        let failures = lp.take_failures().unwrap();
        assert_eq!(failures.len(), 2);
        assert_eq!(failures[0].message, "nope");
        assert!(!failures[0].panicked);
        assert_eq!(failures[1].message, "boom");
        assert!(failures[1].panicked);
        assert!(lp.take_failures().unwrap().is_empty());
    }

    /// Counts drops through a shared counter
    struct DropCount(Rc<Cell<u32>>);

    impl Drop for DropCount {
        fn drop(&mut self) {
            self.0.set(self.0.get() + 1);
        }
    }

    #[test]
    fn test_failing_runs_do_not_accumulate_hook_state() {
        init_logging();
        let config = LoopConfig {
            failed_run_hook_window: 2,
            ..LoopConfig::default()
        };
        let lp = Loop::with_config(Vec::new(), config);
        let dropped = Rc::new(Cell::new(0));
        let counter = dropped.clone();

        let flaky = System::new("flaky", move |_: &mut Vec<String>, ctx: &mut HookContext<'_>| -> std::result::Result<(), String> {
            let tick = ctx.frame().tick;
            ctx.use_hook_state(hook_key!(tick), || DropCount(counter.clone()));
            Err(format!("failed at {}", tick))
        });
        let id = flaky.id();
        lp.schedule_system(flaky).unwrap();

        for _ in 0..5 {
            lp.step("default", 0.0).unwrap();
        }

        assert_eq!(dropped.get(), 3);
        assert_eq!(lp.inner.borrow().hooks.len(id), 2);
        assert_eq!(lp.take_failures().unwrap().len(), 5);
    }

    #[test]
    fn test_failed_run_keeps_recently_used_state() {
        let lp = Loop::new(Vec::new());
        let fail = Rc::new(Cell::new(false));
        let switch = fail.clone();

        let counter = System::new("counter", move |log: &mut Vec<String>, ctx: &mut HookContext<'_>| -> std::result::Result<(), String> {
            if switch.get() {
                return Err("paused".into());
            }
            let runs = ctx.use_hook_state(hook_key!(), || 0u32);
            *runs += 1;
            log.push(runs.to_string());
            Ok(())
        });
        lp.schedule_system(counter).unwrap();

        lp.step("default", 0.0).unwrap();
        fail.set(true);
        lp.step("default", 0.0).unwrap();
        fail.set(false);
        lp.step("default", 0.0).unwrap();

        assert_eq!(lp.with_state(|log| log.clone()).unwrap(), vec!["1", "2"]);
    }

    #[test]
    fn test_evict_releases_hook_state() {
        let lp = Loop::new(Vec::new());
        let stateful = System::new("stateful", |log: &mut Vec<String>, ctx: &mut HookContext<'_>| {
            let runs = ctx.use_hook_state(hook_key!(), || 0u32);
            *runs += 1;
            log.push(runs.to_string());
        });
        let id = stateful.id();
        lp.schedule_system(stateful).unwrap();
        lp.step("default", 0.0).unwrap();

        lp.evict_system(id).unwrap();
        lp.step("default", 0.0).unwrap();
        assert_eq!(lp.with_state(|log| log.len()).unwrap(), 1);
        assert!(matches!(
            lp.evict_system(id),
            Err(LoopError::Schedule(ScheduleError::SystemNotScheduled(_)))
        ));
    }

    #[test]
    fn test_evict_rejected_while_depended_on() {
        let lp = Loop::new(Vec::new());
        let a = recorder("a");
        let a_id = a.id();
        let b = recorder("b").after(a_id);
        lp.schedule_systems(vec![a, b]).unwrap();

        assert!(lp.evict_system(a_id).is_err());
        assert_eq!(lp.system_count().unwrap(), 2);
    }

    #[test]
    fn test_replace_retargets_edges() {
        let lp = Loop::new(Vec::new());
        let a = recorder("a");
        let a_id = a.id();
        let b = recorder("b").after(a_id);
        let b_id = b.id();
        lp.schedule_systems(vec![recorder("first"), a, b]).unwrap();

        let a2 = recorder("a2");
        let a2_id = a2.id();
        lp.replace_system(a_id, a2).unwrap();

        let order = lp.order("default").unwrap();
        let pos = |id| order.iter().position(|x| *x == id).unwrap();
        assert!(pos(a2_id) < pos(b_id));
        assert!(!order.contains(&a_id));
    }

    #[test]
    fn test_middleware_wraps_frame() {
        let lp = Loop::new(Vec::new());
        lp.schedule_system(recorder("system")).unwrap();
        lp.add_middleware(|| {
            |event: &str, log: &mut Vec<String>, next: &mut dyn FnMut(&mut Vec<String>)| {
                log.push(format!("enter {}", event));
                next(log);
                log.push("exit".to_string());
            }
        })
        .unwrap();

        lp.step("default", 0.0).unwrap();
        assert_eq!(
            lp.with_state(|log| log.clone()).unwrap(),
            vec!["enter default", "system", "exit"]
        );
    }

    #[test]
    fn test_panicking_middleware_stays_registered() {
        let lp = Loop::new(Vec::new());
        lp.schedule_system(recorder("system")).unwrap();
        let mut frames = 0;
        lp.add_middleware(move || {
            move |_: &str, log: &mut Vec<String>, next: &mut dyn FnMut(&mut Vec<String>)| {
                frames += 1;
                if frames == 1 {
                    panic!("first frame");
                }
                log.push("wrapped".to_string());
                next(log);
            }
        })
        .unwrap();

        let first = panic::catch_unwind(AssertUnwindSafe(|| lp.step("default", 0.0)));
        assert!(first.is_err());

        lp.step("default", 0.0).unwrap();
        assert_eq!(lp.with_state(|log| log.clone()).unwrap(), vec!["wrapped", "system"]);
    }

    #[test]
    fn test_out_of_range_config_falls_back() {
        init_logging();
        let config = LoopConfig {
            max_delta_time: -1.0,
            ..LoopConfig::default()
        };
        let lp = Loop::with_config(Vec::new(), config);
        lp.schedule_system(System::new("dt", |log: &mut Vec<String>, ctx: &mut HookContext<'_>| {
            log.push(ctx.delta_time().to_string())
        }))
        .unwrap();

        lp.step("default", 1.0).unwrap();
        assert_eq!(lp.with_state(|log| log.clone()).unwrap(), vec!["0.25"]);
    }

    #[test]
    fn test_begin_prunes_disconnected() {
        let lp = Loop::new(Vec::new());
        lp.schedule_system(recorder("render").on_event("render")).unwrap();
        let render = Signal::<()>::new();

        for _ in 0..10 {
            let connections = lp.begin([("render", &render as &dyn EventSource)]).unwrap();
            connections["render"].disconnect();
        }
        let connections = lp.begin([("render", &render as &dyn EventSource)]).unwrap();

        assert_eq!(lp.inner.borrow().connections.len(), 1);
        assert_eq!(render.connection_count(), 1);
        render.fire(&());
        assert_eq!(lp.with_state(|log| log.len()).unwrap(), 1);

        connections["render"].disconnect();
        lp.begin(std::iter::empty::<(&str, &dyn EventSource)>()).unwrap();
        assert!(lp.inner.borrow().connections.is_empty());
    }

    #[test]
    fn test_begin_connects_only_events_with_systems() {
        let lp = Loop::new(Vec::new());
        lp.schedule_system(recorder("render").on_event("render")).unwrap();

        let render = Signal::<()>::new();
        let physics = Signal::<()>::new();
        let connections = lp
            .begin([("render", &render as &dyn EventSource), ("physics", &physics as &dyn EventSource)])
            .unwrap();

        assert_eq!(connections.keys().collect::<Vec<_>>(), vec!["render"]);
        assert_eq!(physics.connection_count(), 0);

        render.fire(&());
        render.fire(&());
        assert_eq!(lp.with_state(|log| log.len()).unwrap(), 2);

        connections["render"].disconnect();
        render.fire(&());
        assert_eq!(lp.with_state(|log| log.len()).unwrap(), 2);
    }

    #[test]
    fn test_shutdown_returns_state() {
        let lp = Loop::new(Vec::new());
        lp.schedule_system(recorder("only")).unwrap();
        let signal = Signal::<()>::new();
        lp.begin([("default", &signal as &dyn EventSource)]).unwrap();
        signal.fire(&());

        let state = lp.shutdown().unwrap();
        assert_eq!(state, vec!["only"]);
        assert_eq!(signal.connection_count(), 0);
    }
}

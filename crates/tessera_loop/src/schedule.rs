//! Schedule resolution
//!
//! Turns system descriptors into one run order per event. The rules:
//!
//! 1. A system runs after every system in its `after` list.
//! 2. `after` targets must be scheduled and on the same event.
//! 3. A dependency may not have a higher priority value than its dependent.
//! 4. Among systems whose dependencies have all run, the lowest priority
//!    value goes first, then the earliest declared.
//!
//! Resolution is a pure function; the loop commits its result only when it
//! succeeds.

use crate::error::ScheduleError;
use crate::system::SystemId;
use std::collections::{BTreeMap, HashMap, HashSet};

/// Scheduling metadata for one system
#[derive(Debug, Clone, PartialEq)]
pub struct SystemDescriptor {
    /// System ID
    pub id: SystemId,
    /// System name
    pub name: String,
    /// Event the system runs on
    pub event: String,
    /// Lower runs first
    pub priority: i32,
    /// Systems that must run before this one
    pub after: Vec<SystemId>,
    /// Declaration sequence, the final tie-breaker
    pub seq: u64,
}

/// Resolved run order for every event
pub type Schedule = BTreeMap<String, Vec<SystemId>>;

/// Resolve descriptors into a run order per event
pub fn resolve(descriptors: &[SystemDescriptor]) -> Result<Schedule, ScheduleError> {
    let by_id: HashMap<SystemId, &SystemDescriptor> =
        descriptors.iter().map(|desc| (desc.id, desc)).collect();

    for desc in descriptors {
        for dependency in &desc.after {
            let Some(target) = by_id.get(dependency) else {
                return Err(ScheduleError::UnknownDependency {
                    system: desc.name.clone(),
                    dependency: *dependency,
                });
            };

            if target.event != desc.event {
                return Err(ScheduleError::CrossEventDependency {
                    system: desc.name.clone(),
                    event: desc.event.clone(),
                    dependency: target.name.clone(),
                    dependency_event: target.event.clone(),
                });
            }

            if target.priority > desc.priority {
                return Err(ScheduleError::PriorityInversion {
                    system: desc.name.clone(),
                    priority: desc.priority,
                    dependency: target.name.clone(),
                    dependency_priority: target.priority,
                });
            }
        }
    }

    let mut groups: BTreeMap<&str, Vec<&SystemDescriptor>> = BTreeMap::new();
    for desc in descriptors {
        groups.entry(desc.event.as_str()).or_default().push(desc);
    }

    let mut schedule = Schedule::new();
    for (event, mut group) in groups {
        group.sort_by_key(|desc| desc.seq);
        schedule.insert(event.to_string(), order_group(event, &group)?);
    }

    Ok(schedule)
}

/// Order one event's systems, which must all live on that event
fn order_group(event: &str, group: &[&SystemDescriptor]) -> Result<Vec<SystemId>, ScheduleError> {
    let mut pending: HashMap<SystemId, usize> = group
        .iter()
        .map(|desc| (desc.id, desc.after.iter().collect::<HashSet<_>>().len()))
        .collect();
    let mut placed = vec![false; group.len()];
    let mut order = Vec::with_capacity(group.len());

    while order.len() < group.len() {
        let next = group
            .iter()
            .enumerate()
            .filter(|(idx, desc)| !placed[*idx] && pending.get(&desc.id) == Some(&0))
            .min_by_key(|(_, desc)| (desc.priority, desc.seq))
            .map(|(idx, _)| idx);

        let Some(idx) = next else {
            let systems = group
                .iter()
                .enumerate()
                .filter(|(idx, _)| !placed[*idx])
                .map(|(_, desc)| desc.name.clone())
                .collect();
            return Err(ScheduleError::Cycle {
                event: event.to_string(),
                systems,
            });
        };

        placed[idx] = true;
        let id = group[idx].id;
        order.push(id);

        for desc in group {
            if desc.after.contains(&id) {
                if let Some(count) = pending.get_mut(&desc.id) {
                    *count -= 1;
                }
            }
        }
    }

    Ok(order)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::system::System;

    struct Fixture {
        ids: Vec<SystemId>,
        descriptors: Vec<SystemDescriptor>,
    }

    impl Fixture {
        fn new(count: usize) -> Self {
            let ids = (0..count)
                .map(|_| System::<()>::new("fixture", |_, _| {}).id())
                .collect();
            Self {
                ids,
                descriptors: Vec::new(),
            }
        }

        fn add(&mut self, idx: usize, event: &str, priority: i32, after: &[usize]) -> &mut Self {
            self.descriptors.push(SystemDescriptor {
                id: self.ids[idx],
                name: format!("s{}", idx),
                event: event.to_string(),
                priority,
                after: after.iter().map(|&i| self.ids[i]).collect(),
                seq: self.descriptors.len() as u64,
            });
            self
        }

        fn order(&self, event: &str) -> Vec<usize> {
            let schedule = resolve(&self.descriptors).unwrap();
            schedule[event]
                .iter()
                .map(|id| self.ids.iter().position(|x| x == id).unwrap())
                .collect()
        }
    }

    #[test]
    fn test_declaration_order_breaks_ties() {
        let mut f = Fixture::new(3);
        f.add(2, "default", 0, &[]).add(0, "default", 0, &[]).add(1, "default", 0, &[]);

        assert_eq!(f.order("default"), vec![2, 0, 1]);
    }

    #[test]
    fn test_priority_orders_ready_systems() {
        let mut f = Fixture::new(3);
        f.add(0, "default", 5, &[]).add(1, "default", -1, &[]).add(2, "default", 0, &[]);

        assert_eq!(f.order("default"), vec![1, 2, 0]);
    }

    #[test]
    fn test_after_edges_point_earlier() {
        let mut f = Fixture::new(3);
        f.add(0, "default", 0, &[1]).add(1, "default", 0, &[2]).add(2, "default", 0, &[]);

        assert_eq!(f.order("default"), vec![2, 1, 0]);
    }

    #[test]
    fn test_events_are_grouped() {
        let mut f = Fixture::new(3);
        f.add(0, "render", 0, &[]).add(1, "default", 0, &[]).add(2, "render", 0, &[0]);

        let schedule = resolve(&f.descriptors).unwrap();
        assert_eq!(schedule.len(), 2);
        assert_eq!(f.order("render"), vec![0, 2]);
        assert_eq!(f.order("default"), vec![1]);
    }

    #[test]
    fn test_priority_inversion_rejected() {
        // A depends on B, but B has the higher priority value
        let mut f = Fixture::new(2);
        f.add(0, "default", 0, &[1]).add(1, "default", 1, &[]);

        assert!(matches!(
            resolve(&f.descriptors),
            Err(ScheduleError::PriorityInversion { .. })
        ));

        let mut ok = Fixture::new(2);
        ok.add(0, "default", 1, &[1]).add(1, "default", 0, &[]);
        assert_eq!(ok.order("default"), vec![1, 0]);
    }

    #[test]
    fn test_cycle_rejected() {
        let mut f = Fixture::new(3);
        f.add(0, "default", 0, &[1]).add(1, "default", 0, &[0]).add(2, "default", 0, &[]);

        match resolve(&f.descriptors) {
            Err(ScheduleError::Cycle { event, systems }) => {
                assert_eq!(event, "default");
                assert_eq!(systems, vec!["s0".to_string(), "s1".to_string()]);
            }
            other => panic!("expected cycle, got {:?}", other),
        }
    }

    #[test]
    fn test_cross_event_rejected() {
        let mut f = Fixture::new(2);
        f.add(0, "render", 0, &[1]).add(1, "default", 0, &[]);

        assert!(matches!(
            resolve(&f.descriptors),
            Err(ScheduleError::CrossEventDependency { .. })
        ));
    }

    #[test]
    fn test_unknown_dependency_rejected() {
        let mut f = Fixture::new(2);
        f.add(0, "default", 0, &[1]);

        assert!(matches!(
            resolve(&f.descriptors),
            Err(ScheduleError::UnknownDependency { .. })
        ));
    }
}

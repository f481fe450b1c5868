//! Breakdown injector
//!
//! Turns the configured breakdown windows into kernel events and applies them
//! to every station of the affected machine type. Overlapping windows on the
//! same machine type keep the stations down until the last one closes.

use crate::line::{InFlightOperation, ResumedOperation, RoutingEngine, Station};
use crate::simulation::{EventKind, EventQueue, SimulationResult};
use crate::types::{Breakdown, MachineType};
use std::collections::BTreeMap;
use tracing::debug;

/// Schedules breakdown windows and takes stations down and back up
#[derive(Debug, Clone)]
pub struct BreakdownInjector {
    breakdowns: Vec<Breakdown>,
    active: BTreeMap<MachineType, u32>,
}

impl BreakdownInjector {
    /// Create an injector over the configured breakdowns
    pub fn new(breakdowns: &[Breakdown]) -> Self {
        Self { breakdowns: breakdowns.to_vec(), active: BTreeMap::new() }
    }

    /// Schedule the start and end event of every window
    pub fn schedule(&self, queue: &mut EventQueue) -> SimulationResult<()> {
        for (index, breakdown) in self.breakdowns.iter().enumerate() {
            queue.schedule(breakdown.start_offset_hours, EventKind::BreakdownStart { breakdown: index })?;
            queue.schedule(breakdown.end_offset_hours(), EventKind::BreakdownEnd { breakdown: index })?;
        }
        Ok(())
    }

    /// Open a window; returns the operations that were due exactly now, per station
    pub fn start(
        &mut self,
        index: usize,
        now: f64,
        routing: &RoutingEngine,
        stations: &mut [Station],
    ) -> Vec<(usize, InFlightOperation)> {
        let Some(breakdown) = self.breakdowns.get(index) else {
            return Vec::new();
        };
        let count = self.active.entry(breakdown.machine_type.clone()).or_insert(0);
        *count += 1;
        if *count > 1 {
            return Vec::new();
        }

        debug!(machine_type = %breakdown.machine_type, time = now, "Breakdown started");
        let mut due_now = Vec::new();
        for &station in routing.stations_for(&breakdown.machine_type) {
            due_now.extend(stations[station].break_down(now).into_iter().map(|op| (station, op)));
        }
        due_now
    }

    /// Close a window; returns the completions to reschedule, per station
    pub fn end(
        &mut self,
        index: usize,
        now: f64,
        routing: &RoutingEngine,
        stations: &mut [Station],
        next_ticket: &mut u64,
    ) -> Vec<(usize, ResumedOperation)> {
        let Some(breakdown) = self.breakdowns.get(index) else {
            return Vec::new();
        };
        let count = self.active.entry(breakdown.machine_type.clone()).or_insert(0);
        *count = count.saturating_sub(1);
        if *count > 0 {
            return Vec::new();
        }

        debug!(machine_type = %breakdown.machine_type, time = now, "Breakdown repaired");
        let mut resumed = Vec::new();
        for &station in routing.stations_for(&breakdown.machine_type) {
            resumed.extend(stations[station].repair(now, next_ticket).into_iter().map(|op| (station, op)));
        }
        resumed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::line::build_stations;
    use crate::types::defaults::{default_configuration, DefaultConfigParams};
    use crate::types::{StationStatus, WorkItemId};

    fn setup(breakdowns: Vec<Breakdown>) -> (BreakdownInjector, RoutingEngine, Vec<Station>) {
        let mut config = default_configuration(&DefaultConfigParams::default());
        config.breakdowns = breakdowns;
        let stations = build_stations(&config);
        let routing = RoutingEngine::new(&config, &stations);
        (BreakdownInjector::new(&config.breakdowns), routing, stations)
    }

    fn sewing_window(start: f64, duration: f64) -> Breakdown {
        Breakdown {
            machine_type: MachineType::from("sewing"),
            start_offset_hours: start,
            duration_hours: duration,
        }
    }

    #[test]
    fn test_schedule_emits_start_and_end() {
        let (injector, _, _) = setup(vec![sewing_window(1.0, 0.5)]);
        let mut queue = EventQueue::new();
        injector.schedule(&mut queue).unwrap();

        let first = queue.pop().unwrap().unwrap();
        assert_eq!(first.time, 1.0);
        assert_eq!(first.kind, EventKind::BreakdownStart { breakdown: 0 });
        let second = queue.pop().unwrap().unwrap();
        assert_eq!(second.time, 1.5);
        assert_eq!(second.kind, EventKind::BreakdownEnd { breakdown: 0 });
    }

    #[test]
    fn test_all_stations_of_type_go_down() {
        let (mut injector, routing, mut stations) = setup(vec![sewing_window(1.0, 0.5)]);
        let sewing: Vec<usize> = routing.stations_for(&MachineType::from("sewing")).to_vec();

        injector.start(0, 1.0, &routing, &mut stations);
        for &s in &sewing {
            assert_eq!(stations[s].status(), StationStatus::Down);
        }
        let others = stations.iter().filter(|s| s.status() == StationStatus::Down).count();
        assert_eq!(others, sewing.len());

        let mut ticket = 0;
        injector.end(0, 1.5, &routing, &mut stations, &mut ticket);
        assert!(stations.iter().all(|s| s.status() == StationStatus::Idle));
    }

    #[test]
    fn test_overlapping_windows_keep_station_down() {
        let (mut injector, routing, mut stations) =
            setup(vec![sewing_window(1.0, 2.0), sewing_window(2.0, 2.0)]);
        let s = routing.stations_for(&MachineType::from("sewing"))[0];
        stations[s].enqueue(WorkItemId(1));
        stations[s].start(0.5, 1, 1.0, 0).unwrap();

        injector.start(0, 1.0, &routing, &mut stations);
        injector.start(1, 2.0, &routing, &mut stations);

        let mut ticket = 1;
        assert!(injector.end(0, 3.0, &routing, &mut stations, &mut ticket).is_empty());
        assert!(stations[s].is_down());

        let resumed = injector.end(1, 4.0, &routing, &mut stations, &mut ticket);
        assert_eq!(resumed.len(), 1);
        assert_eq!(resumed[0].0, s);
        assert!((resumed[0].1.due - 4.5).abs() < 1e-12);
    }
}

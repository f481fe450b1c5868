//! Station and resource model
//!
//! A station instance owns a FIFO queue of waiting units, the operations it is
//! currently running and the operators available to run them (fixed slots plus
//! floating workers currently assigned). Stations are mutated only by the
//! simulation kernel.

use crate::types::{LineConfig, MachineType, StationId, StationStatus, WorkItemId, WorkerId};
use std::collections::VecDeque;

/// Remaining time at or below this is treated as due now
pub const TIME_EPSILON: f64 = 1e-9;

/// An operation being performed at a station
#[derive(Debug, Clone, PartialEq)]
pub struct InFlightOperation {
    /// Unit being processed
    pub item: WorkItemId,
    /// Operators tied up by this operation
    pub operators: u32,
    /// Ticket of the pending completion event; superseded on pause
    pub ticket: u64,
    /// Time the operation first started
    pub started_at: f64,
    /// Completion time while running
    pub due: f64,
    /// Remaining processing time while paused
    pub remaining: Option<f64>,
}

impl InFlightOperation {
    /// True while the operation is suspended by a breakdown or break
    pub fn is_paused(&self) -> bool {
        self.remaining.is_some()
    }
}

/// A completion to schedule after a station resumes
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResumedOperation {
    /// New ticket of the operation
    pub ticket: u64,
    /// New completion time
    pub due: f64,
}

/// Runtime state of one station instance
#[derive(Debug, Clone)]
pub struct Station {
    /// Instance identifier, `"{machine_type}-{n}"`
    pub id: StationId,
    /// Machine type provided
    pub machine_type: MachineType,
    /// Fixed operators
    pub operator_slots: u32,
    floating_workers: Vec<WorkerId>,
    queue: VecDeque<WorkItemId>,
    in_flight: Vec<InFlightOperation>,
    operators_in_use: u32,
    is_down: bool,
    on_break: bool,
    peak_queue_length: usize,
    operations_completed: u64,
}

impl Station {
    /// Create an idle station with an empty queue
    pub fn new(id: StationId, machine_type: MachineType, operator_slots: u32) -> Self {
        Self {
            id,
            machine_type,
            operator_slots,
            floating_workers: Vec::new(),
            queue: VecDeque::new(),
            in_flight: Vec::new(),
            operators_in_use: 0,
            is_down: false,
            on_break: false,
            peak_queue_length: 0,
            operations_completed: 0,
        }
    }

    /// Fixed slots plus floating workers currently assigned
    pub fn assigned_operator_count(&self) -> u32 {
        self.operator_slots + self.floating_workers.len() as u32
    }

    /// Operators tied up by running or paused operations
    pub fn operators_in_use(&self) -> u32 {
        self.operators_in_use
    }

    /// Operators not tied up by any operation
    pub fn free_operators(&self) -> u32 {
        self.assigned_operator_count().saturating_sub(self.operators_in_use)
    }

    /// Current status
    pub fn status(&self) -> StationStatus {
        if self.is_down {
            StationStatus::Down
        } else if self.operators_in_use > 0 {
            StationStatus::Busy
        } else {
            StationStatus::Idle
        }
    }

    /// True while broken down
    pub fn is_down(&self) -> bool {
        self.is_down
    }

    /// True during a scheduled break
    pub fn is_on_break(&self) -> bool {
        self.on_break
    }

    /// True when neither broken down nor on break
    pub fn is_working(&self) -> bool {
        !self.is_down && !self.on_break
    }

    /// Units waiting plus operations in flight
    pub fn load(&self) -> usize {
        self.queue.len() + self.in_flight.len()
    }

    /// Units waiting
    pub fn queue_len(&self) -> usize {
        self.queue.len()
    }

    /// Longest queue seen during the run
    pub fn peak_queue_length(&self) -> usize {
        self.peak_queue_length
    }

    /// Operations finished at this station
    pub fn operations_completed(&self) -> u64 {
        self.operations_completed
    }

    /// Operations running or paused
    pub fn in_flight(&self) -> &[InFlightOperation] {
        &self.in_flight
    }

    /// Floating workers currently assigned
    pub fn floating_workers(&self) -> &[WorkerId] {
        &self.floating_workers
    }

    /// Unit at the head of the queue
    pub fn head(&self) -> Option<WorkItemId> {
        self.queue.front().copied()
    }

    /// Append a unit to the queue
    pub fn enqueue(&mut self, item: WorkItemId) {
        self.queue.push_back(item);
        self.peak_queue_length = self.peak_queue_length.max(self.queue.len());
    }

    /// Whether the queue head can start with `operators_required` operators
    pub fn can_start(&self, operators_required: u32) -> bool {
        self.is_working() && !self.queue.is_empty() && self.free_operators() >= operators_required
    }

    /// Start the queue head; returns the unit and its completion time
    pub fn start(
        &mut self,
        now: f64,
        operators_required: u32,
        duration: f64,
        ticket: u64,
    ) -> Option<(WorkItemId, f64)> {
        if !self.can_start(operators_required) {
            return None;
        }
        let item = self.queue.pop_front()?;
        let due = now + duration;
        self.operators_in_use += operators_required;
        self.in_flight.push(InFlightOperation {
            item,
            operators: operators_required,
            ticket,
            started_at: now,
            due,
            remaining: None,
        });
        Some((item, due))
    }

    /// Finish the running operation holding `ticket`
    ///
    /// Returns `None` for a stale ticket (the operation was paused, resumed
    /// under a new ticket or already completed).
    pub fn finish(&mut self, ticket: u64) -> Option<InFlightOperation> {
        let position = self
            .in_flight
            .iter()
            .position(|op| op.ticket == ticket && !op.is_paused())?;
        Some(self.release(position))
    }

    fn release(&mut self, position: usize) -> InFlightOperation {
        let op = self.in_flight.remove(position);
        self.operators_in_use -= op.operators;
        self.operations_completed += 1;
        op
    }

    /// Take the station down; returns operations that were due exactly now
    pub fn break_down(&mut self, now: f64) -> Vec<InFlightOperation> {
        let was_working = self.is_working();
        self.is_down = true;
        if was_working {
            self.pause(now)
        } else {
            Vec::new()
        }
    }

    /// Bring the station back up; returns completions to reschedule
    pub fn repair(&mut self, now: f64, next_ticket: &mut u64) -> Vec<ResumedOperation> {
        self.is_down = false;
        if self.is_working() {
            self.resume(now, next_ticket)
        } else {
            Vec::new()
        }
    }

    /// Enter a scheduled break; returns operations that were due exactly now
    pub fn begin_break(&mut self, now: f64) -> Vec<InFlightOperation> {
        let was_working = self.is_working();
        self.on_break = true;
        if was_working {
            self.pause(now)
        } else {
            Vec::new()
        }
    }

    /// Leave a scheduled break; returns completions to reschedule
    pub fn end_break(&mut self, now: f64, next_ticket: &mut u64) -> Vec<ResumedOperation> {
        self.on_break = false;
        if self.is_working() {
            self.resume(now, next_ticket)
        } else {
            Vec::new()
        }
    }

    fn pause(&mut self, now: f64) -> Vec<InFlightOperation> {
        let mut due_now = Vec::new();
        let mut index = 0;
        while index < self.in_flight.len() {
            let remaining = self.in_flight[index].due - now;
            if remaining <= TIME_EPSILON {
                due_now.push(self.release(index));
            } else {
                self.in_flight[index].remaining = Some(remaining);
                index += 1;
            }
        }
        due_now
    }

    fn resume(&mut self, now: f64, next_ticket: &mut u64) -> Vec<ResumedOperation> {
        let mut resumed = Vec::new();
        for op in &mut self.in_flight {
            if let Some(remaining) = op.remaining.take() {
                op.ticket = *next_ticket;
                *next_ticket += 1;
                op.due = now + remaining;
                resumed.push(ResumedOperation { ticket: op.ticket, due: op.due });
            }
        }
        resumed
    }

    /// Assign a floating worker to this station
    pub fn assign_worker(&mut self, worker: WorkerId) {
        self.floating_workers.push(worker);
        self.floating_workers.sort();
    }

    /// Release a floating worker; refused when it would strand a running operation
    pub fn release_worker(&mut self, worker: WorkerId) -> bool {
        if self.free_operators() == 0 {
            return false;
        }
        match self.floating_workers.iter().position(|w| *w == worker) {
            Some(position) => {
                self.floating_workers.remove(position);
                true
            }
            None => false,
        }
    }
}

/// Expand the configured station specs into station instances, in configuration order
pub fn build_stations(config: &LineConfig) -> Vec<Station> {
    config
        .stations
        .iter()
        .flat_map(|spec| {
            (1..=spec.count).map(move |n| {
                Station::new(
                    StationId::for_instance(&spec.machine_type, n as usize),
                    spec.machine_type.clone(),
                    spec.operator_slots,
                )
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::defaults::{default_configuration, DefaultConfigParams};

    fn station(slots: u32) -> Station {
        Station::new(StationId::from("sewing-1"), MachineType::from("sewing"), slots)
    }

    #[test]
    fn test_build_stations_expands_counts() {
        let config = default_configuration(&DefaultConfigParams::default());
        let stations = build_stations(&config);

        let expected: u32 = config.stations.iter().map(|s| s.count).sum();
        assert_eq!(stations.len(), expected as usize);
        assert!(stations.iter().any(|s| s.id.as_str() == "sewing-2"));
        assert!(stations.iter().all(|s| s.status() == StationStatus::Idle));
    }

    #[test]
    fn test_strict_fifo_start() {
        let mut s = station(2);
        s.enqueue(WorkItemId(1));
        s.enqueue(WorkItemId(2));
        assert_eq!(s.peak_queue_length(), 2);

        assert_eq!(s.start(0.0, 2, 0.5, 0), Some((WorkItemId(1), 0.5)));
        assert_eq!(s.status(), StationStatus::Busy);
        assert_eq!(s.free_operators(), 0);

        // Head blocks until operators free up
        assert!(!s.can_start(1));
        assert_eq!(s.start(0.0, 1, 0.5, 1), None);
        assert_eq!(s.head(), Some(WorkItemId(2)));

        let done = s.finish(0).unwrap();
        assert_eq!(done.item, WorkItemId(1));
        assert_eq!(s.free_operators(), 2);
        assert_eq!(s.operations_completed(), 1);
        assert_eq!(s.status(), StationStatus::Idle);
    }

    #[test]
    fn test_breakdown_pauses_and_resumes() {
        let mut s = station(1);
        s.enqueue(WorkItemId(1));
        s.start(1.0, 1, 0.5, 7).unwrap();

        assert!(s.break_down(1.2).is_empty());
        assert_eq!(s.status(), StationStatus::Down);
        // The pending completion is now stale
        assert!(s.finish(7).is_none());

        let mut next_ticket = 8;
        let resumed = s.repair(2.0, &mut next_ticket);
        assert_eq!(resumed.len(), 1);
        assert_eq!(resumed[0].ticket, 8);
        assert!((resumed[0].due - 2.3).abs() < 1e-12);
        assert_eq!(next_ticket, 9);

        assert!(s.finish(8).is_some());
    }

    #[test]
    fn test_due_now_work_completes_at_pause() {
        let mut s = station(1);
        s.enqueue(WorkItemId(1));
        s.start(0.0, 1, 2.0, 0).unwrap();

        let due = s.break_down(2.0);
        assert_eq!(due.len(), 1);
        assert_eq!(due[0].item, WorkItemId(1));
        assert!(s.in_flight().is_empty());
        assert_eq!(s.operators_in_use(), 0);
    }

    #[test]
    fn test_break_during_breakdown_keeps_work_paused() {
        let mut s = station(1);
        s.enqueue(WorkItemId(1));
        s.start(0.0, 1, 1.0, 0).unwrap();
        s.break_down(0.5);
        s.begin_break(0.6);

        let mut next_ticket = 1;
        assert!(s.repair(0.7, &mut next_ticket).is_empty());
        assert!(!s.is_working());

        let resumed = s.end_break(1.0, &mut next_ticket);
        assert_eq!(resumed.len(), 1);
        assert!((resumed[0].due - 1.5).abs() < 1e-12);
    }

    #[test]
    fn test_floating_workers_add_capacity() {
        let mut s = station(1);
        s.assign_worker(WorkerId(2));
        s.assign_worker(WorkerId(1));
        assert_eq!(s.assigned_operator_count(), 3);
        assert_eq!(s.floating_workers(), &[WorkerId(1), WorkerId(2)]);

        s.enqueue(WorkItemId(1));
        s.start(0.0, 3, 1.0, 0).unwrap();
        // Every operator is mid-operation
        assert!(!s.release_worker(WorkerId(1)));

        s.finish(0).unwrap();
        assert!(s.release_worker(WorkerId(1)));
        assert!(!s.release_worker(WorkerId(9)));
        assert_eq!(s.assigned_operator_count(), 2);
    }
}

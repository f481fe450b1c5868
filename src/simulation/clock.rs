//! Event clock
//!
//! Time-ordered event queue of the simulation kernel. Events are ordered by
//! `(timestamp, sequence_number)`; the sequence number is assigned when an
//! event is scheduled, so events stamped with the same time pop in the order
//! they were scheduled.

use crate::simulation::{SimulationError, SimulationResult};
use crate::types::{BoundaryKind, WorkItemId};
use std::cmp::Ordering;
use std::collections::BinaryHeap;

/// Sequence number reserved for the horizon sentinel, so it pops after every
/// other event stamped at the horizon
const HORIZON_SEQUENCE: u64 = u64::MAX;

/// Kinds of events processed by the kernel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    /// A unit of the given demand line enters the system
    Arrival {
        /// Index into the configuration's demand list
        demand_index: usize,
    },
    /// A station accepted a unit. Executed inline when capacity frees up and
    /// recorded in the event log, never queued.
    OperationStart {
        /// Station index
        station: usize,
        /// Unit started
        item: WorkItemId,
    },
    /// An operation finishes; stale if the ticket was superseded by a pause
    OperationComplete {
        /// Station index
        station: usize,
        /// Ticket of the operation attempt
        ticket: u64,
    },
    /// A breakdown window opens
    BreakdownStart {
        /// Index into the configuration's breakdown list
        breakdown: usize,
    },
    /// A breakdown window closes
    BreakdownEnd {
        /// Index into the configuration's breakdown list
        breakdown: usize,
    },
    /// Day rollover, break start/end or allocator checkpoint
    ShiftBoundary(BoundaryKind),
    /// End of the simulated horizon
    HorizonEnd,
}

/// An event with its position on the timeline
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScheduledEvent {
    /// Simulated time in hours
    pub time: f64,
    /// Tie-breaker assigned at scheduling time
    pub sequence: u64,
    /// What happens
    pub kind: EventKind,
}

impl Eq for ScheduledEvent {}

impl Ord for ScheduledEvent {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reversed: BinaryHeap is a max-heap and the earliest event must pop first
        other
            .time
            .total_cmp(&self.time)
            .then_with(|| other.sequence.cmp(&self.sequence))
    }
}

impl PartialOrd for ScheduledEvent {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Priority queue of pending events plus the current simulated time
#[derive(Debug, Default)]
pub struct EventQueue {
    heap: BinaryHeap<ScheduledEvent>,
    next_sequence: u64,
    now: f64,
    started: bool,
}

impl EventQueue {
    /// Create an empty queue at time zero
    pub fn new() -> Self {
        Self::default()
    }

    /// Current simulated time (time of the last popped event)
    pub fn now(&self) -> f64 {
        self.now
    }

    /// Number of pending events
    pub fn len(&self) -> usize {
        self.heap.len()
    }

    /// True when no event is pending
    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    /// Schedule an event
    ///
    /// Before the first pop any non-negative time is accepted. Afterwards the
    /// time must be strictly greater than the current time.
    pub fn schedule(&mut self, time: f64, kind: EventKind) -> SimulationResult<u64> {
        let in_order = if self.started { time > self.now } else { time >= self.now };
        if !time.is_finite() || !in_order {
            return Err(SimulationError::NonMonotonicTime { now: self.now, scheduled: time });
        }

        let sequence = self.next_sequence;
        self.next_sequence += 1;
        self.heap.push(ScheduledEvent { time, sequence, kind });
        Ok(sequence)
    }

    /// Schedule the horizon sentinel; it pops after every other event at `horizon`
    pub fn seal_horizon(&mut self, horizon: f64) -> SimulationResult<()> {
        if !horizon.is_finite() || horizon < self.now {
            return Err(SimulationError::NonMonotonicTime { now: self.now, scheduled: horizon });
        }
        self.heap.push(ScheduledEvent {
            time: horizon,
            sequence: HORIZON_SEQUENCE,
            kind: EventKind::HorizonEnd,
        });
        Ok(())
    }

    /// Pop the earliest event and advance the clock to it
    pub fn pop(&mut self) -> SimulationResult<Option<ScheduledEvent>> {
        let Some(event) = self.heap.pop() else {
            return Ok(None);
        };
        if event.time < self.now {
            return Err(SimulationError::NonMonotonicTime { now: self.now, scheduled: event.time });
        }
        self.now = event.time;
        self.started = true;
        Ok(Some(event))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn arrival(i: usize) -> EventKind {
        EventKind::Arrival { demand_index: i }
    }

    #[test]
    fn test_pops_in_time_order() {
        let mut queue = EventQueue::new();
        queue.schedule(3.0, arrival(0)).unwrap();
        queue.schedule(1.0, arrival(1)).unwrap();
        queue.schedule(2.0, arrival(2)).unwrap();

        let times: Vec<f64> = std::iter::from_fn(|| queue.pop().unwrap()).map(|e| e.time).collect();
        assert_eq!(times, vec![1.0, 2.0, 3.0]);
        assert_eq!(queue.now(), 3.0);
    }

    #[test]
    fn test_ties_break_by_sequence() {
        let mut queue = EventQueue::new();
        for i in 0..5 {
            queue.schedule(1.0, arrival(i)).unwrap();
        }

        let order: Vec<EventKind> = std::iter::from_fn(|| queue.pop().unwrap()).map(|e| e.kind).collect();
        assert_eq!(order, (0..5).map(arrival).collect::<Vec<_>>());
    }

    #[test]
    fn test_horizon_sentinel_pops_last_at_its_time() {
        let mut queue = EventQueue::new();
        queue.seal_horizon(8.0).unwrap();
        queue.schedule(8.0, arrival(0)).unwrap();
        queue.schedule(9.0, arrival(1)).unwrap();

        assert_eq!(queue.pop().unwrap().unwrap().kind, arrival(0));
        assert_eq!(queue.pop().unwrap().unwrap().kind, EventKind::HorizonEnd);
        assert_eq!(queue.pop().unwrap().map(|e| e.time), Some(9.0));
    }

    #[test]
    fn test_rejects_non_increasing_time_after_start() {
        let mut queue = EventQueue::new();
        queue.schedule(0.0, arrival(0)).unwrap();
        queue.schedule(0.0, arrival(1)).unwrap();
        queue.pop().unwrap();

        // Same timestamp as the event just processed
        let err = queue.schedule(0.0, arrival(2)).unwrap_err();
        assert!(matches!(err, SimulationError::NonMonotonicTime { now, scheduled } if now == 0.0 && scheduled == 0.0));
        assert!(err.is_internal());

        assert!(queue.schedule(0.5, arrival(3)).is_ok());
    }

    #[test]
    fn test_rejects_non_finite_time() {
        let mut queue = EventQueue::new();
        assert!(queue.schedule(f64::NAN, arrival(0)).is_err());
        assert!(queue.schedule(f64::INFINITY, arrival(0)).is_err());
        assert!(queue.is_empty());
    }
}

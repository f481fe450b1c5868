//! Floating-pool allocator
//!
//! Moves cross-trained workers toward the current bottleneck. The allocator is
//! evaluated at shift boundaries (and optional periodic checkpoints) and looks
//! at each station's utilization over the window since the previous
//! evaluation. At most one worker moves per evaluation.

use crate::line::Station;
use crate::types::{AllocatorConfig, StationId, WorkerId};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// A cross-trained worker
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FloatingWorker {
    /// Worker identifier
    pub id: WorkerId,
    /// Station index the worker is assigned to, if any
    pub assigned_station: Option<usize>,
}

/// One logged worker move
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reassignment {
    /// Simulated time of the move
    pub time_hours: f64,
    /// Worker moved
    pub worker: WorkerId,
    /// Donor station, or `None` when the worker came from the unassigned pool
    pub from_station: Option<StationId>,
    /// Receiving station
    pub to_station: StationId,
    /// Trailing utilization of the receiving station, percent
    pub target_utilization: f64,
    /// Trailing utilization of the donor station, percent
    pub donor_utilization: Option<f64>,
}

/// Allocates floating workers between stations
#[derive(Debug, Clone)]
pub struct FloatingPoolAllocator {
    workers: Vec<FloatingWorker>,
    bottleneck_threshold: f64,
    donor_threshold: f64,
    window_start_busy: Vec<f64>,
    window_start_elapsed: f64,
    log: Vec<Reassignment>,
}

impl FloatingPoolAllocator {
    /// Create a pool of `pool_size` unassigned workers for `station_count` stations
    pub fn new(pool_size: u32, settings: &AllocatorConfig, station_count: usize) -> Self {
        Self {
            workers: (1..=pool_size)
                .map(|n| FloatingWorker { id: WorkerId(n), assigned_station: None })
                .collect(),
            bottleneck_threshold: settings.bottleneck_threshold,
            donor_threshold: settings.donor_threshold,
            window_start_busy: vec![0.0; station_count],
            window_start_elapsed: 0.0,
            log: Vec::new(),
        }
    }

    /// Workers currently assigned to a station
    pub fn assigned_count(&self) -> usize {
        self.workers.iter().filter(|w| w.assigned_station.is_some()).count()
    }

    /// Moves made so far
    pub fn reassignments(&self) -> &[Reassignment] {
        &self.log
    }

    /// Evaluate the pool and make at most one move
    ///
    /// `busy_hours` holds each station's cumulative busy time and
    /// `elapsed_hours` the cumulative working time. Returns the index of the
    /// station that received a worker. Windows without working time (a
    /// boundary right after a break) are skipped and not reset.
    pub fn evaluate(
        &mut self,
        now: f64,
        stations: &mut [Station],
        busy_hours: &[f64],
        elapsed_hours: f64,
    ) -> Option<usize> {
        let window = elapsed_hours - self.window_start_elapsed;
        if window <= 0.0 {
            return None;
        }

        let utilization: Vec<f64> = busy_hours
            .iter()
            .zip(&self.window_start_busy)
            .map(|(busy, start)| ((busy - start) / window * 100.0).clamp(0.0, 100.0))
            .collect();
        self.window_start_busy = busy_hours.to_vec();
        self.window_start_elapsed = elapsed_hours;

        if self.workers.is_empty() {
            return None;
        }

        let target = highest_at_or_above(&utilization, self.bottleneck_threshold)?;
        debug!(
            station = %stations[target].id,
            utilization = utilization[target],
            "Floating pool target identified"
        );

        let (worker_index, donor) = match self.workers.iter().position(|w| w.assigned_station.is_none()) {
            Some(index) => (index, None),
            None => {
                let donor = self.pick_donor(&utilization, stations, target)?;
                let worker_index = self
                    .workers
                    .iter()
                    .position(|w| w.assigned_station == Some(donor))?;
                (worker_index, Some(donor))
            }
        };

        let worker = self.workers[worker_index].id;
        if let Some(donor) = donor {
            if !stations[donor].release_worker(worker) {
                return None;
            }
        }
        stations[target].assign_worker(worker);
        self.workers[worker_index].assigned_station = Some(target);

        let reassignment = Reassignment {
            time_hours: now,
            worker,
            from_station: donor.map(|d| stations[d].id.clone()),
            to_station: stations[target].id.clone(),
            target_utilization: utilization[target],
            donor_utilization: donor.map(|d| utilization[d]),
        };
        info!(
            worker = %worker,
            from = ?reassignment.from_station,
            to = %reassignment.to_station,
            time = now,
            "Floating worker reassigned"
        );
        self.log.push(reassignment);
        Some(target)
    }

    /// Lowest-utilization station at or below the donor threshold that holds a
    /// floating worker with a free operator, ties to the lowest index
    fn pick_donor(&self, utilization: &[f64], stations: &[Station], target: usize) -> Option<usize> {
        utilization
            .iter()
            .enumerate()
            .filter(|&(index, &u)| {
                index != target
                    && u <= self.donor_threshold
                    && !stations[index].floating_workers().is_empty()
                    && stations[index].free_operators() >= 1
            })
            .min_by(|(ia, a), (ib, b)| a.total_cmp(b).then(ia.cmp(ib)))
            .map(|(index, _)| index)
    }
}

/// Index of the highest value at or above `threshold`, ties to the lowest index
pub(crate) fn highest_at_or_above(values: &[f64], threshold: f64) -> Option<usize> {
    values
        .iter()
        .enumerate()
        .filter(|&(_, &v)| v >= threshold)
        .max_by(|(ia, a), (ib, b)| a.total_cmp(b).then(ib.cmp(ia)))
        .map(|(index, _)| index)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{MachineType, WorkItemId};

    fn stations(n: usize) -> Vec<Station> {
        (1..=n)
            .map(|i| {
                let machine = MachineType::new(format!("m{}", i));
                Station::new(StationId::for_instance(&machine, 1), machine, 1)
            })
            .collect()
    }

    #[test]
    fn test_highest_at_or_above_ties_to_first() {
        assert_eq!(highest_at_or_above(&[90.0, 95.0, 95.0], 85.0), Some(1));
        assert_eq!(highest_at_or_above(&[85.0, 10.0], 85.0), Some(0));
        assert_eq!(highest_at_or_above(&[84.9, 10.0], 85.0), None);
    }

    #[test]
    fn test_unassigned_worker_goes_to_bottleneck() {
        let mut line = stations(3);
        let mut pool = FloatingPoolAllocator::new(2, &AllocatorConfig::default(), 3);

        let target = pool.evaluate(4.0, &mut line, &[1.0, 3.8, 2.0], 4.0);
        assert_eq!(target, Some(1));
        assert_eq!(line[1].assigned_operator_count(), 2);
        assert_eq!(pool.assigned_count(), 1);

        let log = pool.reassignments();
        assert_eq!(log.len(), 1);
        assert_eq!(log[0].worker, WorkerId(1));
        assert_eq!(log[0].from_station, None);
        assert_eq!(log[0].to_station.as_str(), "m2-1");
        assert!((log[0].target_utilization - 95.0).abs() < 1e-9);
    }

    #[test]
    fn test_no_move_below_threshold() {
        let mut line = stations(2);
        let mut pool = FloatingPoolAllocator::new(1, &AllocatorConfig::default(), 2);
        assert_eq!(pool.evaluate(4.0, &mut line, &[3.0, 2.0], 4.0), None);
        assert!(pool.reassignments().is_empty());
    }

    #[test]
    fn test_trailing_window_and_donor_move() {
        let mut line = stations(3);
        let mut pool = FloatingPoolAllocator::new(1, &AllocatorConfig::default(), 3);

        // First window: station 0 is the bottleneck and takes the only worker
        assert_eq!(pool.evaluate(4.0, &mut line, &[4.0, 1.0, 1.0], 4.0), Some(0));

        // Second window: station 0 idles, station 2 saturates
        assert_eq!(pool.evaluate(8.0, &mut line, &[4.5, 2.0, 4.6], 8.0), Some(2));
        assert_eq!(line[0].floating_workers().len(), 0);
        assert_eq!(line[2].floating_workers(), &[WorkerId(1)]);
        assert_eq!(pool.assigned_count(), 1);

        let second = &pool.reassignments()[1];
        assert_eq!(second.from_station.as_ref().map(|s| s.as_str()), Some("m1-1"));
        assert!((second.donor_utilization.unwrap() - 12.5).abs() < 1e-9);
    }

    #[test]
    fn test_busy_donor_keeps_worker() {
        let mut line = stations(2);
        let mut pool = FloatingPoolAllocator::new(1, &AllocatorConfig::default(), 2);
        pool.evaluate(4.0, &mut line, &[4.0, 0.0], 4.0);

        // Donor has both operators mid-operation
        line[0].enqueue(WorkItemId(1));
        line[0].start(4.0, 2, 1.0, 0).unwrap();
        assert_eq!(pool.evaluate(8.0, &mut line, &[4.0, 4.0], 8.0), None);
        assert_eq!(line[0].floating_workers().len(), 1);
    }

    #[test]
    fn test_empty_window_is_skipped() {
        let mut line = stations(1);
        let mut pool = FloatingPoolAllocator::new(1, &AllocatorConfig::default(), 1);
        assert_eq!(pool.evaluate(0.0, &mut line, &[0.0], 0.0), None);
        assert_eq!(pool.evaluate(2.0, &mut line, &[2.0], 2.0), Some(0));
    }
}

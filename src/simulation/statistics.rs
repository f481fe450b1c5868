//! Statistics collection and reporting
//!
//! The [`MetricsCollector`] observes every state transition of a run. Before
//! the kernel mutates anything it advances the collector to the current time,
//! which attributes the elapsed interval to each station's busy, idle or down
//! bucket according to the state the station held during that interval. Break
//! time is excluded from every bucket.

use crate::analysis::{BottleneckAnalysis, Recommendation};
use crate::line::{Reassignment, Station};
use crate::simulation::{SimulationError, SimulationResult};
use crate::types::{MachineType, StationId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Relative tolerance of the per-station time accounting check
pub const TIME_ACCOUNTING_TOLERANCE: f64 = 1e-6;

/// Accumulated time buckets of one station
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StationStatistics {
    /// Operator-weighted busy hours
    pub busy_hours: f64,
    /// Idle hours
    pub idle_hours: f64,
    /// Hours broken down
    pub down_hours: f64,
    /// Working hours observed
    pub elapsed_hours: f64,
    /// Assigned operators times hours, excluding down time
    pub available_operator_hours: f64,
}

impl StationStatistics {
    /// Busy time over elapsed working time, percent
    pub fn utilization_percent(&self) -> f64 {
        if self.elapsed_hours <= 0.0 {
            0.0
        } else {
            (self.busy_hours / self.elapsed_hours * 100.0).clamp(0.0, 100.0)
        }
    }

    /// Drift between the bucket sum and elapsed time
    pub fn accounting_error(&self) -> f64 {
        (self.busy_hours + self.idle_hours + self.down_hours - self.elapsed_hours).abs()
    }
}

/// Observes the run and accumulates run-level and per-station metrics
#[derive(Debug, Clone)]
pub struct MetricsCollector {
    last_time: f64,
    working_hours: f64,
    stations: Vec<StationStatistics>,
    earned_hours: f64,
    units_arrived: u64,
    units_completed: u64,
    defective_units: u64,
    operations_started: u64,
    total_flow_time: f64,
}

impl MetricsCollector {
    /// Create a collector for `station_count` stations at time zero
    pub fn new(station_count: usize) -> Self {
        Self {
            last_time: 0.0,
            working_hours: 0.0,
            stations: vec![StationStatistics::default(); station_count],
            earned_hours: 0.0,
            units_arrived: 0,
            units_completed: 0,
            defective_units: 0,
            operations_started: 0,
            total_flow_time: 0.0,
        }
    }

    /// Attribute the interval since the last observation to each station
    pub fn advance(&mut self, now: f64, stations: &[Station], on_break: bool) -> SimulationResult<()> {
        let dt = now - self.last_time;
        if dt < 0.0 {
            return Err(SimulationError::NonMonotonicTime { now: self.last_time, scheduled: now });
        }
        self.last_time = now;
        if dt == 0.0 || on_break {
            return Ok(());
        }

        self.working_hours += dt;
        for (stats, station) in self.stations.iter_mut().zip(stations) {
            stats.elapsed_hours += dt;
            if station.is_down() {
                stats.down_hours += dt;
                continue;
            }
            let assigned = station.assigned_operator_count();
            let busy = if assigned == 0 {
                0.0
            } else {
                dt * station.operators_in_use().min(assigned) as f64 / assigned as f64
            };
            stats.busy_hours += busy;
            stats.idle_hours += dt - busy;
            stats.available_operator_hours += assigned as f64 * dt;
        }
        Ok(())
    }

    /// A unit entered the line
    pub fn record_arrival(&mut self) {
        self.units_arrived += 1;
    }

    /// An operation started
    pub fn record_start(&mut self) {
        self.operations_started += 1;
    }

    /// A good operation finished, earning standard operator hours
    pub fn record_good_operation(&mut self, earned_hours: f64) {
        self.earned_hours += earned_hours;
    }

    /// A unit failed quality and was scrapped
    pub fn record_defect(&mut self) {
        self.defective_units += 1;
    }

    /// A unit finished its routing
    pub fn record_completion(&mut self, flow_time: f64) {
        self.units_completed += 1;
        self.total_flow_time += flow_time;
    }

    /// Working hours observed so far
    pub fn working_hours(&self) -> f64 {
        self.working_hours
    }

    /// Per-station buckets, in station order
    pub fn stations(&self) -> &[StationStatistics] {
        &self.stations
    }

    /// Cumulative busy hours per station
    pub fn busy_hours(&self) -> Vec<f64> {
        self.stations.iter().map(|s| s.busy_hours).collect()
    }

    /// Units that entered the line
    pub fn units_arrived(&self) -> u64 {
        self.units_arrived
    }

    /// Units that finished their routing
    pub fn units_completed(&self) -> u64 {
        self.units_completed
    }

    /// Units scrapped
    pub fn defective_units(&self) -> u64 {
        self.defective_units
    }

    /// Operations started
    pub fn operations_started(&self) -> u64 {
        self.operations_started
    }

    /// Standard operator hours earned by good operations
    pub fn earned_hours(&self) -> f64 {
        self.earned_hours
    }

    /// Operator hours available across all stations
    pub fn available_operator_hours(&self) -> f64 {
        self.stations.iter().map(|s| s.available_operator_hours).sum()
    }

    /// Earned over available operator hours, percent
    pub fn efficiency_percent(&self) -> f64 {
        let available = self.available_operator_hours();
        if available <= 0.0 {
            0.0
        } else {
            self.earned_hours / available * 100.0
        }
    }

    /// Completed over completed plus defective, percent; 100 when no unit finished
    pub fn quality_yield_percent(&self) -> f64 {
        let finished = self.units_completed + self.defective_units;
        if finished == 0 {
            100.0
        } else {
            self.units_completed as f64 / finished as f64 * 100.0
        }
    }

    /// Completed units per simulated hour
    pub fn throughput_per_hour(&self, simulated_hours: f64) -> f64 {
        if simulated_hours <= 0.0 {
            0.0
        } else {
            self.units_completed as f64 / simulated_hours
        }
    }

    /// Mean arrival-to-completion time of completed units
    pub fn average_flow_time(&self) -> Option<f64> {
        if self.units_completed == 0 {
            None
        } else {
            Some(self.total_flow_time / self.units_completed as f64)
        }
    }

    /// Check that each station's buckets sum to its elapsed time
    pub fn check_time_accounting(&self, stations: &[Station]) -> SimulationResult<()> {
        for (stats, station) in self.stations.iter().zip(stations) {
            let tolerance = TIME_ACCOUNTING_TOLERANCE * stats.elapsed_hours.max(1.0);
            if stats.accounting_error() > tolerance {
                return Err(SimulationError::invariant(format!(
                    "station {} busy {:.9} + idle {:.9} + down {:.9} != elapsed {:.9}",
                    station.id, stats.busy_hours, stats.idle_hours, stats.down_hours, stats.elapsed_hours
                )));
            }
        }
        Ok(())
    }
}

/// Headline metrics of a run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    /// Units that finished their routing
    pub units_completed: u64,
    /// Completed units per simulated hour
    pub throughput_per_hour: f64,
    /// Earned over available operator hours, percent
    pub efficiency_percent: f64,
    /// Good units over finished units, percent
    pub quality_yield_percent: f64,
}

/// Unit flow totals of a run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlowSummary {
    /// Units that entered the line
    pub units_arrived: u64,
    /// Units scrapped at a quality check
    pub defective_units: u64,
    /// Units still queued or in flight at the horizon
    pub wip_remaining: u64,
    /// Mean arrival-to-completion hours of completed units
    pub average_flow_time_hours: Option<f64>,
}

/// Time breakdown of one station instance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StationReport {
    /// Station instance
    pub station_id: StationId,
    /// Machine type provided
    pub machine_type: MachineType,
    /// Operator-weighted busy hours
    pub busy_hours: f64,
    /// Idle hours
    pub idle_hours: f64,
    /// Hours broken down
    pub down_hours: f64,
    /// Busy over elapsed working hours, percent
    pub utilization_percent: f64,
    /// Operations finished
    pub operations_completed: u64,
    /// Longest queue seen
    pub peak_queue_length: usize,
    /// Fixed plus floating operators at the end of the run
    pub final_operator_count: u32,
}

impl StationReport {
    /// Build a report from a station and its accumulated buckets
    pub fn new(station: &Station, stats: &StationStatistics) -> Self {
        Self {
            station_id: station.id.clone(),
            machine_type: station.machine_type.clone(),
            busy_hours: stats.busy_hours,
            idle_hours: stats.idle_hours,
            down_hours: stats.down_hours,
            utilization_percent: stats.utilization_percent(),
            operations_completed: station.operations_completed(),
            peak_queue_length: station.peak_queue_length(),
            final_operator_count: station.assigned_operator_count(),
        }
    }
}

/// Complete outcome of one run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunResult {
    /// Headline metrics
    pub summary: RunSummary,
    /// Utilization percent per station, ordered by station id
    pub station_utilization: BTreeMap<StationId, f64>,
    /// Bottleneck station and its utilization
    pub bottleneck_analysis: BottleneckAnalysis,
    /// Rebalancing recommendations as readable sentences, most important first
    pub recommendations: Vec<String>,
    /// The same recommendations in structured form, index for index
    pub recommendation_details: Vec<Recommendation>,
    /// Unit flow totals
    pub flow: FlowSummary,
    /// Per-station time breakdown, in station order
    pub stations: Vec<StationReport>,
    /// Working hours simulated (gross horizon minus breaks)
    pub simulated_hours: f64,
    /// Simulated time at which the run stopped
    pub final_clock_hours: f64,
    /// Events popped from the queue, including stale completions
    pub events_processed: u64,
    /// Floating-pool moves made during the run
    pub reassignments: Vec<Reassignment>,
}

impl fmt::Display for RunResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "=== Run Summary ===")?;
        writeln!(f, "Units completed:     {}", self.summary.units_completed)?;
        writeln!(f, "Throughput:          {:.3} units/hour", self.summary.throughput_per_hour)?;
        writeln!(f, "Efficiency:          {:.1}%", self.summary.efficiency_percent)?;
        writeln!(f, "Quality yield:       {:.1}%", self.summary.quality_yield_percent)?;
        writeln!(f, "Units arrived:       {}", self.flow.units_arrived)?;
        writeln!(f, "Defective units:     {}", self.flow.defective_units)?;
        writeln!(f, "WIP at horizon:      {}", self.flow.wip_remaining)?;
        if let Some(flow_time) = self.flow.average_flow_time_hours {
            writeln!(f, "Average flow time:   {:.2} h", flow_time)?;
        }
        writeln!(
            f,
            "Simulated hours:     {:.2} (clock stopped at {:.2}, {} events)",
            self.simulated_hours, self.final_clock_hours, self.events_processed
        )?;

        writeln!(f)?;
        writeln!(f, "=== Stations ===")?;
        for station in &self.stations {
            writeln!(
                f,
                "{:<16} {:>6.1}%  busy {:>7.2} h  idle {:>7.2} h  down {:>6.2} h  ops {:>5}  peak queue {:>4}  operators {}",
                station.station_id.as_str(),
                station.utilization_percent,
                station.busy_hours,
                station.idle_hours,
                station.down_hours,
                station.operations_completed,
                station.peak_queue_length,
                station.final_operator_count
            )?;
        }

        writeln!(f)?;
        writeln!(f, "=== Bottleneck ===")?;
        match &self.bottleneck_analysis.bottleneck_station {
            Some(station) => writeln!(
                f,
                "{} at {:.1}% utilization",
                station, self.bottleneck_analysis.utilization
            )?,
            None => writeln!(
                f,
                "None (peak utilization {:.1}%)",
                self.bottleneck_analysis.utilization
            )?,
        }
        for recommendation in &self.recommendations {
            writeln!(f, "  - {}", recommendation)?;
        }

        if !self.reassignments.is_empty() {
            writeln!(f)?;
            writeln!(f, "=== Floating Pool Moves ===")?;
            for moved in &self.reassignments {
                let from = moved
                    .from_station
                    .as_ref()
                    .map(|s| s.to_string())
                    .unwrap_or_else(|| "pool".to_string());
                writeln!(
                    f,
                    "{:>7.2} h  {}  {} -> {}",
                    moved.time_hours, moved.worker, from, moved.to_station
                )?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::WorkItemId;

    fn station(slots: u32) -> Station {
        Station::new(StationId::from("m-1"), MachineType::from("m"), slots)
    }

    #[test]
    fn test_busy_time_is_operator_weighted() {
        let mut s = station(2);
        let mut metrics = MetricsCollector::new(1);

        s.enqueue(WorkItemId(1));
        s.start(0.0, 1, 4.0, 0).unwrap();
        metrics.advance(2.0, std::slice::from_ref(&s), false).unwrap();

        let stats = &metrics.stations()[0];
        assert_eq!(stats.busy_hours, 1.0);
        assert_eq!(stats.idle_hours, 1.0);
        assert_eq!(stats.available_operator_hours, 4.0);
        assert_eq!(stats.utilization_percent(), 50.0);
    }

    #[test]
    fn test_down_and_break_time() {
        let mut s = station(1);
        let mut metrics = MetricsCollector::new(1);

        metrics.advance(1.0, std::slice::from_ref(&s), false).unwrap();
        s.break_down(1.0);
        metrics.advance(2.0, std::slice::from_ref(&s), false).unwrap();
        // Break time lands in no bucket
        metrics.advance(2.5, std::slice::from_ref(&s), true).unwrap();

        let stats = &metrics.stations()[0];
        assert_eq!(stats.idle_hours, 1.0);
        assert_eq!(stats.down_hours, 1.0);
        assert_eq!(stats.elapsed_hours, 2.0);
        assert_eq!(stats.available_operator_hours, 1.0);
        assert_eq!(metrics.working_hours(), 2.0);
        assert!(metrics.check_time_accounting(std::slice::from_ref(&s)).is_ok());
    }

    #[test]
    fn test_rejects_time_going_backwards() {
        let s = station(1);
        let mut metrics = MetricsCollector::new(1);
        metrics.advance(3.0, std::slice::from_ref(&s), false).unwrap();
        let err = metrics.advance(2.0, std::slice::from_ref(&s), false).unwrap_err();
        assert!(err.is_internal());
    }

    #[test]
    fn test_run_level_ratios() {
        let mut metrics = MetricsCollector::new(0);
        assert_eq!(metrics.quality_yield_percent(), 100.0);
        assert_eq!(metrics.efficiency_percent(), 0.0);
        assert_eq!(metrics.average_flow_time(), None);

        for _ in 0..3 {
            metrics.record_arrival();
        }
        metrics.record_completion(2.0);
        metrics.record_completion(4.0);
        metrics.record_defect();

        assert!((metrics.quality_yield_percent() - 200.0 / 3.0).abs() < 1e-9);
        assert_eq!(metrics.throughput_per_hour(8.0), 0.25);
        assert_eq!(metrics.throughput_per_hour(0.0), 0.0);
        assert_eq!(metrics.average_flow_time(), Some(3.0));
    }

    #[test]
    fn test_accounting_check_catches_drift() {
        let s = station(1);
        let mut metrics = MetricsCollector::new(1);
        metrics.advance(1.0, std::slice::from_ref(&s), false).unwrap();
        metrics.stations[0].busy_hours += 0.5;

        let err = metrics.check_time_accounting(std::slice::from_ref(&s)).unwrap_err();
        assert!(matches!(err, SimulationError::InvariantViolation(_)));
    }
}

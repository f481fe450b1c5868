//! Simulation kernel
//!
//! Owns the event queue and every piece of mutable run state, and dispatches
//! events in `(time, sequence)` order until the horizon. Each run is
//! single-threaded and owns all of its state; concurrent runs share nothing.

use crate::analysis::BottleneckAnalyzer;
use crate::line::{
    build_stations, BreakdownInjector, FloatingPoolAllocator, InFlightOperation, RouteStep,
    RoutingDecision, RoutingEngine, Station, WorkItem,
};
use crate::simulation::{
    EventKind, EventQueue, FlowSummary, MetricsCollector, RunResult, RunSummary, SimulationError,
    SimulationResult, StationReport,
};
use crate::types::{ArrivalPattern, BoundaryKind, DurationParams, LineConfig, WorkItemId};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::time::{Duration, Instant};
use tracing::{debug, info, instrument, trace};

/// Wall-clock budget is checked every this many events
const TIME_CHECK_INTERVAL: u64 = 64;

/// One entry of the optional event log
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EventRecord {
    /// Simulated time
    pub time: f64,
    /// Event processed or executed inline
    pub kind: EventKind,
}

/// Event and wall-clock budget of a run
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RunLimits {
    /// Maximum events popped from the queue
    pub max_events: Option<u64>,
    /// Maximum wall-clock time
    pub time_budget: Option<Duration>,
}

impl From<&DurationParams> for RunLimits {
    fn from(params: &DurationParams) -> Self {
        Self { max_events: params.max_events, time_budget: params.time_budget }
    }
}

/// Discrete-event kernel for one run over a validated configuration
#[derive(Debug)]
pub struct SimulationEngine<'a> {
    config: &'a LineConfig,
    limits: RunLimits,
    queue: EventQueue,
    stations: Vec<Station>,
    routing: RoutingEngine,
    breakdowns: BreakdownInjector,
    pool: FloatingPoolAllocator,
    metrics: MetricsCollector,
    items: Vec<WorkItem>,
    timing_rng: StdRng,
    quality_rng: StdRng,
    next_ticket: u64,
    on_break: bool,
    horizon: f64,
    events_processed: u64,
    event_log: Option<Vec<EventRecord>>,
}

impl<'a> SimulationEngine<'a> {
    /// Create the kernel; the configuration must already be validated
    pub fn new(config: &'a LineConfig, limits: RunLimits) -> Self {
        let stations = build_stations(config);
        let routing = RoutingEngine::new(config, &stations);
        let station_count = stations.len();

        let mut master = StdRng::seed_from_u64(config.random_seed);
        let timing_rng = StdRng::seed_from_u64(master.gen());
        let quality_rng = StdRng::seed_from_u64(master.gen());

        Self {
            config,
            limits,
            queue: EventQueue::new(),
            stations,
            routing,
            breakdowns: BreakdownInjector::new(&config.breakdowns),
            pool: FloatingPoolAllocator::new(config.floating_pool_size, &config.allocator, station_count),
            metrics: MetricsCollector::new(station_count),
            items: Vec::new(),
            timing_rng,
            quality_rng,
            next_ticket: 0,
            on_break: false,
            horizon: config.schedule.gross_horizon_hours(),
            events_processed: 0,
            event_log: None,
        }
    }

    /// Record every processed event, including inline operation starts
    pub fn with_event_log(mut self) -> Self {
        self.event_log = Some(Vec::new());
        self
    }

    /// Event log, when enabled
    pub fn event_log(&self) -> Option<&[EventRecord]> {
        self.event_log.as_deref()
    }

    /// Stations of the line, in configuration order
    pub fn stations(&self) -> &[Station] {
        &self.stations
    }

    /// Units created so far, in arrival order
    pub fn items(&self) -> &[WorkItem] {
        &self.items
    }

    /// Run to the horizon and assemble the result
    #[instrument(skip(self), fields(stations = self.stations.len(), horizon = self.horizon, seed = self.config.random_seed))]
    pub fn run(&mut self) -> SimulationResult<RunResult> {
        let started = Instant::now();
        self.schedule_initial_events()?;
        info!(pending_events = self.queue.len(), "Simulation started");

        while let Some(event) = self.queue.pop()? {
            self.events_processed += 1;
            self.check_limits(started)?;
            self.metrics.advance(event.time, &self.stations, self.on_break)?;
            self.log_event(event.time, event.kind);
            trace!(time = event.time, kind = ?event.kind, "Processing event");

            match event.kind {
                EventKind::Arrival { demand_index } => self.handle_arrival(demand_index, event.time)?,
                EventKind::OperationComplete { station, ticket } => {
                    self.handle_completion(station, ticket, event.time)?
                }
                EventKind::BreakdownStart { breakdown } => {
                    let due_now = self.breakdowns.start(breakdown, event.time, &self.routing, &mut self.stations);
                    self.complete_due_now(due_now, event.time)?;
                }
                EventKind::BreakdownEnd { breakdown } => {
                    let resumed = self.breakdowns.end(
                        breakdown,
                        event.time,
                        &self.routing,
                        &mut self.stations,
                        &mut self.next_ticket,
                    );
                    for (station, op) in resumed {
                        self.queue.schedule(op.due, EventKind::OperationComplete { station, ticket: op.ticket })?;
                    }
                    self.try_start_all(event.time)?;
                }
                EventKind::ShiftBoundary(boundary) => self.handle_boundary(boundary, event.time)?,
                EventKind::OperationStart { .. } => {
                    return Err(SimulationError::invariant("operation start events are never queued"));
                }
                EventKind::HorizonEnd => break,
            }
        }

        self.finish(started)
    }

    fn schedule_initial_events(&mut self) -> SimulationResult<()> {
        self.breakdowns.schedule(&mut self.queue)?;

        let config = self.config;
        let schedule = &config.schedule;
        let shift = schedule.shift_hours_per_day;
        for day in 0..schedule.horizon_days {
            let day_start = day as f64 * shift;
            if day > 0 {
                self.queue.schedule(day_start, EventKind::ShiftBoundary(BoundaryKind::DayStart))?;
            }
            for window in &schedule.breaks {
                self.queue.schedule(day_start + window.start_hour, EventKind::ShiftBoundary(BoundaryKind::BreakStart))?;
                self.queue.schedule(day_start + window.end_hour, EventKind::ShiftBoundary(BoundaryKind::BreakEnd))?;
            }
        }
        if let Some(interval) = config.allocator.allocation_interval_hours.filter(|i| *i > 0.0) {
            let mut k = 1u32;
            while k as f64 * interval < self.horizon {
                self.queue.schedule(k as f64 * interval, EventKind::ShiftBoundary(BoundaryKind::Checkpoint))?;
                k += 1;
            }
        }

        for (demand_index, demand) in config.demand.iter().enumerate() {
            for time in arrival_times(demand.quantity, demand.arrival, shift, schedule.horizon_days) {
                self.queue.schedule(time, EventKind::Arrival { demand_index })?;
            }
        }

        self.queue.seal_horizon(self.horizon)
    }

    fn check_limits(&self, started: Instant) -> SimulationResult<()> {
        if let Some(max_events) = self.limits.max_events {
            if self.events_processed > max_events {
                return Err(SimulationError::resource_limit(format!(
                    "event limit of {} exceeded at simulated time {:.3} h",
                    max_events,
                    self.queue.now()
                )));
            }
        }
        if let Some(budget) = self.limits.time_budget {
            if (self.events_processed - 1) % TIME_CHECK_INTERVAL == 0 && started.elapsed() > budget {
                return Err(SimulationError::resource_limit(format!(
                    "wall-clock budget of {:?} exceeded after {} events",
                    budget, self.events_processed
                )));
            }
        }
        Ok(())
    }

    fn log_event(&mut self, time: f64, kind: EventKind) {
        if let Some(log) = self.event_log.as_mut() {
            log.push(EventRecord { time, kind });
        }
    }

    fn handle_arrival(&mut self, demand_index: usize, now: f64) -> SimulationResult<()> {
        let demand = self
            .config
            .demand
            .get(demand_index)
            .ok_or_else(|| SimulationError::invariant(format!("unknown demand index {}", demand_index)))?;

        let sequence = self.items.len() as u64;
        let id = WorkItemId(sequence + 1);
        let route_len = self.routing.route_len(&demand.product_id);
        let quality_draws: Vec<f64> = (0..route_len).map(|_| self.quality_rng.gen()).collect();
        self.items.push(WorkItem::new(id, demand.product_id.clone(), now, sequence, quality_draws));
        self.metrics.record_arrival();

        self.dispatch(id, now)
    }

    /// Send a unit to a station for its current step and try to start it
    fn dispatch(&mut self, id: WorkItemId, now: f64) -> SimulationResult<()> {
        let step = self.current_step(id)?;
        let station = self
            .routing
            .select_station(&step.machine_type, &self.stations)
            .ok_or_else(|| SimulationError::invariant(format!("no station for machine type {}", step.machine_type)))?;

        self.stations[station].enqueue(id);
        self.try_start(station, now)
    }

    /// Start queued work at a station for as long as capacity allows
    fn try_start(&mut self, station: usize, now: f64) -> SimulationResult<()> {
        while let Some(head) = self.stations[station].head() {
            let step = self.current_step(head)?.clone();
            if !self.stations[station].can_start(step.operators_required) {
                break;
            }

            let draw = self.config.variability.sample(&mut self.timing_rng);
            let duration = step.actual_time(draw);
            let operators = step.operators_required;
            let ticket = self.next_ticket;
            self.next_ticket += 1;

            let (started, due) = self.stations[station]
                .start(now, operators, duration, ticket)
                .ok_or_else(|| SimulationError::invariant("station refused a startable operation"))?;
            self.queue.schedule(due, EventKind::OperationComplete { station, ticket })?;
            self.metrics.record_start();
            self.log_event(now, EventKind::OperationStart { station, item: started });
            trace!(station = %self.stations[station].id, item = %started, due, "Operation started");
        }
        Ok(())
    }

    fn try_start_all(&mut self, now: f64) -> SimulationResult<()> {
        for station in 0..self.stations.len() {
            self.try_start(station, now)?;
        }
        Ok(())
    }

    fn handle_completion(&mut self, station: usize, ticket: u64, now: f64) -> SimulationResult<()> {
        let Some(op) = self.stations.get_mut(station).and_then(|s| s.finish(ticket)) else {
            trace!(station, ticket, "Skipping stale completion");
            return Ok(());
        };
        self.complete_operation(op, now)?;
        self.try_start(station, now)
    }

    /// Complete operations that were due at the moment their station paused
    fn complete_due_now(&mut self, due_now: Vec<(usize, InFlightOperation)>, now: f64) -> SimulationResult<()> {
        for (_, op) in due_now {
            self.complete_operation(op, now)?;
        }
        Ok(())
    }

    /// Apply the quality outcome and route the unit onward
    fn complete_operation(&mut self, op: InFlightOperation, now: f64) -> SimulationResult<()> {
        let step = self.current_step(op.item)?;
        let defective = self.item(op.item)?.fails_current_step(step.first_pass_defect_percent);
        let earned = step.earned_hours();
        let item = self.item(op.item)?;
        let step_index = item.current_step_index;
        let product = item.product_id.clone();

        if defective {
            self.item_mut(op.item)?.is_defective = true;
            self.metrics.record_defect();
            debug!(item = %op.item, step = step_index + 1, time = now, "Unit scrapped at quality check");
            return Ok(());
        }

        self.metrics.record_good_operation(earned);
        match self.routing.advance(&product, step_index) {
            RoutingDecision::Next(next) => {
                self.item_mut(op.item)?.current_step_index = next;
                self.dispatch(op.item, now)
            }
            RoutingDecision::Finished => {
                let item = self.item_mut(op.item)?;
                item.completion_time = Some(now);
                let flow_time = item.flow_time().unwrap_or_default();
                self.metrics.record_completion(flow_time);
                Ok(())
            }
        }
    }

    fn handle_boundary(&mut self, boundary: BoundaryKind, now: f64) -> SimulationResult<()> {
        debug!(%boundary, time = now, "Shift boundary");

        let elapsed = self.metrics.working_hours();
        let busy = self.metrics.busy_hours();
        let target = self.pool.evaluate(now, &mut self.stations, &busy, elapsed);

        match boundary {
            BoundaryKind::BreakStart => {
                self.on_break = true;
                let mut due_now = Vec::new();
                for (index, station) in self.stations.iter_mut().enumerate() {
                    due_now.extend(station.begin_break(now).into_iter().map(|op| (index, op)));
                }
                self.complete_due_now(due_now, now)?;
            }
            BoundaryKind::BreakEnd => {
                self.on_break = false;
                for station in 0..self.stations.len() {
                    for op in self.stations[station].end_break(now, &mut self.next_ticket) {
                        self.queue.schedule(op.due, EventKind::OperationComplete { station, ticket: op.ticket })?;
                    }
                }
                self.try_start_all(now)?;
            }
            BoundaryKind::DayStart | BoundaryKind::Checkpoint => {}
        }

        if let Some(target) = target {
            self.try_start(target, now)?;
        }
        Ok(())
    }

    /// Routing step a unit is at
    fn current_step(&self, id: WorkItemId) -> SimulationResult<&RouteStep> {
        let item = self.item(id)?;
        self.routing.step(&item.product_id, item.current_step_index).ok_or_else(|| {
            SimulationError::invariant(format!("{} has no routing step {}", id, item.current_step_index))
        })
    }

    fn item(&self, id: WorkItemId) -> SimulationResult<&WorkItem> {
        self.items
            .get((id.0 as usize).wrapping_sub(1))
            .ok_or_else(|| SimulationError::invariant(format!("unknown work item {}", id)))
    }

    fn item_mut(&mut self, id: WorkItemId) -> SimulationResult<&mut WorkItem> {
        self.items
            .get_mut((id.0 as usize).wrapping_sub(1))
            .ok_or_else(|| SimulationError::invariant(format!("unknown work item {}", id)))
    }

    /// Check the end-of-run invariants and assemble the result
    fn finish(&mut self, started: Instant) -> SimulationResult<RunResult> {
        let final_clock = self.queue.now();
        if final_clock > self.horizon {
            return Err(SimulationError::invariant(format!(
                "clock {} passed the horizon {}",
                final_clock, self.horizon
            )));
        }
        self.metrics.check_time_accounting(&self.stations)?;

        let wip: u64 = self.stations.iter().map(|s| s.load() as u64).sum();
        let unfinished = self.items.iter().filter(|item| !item.is_finished()).count() as u64;
        if unfinished != wip {
            return Err(SimulationError::invariant(format!(
                "{} unfinished work items but {} held at stations",
                unfinished, wip
            )));
        }
        let completed = self.metrics.units_completed();
        let defective = self.metrics.defective_units();
        let arrived = self.metrics.units_arrived();
        if completed + defective + wip != arrived {
            return Err(SimulationError::ConservationMismatch { completed, defective, wip, arrived });
        }
        if self.pool.assigned_count() > self.config.floating_pool_size as usize {
            return Err(SimulationError::invariant("floating pool over-assigned"));
        }

        let simulated_hours = self.config.schedule.working_hours();
        let stations: Vec<StationReport> = self
            .stations
            .iter()
            .zip(self.metrics.stations())
            .map(|(station, stats)| StationReport::new(station, stats))
            .collect();
        let ordered: Vec<_> = stations.iter().map(|s| (s.station_id.clone(), s.utilization_percent)).collect();
        let (bottleneck_analysis, recommendations) =
            BottleneckAnalyzer::from_allocator(&self.config.allocator).analyze(&ordered);

        let result = RunResult {
            summary: RunSummary {
                units_completed: completed,
                throughput_per_hour: self.metrics.throughput_per_hour(simulated_hours),
                efficiency_percent: self.metrics.efficiency_percent(),
                quality_yield_percent: self.metrics.quality_yield_percent(),
            },
            station_utilization: ordered.into_iter().collect(),
            bottleneck_analysis,
            recommendations: recommendations.iter().map(ToString::to_string).collect(),
            recommendation_details: recommendations,
            flow: FlowSummary {
                units_arrived: arrived,
                defective_units: defective,
                wip_remaining: wip,
                average_flow_time_hours: self.metrics.average_flow_time(),
            },
            stations,
            simulated_hours,
            final_clock_hours: final_clock,
            events_processed: self.events_processed,
            reassignments: self.pool.reassignments().to_vec(),
        };

        info!(
            units_completed = completed,
            defective,
            wip,
            events = self.events_processed,
            operations = self.metrics.operations_started(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Simulation finished"
        );
        Ok(result)
    }
}

/// Arrival times of one demand line over the horizon
pub fn arrival_times(quantity: u32, pattern: ArrivalPattern, shift_hours: f64, horizon_days: u32) -> Vec<f64> {
    let horizon = shift_hours * horizon_days as f64;
    match pattern {
        ArrivalPattern::AllAtStart => vec![0.0; quantity as usize],
        ArrivalPattern::Uniform => {
            let spacing = horizon / quantity.max(1) as f64;
            (0..quantity).map(|i| i as f64 * spacing).collect()
        }
        ArrivalPattern::DailyRelease => {
            let days = horizon_days.max(1);
            let base = quantity / days;
            let remainder = quantity % days;
            (0..days)
                .flat_map(|day| {
                    let share = base + u32::from(day < remainder);
                    std::iter::repeat(day as f64 * shift_hours).take(share as usize)
                })
                .collect()
        }
    }
}

//! Main simulation orchestrator
//!
//! This module contains the pipeline façade: validate a configuration, run it
//! to the horizon, and compare what-if scenarios against it. Every operation is
//! a pure computation over the configuration it is given.

use crate::simulation::{
    compare, RunLimits, RunResult, ScenarioComparison, ScenarioDelta, SimulationEngine,
    SimulationError, SimulationResult,
};
use crate::types::{validate, DurationParams, LineConfig, ValidationReport};
use tracing::{info, instrument, warn};

/// Validate, then run one configuration to its horizon
///
/// Duration overrides are applied before validation. Validation warnings are
/// logged; blocking errors refuse the run.
#[instrument(skip_all, fields(seed = config.random_seed))]
pub fn run(config: &LineConfig, duration_params: &DurationParams) -> SimulationResult<RunResult> {
    let mut effective = config.clone();
    duration_params.apply_to(&mut effective);

    let report = validate(&effective);
    for warning in &report.warnings {
        warn!("{}", warning);
    }
    if !report.is_valid {
        return Err(SimulationError::invalid_configuration(report.errors));
    }

    SimulationEngine::new(&effective, RunLimits::from(duration_params)).run()
}

/// Main simulation orchestrator that holds a configuration and its run limits
#[derive(Debug, Clone)]
pub struct SimulationOrchestrator {
    /// Baseline configuration
    config: LineConfig,
    /// Schedule overrides and resource limits
    duration_params: DurationParams,
}

impl SimulationOrchestrator {
    /// Create a new simulation orchestrator
    #[instrument(skip(config), fields(stations = config.stations.len(), products = config.demand.len()))]
    pub fn new(config: LineConfig) -> Self {
        info!(
            "Initializing simulation orchestrator with {} station types and {} demand lines",
            config.stations.len(),
            config.demand.len()
        );
        Self { config, duration_params: DurationParams::default() }
    }

    /// Set schedule overrides and resource limits
    pub fn with_duration_params(mut self, duration_params: DurationParams) -> Self {
        self.duration_params = duration_params;
        self
    }

    /// Baseline configuration
    pub fn config(&self) -> &LineConfig {
        &self.config
    }

    /// Duration parameters applied to every run
    pub fn duration_params(&self) -> &DurationParams {
        &self.duration_params
    }

    /// Validate the effective configuration (duration overrides applied)
    pub fn validate(&self) -> ValidationReport {
        let mut effective = self.config.clone();
        self.duration_params.apply_to(&mut effective);
        validate(&effective)
    }

    /// Run the baseline configuration
    pub fn run(&self) -> SimulationResult<RunResult> {
        run(&self.config, &self.duration_params)
    }

    /// Compare scenarios against the baseline
    pub fn compare(&self, scenarios: &[ScenarioDelta]) -> SimulationResult<ScenarioComparison> {
        compare(&self.config, scenarios, &self.duration_params)
    }
}

//! Configuration structures for the line simulator
//!
//! This module contains the line configuration (routings, stations, schedule,
//! demand, breakdowns, floating pool and random seed), the per-run duration
//! parameters, and the command line interface used to load and override them.

use super::{ArrivalPattern, MachineType, OutputFormat, ProductId, VariabilityDistribution};
use clap::Parser;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

/// Default allocator thresholds, in percent
pub mod thresholds {
    /// Utilization at or above which a station is a reallocation target
    pub const BOTTLENECK: f64 = 85.0;

    /// Utilization at or below which a station may give up a floating worker
    pub const DONOR: f64 = 70.0;

    /// Demand may exceed capacity by this much before a feasibility warning
    pub const FEASIBILITY_SLACK: f64 = 10.0;
}

/// One step of a product routing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Operation {
    /// Product this operation belongs to
    pub product_id: ProductId,
    /// Position in the routing, starting at 1
    pub step_number: u32,
    /// Human readable operation name
    pub operation_name: String,
    /// Machine type required to perform the operation
    pub machine_type: MachineType,
    /// Standard allowed time (SAM) in hours
    pub standard_time_hours: f64,
    /// Operators tied up while the operation runs
    pub operators_required: u32,
    /// Operator skill grade, 0-100
    pub operator_grade: f64,
    /// Probability (percent) that a unit fails quality at this step
    pub first_pass_defect_percent: f64,
}

/// Stations provided for one machine type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StationSpec {
    /// Machine type of every instance
    pub machine_type: MachineType,
    /// Number of identical station instances
    pub count: u32,
    /// Fixed operators per instance
    pub operator_slots: u32,
}

/// A break inside every shift, as hour offsets from the shift start
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BreakWindow {
    /// Offset of the break start from the shift start
    pub start_hour: f64,
    /// Offset of the break end from the shift start
    pub end_hour: f64,
}

impl BreakWindow {
    /// Length of the break in hours
    pub fn duration(&self) -> f64 {
        self.end_hour - self.start_hour
    }
}

/// Working schedule of the line
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Schedule {
    /// Working hours per day
    pub shift_hours_per_day: f64,
    /// Number of days simulated
    pub horizon_days: u32,
    /// Breaks repeated every day
    #[serde(default)]
    pub breaks: Vec<BreakWindow>,
}

impl Schedule {
    /// Length of the simulated timeline: shift hours times days
    pub fn gross_horizon_hours(&self) -> f64 {
        self.shift_hours_per_day * self.horizon_days as f64
    }

    /// Break time inside one shift
    pub fn break_hours_per_day(&self) -> f64 {
        self.breaks.iter().map(BreakWindow::duration).sum()
    }

    /// Working time over the whole horizon (gross horizon minus breaks)
    pub fn working_hours(&self) -> f64 {
        self.gross_horizon_hours() - self.break_hours_per_day() * self.horizon_days as f64
    }
}

/// Demand for one product
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Demand {
    /// Product demanded
    pub product_id: ProductId,
    /// Units entering the line
    pub quantity: u32,
    /// How units are released over the horizon
    #[serde(default)]
    pub arrival: ArrivalPattern,
}

/// A scheduled downtime window for every station of a machine type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Breakdown {
    /// Machine type taken down
    pub machine_type: MachineType,
    /// Start of the window on the simulated timeline
    pub start_offset_hours: f64,
    /// Length of the window
    pub duration_hours: f64,
}

impl Breakdown {
    /// End of the window on the simulated timeline
    pub fn end_offset_hours(&self) -> f64 {
        self.start_offset_hours + self.duration_hours
    }
}

/// Floating-pool allocator settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AllocatorConfig {
    /// Trailing utilization (percent) that marks a reallocation target
    pub bottleneck_threshold: f64,
    /// Trailing utilization (percent) below which a station may donate a worker
    pub donor_threshold: f64,
    /// Extra allocator checkpoints every this many hours, on top of shift boundaries
    #[serde(default)]
    pub allocation_interval_hours: Option<f64>,
}

impl Default for AllocatorConfig {
    fn default() -> Self {
        Self {
            bottleneck_threshold: thresholds::BOTTLENECK,
            donor_threshold: thresholds::DONOR,
            allocation_interval_hours: None,
        }
    }
}

fn default_feasibility_slack() -> f64 {
    thresholds::FEASIBILITY_SLACK
}

/// Complete configuration of a production line simulation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineConfig {
    /// Routing steps of every product
    pub operations: Vec<Operation>,
    /// Stations available on the line
    pub stations: Vec<StationSpec>,
    /// Working schedule
    pub schedule: Schedule,
    /// Demand entering the line
    pub demand: Vec<Demand>,
    /// Scheduled breakdowns
    #[serde(default)]
    pub breakdowns: Vec<Breakdown>,
    /// Number of cross-trained floating workers
    #[serde(default)]
    pub floating_pool_size: u32,
    /// Seed of the run's random streams
    #[serde(default)]
    pub random_seed: u64,
    /// Processing-time variability
    #[serde(default)]
    pub variability: VariabilityDistribution,
    /// Floating-pool allocator settings
    #[serde(default)]
    pub allocator: AllocatorConfig,
    /// Allowed demand-over-capacity margin (percent) before a feasibility warning
    #[serde(default = "default_feasibility_slack")]
    pub feasibility_slack_percent: f64,
}

impl LineConfig {
    /// Operations of one product in step order
    pub fn operations_for(&self, product_id: &ProductId) -> Vec<&Operation> {
        let mut ops: Vec<&Operation> =
            self.operations.iter().filter(|op| &op.product_id == product_id).collect();
        ops.sort_by_key(|op| op.step_number);
        ops
    }

    /// Station specification for a machine type, if any
    pub fn station_spec(&self, machine_type: &MachineType) -> Option<&StationSpec> {
        self.stations.iter().find(|s| &s.machine_type == machine_type)
    }

    /// Total units entering the line
    pub fn total_demand_units(&self) -> u64 {
        self.demand.iter().map(|d| d.quantity as u64).sum()
    }

    /// Load configuration from a JSON file
    ///
    /// Accepts either a bare configuration or an exported configuration document.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(ConfigError::FileNotFound(path.display().to_string()));
        }

        match path.extension().and_then(|ext| ext.to_str()) {
            Some("json") => {}
            Some(ext) => return Err(ConfigError::UnsupportedFormat(ext.to_string())),
            None => return Err(ConfigError::UnsupportedFormat("no extension".to_string())),
        }

        let content = fs::read_to_string(path)?;
        Self::from_json_str(&content)
    }

    /// Parse configuration from JSON text (bare configuration or document)
    pub fn from_json_str(content: &str) -> Result<Self, ConfigError> {
        let value: serde_json::Value = serde_json::from_str(content)?;
        if value.get("schema_version").is_some() {
            crate::export::import_configuration_str(content)
                .map_err(|e| ConfigError::Document(e.to_string()))
        } else {
            Ok(serde_json::from_value(value)?)
        }
    }

    /// Apply CLI argument overrides to configuration
    pub fn apply_cli_overrides(&mut self, args: &CliArgs) {
        if let Some(value) = args.seed {
            self.random_seed = value;
        }
        if let Some(value) = args.horizon_days {
            self.schedule.horizon_days = value;
        }
        if let Some(value) = args.shift_hours {
            self.schedule.shift_hours_per_day = value;
        }
        if let Some(value) = args.floating_pool_size {
            self.floating_pool_size = value;
        }
    }

    /// Save configuration to a JSON file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }

    /// Print configuration as JSON
    pub fn print_json(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Per-run duration parameters and resource limits
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DurationParams {
    /// Override of the schedule's horizon days
    pub horizon_days: Option<u32>,
    /// Override of the schedule's shift length
    pub shift_hours_per_day: Option<f64>,
    /// Abort the run after processing this many events
    pub max_events: Option<u64>,
    /// Abort the run after this much wall-clock time
    pub time_budget: Option<Duration>,
}

impl DurationParams {
    /// Limits only, no schedule overrides
    pub fn with_limits(max_events: Option<u64>, time_budget: Option<Duration>) -> Self {
        Self { max_events, time_budget, ..Default::default() }
    }

    /// Apply the schedule overrides to a configuration
    pub fn apply_to(&self, config: &mut LineConfig) {
        if let Some(days) = self.horizon_days {
            config.schedule.horizon_days = days;
        }
        if let Some(hours) = self.shift_hours_per_day {
            config.schedule.shift_hours_per_day = hours;
        }
    }

    /// Build duration parameters from parsed CLI arguments
    pub fn from_cli_args(args: &CliArgs) -> Self {
        Self::with_limits(args.max_events, args.time_budget_secs)
    }
}

/// Parse a wall-clock budget given in (possibly fractional) seconds
fn parse_time_budget(value: &str) -> Result<Duration, String> {
    let secs: f64 = value.parse().map_err(|e| format!("invalid number of seconds: {}", e))?;
    Duration::try_from_secs_f64(secs)
        .map_err(|_| format!("time budget must be a finite, non-negative number of seconds, got {}", value))
}

/// Command line arguments structure
#[derive(Debug, Clone, Parser)]
#[command(
    name = "line-sim",
    version = "0.1.0",
    about = "Production line simulator - bottleneck analysis and staffing what-ifs",
    long_about = "Runs a discrete-event simulation of a multi-station production line with floating-pool workers and equipment breakdowns, then reports utilization, bottlenecks and rebalancing recommendations.

EXAMPLES:
    # Run the built-in sample line
    line-sim

    # Run a configuration file
    line-sim --config line.json

    # Compare staffing scenarios against the baseline
    line-sim --config line.json --scenarios scenarios.json

    # Generate a configuration template
    line-sim --print-config > my-line.json

    # Validate configuration without running
    line-sim --config my-line.json --dry-run

CONFIGURATION:
    Command line arguments override the configuration file, which overrides
    the built-in sample line. Configuration files are JSON, either a bare
    configuration or an exported configuration document."
)]
pub struct CliArgs {
    /// Configuration file path (JSON format)
    #[arg(short, long, help = "Configuration file path (JSON format)")]
    pub config: Option<String>,

    /// Scenario file (JSON array of scenario deltas)
    #[arg(
        long,
        help = "Scenario deltas file (JSON array)",
        long_help = "Path to a JSON array of scenario deltas. When given, the baseline and every scenario are run with the same seed and compared."
    )]
    pub scenarios: Option<String>,

    /// Write the result document to this path instead of stdout
    #[arg(short, long, help = "Output path for the result document")]
    pub output: Option<String>,

    /// Output format
    #[arg(long, default_value = "text", help = "Output format (json or text)")]
    pub format: OutputFormat,

    /// Random seed for reproducible results
    #[arg(long, help = "Random seed for reproducible results")]
    pub seed: Option<u64>,

    /// Number of days to simulate
    #[arg(long, help = "Number of days to simulate")]
    pub horizon_days: Option<u32>,

    /// Shift length in hours
    #[arg(long, help = "Shift hours per day")]
    pub shift_hours: Option<f64>,

    /// Floating pool size
    #[arg(long, help = "Number of floating-pool workers")]
    pub floating_pool_size: Option<u32>,

    /// Maximum processed events before the run is aborted
    #[arg(long, help = "Abort after processing this many events")]
    pub max_events: Option<u64>,

    /// Wall-clock budget in seconds
    #[arg(long, value_parser = parse_time_budget, help = "Abort after this many wall-clock seconds")]
    pub time_budget_secs: Option<Duration>,

    /// Enable verbose logging
    #[arg(short, long, help = "Enable verbose logging")]
    pub verbose: bool,

    /// Enable debug logging
    #[arg(short, long, help = "Enable debug logging")]
    pub debug: bool,

    /// Write JSON logs to daily files in this directory
    #[arg(long, help = "Directory for daily rotated JSON log files")]
    pub log_dir: Option<String>,

    /// Dry run mode - validate configuration without running simulation
    #[arg(long, help = "Validate configuration without running simulation")]
    pub dry_run: bool,

    /// Print default configuration and exit
    #[arg(long, help = "Print default configuration in JSON format and exit")]
    pub print_config: bool,
}

/// Configuration loading errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Configuration file not found
    #[error("Configuration file not found: {0}")]
    FileNotFound(String),

    /// Configuration file read error
    #[error("Failed to read configuration file: {0}")]
    ReadError(#[from] std::io::Error),

    /// JSON parsing error
    #[error("Failed to parse JSON configuration: {0}")]
    JsonError(#[from] serde_json::Error),

    /// Exported document could not be imported
    #[error("Failed to import configuration document: {0}")]
    Document(String),

    /// Unsupported configuration file format
    #[error("Unsupported configuration file format: {0} (supported: .json)")]
    UnsupportedFormat(String),
}

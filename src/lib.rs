//! Production Line Simulator
//!
//! A discrete-event simulator of a multi-station manufacturing line with
//! cross-trained floating workers, equipment breakdowns and bottleneck
//! analysis.
//!
//! # Overview
//!
//! Each run is a pure computation over a supplied configuration: the
//! validator gates the run, the kernel advances simulated time through
//! arrivals, operation completions, breakdowns and shift boundaries, and the
//! metrics collected along the way feed a bottleneck analysis with
//! rebalancing recommendations. Scenario comparison reruns the pipeline over
//! what-if staffing deltas with the same seed.
//!
//! ## Key Features
//!
//! - **Deterministic**: identical configuration and seed give identical results
//! - **Floating pool**: workers move toward the bottleneck at shift boundaries
//! - **Breakdowns and breaks**: in-flight work pauses and resumes
//! - **Analytics**: utilization, efficiency, throughput, quality yield
//! - **What-if scenarios**: parallel runs compared against a baseline
//!
//! ## Quick Start
//!
//! ```rust
//! use production_line_simulator::*;
//!
//! let config = default_configuration(&DefaultConfigParams::default());
//! let report = validate(&config);
//! assert!(report.is_valid);
//!
//! let result = run(&config, &DurationParams::default())?;
//! println!("{} units completed", result.summary.units_completed);
//! # Ok::<(), SimulationError>(())
//! ```
//!
//! ## Module Organization
//!
//! - [`types`]: configuration model, identifiers, validation and sample lines
//! - [`line`]: stations, routing, work items, breakdowns and the floating pool
//! - [`simulation`]: kernel, metrics, scenarios, orchestration and errors
//! - [`analysis`]: bottleneck analysis and recommendations
//! - [`export`]: configuration documents and result export
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐    ┌─────────────┐    ┌─────────────┐
//! │   Types     │    │    Line     │    │ Simulation  │
//! │             │    │             │    │             │
//! │ Config      │◄───┤ Stations    │◄───┤ Kernel      │
//! │ Validation  │    │ Routing     │    │ Metrics     │
//! │ Defaults    │    │ Pool        │    │ Scenarios   │
//! └─────────────┘    └─────────────┘    └─────────────┘
//!        ▲                                     │
//!        │           ┌─────────────┐    ┌─────────────┐
//!        └───────────┤   Export    │    │  Analysis   │
//!                    │             │    │             │
//!                    │ Documents   │    │ Bottleneck  │
//!                    │ Results     │    │ Advice      │
//!                    └─────────────┘    └─────────────┘
//! ```
#![warn(missing_docs, missing_debug_implementations, unreachable_pub)]

// Module declarations
pub mod analysis;
pub mod export;
pub mod line;
pub mod simulation;
pub mod types;

// Configuration, identifiers and validation
pub use types::{
    default_configuration, validate, ArrivalPattern, Breakdown, BreakWindow, ConfigError,
    DefaultConfigParams, Demand, DurationParams, LineConfig, MachineType, Operation,
    OutputFormat, ProductId, Schedule, StationId, StationSpec, StationStatus, ValidationReport,
    VariabilityDistribution, WorkItemId, WorkerId,
};

// Analysis and export
pub use analysis::{BottleneckAnalysis, BottleneckAnalyzer, Recommendation};
pub use export::{
    export_configuration, import_configuration, ConfigurationDocument, ResultsExporter,
};

// Simulation pipeline
pub use simulation::{
    compare, run, LoggingConfig, RunResult, RunSummary, ScenarioComparison, ScenarioDelta,
    SimulationError, SimulationOrchestrator, SimulationResult,
};

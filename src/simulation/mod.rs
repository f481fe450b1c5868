//! Simulation orchestration and control
//!
//! This module contains the simulation kernel, metrics collection, scenario
//! comparison, the pipeline façade and error handling.
//!
//! # Overview
//!
//! - **EventQueue**: time-ordered event queue with deterministic tie-breaking
//! - **SimulationEngine**: dispatch loop that owns and mutates the line state
//! - **MetricsCollector**: busy/idle/down accounting and run-level metrics
//! - **compare**: baseline plus what-if scenarios with a shared seed
//! - **SimulationOrchestrator**: validate / run / compare façade
//! - **SimulationError**: configuration, kernel and resource-limit errors
//!
//! # Usage Example
//!
//! ```rust
//! use production_line_simulator::simulation::*;
//! use production_line_simulator::types::*;
//!
//! let config = default_configuration(&DefaultConfigParams::default());
//! let result = run(&config, &DurationParams::default()).unwrap();
//! assert!(result.summary.units_completed > 0);
//!
//! let comparison = compare(&config, &[ScenarioDelta::named("same")], &DurationParams::default()).unwrap();
//! assert_eq!(comparison.scenarios[0].change_from_baseline.throughput_percent, 0.0);
//! ```

pub mod clock;
pub mod engine;
pub mod error;
pub mod logging;
pub mod orchestrator;
pub mod scenario;
pub mod statistics;

// Re-export all public types for convenience
pub use clock::*;
pub use engine::*;
pub use error::*;
pub use logging::*;
pub use orchestrator::*;
pub use scenario::*;
pub use statistics::*;

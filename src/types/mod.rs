//! Core types for the line simulator
//!
//! This module contains the configuration model, identifiers, enumerations,
//! the configuration validator and the sample configuration generator.
//!
//! # Overview
//!
//! - **Identifiers**: deterministic identifiers for products, machine types, stations and workers
//! - **Enums**: station status, arrival patterns, variability distributions
//! - **Configuration**: line configuration, duration parameters and CLI support
//! - **Validation**: blocking errors and warnings over a configuration
//! - **Defaults**: a runnable sample line
//!
//! # Usage Example
//!
//! ```rust
//! use production_line_simulator::types::*;
//!
//! let config = default_configuration(&DefaultConfigParams::default());
//! let report = validate(&config);
//! assert!(report.is_valid);
//! ```

pub mod config;
pub mod defaults;
pub mod enums;
pub mod identifiers;
pub mod validation;

// Re-export all public types for convenience
pub use config::*;
pub use defaults::*;
pub use enums::*;
pub use identifiers::*;
pub use validation::*;

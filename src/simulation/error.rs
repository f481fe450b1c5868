//! Error types and handling
//!
//! This module contains the error taxonomy of the simulator. Errors fall in
//! three tiers that callers must not conflate:
//!
//! - **Configuration**: the input is wrong; fix it and retry
//! - **Kernel**: an internal invariant broke; the run is aborted and is a bug
//! - **Resource limit**: the caller's event or wall-clock budget was exceeded

use thiserror::Error;

/// Errors that can occur during a simulation run
#[derive(Debug, Error)]
pub enum SimulationError {
    /// The configuration failed validation and the run was refused
    #[error("Configuration validation failed: {}", errors.join("; "))]
    InvalidConfiguration {
        /// Blocking validation errors
        errors: Vec<String>,
    },

    /// An event was scheduled or popped out of time order
    #[error("Non-monotonic simulated time: event at {scheduled} while clock is at {now}")]
    NonMonotonicTime {
        /// Current clock time
        now: f64,
        /// Offending event time
        scheduled: f64,
    },

    /// Units were created or lost
    #[error("Unit conservation violated: {completed} completed + {defective} defective + {wip} WIP != {arrived} arrived")]
    ConservationMismatch {
        /// Units completed
        completed: u64,
        /// Units scrapped as defective
        defective: u64,
        /// Units still in the system
        wip: u64,
        /// Units that entered the system
        arrived: u64,
    },

    /// Any other kernel invariant violation
    #[error("Kernel invariant violated: {0}")]
    InvariantViolation(String),

    /// The run exceeded its event count or wall-clock budget
    #[error("Resource limit exceeded: {0}")]
    ResourceLimit(String),

    /// A configuration document has an unknown schema version
    #[error("Unsupported configuration schema version {found} (supported: {supported})")]
    UnsupportedSchemaVersion {
        /// Version found in the document
        found: u32,
        /// Version this build reads
        supported: u32,
    },

    /// I/O error
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}

impl SimulationError {
    /// Create a configuration error from validation messages
    pub fn invalid_configuration(errors: Vec<String>) -> Self {
        Self::InvalidConfiguration { errors }
    }

    /// Create a kernel invariant error
    pub fn invariant(msg: impl Into<String>) -> Self {
        Self::InvariantViolation(msg.into())
    }

    /// Create a resource limit error
    pub fn resource_limit(msg: impl Into<String>) -> Self {
        Self::ResourceLimit(msg.into())
    }

    /// True for kernel invariant violations (internal bugs, not bad input)
    pub fn is_internal(&self) -> bool {
        matches!(
            self,
            SimulationError::NonMonotonicTime { .. }
                | SimulationError::ConservationMismatch { .. }
                | SimulationError::InvariantViolation(_)
        )
    }

    /// Get the error category
    pub fn category(&self) -> &'static str {
        match self {
            SimulationError::InvalidConfiguration { .. } => "Configuration",
            SimulationError::NonMonotonicTime { .. }
            | SimulationError::ConservationMismatch { .. }
            | SimulationError::InvariantViolation(_) => "Kernel",
            SimulationError::ResourceLimit(_) => "Resource Limit",
            SimulationError::UnsupportedSchemaVersion { .. } => "Schema",
            SimulationError::IoError(_) => "IO",
            SimulationError::SerializationError(_) => "Serialization",
        }
    }
}

/// Result type for simulation operations
pub type SimulationResult<T> = Result<T, SimulationError>;

//! Enumeration types for the line simulator
//!
//! This module contains the enumerations shared across the configuration and
//! the simulation kernel: station status, demand arrival patterns, the
//! processing-time variability distribution, shift boundary kinds and the
//! report output format.

use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Operational status of a station
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StationStatus {
    /// No operation in progress and able to accept work
    Idle,
    /// At least one operation in progress
    Busy,
    /// Broken down; in-flight work is paused and nothing new is accepted
    Down,
}

impl fmt::Display for StationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StationStatus::Idle => write!(f, "IDLE"),
            StationStatus::Busy => write!(f, "BUSY"),
            StationStatus::Down => write!(f, "DOWN"),
        }
    }
}

/// How the units of a demand line enter the system over the horizon
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ArrivalPattern {
    /// Every unit is released at time zero
    #[default]
    AllAtStart,
    /// Units are spread evenly over the gross horizon
    Uniform,
    /// Units are split across days and released at the start of each day
    DailyRelease,
}

impl fmt::Display for ArrivalPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArrivalPattern::AllAtStart => write!(f, "all at start"),
            ArrivalPattern::Uniform => write!(f, "uniform"),
            ArrivalPattern::DailyRelease => write!(f, "daily release"),
        }
    }
}

impl FromStr for ArrivalPattern {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace(['-', ' '], "_").as_str() {
            "all_at_start" | "start" => Ok(ArrivalPattern::AllAtStart),
            "uniform" => Ok(ArrivalPattern::Uniform),
            "daily_release" | "daily" => Ok(ArrivalPattern::DailyRelease),
            _ => Err(format!("Unknown arrival pattern: {}", s)),
        }
    }
}

/// Symmetric, zero-mean distribution of the processing-time variability draw
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum VariabilityDistribution {
    /// No variability, every draw is exactly zero
    None,
    /// Uniform on `[-half_width, half_width]`
    Uniform {
        /// Half width of the interval, as a fraction of standard time
        half_width: f64,
    },
    /// Triangular on `[-half_width, half_width]` with mode zero
    Triangular {
        /// Half width of the interval, as a fraction of standard time
        half_width: f64,
    },
}

impl Default for VariabilityDistribution {
    fn default() -> Self {
        VariabilityDistribution::Uniform { half_width: 0.10 }
    }
}

impl VariabilityDistribution {
    /// Half width of the support (zero for `None`)
    pub fn half_width(&self) -> f64 {
        match self {
            VariabilityDistribution::None => 0.0,
            VariabilityDistribution::Uniform { half_width }
            | VariabilityDistribution::Triangular { half_width } => *half_width,
        }
    }

    /// Take one draw from the distribution
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> f64 {
        match *self {
            VariabilityDistribution::None => 0.0,
            VariabilityDistribution::Uniform { half_width } => {
                if half_width == 0.0 {
                    0.0
                } else {
                    rng.gen_range(-half_width..=half_width)
                }
            }
            VariabilityDistribution::Triangular { half_width } => {
                // Sum of two uniforms on [0,1) is triangular on [0,2) with mode 1
                let a: f64 = rng.gen();
                let b: f64 = rng.gen();
                (a + b - 1.0) * half_width
            }
        }
    }
}

/// What a shift boundary event marks on the timeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BoundaryKind {
    /// Rollover into the next working day
    DayStart,
    /// A scheduled break begins; all stations pause
    BreakStart,
    /// A scheduled break ends; all stations resume
    BreakEnd,
    /// Periodic allocator checkpoint with no schedule effect
    Checkpoint,
}

impl fmt::Display for BoundaryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BoundaryKind::DayStart => write!(f, "day start"),
            BoundaryKind::BreakStart => write!(f, "break start"),
            BoundaryKind::BreakEnd => write!(f, "break end"),
            BoundaryKind::Checkpoint => write!(f, "checkpoint"),
        }
    }
}

/// Output formats for run reports
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OutputFormat {
    /// JSON document following the result contract
    Json,
    /// Human readable text summary
    Text,
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputFormat::Json => write!(f, "JSON"),
            OutputFormat::Text => write!(f, "TEXT"),
        }
    }
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "json" => Ok(OutputFormat::Json),
            "text" | "txt" => Ok(OutputFormat::Text),
            _ => Err(format!("Unknown output format: {}", s)),
        }
    }
}

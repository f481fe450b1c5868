//! Static consistency checks over a line configuration
//!
//! The validator never mutates the configuration and returns the same report
//! for the same input. Blocking errors refuse the run; warnings are
//! informational only.

use super::config::LineConfig;
use super::{MachineType, ProductId};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, instrument};

/// Shortest standard time an operation may have; anything shorter vanishes
/// when added to the simulated clock
pub const MIN_STANDARD_TIME_HOURS: f64 = 1e-9;

/// Blocking configuration problems
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigValidationError {
    /// Shift hours are not positive
    #[error("Shift hours per day must be greater than 0, got {0}")]
    InvalidShiftHours(f64),

    /// Horizon days is zero
    #[error("Horizon days must be greater than 0, got {0}")]
    InvalidHorizonDays(u32),

    /// A product's routing does not start at step 1 or has gaps
    #[error("Product {product} has non-contiguous steps {steps:?} (expected 1..={expected})")]
    NonContiguousSteps {
        /// Product with the broken routing
        product: ProductId,
        /// Step numbers found, sorted
        steps: Vec<u32>,
        /// Number of steps expected
        expected: usize,
    },

    /// The same step number appears twice in one routing
    #[error("Product {product} defines step {step} more than once")]
    DuplicateStep {
        /// Product with the duplicated step
        product: ProductId,
        /// Duplicated step number
        step: u32,
    },

    /// An operation needs a machine type no station provides
    #[error("Operation {product}/{step} requires machine type '{machine_type}' which has no stations")]
    UnknownMachineType {
        /// Product of the operation
        product: ProductId,
        /// Step of the operation
        step: u32,
        /// Missing machine type
        machine_type: MachineType,
    },

    /// An operation value is outside its allowed range
    #[error("Operation {product}/{step}: {field} = {value} is out of range")]
    OperationOutOfRange {
        /// Product of the operation
        product: ProductId,
        /// Step of the operation
        step: u32,
        /// Offending field
        field: &'static str,
        /// Offending value
        value: f64,
    },

    /// An operation needs more operators than its station has fixed slots
    #[error("Operation {product}/{step} needs {required} operators but '{machine_type}' stations have {slots} slots")]
    InsufficientOperatorSlots {
        /// Product of the operation
        product: ProductId,
        /// Step of the operation
        step: u32,
        /// Machine type of the operation
        machine_type: MachineType,
        /// Operators required
        required: u32,
        /// Fixed slots per station
        slots: u32,
    },

    /// Two station entries share a machine type
    #[error("Machine type '{0}' is listed more than once in stations")]
    DuplicateStationType(MachineType),

    /// A station entry has no instances or no operators
    #[error("Stations for '{machine_type}' need count >= 1 and operator_slots >= 1 (got {count} x {slots})")]
    InvalidStationCapacity {
        /// Machine type of the entry
        machine_type: MachineType,
        /// Configured count
        count: u32,
        /// Configured operator slots
        slots: u32,
    },

    /// Demand for a product without a routing
    #[error("Demand references unknown product {0}")]
    UnknownProduct(ProductId),

    /// Demand with zero units
    #[error("Demand for product {0} must have quantity >= 1")]
    InvalidDemandQuantity(ProductId),

    /// A breakdown window lies outside the horizon
    #[error("Breakdown on '{machine_type}' [{start}, {end}] falls outside the horizon [0, {horizon}]")]
    BreakdownOutsideHorizon {
        /// Machine type of the breakdown
        machine_type: MachineType,
        /// Window start
        start: f64,
        /// Window end
        end: f64,
        /// Gross horizon
        horizon: f64,
    },

    /// A breakdown has a non-positive duration
    #[error("Breakdown on '{machine_type}' must have a positive duration, got {duration}")]
    InvalidBreakdownDuration {
        /// Machine type of the breakdown
        machine_type: MachineType,
        /// Configured duration
        duration: f64,
    },

    /// A breakdown targets a machine type no station provides
    #[error("Breakdown references machine type '{0}' which has no stations")]
    BreakdownUnknownMachineType(MachineType),

    /// A break window is empty, inverted, or outside the shift
    #[error("Break window [{start}, {end}] must satisfy 0 <= start < end <= {shift}")]
    InvalidBreakWindow {
        /// Break start offset
        start: f64,
        /// Break end offset
        end: f64,
        /// Shift length
        shift: f64,
    },

    /// Two break windows overlap
    #[error("Break windows [{0}, {1}] and [{2}, {3}] overlap")]
    OverlappingBreaks(f64, f64, f64, f64),

    /// Breaks leave no working time
    #[error("Breaks leave no working time in the shift")]
    NoWorkingTime,

    /// Variability half width outside [0, 1)
    #[error("Variability half width must be in [0, 1), got {0}")]
    InvalidVariability(f64),

    /// Allocator thresholds are out of range or inverted
    #[error("Allocator thresholds must satisfy 0 <= donor ({donor}) < bottleneck ({bottleneck}) <= 100")]
    InvalidThresholds {
        /// Donor threshold
        donor: f64,
        /// Bottleneck threshold
        bottleneck: f64,
    },

    /// Allocation interval is not positive
    #[error("Allocation interval must be greater than 0, got {0}")]
    InvalidAllocationInterval(f64),
}

/// Non-blocking configuration observations
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigWarning {
    /// Only one station provides a machine type
    #[error("Machine type '{0}' has a single station (single point of failure)")]
    SinglePointOfFailure(MachineType),

    /// Demand exceeds capacity by more than the configured slack
    #[error("Demand requires {demand_hours:.1} operator hours but only {capacity_hours:.1} are available (slack {slack_percent}%); expect WIP backlog")]
    DemandExceedsCapacity {
        /// Standard operator hours demanded
        demand_hours: f64,
        /// Operator hours available over the horizon
        capacity_hours: f64,
        /// Allowed slack
        slack_percent: f64,
    },
}

/// Outcome of validating a configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationReport {
    /// True when no blocking error was found
    pub is_valid: bool,
    /// Blocking errors
    pub errors: Vec<String>,
    /// Informational warnings
    pub warnings: Vec<String>,
}

/// Validate a configuration, collecting every problem rather than stopping at the first
#[instrument(skip(config), fields(operations = config.operations.len(), stations = config.stations.len()))]
pub fn validate(config: &LineConfig) -> ValidationReport {
    let (errors, warnings) = check(config);
    debug!(errors = errors.len(), warnings = warnings.len(), "Validation finished");

    ValidationReport {
        is_valid: errors.is_empty(),
        errors: errors.iter().map(ToString::to_string).collect(),
        warnings: warnings.iter().map(ToString::to_string).collect(),
    }
}

/// Typed validation: blocking errors and warnings
pub fn check(config: &LineConfig) -> (Vec<ConfigValidationError>, Vec<ConfigWarning>) {
    let mut errors = Vec::new();
    let mut warnings = Vec::new();

    let schedule = &config.schedule;
    let schedule_ok = schedule.shift_hours_per_day > 0.0 && schedule.horizon_days > 0;
    if !(schedule.shift_hours_per_day > 0.0) {
        errors.push(ConfigValidationError::InvalidShiftHours(schedule.shift_hours_per_day));
    }
    if schedule.horizon_days == 0 {
        errors.push(ConfigValidationError::InvalidHorizonDays(schedule.horizon_days));
    }

    check_stations(config, &mut errors, &mut warnings);
    check_routings(config, &mut errors);
    check_demand(config, &mut errors);
    if schedule_ok {
        check_breaks(config, &mut errors);
    }
    check_breakdowns(config, schedule_ok, &mut errors);
    check_tuning(config, &mut errors);

    if errors.is_empty() {
        check_feasibility(config, &mut warnings);
    }

    (errors, warnings)
}

fn check_stations(
    config: &LineConfig,
    errors: &mut Vec<ConfigValidationError>,
    warnings: &mut Vec<ConfigWarning>,
) {
    let mut seen = BTreeSet::new();
    for spec in &config.stations {
        if !seen.insert(spec.machine_type.clone()) {
            errors.push(ConfigValidationError::DuplicateStationType(spec.machine_type.clone()));
            continue;
        }
        if spec.count == 0 || spec.operator_slots == 0 {
            errors.push(ConfigValidationError::InvalidStationCapacity {
                machine_type: spec.machine_type.clone(),
                count: spec.count,
                slots: spec.operator_slots,
            });
        } else if spec.count == 1 {
            warnings.push(ConfigWarning::SinglePointOfFailure(spec.machine_type.clone()));
        }
    }
}

fn check_routings(config: &LineConfig, errors: &mut Vec<ConfigValidationError>) {
    let mut by_product: BTreeMap<&ProductId, Vec<u32>> = BTreeMap::new();

    for op in &config.operations {
        by_product.entry(&op.product_id).or_default().push(op.step_number);

        let range_checks: [(&'static str, f64, bool); 4] = [
            ("standard_time_hours", op.standard_time_hours, op.standard_time_hours >= MIN_STANDARD_TIME_HOURS),
            ("operators_required", op.operators_required as f64, op.operators_required >= 1),
            ("operator_grade", op.operator_grade, (0.0..=100.0).contains(&op.operator_grade)),
            (
                "first_pass_defect_percent",
                op.first_pass_defect_percent,
                (0.0..=100.0).contains(&op.first_pass_defect_percent),
            ),
        ];
        for (field, value, ok) in range_checks {
            if !ok {
                errors.push(ConfigValidationError::OperationOutOfRange {
                    product: op.product_id.clone(),
                    step: op.step_number,
                    field,
                    value,
                });
            }
        }

        match config.station_spec(&op.machine_type) {
            None => errors.push(ConfigValidationError::UnknownMachineType {
                product: op.product_id.clone(),
                step: op.step_number,
                machine_type: op.machine_type.clone(),
            }),
            Some(spec) if spec.operator_slots > 0 && op.operators_required > spec.operator_slots => {
                errors.push(ConfigValidationError::InsufficientOperatorSlots {
                    product: op.product_id.clone(),
                    step: op.step_number,
                    machine_type: op.machine_type.clone(),
                    required: op.operators_required,
                    slots: spec.operator_slots,
                })
            }
            Some(_) => {}
        }
    }

    for (product, mut steps) in by_product {
        steps.sort_unstable();
        let mut duplicated = false;
        for pair in steps.windows(2) {
            if pair[0] == pair[1] {
                errors.push(ConfigValidationError::DuplicateStep {
                    product: product.clone(),
                    step: pair[0],
                });
                duplicated = true;
            }
        }
        if duplicated {
            continue;
        }
        let contiguous = steps.iter().enumerate().all(|(i, step)| *step == i as u32 + 1);
        if !contiguous {
            errors.push(ConfigValidationError::NonContiguousSteps {
                product: product.clone(),
                expected: steps.len(),
                steps,
            });
        }
    }
}

fn check_demand(config: &LineConfig, errors: &mut Vec<ConfigValidationError>) {
    for demand in &config.demand {
        if !config.operations.iter().any(|op| op.product_id == demand.product_id) {
            errors.push(ConfigValidationError::UnknownProduct(demand.product_id.clone()));
        }
        if demand.quantity == 0 {
            errors.push(ConfigValidationError::InvalidDemandQuantity(demand.product_id.clone()));
        }
    }
}

fn check_breaks(config: &LineConfig, errors: &mut Vec<ConfigValidationError>) {
    let shift = config.schedule.shift_hours_per_day;
    let mut windows = config.schedule.breaks.clone();
    let mut all_ok = true;

    for window in &windows {
        if !(window.start_hour >= 0.0 && window.start_hour < window.end_hour && window.end_hour <= shift) {
            errors.push(ConfigValidationError::InvalidBreakWindow {
                start: window.start_hour,
                end: window.end_hour,
                shift,
            });
            all_ok = false;
        }
    }
    if !all_ok {
        return;
    }

    windows.sort_by(|a, b| a.start_hour.total_cmp(&b.start_hour));
    for pair in windows.windows(2) {
        if pair[1].start_hour < pair[0].end_hour {
            errors.push(ConfigValidationError::OverlappingBreaks(
                pair[0].start_hour,
                pair[0].end_hour,
                pair[1].start_hour,
                pair[1].end_hour,
            ));
            return;
        }
    }

    if config.schedule.break_hours_per_day() >= shift {
        errors.push(ConfigValidationError::NoWorkingTime);
    }
}

fn check_breakdowns(config: &LineConfig, schedule_ok: bool, errors: &mut Vec<ConfigValidationError>) {
    let horizon = config.schedule.gross_horizon_hours();
    for breakdown in &config.breakdowns {
        if config.station_spec(&breakdown.machine_type).is_none() {
            errors.push(ConfigValidationError::BreakdownUnknownMachineType(
                breakdown.machine_type.clone(),
            ));
        }
        if !(breakdown.duration_hours > 0.0) {
            errors.push(ConfigValidationError::InvalidBreakdownDuration {
                machine_type: breakdown.machine_type.clone(),
                duration: breakdown.duration_hours,
            });
            continue;
        }
        if schedule_ok
            && !(breakdown.start_offset_hours >= 0.0 && breakdown.end_offset_hours() <= horizon)
        {
            errors.push(ConfigValidationError::BreakdownOutsideHorizon {
                machine_type: breakdown.machine_type.clone(),
                start: breakdown.start_offset_hours,
                end: breakdown.end_offset_hours(),
                horizon,
            });
        }
    }
}

fn check_tuning(config: &LineConfig, errors: &mut Vec<ConfigValidationError>) {
    let half_width = config.variability.half_width();
    if !(0.0..1.0).contains(&half_width) {
        errors.push(ConfigValidationError::InvalidVariability(half_width));
    }

    let allocator = &config.allocator;
    let thresholds_ok = allocator.donor_threshold >= 0.0
        && allocator.donor_threshold < allocator.bottleneck_threshold
        && allocator.bottleneck_threshold <= 100.0;
    if !thresholds_ok {
        errors.push(ConfigValidationError::InvalidThresholds {
            donor: allocator.donor_threshold,
            bottleneck: allocator.bottleneck_threshold,
        });
    }

    if let Some(interval) = allocator.allocation_interval_hours {
        if !(interval > 0.0) {
            errors.push(ConfigValidationError::InvalidAllocationInterval(interval));
        }
    }
}

fn check_feasibility(config: &LineConfig, warnings: &mut Vec<ConfigWarning>) {
    let demand_hours: f64 = config
        .demand
        .iter()
        .map(|demand| {
            let per_unit: f64 = config
                .operations_for(&demand.product_id)
                .iter()
                .map(|op| op.standard_time_hours * op.operators_required as f64)
                .sum();
            per_unit * demand.quantity as f64
        })
        .sum();

    let operators: u64 = config
        .stations
        .iter()
        .map(|s| s.count as u64 * s.operator_slots as u64)
        .sum::<u64>()
        + config.floating_pool_size as u64;
    let capacity_hours = operators as f64 * config.schedule.working_hours();

    if demand_hours > capacity_hours * (1.0 + config.feasibility_slack_percent / 100.0) {
        warnings.push(ConfigWarning::DemandExceedsCapacity {
            demand_hours,
            capacity_hours,
            slack_percent: config.feasibility_slack_percent,
        });
    }
}

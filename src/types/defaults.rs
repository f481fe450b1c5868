//! Sample configuration generator
//!
//! Builds a runnable line configuration for onboarding and for the CLI's
//! `--print-config` template.

use super::config::{
    AllocatorConfig, BreakWindow, Breakdown, Demand, LineConfig, Operation, Schedule, StationSpec,
    thresholds,
};
use super::{ArrivalPattern, MachineType, ProductId, VariabilityDistribution};
use tracing::debug;

/// Machine types of the sample line in routing order, with their base SAM (hours)
const SAMPLE_STAGES: [(&str, &str, f64); 6] = [
    ("cutting", "Cut panels", 0.10),
    ("sewing", "Assemble and stitch", 0.25),
    ("pressing", "Press seams", 0.12),
    ("finishing", "Trim and finish", 0.15),
    ("inspection", "Final inspection", 0.08),
    ("packing", "Fold and pack", 0.06),
];

/// Parameters for [`default_configuration`]
#[derive(Debug, Clone, PartialEq)]
pub struct DefaultConfigParams {
    /// Number of routing stages (1-6)
    pub stages: usize,
    /// Number of products sharing the line (1-3)
    pub products: usize,
    /// Units demanded per product
    pub units_per_product: u32,
    /// Shift length
    pub shift_hours_per_day: f64,
    /// Days simulated
    pub horizon_days: u32,
    /// Floating workers
    pub floating_pool_size: u32,
    /// Random seed
    pub random_seed: u64,
    /// Add a lunch break to every shift
    pub include_breaks: bool,
    /// Add a breakdown on the sewing stations
    pub include_breakdown: bool,
}

impl Default for DefaultConfigParams {
    fn default() -> Self {
        Self {
            stages: 5,
            products: 2,
            units_per_product: 60,
            shift_hours_per_day: 8.0,
            horizon_days: 2,
            floating_pool_size: 2,
            random_seed: 42,
            include_breaks: true,
            include_breakdown: true,
        }
    }
}

/// Generate a runnable sample line
pub fn default_configuration(params: &DefaultConfigParams) -> LineConfig {
    let stages = params.stages.clamp(1, SAMPLE_STAGES.len());
    let products = params.products.clamp(1, 3);

    let mut operations = Vec::new();
    for p in 0..products {
        let product_id = ProductId::new(format!("P-{:03}", p + 1));
        let time_factor = 1.0 + 0.1 * p as f64;
        for (step, (machine, name, sam)) in SAMPLE_STAGES.iter().take(stages).enumerate() {
            operations.push(Operation {
                product_id: product_id.clone(),
                step_number: step as u32 + 1,
                operation_name: name.to_string(),
                machine_type: MachineType::from(*machine),
                standard_time_hours: sam * time_factor,
                operators_required: 1,
                operator_grade: 85.0,
                first_pass_defect_percent: if *machine == "sewing" { 2.0 } else { 0.5 },
            });
        }
    }

    let stations = SAMPLE_STAGES
        .iter()
        .take(stages)
        .map(|(machine, _, _)| StationSpec {
            machine_type: MachineType::from(*machine),
            count: if *machine == "sewing" { 2 } else { 1 },
            operator_slots: 1,
        })
        .collect();

    let breaks = if params.include_breaks && params.shift_hours_per_day >= 6.0 {
        let midpoint = (params.shift_hours_per_day / 2.0).floor();
        vec![BreakWindow { start_hour: midpoint, end_hour: midpoint + 0.5 }]
    } else {
        Vec::new()
    };

    let demand = (0..products)
        .map(|p| Demand {
            product_id: ProductId::new(format!("P-{:03}", p + 1)),
            quantity: params.units_per_product.max(1),
            arrival: if p == 0 { ArrivalPattern::AllAtStart } else { ArrivalPattern::DailyRelease },
        })
        .collect();

    let horizon = params.shift_hours_per_day * params.horizon_days as f64;
    let breakdowns = if params.include_breakdown && stages >= 2 && horizon >= 2.5 {
        vec![Breakdown {
            machine_type: MachineType::from("sewing"),
            start_offset_hours: 2.0,
            duration_hours: 0.5,
        }]
    } else {
        Vec::new()
    };

    debug!(stages, products, "Generated sample line configuration");

    LineConfig {
        operations,
        stations,
        schedule: Schedule {
            shift_hours_per_day: params.shift_hours_per_day,
            horizon_days: params.horizon_days,
            breaks,
        },
        demand,
        breakdowns,
        floating_pool_size: params.floating_pool_size,
        random_seed: params.random_seed,
        variability: VariabilityDistribution::default(),
        allocator: AllocatorConfig::default(),
        feasibility_slack_percent: thresholds::FEASIBILITY_SLACK,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::validation::validate;

    #[test]
    fn test_default_configuration_is_valid() {
        let config = default_configuration(&DefaultConfigParams::default());
        let report = validate(&config);
        assert!(report.is_valid, "errors: {:?}", report.errors);
    }

    #[test]
    fn test_default_configuration_shape() {
        let config = default_configuration(&DefaultConfigParams::default());
        assert_eq!(config.stations.len(), 5);
        assert_eq!(config.operations.len(), 10);
        assert_eq!(config.demand.len(), 2);
        assert_eq!(config.breakdowns.len(), 1);
        assert_eq!(config.schedule.breaks.len(), 1);
        assert_eq!(config.random_seed, 42);
    }

    #[test]
    fn test_parameters_are_clamped() {
        let params = DefaultConfigParams {
            stages: 50,
            products: 0,
            include_breaks: false,
            include_breakdown: false,
            ..Default::default()
        };
        let config = default_configuration(&params);
        assert_eq!(config.stations.len(), 6);
        assert_eq!(config.demand.len(), 1);
        assert!(config.breakdowns.is_empty());
        assert!(config.schedule.breaks.is_empty());
        assert!(validate(&config).is_valid);
    }

    #[test]
    fn test_single_stage_line_is_valid() {
        let params = DefaultConfigParams { stages: 1, products: 1, ..Default::default() };
        let config = default_configuration(&params);
        assert!(config.breakdowns.is_empty());
        assert!(validate(&config).is_valid);
    }
}

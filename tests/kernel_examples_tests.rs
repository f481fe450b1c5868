//! Tests for the simulation kernel on small hand-checkable lines
//!
//! These lines are simple enough that the expected unit counts follow from
//! arithmetic on standard times, so they pin down event ordering, pause and
//! resume, and time accounting through the public `run` entry point.

use production_line_simulator::types::AllocatorConfig;
use production_line_simulator::*;

fn operation(product: &str, step: u32, machine: &str, hours: f64) -> Operation {
    Operation {
        product_id: ProductId::from(product),
        step_number: step,
        operation_name: format!("{}-{}", machine, step),
        machine_type: MachineType::from(machine),
        standard_time_hours: hours,
        operators_required: 1,
        operator_grade: 100.0,
        first_pass_defect_percent: 0.0,
    }
}

fn press_line(quantity: u32) -> LineConfig {
    LineConfig {
        operations: vec![operation("P", 1, "press", 0.25)],
        stations: vec![StationSpec { machine_type: MachineType::from("press"), count: 1, operator_slots: 1 }],
        schedule: Schedule { shift_hours_per_day: 8.0, horizon_days: 1, breaks: vec![] },
        demand: vec![Demand { product_id: ProductId::from("P"), quantity, arrival: ArrivalPattern::AllAtStart }],
        breakdowns: vec![],
        floating_pool_size: 0,
        random_seed: 7,
        variability: VariabilityDistribution::None,
        allocator: AllocatorConfig::default(),
        feasibility_slack_percent: 10.0,
    }
}

/// A single press fills an eight hour shift with quarter-hour jobs
#[test]
fn test_single_station_throughput() {
    let result = run(&press_line(40), &DurationParams::default()).unwrap();

    assert_eq!(result.summary.units_completed, 32);
    assert!((result.summary.efficiency_percent - 100.0).abs() < 1e-6);
    assert!((result.summary.throughput_per_hour - 4.0).abs() < 1e-9);
    assert_eq!(result.summary.quality_yield_percent, 100.0);
    assert_eq!(result.flow.wip_remaining, 8);
    assert_eq!(result.final_clock_hours, 8.0);
}

/// A one hour breakdown costs exactly four units
#[test]
fn test_breakdown_pauses_and_resumes_work() {
    let mut config = press_line(40);
    config.breakdowns.push(Breakdown {
        machine_type: MachineType::from("press"),
        start_offset_hours: 2.0,
        duration_hours: 1.0,
    });

    let result = run(&config, &DurationParams::default()).unwrap();
    assert_eq!(result.summary.units_completed, 28);

    let press = &result.stations[0];
    assert!((press.down_hours - 1.0).abs() < 1e-9);
    assert!((press.busy_hours - 7.0).abs() < 1e-9);
    assert!(press.idle_hours.abs() < 1e-9);
}

/// Break time is excluded from both output and metrics
#[test]
fn test_break_is_excluded_from_metrics() {
    let mut config = press_line(40);
    config.schedule.breaks.push(BreakWindow { start_hour: 4.0, end_hour: 5.0 });

    let result = run(&config, &DurationParams::default()).unwrap();
    assert_eq!(result.summary.units_completed, 28);
    assert!((result.summary.efficiency_percent - 100.0).abs() < 1e-6);
    assert!((result.stations[0].utilization_percent - 100.0).abs() < 1e-6);
    assert!((result.simulated_hours - 7.0).abs() < 1e-9);
}

/// Two stations in series: the slower one sets the pace and is flagged
#[test]
fn test_serial_line_bottleneck() {
    let mut config = press_line(20);
    config.operations.push(operation("P", 2, "welder", 0.5));
    config.stations.push(StationSpec { machine_type: MachineType::from("welder"), count: 1, operator_slots: 1 });

    let result = run(&config, &DurationParams::default()).unwrap();

    // First weld starts at 0.25; 15 welds finish by 7.75 and the 16th would end at 8.25
    assert_eq!(result.summary.units_completed, 15);
    let welder = StationId::for_instance(&MachineType::from("welder"), 1);
    assert_eq!(result.bottleneck_analysis.bottleneck_station, Some(welder.clone()));
    assert!(result.station_utilization[&welder] > 95.0);
}

/// Parallel instances of a machine type split the demand
#[test]
fn test_parallel_instances_double_capacity() {
    let mut config = press_line(80);
    config.stations[0].count = 2;

    let result = run(&config, &DurationParams::default()).unwrap();
    assert_eq!(result.summary.units_completed, 64);
    assert_eq!(result.stations.len(), 2);
    assert!(result.stations.iter().all(|s| s.operations_completed == 32));
}

/// Work finishing exactly at the horizon counts
#[test]
fn test_completion_at_horizon_counts() {
    let result = run(&press_line(32), &DurationParams::default()).unwrap();
    assert_eq!(result.summary.units_completed, 32);
    assert_eq!(result.flow.wip_remaining, 0);
    assert_eq!(result.flow.average_flow_time_hours, Some((0.25 + 8.0) / 2.0));
}

/// A demand line with no units is refused before the kernel starts
#[test]
fn test_zero_demand_is_refused() {
    let err = run(&press_line(0), &DurationParams::default()).unwrap_err();
    assert!(matches!(err, SimulationError::InvalidConfiguration { .. }));
}

/// A pooled worker joins the saturated press at the first day boundary
#[test]
fn test_floating_worker_moves_to_saturated_station() {
    let mut config = press_line(200);
    config.schedule.horizon_days = 3;
    let without_pool = run(&config, &DurationParams::default()).unwrap();

    config.floating_pool_size = 1;
    let with_pool = run(&config, &DurationParams::default()).unwrap();

    assert!(without_pool.reassignments.is_empty());
    assert_eq!(with_pool.reassignments.len(), 1);
    let moved = &with_pool.reassignments[0];
    assert_eq!(moved.time_hours, 8.0);
    assert_eq!(moved.from_station, None);
    assert_eq!(moved.to_station, StationId::for_instance(&MachineType::from("press"), 1));
    assert!(moved.target_utilization >= config.allocator.bottleneck_threshold);

    assert_eq!(without_pool.summary.units_completed, 96);
    assert_eq!(with_pool.summary.units_completed, 160);
    assert_eq!(with_pool.stations[0].final_operator_count, 2);
}

/// Periodic checkpoints let the allocator act inside a shift
#[test]
fn test_allocation_checkpoint_moves_worker_mid_shift() {
    let mut config = press_line(200);
    config.floating_pool_size = 1;
    config.allocator.allocation_interval_hours = Some(2.0);

    let result = run(&config, &DurationParams::default()).unwrap();

    assert_eq!(result.reassignments.len(), 1);
    assert_eq!(result.reassignments[0].time_hours, 2.0);
    // 8 units alone, then two operators for the remaining six hours
    assert_eq!(result.summary.units_completed, 8 + 48);
}

/// Recommendations are reported as sentences with a structured twin
#[test]
fn test_recommendations_are_sentences() {
    let result = run(&press_line(40), &DurationParams::default()).unwrap();

    assert_eq!(result.recommendation_details.len(), 2);
    let rendered: Vec<String> = result.recommendation_details.iter().map(ToString::to_string).collect();
    assert_eq!(result.recommendations, rendered);

    let json = ResultsExporter::new(OutputFormat::Json).render_run(&result).unwrap();
    let value: serde_json::Value = serde_json::from_str(&json).unwrap();
    let listed = value["recommendations"].as_array().unwrap();
    assert_eq!(listed.len(), 2);
    assert!(listed.iter().all(|r| r.is_string()));
    assert_eq!(listed[0].as_str(), Some(rendered[0].as_str()));
}

/// With a backlog, a higher defect rate never yields more good units
///
/// The defect allowance lengthens processing, so fewer units reach the quality
/// check. Yield over the units that did can still move either way; good output
/// cannot rise.
#[test]
fn test_good_output_never_rises_with_defect_rate_under_backlog() {
    for seed in 0..20 {
        let mut config = press_line(40);
        config.random_seed = seed;

        let mut previous_good = u64::MAX;
        let mut previous_checked = u64::MAX;
        for step in 0..14 {
            let defect_percent = step as f64 * 1.5;
            config.operations[0].first_pass_defect_percent = defect_percent;
            let result = run(&config, &DurationParams::default()).unwrap();

            let good = result.summary.units_completed;
            let checked = good + result.flow.defective_units;
            assert!(result.flow.wip_remaining > 0);
            assert!(good <= previous_good, "seed {}: good output rose to {} at {}%", seed, good, defect_percent);
            assert!(checked <= previous_checked, "seed {}: {} units checked at {}%", seed, checked, defect_percent);
            previous_good = good;
            previous_checked = checked;
        }
    }
}

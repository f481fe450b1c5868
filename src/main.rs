// Production Line Simulator - Main Entry Point
//
// You can run it via Cargo:
//
// ```console
// $ cargo build --release
// $ ./target/release/line-sim --config line.json
// ```
//
// Or compare staffing scenarios:
//
// ```console
// $ ./target/release/line-sim --config line.json --scenarios scenarios.json --format json
// ```

use anyhow::{bail, Context, Result};
use clap::Parser;
use production_line_simulator::simulation::{LoggingConfig, ScenarioDelta, SimulationOrchestrator};
use production_line_simulator::types::config::CliArgs;
use production_line_simulator::types::{
    default_configuration, DefaultConfigParams, DurationParams, LineConfig,
};
use production_line_simulator::ResultsExporter;
use std::process;
use tracing::{error, info};

fn main() {
    // Parse CLI arguments first to check for special flags
    let args = CliArgs::parse();

    // Handle special CLI flags that don't require full initialization
    if args.print_config {
        let default_config = default_configuration(&DefaultConfigParams::default());
        match default_config.print_json() {
            Ok(json) => {
                println!("{}", json);
                return;
            }
            Err(e) => {
                eprintln!("Failed to serialize default configuration: {}", e);
                process::exit(1);
            }
        }
    }

    // Initialize logging based on CLI flags
    let logging_result = if let Some(dir) = &args.log_dir {
        LoggingConfig::init_prod(dir.as_str())
    } else if args.debug {
        LoggingConfig::init_debug()
    } else if args.verbose {
        LoggingConfig::init_verbose()
    } else {
        LoggingConfig::new().with_level(tracing::Level::WARN).init()
    };

    let _logging_guard = match logging_result {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("Failed to initialize logging: {}", e);
            process::exit(1);
        }
    };

    if let Err(e) = run_cli(&args) {
        error!("{:#}", e);
        eprintln!("Error: {:#}", e);
        process::exit(1);
    }
}

/// Load, validate and run according to the parsed arguments
fn run_cli(args: &CliArgs) -> Result<()> {
    info!("Starting production line simulator");

    let config = load_configuration(args)?;
    let orchestrator =
        SimulationOrchestrator::new(config).with_duration_params(DurationParams::from_cli_args(args));

    let report = orchestrator.validate();
    for warning in &report.warnings {
        eprintln!("Warning: {}", warning);
    }
    if !report.is_valid {
        for problem in &report.errors {
            eprintln!("  - {}", problem);
        }
        bail!("configuration has {} blocking error(s)", report.errors.len());
    }

    // Handle dry run mode
    if args.dry_run {
        eprintln!("Configuration validation successful!");
        eprintln!("Dry run mode - simulation will not be executed.");
        print_configuration_summary(orchestrator.config());
        return Ok(());
    }

    print_configuration_summary(orchestrator.config());

    let exporter = ResultsExporter::new(args.format);
    let rendered = match &args.scenarios {
        Some(path) => {
            let scenarios = ScenarioDelta::load_all(path)
                .with_context(|| format!("failed to load scenarios from {}", path))?;
            info!("Comparing {} scenarios against the baseline", scenarios.len());
            let comparison = orchestrator.compare(&scenarios).context("scenario comparison failed")?;
            exporter.render_comparison(&comparison)?
        }
        None => {
            let result = orchestrator.run().context("simulation run failed")?;
            exporter.render_run(&result)?
        }
    };

    match &args.output {
        Some(path) => {
            exporter
                .write_to_file(&rendered, path)
                .with_context(|| format!("failed to write results to {}", path))?;
            eprintln!("Results written to {}", path);
        }
        None => println!("{}", rendered),
    }

    info!("Production line simulator completed successfully");
    Ok(())
}

/// Configuration from file (or the sample line) with CLI overrides applied
fn load_configuration(args: &CliArgs) -> Result<LineConfig> {
    let mut config = match &args.config {
        Some(path) => LineConfig::from_file(path)
            .with_context(|| format!("failed to load configuration from {}", path))?,
        None => default_configuration(&DefaultConfigParams::default()),
    };
    config.apply_cli_overrides(args);
    Ok(config)
}

/// Print configuration summary
fn print_configuration_summary(config: &LineConfig) {
    let instances: u32 = config.stations.iter().map(|s| s.count).sum();
    eprintln!("Configuration:");
    eprintln!("  Station Types: {} ({} instances)", config.stations.len(), instances);
    eprintln!("  Operations: {}", config.operations.len());
    eprintln!("  Demand: {} units across {} products", config.total_demand_units(), config.demand.len());
    eprintln!(
        "  Schedule: {} days x {} h ({} h working)",
        config.schedule.horizon_days,
        config.schedule.shift_hours_per_day,
        config.schedule.working_hours()
    );
    eprintln!("  Floating Pool: {}", config.floating_pool_size);
    eprintln!("  Breakdowns: {}", config.breakdowns.len());
    eprintln!("  Random Seed: {}", config.random_seed);
    eprintln!();
}

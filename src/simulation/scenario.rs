//! Scenario comparison
//!
//! Runs a baseline configuration and a list of named what-if deltas with the
//! same seed, so that differences come from the configuration alone, and
//! reports each scenario's change against the baseline.

use crate::simulation::{run, RunSummary, SimulationError, SimulationResult};
use crate::types::{validate, DurationParams, LineConfig, MachineType};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::{info, instrument};

/// Override of one machine type's stations
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StationOverride {
    /// Machine type to change
    pub machine_type: MachineType,
    /// New number of station instances
    #[serde(default)]
    pub count: Option<u32>,
    /// New fixed operators per instance
    #[serde(default)]
    pub operator_slots: Option<u32>,
}

/// A named partial override of the baseline configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScenarioDelta {
    /// Scenario name used in reports
    pub name: String,
    /// Fixed operators for every station
    #[serde(default)]
    pub workers_per_station: Option<u32>,
    /// Floating pool size
    #[serde(default)]
    pub floating_pool_size: Option<u32>,
    /// Per machine type station changes, applied after `workers_per_station`
    #[serde(default)]
    pub station_overrides: Vec<StationOverride>,
    /// Shift length
    #[serde(default)]
    pub shift_hours_per_day: Option<f64>,
    /// Days simulated
    #[serde(default)]
    pub horizon_days: Option<u32>,
    /// Factor applied to every demand quantity (rounded to whole units)
    #[serde(default)]
    pub demand_multiplier: Option<f64>,
}

impl ScenarioDelta {
    /// A delta that changes nothing
    pub fn named(name: impl Into<String>) -> Self {
        Self { name: name.into(), ..Default::default() }
    }

    /// Apply the delta to a copy of the baseline
    pub fn apply(&self, baseline: &LineConfig) -> LineConfig {
        let mut config = baseline.clone();

        if let Some(workers) = self.workers_per_station {
            for station in &mut config.stations {
                station.operator_slots = workers;
            }
        }
        for change in &self.station_overrides {
            if let Some(station) = config.stations.iter_mut().find(|s| s.machine_type == change.machine_type) {
                if let Some(count) = change.count {
                    station.count = count;
                }
                if let Some(slots) = change.operator_slots {
                    station.operator_slots = slots;
                }
            }
        }
        if let Some(size) = self.floating_pool_size {
            config.floating_pool_size = size;
        }
        if let Some(hours) = self.shift_hours_per_day {
            config.schedule.shift_hours_per_day = hours;
        }
        if let Some(days) = self.horizon_days {
            config.schedule.horizon_days = days;
        }
        if let Some(factor) = self.demand_multiplier {
            for demand in &mut config.demand {
                demand.quantity = (demand.quantity as f64 * factor).round().max(0.0) as u32;
            }
        }
        config
    }

    /// Load a JSON array of deltas
    pub fn load_all<P: AsRef<Path>>(path: P) -> SimulationResult<Vec<ScenarioDelta>> {
        let content = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }
}

/// Percent change of each headline metric against the baseline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricChanges {
    /// Throughput change, percent
    pub throughput_percent: f64,
    /// Efficiency change, percent
    pub efficiency_percent: f64,
    /// Quality yield change, percent
    pub quality_percent: f64,
}

impl MetricChanges {
    /// Compare a scenario summary to the baseline summary
    pub fn between(baseline: &RunSummary, scenario: &RunSummary) -> Self {
        Self {
            throughput_percent: percent_change(baseline.throughput_per_hour, scenario.throughput_per_hour),
            efficiency_percent: percent_change(baseline.efficiency_percent, scenario.efficiency_percent),
            quality_percent: percent_change(baseline.quality_yield_percent, scenario.quality_yield_percent),
        }
    }
}

/// Relative change in percent; 0 when both are zero, ±100 when only the baseline is zero
pub fn percent_change(baseline: f64, scenario: f64) -> f64 {
    if baseline == 0.0 {
        if scenario == 0.0 {
            0.0
        } else {
            100.0 * scenario.signum()
        }
    } else {
        (scenario - baseline) / baseline.abs() * 100.0
    }
}

/// Result of one scenario
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioOutcome {
    /// Scenario name
    pub name: String,
    /// Headline metrics of the scenario run
    pub summary: RunSummary,
    /// Change against the baseline
    pub change_from_baseline: MetricChanges,
}

/// Best scenario by throughput
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparisonSummary {
    /// Scenario with the highest throughput, earliest on ties; `None` without scenarios
    pub best_scenario: Option<String>,
    /// Its throughput (the baseline's when there are no scenarios)
    pub best_throughput: f64,
    /// Scenario names by descending throughput
    pub ranking: Vec<String>,
}

/// Baseline plus every scenario
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioComparison {
    /// Headline metrics of the baseline
    pub baseline: RunSummary,
    /// Scenario results in input order
    pub scenarios: Vec<ScenarioOutcome>,
    /// Ranking and best scenario
    pub summary: ComparisonSummary,
}

/// Run the baseline and every scenario with the baseline's seed
///
/// Scenarios run in parallel. Every scenario configuration is validated up
/// front; any invalid one fails the whole comparison.
#[instrument(skip_all, fields(scenarios = scenarios.len()))]
pub fn compare(
    baseline: &LineConfig,
    scenarios: &[ScenarioDelta],
    duration_params: &DurationParams,
) -> SimulationResult<ScenarioComparison> {
    let configs: Vec<LineConfig> = scenarios.iter().map(|delta| delta.apply(baseline)).collect();

    let mut errors = Vec::new();
    for (delta, config) in scenarios.iter().zip(&configs) {
        let mut effective = config.clone();
        duration_params.apply_to(&mut effective);
        let report = validate(&effective);
        errors.extend(report.errors.into_iter().map(|e| format!("scenario '{}': {}", delta.name, e)));
    }
    if !errors.is_empty() {
        return Err(SimulationError::invalid_configuration(errors));
    }

    let baseline_result = run(baseline, duration_params)?;
    let results: Vec<RunSummary> = configs
        .par_iter()
        .map(|config| run(config, duration_params).map(|result| result.summary))
        .collect::<SimulationResult<_>>()?;

    let outcomes: Vec<ScenarioOutcome> = scenarios
        .iter()
        .zip(results)
        .map(|(delta, summary)| ScenarioOutcome {
            name: delta.name.clone(),
            change_from_baseline: MetricChanges::between(&baseline_result.summary, &summary),
            summary,
        })
        .collect();

    let mut ranked: Vec<&ScenarioOutcome> = outcomes.iter().collect();
    // Stable sort keeps input order among equal throughputs
    ranked.sort_by(|a, b| b.summary.throughput_per_hour.total_cmp(&a.summary.throughput_per_hour));
    let summary = ComparisonSummary {
        best_scenario: ranked.first().map(|o| o.name.clone()),
        best_throughput: ranked
            .first()
            .map(|o| o.summary.throughput_per_hour)
            .unwrap_or(baseline_result.summary.throughput_per_hour),
        ranking: ranked.iter().map(|o| o.name.clone()).collect(),
    };

    info!(best = ?summary.best_scenario, best_throughput = summary.best_throughput, "Scenario comparison finished");
    Ok(ScenarioComparison { baseline: baseline_result.summary, scenarios: outcomes, summary })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::defaults::{default_configuration, DefaultConfigParams};

    #[test]
    fn test_percent_change_edge_cases() {
        assert_eq!(percent_change(0.0, 0.0), 0.0);
        assert_eq!(percent_change(0.0, 3.0), 100.0);
        assert_eq!(percent_change(2.0, 3.0), 50.0);
        assert_eq!(percent_change(4.0, 3.0), -25.0);
    }

    #[test]
    fn test_delta_application() {
        let baseline = default_configuration(&DefaultConfigParams::default());
        let delta = ScenarioDelta {
            name: "bigger".to_string(),
            workers_per_station: Some(2),
            floating_pool_size: Some(5),
            station_overrides: vec![StationOverride {
                machine_type: MachineType::from("sewing"),
                count: Some(3),
                operator_slots: Some(4),
            }],
            shift_hours_per_day: Some(10.0),
            horizon_days: Some(3),
            demand_multiplier: Some(1.5),
        };
        let config = delta.apply(&baseline);

        assert!(config.stations.iter().filter(|s| s.machine_type.as_str() != "sewing").all(|s| s.operator_slots == 2));
        let sewing = config.station_spec(&MachineType::from("sewing")).unwrap();
        assert_eq!((sewing.count, sewing.operator_slots), (3, 4));
        assert_eq!(config.floating_pool_size, 5);
        assert_eq!(config.schedule.shift_hours_per_day, 10.0);
        assert_eq!(config.schedule.horizon_days, 3);
        assert_eq!(config.demand[0].quantity, 90);
        assert_eq!(config.random_seed, baseline.random_seed);
    }

    #[test]
    fn test_empty_delta_is_identity() {
        let baseline = default_configuration(&DefaultConfigParams::default());
        assert_eq!(ScenarioDelta::named("same").apply(&baseline), baseline);
    }

    #[test]
    fn test_invalid_scenario_fails_comparison() {
        let baseline = default_configuration(&DefaultConfigParams::default());
        let broken = ScenarioDelta { name: "no-shift".to_string(), shift_hours_per_day: Some(0.0), ..Default::default() };

        match compare(&baseline, &[broken], &DurationParams::default()) {
            Err(SimulationError::InvalidConfiguration { errors }) => {
                assert!(errors.iter().all(|e| e.starts_with("scenario 'no-shift'")));
            }
            other => panic!("Expected InvalidConfiguration, got {:?}", other),
        }
    }

    #[test]
    fn test_delta_file_parsing() {
        let json = r#"[{"name": "more floats", "floating_pool_size": 4}, {"name": "base"}]"#;
        let deltas: Vec<ScenarioDelta> = serde_json::from_str(json).unwrap();
        assert_eq!(deltas[0].floating_pool_size, Some(4));
        assert_eq!(deltas[1], ScenarioDelta::named("base"));
    }
}

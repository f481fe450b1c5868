//! Configuration import/export and result export
//!
//! Configurations travel as versioned documents that wrap the configuration
//! with a schema version, a document id and an export timestamp. Import is
//! exact: `import_configuration(export_configuration(cfg)) == cfg`.

use crate::simulation::{RunResult, ScenarioComparison, SimulationError, SimulationResult};
use crate::types::{LineConfig, OutputFormat};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use tracing::info;
use uuid::Uuid;

/// Schema version written by this build and the only one it reads
pub const CONFIG_SCHEMA_VERSION: u32 = 1;

/// Versioned envelope of an exported configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfigurationDocument {
    /// Schema version of the document
    pub schema_version: u32,
    /// Unique id of this export
    pub document_id: Uuid,
    /// When the document was exported
    pub exported_at: DateTime<Utc>,
    /// The configuration itself
    pub configuration: LineConfig,
}

/// Wrap a configuration in a new document
pub fn export_configuration(config: &LineConfig) -> ConfigurationDocument {
    ConfigurationDocument {
        schema_version: CONFIG_SCHEMA_VERSION,
        document_id: Uuid::new_v4(),
        exported_at: Utc::now(),
        configuration: config.clone(),
    }
}

/// Unwrap a document, rejecting unknown schema versions
pub fn import_configuration(document: ConfigurationDocument) -> SimulationResult<LineConfig> {
    if document.schema_version != CONFIG_SCHEMA_VERSION {
        return Err(SimulationError::UnsupportedSchemaVersion {
            found: document.schema_version,
            supported: CONFIG_SCHEMA_VERSION,
        });
    }
    Ok(document.configuration)
}

/// Export a configuration as a pretty JSON document
pub fn export_configuration_string(config: &LineConfig) -> SimulationResult<String> {
    Ok(serde_json::to_string_pretty(&export_configuration(config))?)
}

/// Import a configuration from JSON document text
///
/// The schema version is checked before the rest of the document is parsed,
/// so documents from a newer schema fail with `UnsupportedSchemaVersion`
/// rather than a parse error.
pub fn import_configuration_str(content: &str) -> SimulationResult<LineConfig> {
    #[derive(Deserialize)]
    struct VersionProbe {
        schema_version: u32,
    }

    let probe: VersionProbe = serde_json::from_str(content)?;
    if probe.schema_version != CONFIG_SCHEMA_VERSION {
        return Err(SimulationError::UnsupportedSchemaVersion {
            found: probe.schema_version,
            supported: CONFIG_SCHEMA_VERSION,
        });
    }
    import_configuration(serde_json::from_str(content)?)
}

/// Writes run results and scenario comparisons
#[derive(Debug, Clone, Copy)]
pub struct ResultsExporter {
    format: OutputFormat,
}

impl ResultsExporter {
    /// Create an exporter for an output format
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    /// Output format of this exporter
    pub fn format(&self) -> OutputFormat {
        self.format
    }

    /// Render a run result
    pub fn render_run(&self, result: &RunResult) -> SimulationResult<String> {
        match self.format {
            OutputFormat::Json => Ok(serde_json::to_string_pretty(result)?),
            OutputFormat::Text => Ok(result.to_string()),
        }
    }

    /// Render a scenario comparison
    pub fn render_comparison(&self, comparison: &ScenarioComparison) -> SimulationResult<String> {
        match self.format {
            OutputFormat::Json => Ok(serde_json::to_string_pretty(comparison)?),
            OutputFormat::Text => Ok(comparison_text(comparison)),
        }
    }

    /// Write rendered output to a file
    pub fn write_to_file<P: AsRef<Path>>(&self, rendered: &str, path: P) -> SimulationResult<()> {
        let path = path.as_ref();
        let mut writer = BufWriter::new(File::create(path)?);
        writer.write_all(rendered.as_bytes())?;
        writer.write_all(b"\n")?;
        writer.flush()?;
        info!(path = %path.display(), format = %self.format, "Results written");
        Ok(())
    }
}

fn comparison_text(comparison: &ScenarioComparison) -> String {
    let mut out = String::new();
    out.push_str("=== Scenario Comparison ===\n");
    out.push_str(&format!(
        "{:<24} {:>10} {:>10} {:>10} {:>12} {:>12} {:>12}\n",
        "scenario", "units", "thru/h", "eff %", "Δ thru %", "Δ eff %", "Δ quality %"
    ));
    out.push_str(&format!(
        "{:<24} {:>10} {:>10.3} {:>10.1} {:>12} {:>12} {:>12}\n",
        "baseline",
        comparison.baseline.units_completed,
        comparison.baseline.throughput_per_hour,
        comparison.baseline.efficiency_percent,
        "-",
        "-",
        "-"
    ));
    for scenario in &comparison.scenarios {
        out.push_str(&format!(
            "{:<24} {:>10} {:>10.3} {:>10.1} {:>+12.1} {:>+12.1} {:>+12.1}\n",
            scenario.name,
            scenario.summary.units_completed,
            scenario.summary.throughput_per_hour,
            scenario.summary.efficiency_percent,
            scenario.change_from_baseline.throughput_percent,
            scenario.change_from_baseline.efficiency_percent,
            scenario.change_from_baseline.quality_percent
        ));
    }
    match &comparison.summary.best_scenario {
        Some(best) => out.push_str(&format!(
            "\nBest scenario: {} ({:.3} units/hour)\n",
            best, comparison.summary.best_throughput
        )),
        None => out.push_str("\nNo scenarios given\n"),
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::defaults::{default_configuration, DefaultConfigParams};

    #[test]
    fn test_document_round_trip() {
        let config = default_configuration(&DefaultConfigParams::default());
        let document = export_configuration(&config);
        assert_eq!(document.schema_version, CONFIG_SCHEMA_VERSION);
        assert_eq!(import_configuration(document).unwrap(), config);
    }

    #[test]
    fn test_string_round_trip_is_exact() {
        let mut config = default_configuration(&DefaultConfigParams::default());
        config.operations[0].standard_time_hours = 0.1 + 0.2;
        config.random_seed = u64::MAX;

        let json = export_configuration_string(&config).unwrap();
        assert_eq!(import_configuration_str(&json).unwrap(), config);
    }

    #[test]
    fn test_unknown_schema_version_is_rejected() {
        let config = default_configuration(&DefaultConfigParams::default());
        let mut document = export_configuration(&config);
        document.schema_version = 2;
        assert!(matches!(
            import_configuration(document),
            Err(SimulationError::UnsupportedSchemaVersion { found: 2, supported: 1 })
        ));

        let newer = r#"{"schema_version": 7, "configuration": {"shape": "unknown"}}"#;
        assert!(matches!(
            import_configuration_str(newer),
            Err(SimulationError::UnsupportedSchemaVersion { found: 7, .. })
        ));
    }

    #[test]
    fn test_document_ids_are_unique() {
        let config = default_configuration(&DefaultConfigParams::default());
        assert_ne!(export_configuration(&config).document_id, export_configuration(&config).document_id);
    }
}

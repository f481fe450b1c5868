//! Bottleneck analysis
//!
//! Runs once over the final station utilizations of a run and derives the
//! bottleneck station plus rebalancing recommendations.

use crate::types::{AllocatorConfig, StationId};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Bottleneck section of a run result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BottleneckAnalysis {
    /// Highest-utilization station, when at or above the bottleneck threshold
    pub bottleneck_station: Option<StationId>,
    /// Utilization of the highest-utilization station, percent
    pub utilization: f64,
}

/// A rebalancing action suggested by the analyzer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Recommendation {
    /// Move a floating worker from an underused station to the bottleneck
    MoveFloatingWorker {
        /// Donor station
        from_station: StationId,
        /// Bottleneck station
        to_station: StationId,
        /// Donor utilization, percent
        donor_utilization: f64,
        /// Bottleneck utilization, percent
        bottleneck_utilization: f64,
    },
    /// Add a fixed operator at the bottleneck
    AddFixedOperator {
        /// Bottleneck station
        station: StationId,
        /// Bottleneck utilization, percent
        utilization: f64,
    },
    /// Reduce the standard time of the bottleneck's operations
    ReduceStandardTime {
        /// Bottleneck station
        station: StationId,
        /// Bottleneck utilization, percent
        utilization: f64,
    },
}

impl fmt::Display for Recommendation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Recommendation::MoveFloatingWorker {
                from_station,
                to_station,
                donor_utilization,
                bottleneck_utilization,
            } => write!(
                f,
                "Move a floating worker from {} ({:.1}% utilized) to {} ({:.1}% utilized)",
                from_station, donor_utilization, to_station, bottleneck_utilization
            ),
            Recommendation::AddFixedOperator { station, utilization } => write!(
                f,
                "Add a fixed operator at {} ({:.1}% utilized)",
                station, utilization
            ),
            Recommendation::ReduceStandardTime { station, utilization } => write!(
                f,
                "Reduce standard time of operations at {} ({:.1}% utilized)",
                station, utilization
            ),
        }
    }
}

/// Derives the bottleneck and recommendations from station utilizations
#[derive(Debug, Clone)]
pub struct BottleneckAnalyzer {
    bottleneck_threshold: f64,
    donor_threshold: f64,
}

impl BottleneckAnalyzer {
    /// Create an analyzer with explicit thresholds (percent)
    pub fn new(bottleneck_threshold: f64, donor_threshold: f64) -> Self {
        Self { bottleneck_threshold, donor_threshold }
    }

    /// Create an analyzer using the run's allocator thresholds
    pub fn from_allocator(settings: &AllocatorConfig) -> Self {
        Self::new(settings.bottleneck_threshold, settings.donor_threshold)
    }

    /// Analyze utilizations given in station order
    pub fn analyze(&self, utilization: &[(StationId, f64)]) -> (BottleneckAnalysis, Vec<Recommendation>) {
        let highest = utilization
            .iter()
            .enumerate()
            .max_by(|(ia, (_, a)), (ib, (_, b))| a.total_cmp(b).then(ib.cmp(ia)));

        let Some((bottleneck_index, (station, peak))) = highest else {
            return (BottleneckAnalysis { bottleneck_station: None, utilization: 0.0 }, Vec::new());
        };

        if *peak < self.bottleneck_threshold {
            return (BottleneckAnalysis { bottleneck_station: None, utilization: *peak }, Vec::new());
        }

        let donor = utilization
            .iter()
            .enumerate()
            .filter(|&(index, (_, u))| index != bottleneck_index && *u <= self.donor_threshold)
            .min_by(|(ia, (_, a)), (ib, (_, b))| a.total_cmp(b).then(ia.cmp(ib)));

        let recommendations = match donor {
            Some((_, (donor_station, donor_utilization))) => vec![Recommendation::MoveFloatingWorker {
                from_station: donor_station.clone(),
                to_station: station.clone(),
                donor_utilization: *donor_utilization,
                bottleneck_utilization: *peak,
            }],
            None => vec![
                Recommendation::AddFixedOperator { station: station.clone(), utilization: *peak },
                Recommendation::ReduceStandardTime { station: station.clone(), utilization: *peak },
            ],
        };

        (
            BottleneckAnalysis { bottleneck_station: Some(station.clone()), utilization: *peak },
            recommendations,
        )
    }
}

impl Default for BottleneckAnalyzer {
    fn default() -> Self {
        Self::from_allocator(&AllocatorConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn util(values: &[(&str, f64)]) -> Vec<(StationId, f64)> {
        values.iter().map(|(id, u)| (StationId::from(*id), *u)).collect()
    }

    #[test]
    fn test_no_bottleneck_below_threshold() {
        let (analysis, recommendations) =
            BottleneckAnalyzer::default().analyze(&util(&[("a-1", 80.0), ("b-1", 40.0)]));
        assert_eq!(analysis.bottleneck_station, None);
        assert_eq!(analysis.utilization, 80.0);
        assert!(recommendations.is_empty());
    }

    #[test]
    fn test_donor_recommendation() {
        let (analysis, recommendations) = BottleneckAnalyzer::default()
            .analyze(&util(&[("a-1", 60.0), ("b-1", 95.0), ("c-1", 30.0), ("d-1", 30.0)]));

        assert_eq!(analysis.bottleneck_station, Some(StationId::from("b-1")));
        assert_eq!(
            recommendations,
            vec![Recommendation::MoveFloatingWorker {
                from_station: StationId::from("c-1"),
                to_station: StationId::from("b-1"),
                donor_utilization: 30.0,
                bottleneck_utilization: 95.0,
            }]
        );
        assert!(recommendations[0].to_string().starts_with("Move a floating worker from c-1"));
    }

    #[test]
    fn test_no_donor_recommends_capacity() {
        let (analysis, recommendations) =
            BottleneckAnalyzer::default().analyze(&util(&[("a-1", 90.0), ("b-1", 90.0), ("c-1", 75.0)]));

        // Ties resolve to station order
        assert_eq!(analysis.bottleneck_station, Some(StationId::from("a-1")));
        assert_eq!(recommendations.len(), 2);
        assert!(matches!(recommendations[0], Recommendation::AddFixedOperator { .. }));
        assert!(matches!(recommendations[1], Recommendation::ReduceStandardTime { .. }));
    }

    #[test]
    fn test_empty_line() {
        let (analysis, recommendations) = BottleneckAnalyzer::default().analyze(&[]);
        assert_eq!(analysis.bottleneck_station, None);
        assert!(recommendations.is_empty());
    }

    #[test]
    fn test_recommendation_serde_tag() {
        let json = serde_json::to_value(Recommendation::AddFixedOperator {
            station: StationId::from("a-1"),
            utilization: 90.0,
        })
        .unwrap();
        assert_eq!(json["action"], "add_fixed_operator");
        assert_eq!(json["station"], "a-1");
    }
}

//! Routing engine
//!
//! Resolves, per product, the ordered operations a unit passes through and
//! picks the station instance that will perform each one.

use crate::line::Station;
use crate::types::{LineConfig, MachineType, Operation, ProductId};
use std::collections::BTreeMap;

/// One resolved routing step
#[derive(Debug, Clone, PartialEq)]
pub struct RouteStep {
    /// Step number in the routing
    pub step_number: u32,
    /// Operation name
    pub operation_name: String,
    /// Machine type required
    pub machine_type: MachineType,
    /// Standard allowed time in hours
    pub standard_time_hours: f64,
    /// Operators tied up while running
    pub operators_required: u32,
    /// Operator grade, 0-100
    pub operator_grade: f64,
    /// First pass defect percentage
    pub first_pass_defect_percent: f64,
}

impl RouteStep {
    /// Processing time for one attempt given a variability draw
    ///
    /// `SAM × (1 + draw + FPD/100 + (100 − grade)/100)`
    pub fn actual_time(&self, variability_draw: f64) -> f64 {
        self.standard_time_hours
            * (1.0
                + variability_draw
                + self.first_pass_defect_percent / 100.0
                + (100.0 - self.operator_grade) / 100.0)
    }

    /// Standard operator hours earned by one good pass
    pub fn earned_hours(&self) -> f64 {
        self.standard_time_hours * self.operators_required as f64
    }
}

impl From<&Operation> for RouteStep {
    fn from(op: &Operation) -> Self {
        Self {
            step_number: op.step_number,
            operation_name: op.operation_name.clone(),
            machine_type: op.machine_type.clone(),
            standard_time_hours: op.standard_time_hours,
            operators_required: op.operators_required,
            operator_grade: op.operator_grade,
            first_pass_defect_percent: op.first_pass_defect_percent,
        }
    }
}

/// Where a unit goes after finishing a step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoutingDecision {
    /// Continue with the step at this routing index
    Next(usize),
    /// The routing is complete
    Finished,
}

/// Product routings and machine-type to station mapping
#[derive(Debug, Clone)]
pub struct RoutingEngine {
    routes: BTreeMap<ProductId, Vec<RouteStep>>,
    stations_by_type: BTreeMap<MachineType, Vec<usize>>,
}

impl RoutingEngine {
    /// Build the routing tables from a validated configuration and its stations
    pub fn new(config: &LineConfig, stations: &[Station]) -> Self {
        let mut routes: BTreeMap<ProductId, Vec<RouteStep>> = BTreeMap::new();
        for op in &config.operations {
            routes.entry(op.product_id.clone()).or_default().push(RouteStep::from(op));
        }
        for steps in routes.values_mut() {
            steps.sort_by_key(|s| s.step_number);
        }

        let mut stations_by_type: BTreeMap<MachineType, Vec<usize>> = BTreeMap::new();
        for (index, station) in stations.iter().enumerate() {
            stations_by_type.entry(station.machine_type.clone()).or_default().push(index);
        }

        Self { routes, stations_by_type }
    }

    /// Full routing of a product
    pub fn route(&self, product_id: &ProductId) -> Option<&[RouteStep]> {
        self.routes.get(product_id).map(Vec::as_slice)
    }

    /// One step of a product's routing
    pub fn step(&self, product_id: &ProductId, index: usize) -> Option<&RouteStep> {
        self.routes.get(product_id).and_then(|steps| steps.get(index))
    }

    /// Number of steps in a product's routing
    pub fn route_len(&self, product_id: &ProductId) -> usize {
        self.routes.get(product_id).map(Vec::len).unwrap_or(0)
    }

    /// Decide what follows the step at `index`
    pub fn advance(&self, product_id: &ProductId, index: usize) -> RoutingDecision {
        if index + 1 < self.route_len(product_id) {
            RoutingDecision::Next(index + 1)
        } else {
            RoutingDecision::Finished
        }
    }

    /// Station instances providing a machine type
    pub fn stations_for(&self, machine_type: &MachineType) -> &[usize] {
        self.stations_by_type.get(machine_type).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Pick the least-loaded station of a machine type (queue plus in-flight), first on ties
    pub fn select_station(&self, machine_type: &MachineType, stations: &[Station]) -> Option<usize> {
        self.stations_for(machine_type)
            .iter()
            .copied()
            .min_by_key(|&index| (stations[index].load(), index))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::line::build_stations;
    use crate::types::defaults::{default_configuration, DefaultConfigParams};
    use crate::types::WorkItemId;

    fn step(sam: f64, grade: f64, fpd: f64) -> RouteStep {
        RouteStep {
            step_number: 1,
            operation_name: "op".to_string(),
            machine_type: MachineType::from("m"),
            standard_time_hours: sam,
            operators_required: 2,
            operator_grade: grade,
            first_pass_defect_percent: fpd,
        }
    }

    #[test]
    fn test_actual_time_formula() {
        assert_eq!(step(0.25, 100.0, 0.0).actual_time(0.0), 0.25);
        // 0.5 × (1 + 0.1 + 0.1 + 0.2)
        let t = step(0.5, 80.0, 10.0).actual_time(0.1);
        assert!((t - 0.7).abs() < 1e-12);
        assert_eq!(step(0.5, 100.0, 0.0).earned_hours(), 1.0);
    }

    #[test]
    fn test_routes_are_ordered_and_advance() {
        let mut config = default_configuration(&DefaultConfigParams::default());
        config.operations.reverse();
        let stations = build_stations(&config);
        let routing = RoutingEngine::new(&config, &stations);

        let product = ProductId::from("P-001");
        let route = routing.route(&product).unwrap();
        assert_eq!(route.len(), 5);
        assert_eq!(route[0].machine_type.as_str(), "cutting");
        assert_eq!(routing.advance(&product, 0), RoutingDecision::Next(1));
        assert_eq!(routing.advance(&product, 4), RoutingDecision::Finished);
        assert!(routing.route(&ProductId::from("nope")).is_none());
    }

    #[test]
    fn test_select_least_loaded_station() {
        let config = default_configuration(&DefaultConfigParams::default());
        let mut stations = build_stations(&config);
        let routing = RoutingEngine::new(&config, &stations);
        let sewing = MachineType::from("sewing");

        let candidates = routing.stations_for(&sewing).to_vec();
        assert_eq!(candidates.len(), 2);

        // Ties go to the first instance
        assert_eq!(routing.select_station(&sewing, &stations), Some(candidates[0]));

        stations[candidates[0]].enqueue(WorkItemId(1));
        assert_eq!(routing.select_station(&sewing, &stations), Some(candidates[1]));

        assert_eq!(routing.select_station(&MachineType::from("laser"), &stations), None);
    }
}

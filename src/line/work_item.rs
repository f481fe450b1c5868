//! Work items flowing through the line

use crate::types::{ProductId, WorkItemId};

/// One unit of product travelling along its routing
#[derive(Debug, Clone, PartialEq)]
pub struct WorkItem {
    /// Identifier, assigned in arrival order
    pub id: WorkItemId,
    /// Product being made
    pub product_id: ProductId,
    /// Index into the product routing of the step in progress or queued for
    pub current_step_index: usize,
    /// Time the unit entered the system
    pub arrival_time: f64,
    /// Order of arrival among all units
    pub arrival_sequence: u64,
    /// Set when the unit failed a quality check and was scrapped
    pub is_defective: bool,
    /// Time the unit finished its last step
    pub completion_time: Option<f64>,
    /// Uniform draws deciding the quality outcome of each step, taken at arrival
    quality_draws: Vec<f64>,
}

impl WorkItem {
    /// Create a unit at its first step
    pub fn new(
        id: WorkItemId,
        product_id: ProductId,
        arrival_time: f64,
        arrival_sequence: u64,
        quality_draws: Vec<f64>,
    ) -> Self {
        Self {
            id,
            product_id,
            current_step_index: 0,
            arrival_time,
            arrival_sequence,
            is_defective: false,
            completion_time: None,
            quality_draws,
        }
    }

    /// Bernoulli outcome of the current step: true when the unit fails quality
    pub fn fails_current_step(&self, first_pass_defect_percent: f64) -> bool {
        self.quality_draws
            .get(self.current_step_index)
            .map(|draw| *draw < first_pass_defect_percent / 100.0)
            .unwrap_or(false)
    }

    /// True once the unit has left the system, either completed or scrapped
    pub fn is_finished(&self) -> bool {
        self.is_defective || self.completion_time.is_some()
    }

    /// Hours from arrival to completion
    pub fn flow_time(&self) -> Option<f64> {
        self.completion_time.map(|done| done - self.arrival_time)
    }
}

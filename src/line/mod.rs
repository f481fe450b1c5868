//! Line model
//!
//! This module contains the components the simulation kernel drives:
//!
//! - **WorkItem**: a unit of product travelling along its routing
//! - **RoutingEngine**: product routings and station selection
//! - **Station**: queue, in-flight operations and operator capacity of one station instance
//! - **BreakdownInjector**: scheduled downtime windows per machine type
//! - **FloatingPoolAllocator**: moves cross-trained workers toward the bottleneck

pub mod breakdown;
pub mod floating_pool;
pub mod routing;
pub mod station;
pub mod work_item;

// Re-export all public types for convenience
pub use breakdown::*;
pub use floating_pool::*;
pub use routing::*;
pub use station::*;
pub use work_item::*;

//! Cost modeling and projection
//!
//! [`model`] prices storage and network for one workload size; [`projection`]
//! runs the model across the 3-year horizon and assembles the flat result
//! map the renderer consumes.

pub mod model;
pub mod projection;

pub use model::{CostModel, NetworkCost, StorageCost};
pub use projection::{ProjectionEngine, ProjectionInput};

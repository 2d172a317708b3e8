//! Core library for database migration cost estimation
//!
//! This crate provides the core functionality for:
//! - Parsing performance dump files and assessment reports
//! - Instance catalog lookups and family expansion
//! - Concurrent price quote gathering
//! - Storage, network and TCO cost projection

pub mod catalog;
pub mod cost;
pub mod error;
pub mod estimator;
pub mod models;
pub mod parser;
pub mod pricing;

pub use cost::{CostModel, NetworkCost, ProjectionEngine, ProjectionInput, StorageCost};
pub use error::EstimatorError;
pub use estimator::{Estimate, Estimator};
pub use models::*;
pub use parser::ReportParser;
pub use pricing::{QuoteGatherer, QuoteSet, QuoteSource, ReservationSource, ReservedOffering};

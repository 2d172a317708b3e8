//! CLI command implementations

pub mod estimate;
pub mod parse;

//! Execution engine for converge
//!
//! The engine orchestrates:
//! 1. Executing - Converge manifest resources sequentially or in parallel
//! 2. Diffing - Render planned and applied changes

pub mod differ;
pub mod executor;

pub use differ::display_reports;
pub use executor::{ExecuteSummary, print_summary, run};

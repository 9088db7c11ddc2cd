//! Timing Execution
//!
//! Drives one harness run against the reference VM and collects the
//! metadata that accompanies its report.

mod execution;
mod metadata;

pub use execution::{PROGRESS_STRIDE, run_timing};
pub use metadata::build_report_meta;

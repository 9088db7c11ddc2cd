#![warn(missing_docs)]
//! opbench Statistical Primitives
//!
//! Reductions used by the differential sampler and the report layer:
//! - Two-pass mean and population standard deviation
//! - Percentiles with linear interpolation between ranks
//! - Distribution summaries over all samples (nothing is trimmed)

mod dispersion;
mod percentiles;
mod summary;

pub use dispersion::{Dispersion, population_std_dev};
pub use percentiles::{Percentiles, compute_percentiles};
pub use summary::{SummaryStatistics, compute_summary};

#![warn(missing_docs)]
//! opbench Report - Output Rendering
//!
//! Generates the output formats of `opcode-timing`:
//! - CSV (one header line plus one line per timed code unit)
//! - JSON (full report with metadata and runtime distribution)

mod csv;
mod json;
mod report;

pub use csv::{CSV_HEADER, generate_csv_report};
pub use json::{ReportSchema, generate_json_report};
pub use report::{
    MetricSummary, Report, ReportConfig, ReportMeta, ReportSummary, RuntimeDistribution,
    SCHEMA_VERSION, SystemInfo, TimingRecord,
};

use serde::{Deserialize, Serialize};

/// Output format selection
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Header plus one fixed-point line per result
    #[default]
    Csv,
    /// JSON with full schema
    Json,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "csv" => Ok(OutputFormat::Csv),
            "json" => Ok(OutputFormat::Json),
            other => Err(format!("Unknown output format: {}", other)),
        }
    }
}

/// Unit for runtime columns in the CSV output
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum TimeUnit {
    /// Nanoseconds
    #[default]
    #[serde(rename = "ns")]
    Nanoseconds,
    /// Milliseconds
    #[serde(rename = "ms")]
    Milliseconds,
}

impl TimeUnit {
    /// Convert a nanosecond quantity into this unit
    pub fn from_nanos(self, nanos: f64) -> f64 {
        match self {
            TimeUnit::Nanoseconds => nanos,
            TimeUnit::Milliseconds => nanos / 1_000_000.0,
        }
    }
}

impl std::str::FromStr for TimeUnit {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "ns" | "nanos" | "nanoseconds" => Ok(TimeUnit::Nanoseconds),
            "ms" | "millis" | "milliseconds" => Ok(TimeUnit::Milliseconds),
            other => Err(format!("Unknown time unit: {}", other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_format_and_unit() {
        assert_eq!("CSV".parse::<OutputFormat>(), Ok(OutputFormat::Csv));
        assert_eq!("json".parse::<OutputFormat>(), Ok(OutputFormat::Json));
        assert!("html".parse::<OutputFormat>().is_err());

        assert_eq!("ms".parse::<TimeUnit>(), Ok(TimeUnit::Milliseconds));
        assert_eq!("ns".parse::<TimeUnit>(), Ok(TimeUnit::Nanoseconds));
        assert!("s".parse::<TimeUnit>().is_err());
    }

    #[test]
    fn test_unit_conversion() {
        assert_eq!(TimeUnit::Nanoseconds.from_nanos(1500.0), 1500.0);
        assert_eq!(TimeUnit::Milliseconds.from_nanos(2_500_000.0), 2.5);
    }
}

//! CSV Output
//!
//! One header line, then per result: token, runtime mean, runtime std-dev,
//! gas mean, gas std-dev (fixed point, 9 decimals) and `1`/`0` for the
//! error flag. Runtime columns use the unit recorded in the report config.

use crate::report::Report;
use std::fmt::Write;

/// Header line (without newline)
pub const CSV_HEADER: &str = "OPCODE,runtime mean,runtime stddev,gas mean,gas stddev,error";

/// Quote a field if it contains a separator, quote or newline
fn escape_field(field: &str) -> String {
    if field.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

/// Generate the CSV report
pub fn generate_csv_report(report: &Report) -> String {
    let unit = report.meta.config.time_unit;
    let mut output = String::with_capacity(CSV_HEADER.len() + 128 * report.results.len());
    output.push_str(CSV_HEADER);
    output.push('\n');

    for record in &report.results {
        let _ = writeln!(
            output,
            "{},{:.9},{:.9},{:.9},{:.9},{}",
            escape_field(&record.code),
            unit.from_nanos(record.runtime_ns.mean),
            unit.from_nanos(record.runtime_ns.std_dev),
            record.gas.mean,
            record.gas.std_dev,
            u8::from(record.errored),
        );
    }

    output
}

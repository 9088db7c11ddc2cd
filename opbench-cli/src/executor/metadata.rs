//! System Metadata Collection
//!
//! CPU model and memory are read from `/proc` on Linux and degrade to
//! "Unknown" / 0 elsewhere.

use chrono::Utc;
use opbench_report::{ReportConfig, ReportMeta, ReportSchema, SystemInfo};

/// Build report metadata for a run with the given configuration
pub fn build_report_meta(config: ReportConfig) -> ReportMeta {
    let system = SystemInfo {
        os: std::env::consts::OS.to_string(),
        arch: std::env::consts::ARCH.to_string(),
        cpu: cpu_model().unwrap_or_else(|| "Unknown".to_string()),
        cpu_cores: std::thread::available_parallelism().map_or(1, |n| n.get() as u32),
        memory_gb: total_memory_gb().unwrap_or(0.0),
    };

    ReportMeta {
        schema: ReportSchema::default(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: Utc::now(),
        system,
        config,
    }
}

/// Value of the first `key: value` line of a `/proc` table
fn table_field<'a>(table: &'a str, key: &str) -> Option<&'a str> {
    table.lines().find_map(|line| {
        let (name, value) = line.split_once(':')?;
        (name.trim() == key).then(|| value.trim())
    })
}

#[cfg(target_os = "linux")]
fn read_proc_field(path: &str, key: &str) -> Option<String> {
    let table = std::fs::read_to_string(path).ok()?;
    table_field(&table, key).map(str::to_string)
}

#[cfg(not(target_os = "linux"))]
fn read_proc_field(_path: &str, _key: &str) -> Option<String> {
    None
}

fn cpu_model() -> Option<String> {
    read_proc_field("/proc/cpuinfo", "model name")
}

/// `MemTotal` is reported in kibibytes
fn total_memory_gb() -> Option<f64> {
    let field = read_proc_field("/proc/meminfo", "MemTotal")?;
    let kib: u64 = field.split_whitespace().next()?.parse().ok()?;
    Some(kib as f64 / (1024.0 * 1024.0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use opbench_core::HarnessConfig;
    use opbench_report::TimeUnit;

    #[test]
    fn test_meta_carries_config() {
        let config = ReportConfig::from_harness(&HarnessConfig::default(), TimeUnit::Milliseconds);
        let meta = build_report_meta(config.clone());
        assert_eq!(meta.config, config);
        assert_eq!(meta.schema.schema, "opbench.report");
        assert_eq!(meta.system.os, std::env::consts::OS);
        assert!(meta.system.cpu_cores >= 1);
        assert!(!meta.system.cpu.is_empty());
    }

    #[test]
    fn test_table_field_matches_whole_key() {
        let cpuinfo = "processor\t: 0\nmodel name\t: Example CPU @ 3.00GHz\nmodel\t\t: 85\n";
        assert_eq!(table_field(cpuinfo, "model name"), Some("Example CPU @ 3.00GHz"));
        assert_eq!(table_field(cpuinfo, "model"), Some("85"));
        assert_eq!(table_field(cpuinfo, "flags"), None);

        let meminfo = "MemTotal:       16318000 kB\nMemFree:         1024 kB\n";
        assert_eq!(table_field(meminfo, "MemTotal"), Some("16318000 kB"));
    }
}

#![warn(missing_docs)]
//! opbench CLI Library
//!
//! Command-line front end of `opcode-timing`: argument parsing, configuration
//! layering, logging setup and report output. The binary in the `opbench`
//! crate calls [`run`] from its `main`.
//!
//! # Example
//!
//! ```ignore
//! fn main() -> std::process::ExitCode {
//!     opbench_cli::run()
//! }
//! ```

mod config;
mod executor;

pub use config::{
    CONFIG_FILE_NAME, OpbenchConfig, OutputConfig, SamplerConfig, VmConfig,
};
pub use executor::{PROGRESS_STRIDE, build_report_meta, run_timing};

use anyhow::Context;
use clap::Parser;
use clap::error::ErrorKind;
use opbench_core::{BenchError, HarnessConfig};
use opbench_report::{
    OutputFormat, Report, ReportConfig, TimeUnit, TimingRecord, generate_csv_report,
    generate_json_report,
};
use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Instant;
use tracing_subscriber::EnvFilter;

/// Name the binary is installed under
pub const PROGRAM_NAME: &str = "opcode-timing";

/// opcode-timing CLI arguments
#[derive(Parser, Debug)]
#[command(name = "opcode-timing")]
#[command(
    author,
    version,
    about = "Compare TVM execution time against gas for an opcode or code sequence",
    override_usage = "opcode-timing [OPTIONS] [SETUP_CODE] MEASURED_CODE"
)]
pub struct Cli {
    /// Optional setup code followed by the code to measure
    /// (hex, e.g. A90E, or boc:<base64>)
    #[arg(value_name = "CODE")]
    pub codes: Vec<String>,

    /// Upper bound on collected samples
    #[arg(short = 'n', long = "samples")]
    pub samples: Option<usize>,

    /// Wall-clock sampling budget (e.g., "2s", "500ms")
    #[arg(long)]
    pub time_budget: Option<String>,

    /// Samples required before the time budget may stop sampling
    #[arg(long)]
    pub min_samples: Option<usize>,

    /// Code whose cost is subtracted from the measured code (default: empty)
    #[arg(long)]
    pub baseline: Option<String>,

    /// Gas budget per execution
    #[arg(long)]
    pub gas_limit: Option<i64>,

    /// Global version selecting instruction semantics
    #[arg(long)]
    pub global_version: Option<u32>,

    /// Pin the sampling thread to this CPU
    #[arg(long)]
    pub pin_cpu: Option<usize>,

    /// Output format: csv or json
    #[arg(long)]
    pub format: Option<OutputFormat>,

    /// Runtime unit in CSV output: ns or ms
    #[arg(long)]
    pub time_unit: Option<TimeUnit>,

    /// Path to an opbench.toml (default: discovered from the current directory)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Write the report to a file instead of stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Verbose logging on stderr
    #[arg(short, long)]
    pub verbose: bool,

    /// Print a default opbench.toml and exit
    #[arg(long)]
    pub print_config: bool,
}

impl Cli {
    /// Split positionals into `(setup, measured)`; `None` unless there are
    /// one or two of them
    pub fn code_pair(&self) -> Option<(&str, &str)> {
        match self.codes.as_slice() {
            [measured] => Some(("", measured.as_str())),
            [setup, measured] => Some((setup.as_str(), measured.as_str())),
            _ => None,
        }
    }
}

/// Effective settings after layering defaults, file and flags
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    /// Harness configuration
    pub harness: HarnessConfig,
    /// Report format
    pub format: OutputFormat,
    /// CSV runtime unit
    pub time_unit: TimeUnit,
}

impl Settings {
    /// Apply command-line overrides on top of a file configuration
    pub fn resolve(cli: &Cli, config: &OpbenchConfig) -> anyhow::Result<Self> {
        let mut policy = config.policy()?;
        if let Some(n) = cli.samples {
            policy.target_samples = n;
        }
        if let Some(budget) = &cli.time_budget {
            policy.time_budget =
                OpbenchConfig::parse_duration(budget).context("invalid --time-budget")?;
        }
        if let Some(min) = cli.min_samples {
            policy.min_samples = min;
        }

        let mut limits = config.limits();
        if let Some(gas) = cli.gas_limit {
            limits.gas_limit = gas;
        }
        if let Some(version) = cli.global_version {
            limits.global_version = version;
        }

        Ok(Self {
            harness: HarnessConfig {
                policy,
                limits,
                baseline: cli.baseline.clone().unwrap_or_default(),
                pin_cpu: cli.pin_cpu.or(config.sampler.pin_cpu),
            },
            format: cli.format.unwrap_or(config.output.format),
            time_unit: cli.time_unit.unwrap_or(config.output.time_unit),
        })
    }
}

/// Usage text printed on argument errors
pub fn usage_text() -> String {
    format!(
        "This utility compares the timing of VM execution against the gas used.\n\
         It can be used to discover opcodes or opcode sequences that consume an \
         inordinate amount of computational resources relative to their gas cost.\n\
         \n\
         The utility expects one or two code arguments:\n\
         the code used to set up the stack and VM state (optional), followed by the code to measure.\n\
         For example, to test the DIVMODC opcode:\n\
         \t$ {PROGRAM_NAME} 80FF801C A90E 2>/dev/null\n\
         \tOPCODE,runtime mean,runtime stddev,gas mean,gas stddev,error\n\
         \tA90E,6641.600000000,2334.960000000,26.000000000,0.000000000,0\n\
         \n\
         Usage: {PROGRAM_NAME} [OPTIONS] [SETUP_CODE] MEASURED_CODE\n\
         \tCODE is either:\n\
         \t1. hex-encoded string (e.g. A90E for DIVMODC)\n\
         \t2. boc:<serialized boc in base64> (e.g. boc:te6ccgEBAgEABwABAogBAAJ7)\n\
         \n\
         Run `{PROGRAM_NAME} --help` for the list of options.\n"
    )
}

/// Run the opcode-timing CLI, parsing arguments from the environment
pub fn run() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) if matches!(e.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => {
            let _ = e.print();
            return ExitCode::SUCCESS;
        }
        Err(e) => {
            let reason = e.kind().as_str().unwrap_or("invalid arguments");
            eprintln!("error: {reason}\n");
            eprint!("{}", usage_text());
            return ExitCode::FAILURE;
        }
    };
    run_with_cli(cli)
}

/// Run the opcode-timing CLI with pre-parsed arguments
pub fn run_with_cli(cli: Cli) -> ExitCode {
    if cli.print_config {
        print!("{}", OpbenchConfig::default_toml());
        return ExitCode::SUCCESS;
    }

    let Some((setup, measured)) = cli.code_pair() else {
        eprint!("{}", usage_text());
        return ExitCode::FAILURE;
    };

    init_logging(cli.verbose);

    match execute(&cli, setup, measured) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            if let Some(BenchError::Fault(fault)) =
                e.chain().find_map(|cause| cause.downcast_ref::<BenchError>())
            {
                tracing::error!(%fault, "execution oracle fault");
                eprintln!("fatal: {fault}");
                std::process::abort();
            }
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

/// Log to stderr; `RUST_LOG` overrides the verbosity flag
fn init_logging(verbose: bool) {
    let default = if verbose {
        "opbench=debug"
    } else {
        "opbench=warn"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn load_config(cli: &Cli) -> anyhow::Result<OpbenchConfig> {
    match &cli.config {
        Some(path) => OpbenchConfig::load(path),
        None => Ok(OpbenchConfig::discover()?.unwrap_or_default()),
    }
}

fn execute(cli: &Cli, setup: &str, measured: &str) -> anyhow::Result<()> {
    let config = load_config(cli)?;
    let settings = Settings::resolve(cli, &config)?;
    let report = time_code(&settings, setup, measured)?;
    let output = render(&report, settings.format)?;

    match &cli.output {
        Some(path) => {
            std::fs::write(path, &output)
                .with_context(|| format!("failed to write report to {}", path.display()))?;
            eprintln!("Report written to: {}", path.display());
        }
        None => {
            let mut stdout = std::io::stdout().lock();
            stdout
                .write_all(output.as_bytes())
                .and_then(|()| stdout.flush())
                .context("failed to write report to stdout")?;
        }
    }
    Ok(())
}

/// Time one code unit and wrap the result in a report
pub fn time_code(settings: &Settings, setup: &str, measured: &str) -> anyhow::Result<Report> {
    let start = Instant::now();
    let run = run_timing(&settings.harness, setup, measured)?;
    let record = TimingRecord::from_run(setup, measured, &run);
    let meta = build_report_meta(ReportConfig::from_harness(
        &settings.harness,
        settings.time_unit,
    ));
    let total_duration_ms = start.elapsed().as_secs_f64() * 1000.0;
    Ok(Report::new(meta, vec![record], total_duration_ms))
}

/// Render a report in the selected format
pub fn render(report: &Report, format: OutputFormat) -> anyhow::Result<String> {
    match format {
        OutputFormat::Csv => Ok(generate_csv_report(report)),
        OutputFormat::Json => {
            generate_json_report(report).context("failed to serialize JSON report")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use opbench_report::CSV_HEADER;
    use std::time::Duration;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once(PROGRAM_NAME).chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn test_code_pair() {
        assert_eq!(parse(&["A90E"]).code_pair(), Some(("", "A90E")));
        assert_eq!(
            parse(&["80FF801C", "A90E"]).code_pair(),
            Some(("80FF801C", "A90E"))
        );
        assert_eq!(parse(&["", "A90E"]).code_pair(), Some(("", "A90E")));
        assert_eq!(parse(&[]).code_pair(), None);
        assert_eq!(parse(&["A", "B", "C"]).code_pair(), None);
    }

    #[test]
    fn test_unknown_option_rejected() {
        let err = Cli::try_parse_from([PROGRAM_NAME, "--bogus", "A90E"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnknownArgument);
        assert!(Cli::try_parse_from([PROGRAM_NAME, "--format", "xml", "A90E"]).is_err());
    }

    #[test]
    fn test_defaults_without_flags() {
        let settings = Settings::resolve(&parse(&["A90E"]), &OpbenchConfig::default()).unwrap();
        assert_eq!(settings.harness, HarnessConfig::default());
        assert_eq!(settings.format, OutputFormat::Csv);
        assert_eq!(settings.time_unit, TimeUnit::Nanoseconds);
    }

    #[test]
    fn test_flags_override_file() {
        let mut config = OpbenchConfig::default();
        config.sampler.target_samples = 500;
        config.sampler.min_samples = 5;
        config.sampler.pin_cpu = Some(3);
        config.vm.gas_limit = 10_000;
        config.output.format = OutputFormat::Json;

        let cli = parse(&[
            "-n",
            "1000",
            "--time-budget",
            "250ms",
            "--gas-limit",
            "777",
            "--time-unit",
            "ms",
            "--baseline",
            "00",
            "80FF801C",
            "A90E",
        ]);
        let settings = Settings::resolve(&cli, &config).unwrap();

        assert_eq!(settings.harness.policy.target_samples, 1000);
        assert_eq!(settings.harness.policy.time_budget, Duration::from_millis(250));
        // Taken from the file
        assert_eq!(settings.harness.policy.min_samples, 5);
        assert_eq!(settings.harness.pin_cpu, Some(3));
        assert_eq!(settings.format, OutputFormat::Json);
        // Overridden
        assert_eq!(settings.harness.limits.gas_limit, 777);
        assert_eq!(settings.harness.baseline, "00");
        assert_eq!(settings.time_unit, TimeUnit::Milliseconds);
    }

    #[test]
    fn test_bad_time_budget_flag() {
        let cli = parse(&["--time-budget", "soon", "A90E"]);
        let err = Settings::resolve(&cli, &OpbenchConfig::default()).unwrap_err();
        assert!(format!("{err:#}").contains("--time-budget"));
    }

    #[test]
    fn test_usage_text() {
        let usage = usage_text();
        assert!(usage.contains("80FF801C A90E"));
        assert!(usage.contains("boc:te6ccgEBAgEABwABAogBAAJ7"));
        assert!(usage.contains("[SETUP_CODE] MEASURED_CODE"));
    }

    #[test]
    fn test_time_code_csv() {
        let cli = parse(&["-n", "100", "--min-samples", "1", "80FF801C", "A90E"]);
        let settings = Settings::resolve(&cli, &OpbenchConfig::default()).unwrap();
        let report = time_code(&settings, "80FF801C", "A90E").unwrap();
        assert_eq!(report.summary.total_results, 1);
        assert_eq!(report.results[0].samples, 100);

        let csv = render(&report, OutputFormat::Csv).unwrap();
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0], CSV_HEADER);
        let fields: Vec<&str> = lines[1].split(',').collect();
        assert_eq!(fields[0], "A90E");
        assert_eq!(fields[3], "26.000000000");
        assert_eq!(fields[4], "0.000000000");
        assert_eq!(fields[5], "0");
    }

    #[test]
    fn test_time_code_json() {
        let cli = parse(&["-n", "50", "--min-samples", "1", "--format", "json", "A90E"]);
        let settings = Settings::resolve(&cli, &OpbenchConfig::default()).unwrap();
        let report = time_code(&settings, "", "A90E").unwrap();
        let json = render(&report, settings.format).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["results"][0]["code"], "A90E");
        assert_eq!(value["results"][0]["samples"], 50);
        assert_eq!(value["meta"]["config"]["target_samples"], 50);
    }

    #[test]
    fn test_decode_error_surfaces() {
        let settings = Settings::resolve(&parse(&["Q"]), &OpbenchConfig::default()).unwrap();
        let err = time_code(&settings, "", "Q").unwrap_err();
        assert!(matches!(
            err.downcast_ref::<BenchError>(),
            Some(BenchError::Decode { .. })
        ));
    }
}

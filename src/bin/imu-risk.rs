//! imu-risk CLI - Command-line interface for the IMU risk engine
//!
//! Commands:
//! - run: Classify a sample stream from stdin (streaming mode)
//! - analyze: Classify a recorded sample file and report (batch mode)
//! - config: Print the default engine configuration

use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use log::{info, warn};
use std::fs::{self, File};
use std::io::{self, BufRead, Read, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use imu_risk::config::{FourTierThresholds, ThreeTierThresholds};
use imu_risk::{
    AlertRaised, ClassificationPolicy, CsvRecorder, EmergencyCleared, EngineConfig, EngineEvent,
    EventCollector, EventSink, MonitorError, MotionEngine, Sample, SessionSummary,
    WindowEvaluated, ENGINE_VERSION, PRODUCER_NAME,
};

/// imu-risk - Real-time motion risk classification from accelerometer streams
#[derive(Parser)]
#[command(name = "imu-risk")]
#[command(version = ENGINE_VERSION)]
#[command(about = "Classify accelerometer streams into motion risk levels", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Classify NDJSON samples from stdin, writing NDJSON events to stdout
    Run {
        #[command(flatten)]
        engine: EngineArgs,

        /// Append one CSV row per evaluated window to this file
        #[arg(long)]
        csv_log: Option<PathBuf>,

        /// Milliseconds added to sample timestamps in the CSV log (boot-relative clocks)
        #[arg(long, default_value_t = 0, allow_negative_numbers = true)]
        clock_offset_ms: i64,

        /// Flush output after each event (`--flush false` to buffer)
        #[arg(long, action = ArgAction::Set, default_value_t = true)]
        flush: bool,
    },

    /// Classify a recorded sample file and print a session report
    Analyze {
        /// Input file path (use - for stdin)
        #[arg(short, long)]
        input: PathBuf,

        /// Input format
        #[arg(long, default_value = "ndjson")]
        input_format: InputFormat,

        #[command(flatten)]
        engine: EngineArgs,

        /// Write the window log as CSV
        #[arg(long)]
        csv_log: Option<PathBuf>,

        /// Output report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print the engine configuration as JSON
    Config {
        /// Policy preset
        #[arg(long, default_value = "four-tier")]
        policy: PolicyArg,
    },
}

#[derive(clap::Args)]
struct EngineArgs {
    /// Engine configuration file (JSON)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Override the classification policy (default thresholds)
    #[arg(long)]
    policy: Option<PolicyArg>,

    /// Drop samples closer than this many milliseconds to the previous one
    #[arg(long)]
    min_interval_ms: Option<i64>,
}

#[derive(Clone, Copy, ValueEnum)]
enum PolicyArg {
    /// Safe / Caution / Danger
    ThreeTier,
    /// Safe / Attention / Warning / Danger with escalation
    FourTier,
}

impl PolicyArg {
    fn policy(self) -> ClassificationPolicy {
        match self {
            PolicyArg::ThreeTier => ClassificationPolicy::ThreeTier(ThreeTierThresholds::default()),
            PolicyArg::FourTier => ClassificationPolicy::FourTier(FourTierThresholds::default()),
        }
    }
}

#[derive(Clone, ValueEnum)]
enum InputFormat {
    /// Newline-delimited JSON (one sample per line)
    Ndjson,
    /// JSON array of samples
    Json,
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!(
                "{}",
                serde_json::to_string(&CliError::from(e))
                    .unwrap_or_else(|_| "Unknown error".to_string())
            );
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), ImuCliError> {
    match cli.command {
        Commands::Run {
            engine,
            csv_log,
            clock_offset_ms,
            flush,
        } => cmd_run(&engine, csv_log.as_deref(), clock_offset_ms, flush),

        Commands::Analyze {
            input,
            input_format,
            engine,
            csv_log,
            json,
        } => cmd_analyze(&input, input_format, &engine, csv_log.as_deref(), json),

        Commands::Config { policy } => cmd_config(policy),
    }
}

fn cmd_run(
    args: &EngineArgs,
    csv_log: Option<&Path>,
    clock_offset_ms: i64,
    flush: bool,
) -> Result<(), ImuCliError> {
    let config = build_config(args)?;
    let mut engine = MotionEngine::new(config)?;

    if atty::is(atty::Stream::Stdin) {
        info!("stdin is a TTY; pipe NDJSON samples to classify a stream");
    }

    let csv = match csv_log {
        Some(path) => Some(CsvRecorder::append_to(path)?.with_clock_offset(clock_offset_ms)),
        None => None,
    };
    let mut sink = StreamSink {
        out: io::stdout(),
        csv,
        flush,
        error: None,
    };

    let stdin = io::stdin();
    for (line_no, line) in stdin.lock().lines().enumerate() {
        let line = line?;
        let trimmed = line.trim();

        if trimmed.is_empty() {
            continue;
        }

        let sample: Sample = serde_json::from_str(trimmed).map_err(|e| {
            ImuCliError::ParseError(format!("Failed to parse sample on line {}: {}", line_no + 1, e))
        })?;

        engine.feed(sample, &mut sink)?;

        if let Some(e) = sink.error.take() {
            return Err(ImuCliError::Io(e));
        }
    }

    engine.stop();
    sink.out.flush()?;

    let summary = engine.summary();
    info!(
        "session {}: {} samples, {} windows, {} alerts",
        summary.session_id,
        summary.samples_accepted,
        summary.windows_evaluated,
        summary.alerts_raised
    );
    if let Some(csv) = &sink.csv {
        if csv.failures() > 0 {
            warn!("{} window rows could not be written to the CSV log", csv.failures());
        }
    }

    Ok(())
}

fn cmd_analyze(
    input: &Path,
    input_format: InputFormat,
    args: &EngineArgs,
    csv_log: Option<&Path>,
    json: bool,
) -> Result<(), ImuCliError> {
    let input_data = if input.to_string_lossy() == "-" {
        let mut buffer = String::new();
        io::stdin().read_to_string(&mut buffer)?;
        buffer
    } else {
        fs::read_to_string(input)?
    };

    let samples = match input_format {
        InputFormat::Ndjson => parse_ndjson(&input_data)?,
        InputFormat::Json => serde_json::from_str::<Vec<Sample>>(&input_data)?,
    };

    if samples.is_empty() {
        return Err(ImuCliError::NoSamples);
    }

    let config = build_config(args)?;
    let policy = config.policy.name();
    let mut engine = MotionEngine::new(config)?;
    let mut collector = EventCollector::new();

    for sample in &samples {
        engine.feed(*sample, &mut collector)?;
    }
    let summary = engine.summary();
    engine.stop();

    if let Some(path) = csv_log {
        let mut recorder = CsvRecorder::new(File::create(path)?);
        for window in collector.windows() {
            recorder.window_evaluated(window);
        }
        if recorder.failures() > 0 {
            return Err(ImuCliError::Io(io::Error::new(
                io::ErrorKind::Other,
                format!("{} rows could not be written", recorder.failures()),
            )));
        }
    }

    let report = AnalysisReport {
        producer: PRODUCER_NAME.to_string(),
        version: ENGINE_VERSION.to_string(),
        policy: policy.to_string(),
        peak_window: collector
            .windows()
            .filter(|w| !w.mean_delta.is_nan())
            .max_by(|a, b| a.mean_delta.total_cmp(&b.mean_delta))
            .cloned(),
        alerts: collector.alerts().cloned().collect(),
        summary,
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report);
    }

    Ok(())
}

fn cmd_config(policy: PolicyArg) -> Result<(), ImuCliError> {
    let config = EngineConfig {
        policy: policy.policy(),
        ..EngineConfig::default()
    };
    println!("{}", config.to_json()?);
    Ok(())
}

// Helper functions

fn build_config(args: &EngineArgs) -> Result<EngineConfig, ImuCliError> {
    let mut config = match &args.config {
        Some(path) => EngineConfig::from_json(&fs::read_to_string(path)?)?,
        None => EngineConfig::default(),
    };

    if let Some(policy) = args.policy {
        config.policy = policy.policy();
    }
    if let Some(interval) = args.min_interval_ms {
        config.min_sample_interval_ms = Some(interval);
    }

    config.validate()?;
    Ok(config)
}

fn parse_ndjson(data: &str) -> Result<Vec<Sample>, ImuCliError> {
    let mut samples = Vec::new();

    for (line_no, line) in data.lines().enumerate() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        let sample = serde_json::from_str(trimmed).map_err(|e| {
            ImuCliError::ParseError(format!("Failed to parse sample on line {}: {}", line_no + 1, e))
        })?;
        samples.push(sample);
    }

    Ok(samples)
}

fn print_report(report: &AnalysisReport) {
    let summary = &report.summary;

    println!("IMU Risk Report");
    println!("===============");
    println!("Producer: {} {}", report.producer, report.version);
    println!("Policy:   {}", report.policy);
    println!("Session:  {}", summary.session_id);
    println!();
    println!("Samples accepted:  {}", summary.samples_accepted);
    println!("Samples dropped:   {}", summary.samples_dropped);
    println!("Windows evaluated: {}", summary.windows_evaluated);
    println!("Alerts raised:     {}", summary.alerts_raised);

    if !summary.status_counts.is_empty() {
        println!("\nStatus counts:");
        for (status, count) in &summary.status_counts {
            println!("  {:<10} {}", status, count);
        }
    }

    if let Some(peak) = &report.peak_window {
        println!(
            "\nPeak window: #{} (mean delta {:.2}, std delta {:.2}, {})",
            peak.index, peak.mean_delta, peak.std_delta, peak.status
        );
    }

    if !report.alerts.is_empty() {
        println!("\nAlerts:");
        for alert in &report.alerts {
            println!(
                "  - window #{} at {} ms (mean SVM {:.2})",
                alert.index, alert.timestamp_ms, alert.mean_svm
            );
        }
    }
}

/// Writes every event as an NDJSON line and mirrors windows into an optional CSV log
struct StreamSink<W: Write> {
    out: W,
    csv: Option<CsvRecorder<File>>,
    flush: bool,
    error: Option<io::Error>,
}

impl<W: Write> StreamSink<W> {
    fn emit(&mut self, event: EngineEvent) {
        if self.error.is_some() {
            return;
        }
        let result = serde_json::to_string(&event)
            .map_err(io::Error::from)
            .and_then(|line| writeln!(self.out, "{}", line))
            .and_then(|()| if self.flush { self.out.flush() } else { Ok(()) });

        if let Err(e) = result {
            self.error = Some(e);
        }
    }
}

impl<W: Write> EventSink for StreamSink<W> {
    fn window_evaluated(&mut self, event: &WindowEvaluated) {
        if let Some(csv) = self.csv.as_mut() {
            csv.window_evaluated(event);
        }
        self.emit(EngineEvent::WindowEvaluated(event.clone()));
    }

    fn alert_raised(&mut self, event: &AlertRaised) {
        self.emit(EngineEvent::AlertRaised(event.clone()));
    }

    fn emergency_cleared(&mut self, event: &EmergencyCleared) {
        self.emit(EngineEvent::EmergencyCleared(event.clone()));
    }
}

// Error types

#[derive(Debug)]
enum ImuCliError {
    Io(io::Error),
    Engine(MonitorError),
    Json(serde_json::Error),
    NoSamples,
    ParseError(String),
}

impl From<io::Error> for ImuCliError {
    fn from(e: io::Error) -> Self {
        ImuCliError::Io(e)
    }
}

impl From<MonitorError> for ImuCliError {
    fn from(e: MonitorError) -> Self {
        ImuCliError::Engine(e)
    }
}

impl From<serde_json::Error> for ImuCliError {
    fn from(e: serde_json::Error) -> Self {
        ImuCliError::Json(e)
    }
}

#[derive(serde::Serialize)]
struct CliError {
    code: String,
    message: String,
    hint: Option<String>,
}

impl From<ImuCliError> for CliError {
    fn from(e: ImuCliError) -> Self {
        match e {
            ImuCliError::Io(e) | ImuCliError::Engine(MonitorError::Io(e)) => CliError {
                code: "IO_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check file paths and permissions".to_string()),
            },
            ImuCliError::Engine(MonitorError::InvalidConfig(msg)) => CliError {
                code: "INVALID_CONFIG".to_string(),
                message: msg,
                hint: Some("Run 'imu-risk config' for a valid template".to_string()),
            },
            ImuCliError::Engine(e) => CliError {
                code: "ENGINE_ERROR".to_string(),
                message: e.to_string(),
                hint: None,
            },
            ImuCliError::Json(e) => CliError {
                code: "JSON_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check JSON syntax".to_string()),
            },
            ImuCliError::NoSamples => CliError {
                code: "NO_SAMPLES".to_string(),
                message: "No samples found in input".to_string(),
                hint: Some("Ensure input file is not empty".to_string()),
            },
            ImuCliError::ParseError(msg) => CliError {
                code: "PARSE_ERROR".to_string(),
                message: msg,
                hint: Some(
                    "Samples look like {\"timestamp_ms\": 0, \"x\": 0.0, \"y\": 0.0, \"z\": 9.8}"
                        .to_string(),
                ),
            },
        }
    }
}

// Report types

#[derive(serde::Serialize)]
struct AnalysisReport {
    producer: String,
    version: String,
    policy: String,
    summary: SessionSummary,
    peak_window: Option<WindowEvaluated>,
    alerts: Vec<AlertRaised>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run_flags(args: &[&str]) -> (i64, bool) {
        let cli = Cli::try_parse_from(args).unwrap();
        match cli.command {
            Commands::Run {
                clock_offset_ms,
                flush,
                ..
            } => (clock_offset_ms, flush),
            _ => panic!("expected run command"),
        }
    }

    #[test]
    fn test_run_flush_defaults_on_and_can_be_disabled() {
        assert_eq!(run_flags(&["imu-risk", "run"]), (0, true));
        assert_eq!(run_flags(&["imu-risk", "run", "--flush", "false"]), (0, false));
        assert_eq!(run_flags(&["imu-risk", "run", "--flush", "true"]), (0, true));
    }

    #[test]
    fn test_run_accepts_negative_clock_offset() {
        assert_eq!(
            run_flags(&["imu-risk", "run", "--clock-offset-ms", "-5000"]),
            (-5000, true)
        );
    }

    #[test]
    fn test_recorder_io_error_reported_as_io() {
        let err = ImuCliError::from(MonitorError::Io(io::Error::new(
            io::ErrorKind::PermissionDenied,
            "denied",
        )));
        assert_eq!(CliError::from(err).code, "IO_ERROR");
    }
}

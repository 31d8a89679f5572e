//! CLI definition and dispatch.

use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use crate::adapters::csv_adapter::CsvDataAdapter;
use crate::adapters::csv_artifact_adapter::CsvArtifactAdapter;
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::domain::diagnostics::Diagnostics;
use crate::domain::error::SignalError;
use crate::domain::levels::{DEFAULT_BINS, support_resistance};
use crate::domain::pipeline::{RunReport, run_pipeline};
use crate::domain::registry::Registry;
use crate::domain::settings::{PipelineSettings, parse_ticker_list, parse_timeframes};
use crate::domain::timeframe::Interval;
use crate::ports::artifact_port::ArtifactPort;
use crate::ports::data_port::DataPort;

#[derive(Parser, Debug)]
#[command(
    name = "signalcraft",
    about = "Multi-timeframe indicator snapshots and rankings"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Build snapshots, rankings and artifacts
    Run {
        #[arg(short, long)]
        config: PathBuf,
        /// Comma-separated universe override
        #[arg(long)]
        tickers: Option<String>,
        /// Comma-separated interval override, e.g. 1h,1d
        #[arg(long)]
        timeframes: Option<String>,
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Directory of <TICKER>_<interval>.csv files
        #[arg(long)]
        data: Option<PathBuf>,
        /// Copy the reduced tables into reduced/history afterwards
        #[arg(long)]
        archive: bool,
    },
    /// Load and validate a configuration, then print the resolved registry
    Validate {
        #[arg(short, long)]
        config: PathBuf,
    },
    /// Volume-profile support and resistance for one ticker
    Levels {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(long)]
        ticker: String,
        #[arg(long, default_value = "1d")]
        interval: String,
        #[arg(long, default_value_t = DEFAULT_BINS)]
        bins: usize,
    },
}

/// Command-line overrides applied on top of the configuration file.
#[derive(Debug, Default)]
pub struct Overrides {
    pub tickers: Option<String>,
    pub timeframes: Option<String>,
    pub output: Option<PathBuf>,
    pub data: Option<PathBuf>,
}

pub fn run(cli: Cli) -> ExitCode {
    match cli.command {
        Command::Run {
            config,
            tickers,
            timeframes,
            output,
            data,
            archive,
        } => {
            let overrides = Overrides {
                tickers,
                timeframes,
                output,
                data,
            };
            run_full(&config, overrides, archive)
        }
        Command::Validate { config } => run_validate(&config),
        Command::Levels {
            config,
            ticker,
            interval,
            bins,
        } => run_levels(&config, &ticker, &interval, bins),
    }
}

fn fail(e: &SignalError) -> ExitCode {
    eprintln!("error: {e}");
    e.into()
}

pub fn load_config(path: &Path) -> Result<FileConfigAdapter, ExitCode> {
    FileConfigAdapter::from_file(path).map_err(|e| fail(&e))
}

/// Settings and registry from `path`, with overrides applied and validated.
pub fn resolve(
    path: &Path,
    overrides: &Overrides,
) -> Result<(PipelineSettings, Registry), ExitCode> {
    let config = load_config(path)?;
    let build = || -> Result<(PipelineSettings, Registry), SignalError> {
        let mut settings = PipelineSettings::from_config(&config)?;
        if let Some(raw) = &overrides.tickers {
            settings.tickers = parse_ticker_list(raw)?;
        }
        if let Some(raw) = &overrides.timeframes {
            settings.timeframes = parse_timeframes(raw)?;
        }
        if let Some(dir) = &overrides.output {
            settings.output_dir = dir.clone();
        }
        if let Some(dir) = &overrides.data {
            settings.data_dir = Some(dir.clone());
        }
        settings.validate()?;
        let registry = Registry::from_config(&config)?;
        Ok((settings, registry))
    };
    build().map_err(|e| fail(&e))
}

fn data_port(settings: &PipelineSettings) -> Result<CsvDataAdapter, ExitCode> {
    match &settings.data_dir {
        Some(dir) => Ok(CsvDataAdapter::new(dir.clone())),
        None => Err(fail(&SignalError::ConfigMissing {
            section: "data".into(),
            key: "dir".into(),
        })),
    }
}

fn run_full(config_path: &Path, overrides: Overrides, archive: bool) -> ExitCode {
    // Stage 1: Load and validate configuration
    eprintln!("Loading config from {}", config_path.display());
    let (settings, registry) = match resolve(config_path, &overrides) {
        Ok(r) => r,
        Err(code) => return code,
    };

    // Stage 2: Wire adapters
    let data = match data_port(&settings) {
        Ok(d) => d,
        Err(code) => return code,
    };
    let artifacts = CsvArtifactAdapter::new(settings.output_dir.clone());

    run_with_ports(&data, &artifacts, &registry, &settings, archive)
}

/// Pipeline plus artifact stages against arbitrary ports.
pub fn run_with_ports(
    data: &dyn DataPort,
    artifacts: &dyn ArtifactPort,
    registry: &Registry,
    settings: &PipelineSettings,
    archive: bool,
) -> ExitCode {
    // Stage 3: Snapshots and rankings
    eprintln!(
        "Building snapshots: {} tickers x {} timeframes",
        settings.tickers.len(),
        settings.timeframes.len()
    );
    let report = run_pipeline(data, registry, settings);
    print_report(&report);

    if report.usable_timeframes() == 0 {
        return fail(&SignalError::NoData {
            what: "any timeframe".into(),
        });
    }

    // Stage 4: Artifacts
    let written = match artifacts.publish(
        &report.snapshots,
        &report.summaries,
        &settings.summary,
        &settings.reduced_features,
    ) {
        Ok(paths) => paths,
        Err(e) => return fail(&e),
    };
    for path in &written {
        eprintln!("  wrote {}", path.display());
    }

    // Stage 5: Optional archive
    if archive {
        match artifacts.archive_reduced() {
            Ok(n) => eprintln!("Archived {n} reduced files"),
            Err(e) => return fail(&e),
        }
    }

    ExitCode::SUCCESS
}

fn print_report(report: &RunReport) {
    eprintln!("\n=== Snapshots ===");
    for snapshot in &report.snapshots {
        let incomplete = snapshot.rows().iter().filter(|r| !r.complete).count();
        eprintln!(
            "  {:<4} {} rows ({} incomplete), {} columns",
            snapshot.label(),
            snapshot.len(),
            incomplete,
            snapshot.keys().count()
        );
    }
    print_diagnostics(&report.diagnostics);
}

fn print_diagnostics(diag: &Diagnostics) {
    if diag.is_empty() {
        return;
    }
    eprintln!("\n=== Skipped ({}) ===", diag.len());
    for entry in diag.entries() {
        eprintln!("  {entry}");
    }
}

fn run_validate(config_path: &Path) -> ExitCode {
    eprintln!("Validating config: {}", config_path.display());
    let (settings, registry) = match resolve(config_path, &Overrides::default()) {
        Ok(r) => r,
        Err(code) => return code,
    };

    eprintln!("\nUniverse: {}", settings.tickers.join(", "));
    let timeframes: Vec<String> = settings
        .timeframes
        .iter()
        .map(|&i| format!("{} ({})", i.label(), settings.period_for(i)))
        .collect();
    eprintln!("Timeframes: {}", timeframes.join(", "));

    eprintln!("\nIndicators:");
    for def in &registry.indicators {
        eprintln!("  {def}");
    }
    eprintln!("\nPassthroughs:");
    for def in &registry.passthroughs {
        eprintln!("  {def}");
    }
    eprintln!("\nEnhancers:");
    for (indicator, enhancers) in registry.enhancers.iter() {
        let ids: Vec<&str> = enhancers.iter().map(|e| e.id()).collect();
        eprintln!("  {:<16} {}", indicator, ids.join(", "));
    }
    let tracked: Vec<String> = settings.summary.indicators.iter().map(ToString::to_string).collect();
    eprintln!("\nSummary: top/bottom {} of {}", settings.summary.top_n, tracked.join(", "));

    eprintln!("\nConfiguration is valid.");
    ExitCode::SUCCESS
}

fn run_levels(config_path: &Path, ticker: &str, interval: &str, bins: usize) -> ExitCode {
    let (settings, _) = match resolve(config_path, &Overrides::default()) {
        Ok(r) => r,
        Err(code) => return code,
    };
    let interval: Interval = match interval.parse() {
        Ok(i) => i,
        Err(e) => return fail(&SignalError::invalid("levels", "interval", format!("{e}"))),
    };
    let data = match data_port(&settings) {
        Ok(d) => d,
        Err(code) => return code,
    };

    let ticker = ticker.trim().to_uppercase();
    let table = match data.fetch_ohlcv(&ticker, interval, settings.period_for(interval)) {
        Ok(t) => t,
        Err(e) => return fail(&e),
    };
    if table.is_empty() {
        return fail(&SignalError::NoData {
            what: format!("{ticker} ({interval})"),
        });
    }

    match support_resistance(&table, bins) {
        Ok(levels) => {
            println!("{ticker} {}", interval.label());
            println!("{levels}");
            ExitCode::SUCCESS
        }
        Err(e) => fail(&e),
    }
}

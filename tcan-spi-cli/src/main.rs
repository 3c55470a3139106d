//! TCAN SPI Decoder CLI Application
//!
//! This is the command-line interface for the TCAN SPI decoder.
//! It uses the tcan-spi-decoder library and adds:
//! - TOML configuration files
//! - Record output as text or JSON Lines
//! - Command-only display

use anyhow::{Context, Result};
use clap::Parser;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use tcan_spi_decoder::{Decoder, RecordFilter};

mod config;
mod report;

use config::{AppConfig, OutputFormat};
use report::ReportWriter;

/// Record filter selectable on the command line
#[derive(Debug, Clone, Copy, clap::ValueEnum)]
enum FilterArg {
    /// Reads, writes and command errors
    All,
    /// Reads and command errors
    Read,
    /// Writes and command errors
    Write,
    /// Timing violations only
    Timing,
}

impl From<FilterArg> for RecordFilter {
    fn from(arg: FilterArg) -> Self {
        match arg {
            FilterArg::All => RecordFilter::All,
            FilterArg::Read => RecordFilter::Read,
            FilterArg::Write => RecordFilter::Write,
            FilterArg::Timing => RecordFilter::TimingViolations,
        }
    }
}

/// TCAN SPI Decoder - Decode TCAN4x5x SPI traffic from logic analyzer captures
#[derive(Parser, Debug)]
#[command(name = "tcan-spi-cli")]
#[command(about = "Decode TCAN4x5x SPI register traffic (Saleae CSV exports)", long_about = None)]
#[command(version)]
struct Args {
    /// Path to Saleae Logic 2 SPI analyzer CSV export
    #[arg(value_name = "CAPTURE")]
    capture: Option<PathBuf>,

    /// Path to configuration file (config.toml)
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Which records to show
    #[arg(short, long, value_enum)]
    filter: Option<FilterArg>,

    /// Show commands and registers without payload data
    #[arg(long)]
    command_only: bool,

    /// Maximum CS-to-first-byte time (tCSA_B) in ns
    #[arg(long, value_name = "NS")]
    cs_to_first_byte_ns: Option<u64>,

    /// Maximum byte-to-byte time (tB_B) in ns
    #[arg(long, value_name = "NS")]
    byte_to_byte_ns: Option<u64>,

    /// Maximum last-byte-to-CS time (tB_CSIA) in ns
    #[arg(long, value_name = "NS")]
    last_byte_to_cs_ns: Option<u64>,

    /// Output format
    #[arg(long, value_enum)]
    format: Option<OutputFormat>,

    /// Output file for decoded records (default: stdout)
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,

    /// Verbosity level (can be repeated: -v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long)]
    quiet: bool,
}

impl Args {
    /// Apply command line options on top of the configuration file
    fn apply_to(&self, config: &mut AppConfig) {
        if let Some(capture) = &self.capture {
            config.input.capture = Some(capture.clone());
        }
        if let Some(filter) = self.filter {
            config.decoder.filter = filter.into();
        }
        if let Some(ns) = self.cs_to_first_byte_ns {
            config.decoder.timing.cs_to_first_byte_ns = Some(ns);
        }
        if let Some(ns) = self.byte_to_byte_ns {
            config.decoder.timing.byte_to_byte_ns = Some(ns);
        }
        if let Some(ns) = self.last_byte_to_cs_ns {
            config.decoder.timing.last_byte_to_cs_ns = Some(ns);
        }
        if let Some(format) = self.format {
            config.output.format = format;
        }
        if self.command_only {
            config.output.command_only = true;
        }
        if let Some(output) = &self.output {
            config.output.file = Some(output.clone());
        }
    }
}

fn main() -> Result<()> {
    // Parse command line arguments
    let args = Args::parse();

    // Initialize logging
    init_logging(args.verbose, args.quiet);

    log::info!("TCAN SPI Decoder CLI v{}", env!("CARGO_PKG_VERSION"));
    log::info!("Using decoder library v{}", tcan_spi_decoder::VERSION);

    let mut config = match &args.config {
        Some(path) => {
            log::info!("Loading configuration from: {:?}", path);
            config::load_config(path)?
        }
        None => AppConfig::default(),
    };
    args.apply_to(&mut config);
    log::debug!("Effective configuration: {:?}", config);

    let capture = config
        .input
        .capture
        .clone()
        .context("No capture file given (pass CAPTURE or set input.capture in the config file)")?;

    let out: Box<dyn Write> = match &config.output.file {
        Some(path) => Box::new(BufWriter::new(
            File::create(path).with_context(|| format!("Failed to create output file: {:?}", path))?,
        )),
        None => Box::new(BufWriter::new(io::stdout().lock())),
    };

    decode_capture(&capture, &config, out)
}

/// Decode a capture file and write its records to `out`
fn decode_capture(capture: &Path, config: &AppConfig, out: Box<dyn Write>) -> Result<()> {
    if config.decoder.filter == RecordFilter::TimingViolations && config.decoder.timing.is_empty() {
        log::warn!("Timing violation filter selected but no timing limit is set");
    }

    let mut decoder = Decoder::new(config.decoder.clone());
    let mut report = ReportWriter::new(out, config.output.format, config.output.command_only);
    let mut bad_rows = 0usize;

    let records = decoder
        .decode_file(capture)
        .with_context(|| format!("Failed to decode capture: {:?}", capture))?;

    for record in records {
        match record {
            Ok(record) => report.write_record(&record)?,
            Err(e) => {
                bad_rows += 1;
                log::warn!("Skipping capture row: {}", e);
            }
        }
    }

    let written = report.finish()?;
    let stats = decoder.stats();
    log::info!(
        "Decoded {} events: {} transactions, {} command errors, {} timing violations ({} records written, {} filtered)",
        stats.events,
        stats.transactions,
        stats.command_errors,
        stats.timing_violations,
        written,
        stats.filtered
    );
    if bad_rows > 0 {
        log::warn!("{} capture rows could not be parsed", bad_rows);
    }

    Ok(())
}

/// Initialize logging based on verbosity level
fn init_logging(verbose: u8, quiet: bool) {
    use env_logger::Builder;
    use log::LevelFilter;

    let level = if quiet {
        LevelFilter::Error
    } else {
        match verbose {
            0 => LevelFilter::Info,
            1 => LevelFilter::Debug,
            _ => LevelFilter::Trace,
        }
    };

    Builder::new()
        .filter_level(level)
        .format(|buf, record| {
            writeln!(
                buf,
                "[{} {}] {}",
                record.level(),
                record.target(),
                record.args()
            )
        })
        .init();
}

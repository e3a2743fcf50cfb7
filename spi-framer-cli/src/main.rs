//! SPI Framer CLI Application
//!
//! Command-line front end for the spi-framer library. It:
//! - Reads upstream SPI decoder frames from JSON Lines files
//! - Frames each file independently (in parallel when writing to an output directory)
//! - Writes transaction records as JSON Lines to stdout or an output directory

use anyhow::{Context, Result};
use clap::Parser;
use rayon::prelude::*;
use spi_framer::{formats, FramerConfig, FramerError, FramerStats, FramingIterator, TransactionFramer};
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

mod config;
mod output;

use config::AppConfig;

/// SPI Framer - Group decoded SPI transfers into chip-select transactions
#[derive(Parser, Debug)]
#[command(name = "spi-framer-cli")]
#[command(about = "Group decoded SPI transfers into chip-select transactions", long_about = None)]
#[command(version)]
struct Args {
    /// JSON Lines event files to frame
    #[arg(value_name = "FILE")]
    inputs: Vec<PathBuf>,

    /// Path to configuration file (config.toml)
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Directory for per-file record output (default: stdout)
    #[arg(short, long, value_name = "DIR")]
    output_dir: Option<PathBuf>,

    /// Report windows discarded by a re-asserted select
    #[arg(long)]
    report_abandoned: bool,

    /// Per-direction byte limit for a single transaction
    #[arg(long, value_name = "BYTES")]
    max_transaction_bytes: Option<usize>,

    /// Verbosity level (can be repeated: -v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long)]
    quiet: bool,
}

/// Summary of framing one input file
struct FileOutcome {
    records: u64,
    stats: FramerStats,
    skipped_lines: usize,
}

fn main() -> Result<()> {
    // Parse command line arguments
    let args = Args::parse();

    // Initialize logging
    init_logging(args.verbose, args.quiet);

    log::info!("SPI Framer CLI v{}", env!("CARGO_PKG_VERSION"));
    log::debug!("Using framer library v{}", spi_framer::VERSION);

    let mut config = match &args.config {
        Some(path) => {
            log::info!("Loading configuration from: {:?}", path);
            config::load_config(path)?
        }
        None => AppConfig::default(),
    };
    apply_args(&mut config, &args);

    if config.input.files.is_empty() {
        println!("SPI Framer - No input specified");
        println!("\nQuick Start:");
        println!("  spi-framer-cli capture.jsonl");
        println!("  spi-framer-cli --output-dir out/ a.jsonl b.jsonl");
        println!("  spi-framer-cli --config config.toml");
        println!("\nUse --help for more options");
        return Ok(());
    }

    let failed = frame_inputs(&config)?;
    if failed > 0 {
        anyhow::bail!("{} of {} input files failed", failed, config.input.files.len());
    }

    Ok(())
}

/// Merge command-line flags over the loaded configuration
fn apply_args(config: &mut AppConfig, args: &Args) {
    config.input.files.extend(args.inputs.iter().cloned());

    if args.output_dir.is_some() {
        config.output.output_dir = args.output_dir.clone();
    }
    if args.report_abandoned {
        config.framer.report_abandoned = true;
    }
    if let Some(limit) = args.max_transaction_bytes {
        config.framer.max_transaction_bytes = Some(limit);
    }
}

/// Frame every configured input, returning how many files failed
///
/// With an output directory, files are framed in parallel, each into its own
/// output file. Without one, files are framed in order onto stdout.
fn frame_inputs(config: &AppConfig) -> Result<usize> {
    let inputs = &config.input.files;

    let outcomes: Vec<Result<FileOutcome>> = match &config.output.output_dir {
        Some(dir) => {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create output directory: {:?}", dir))?;

            let targets = output::records_paths(dir, inputs);
            inputs
                .par_iter()
                .zip(targets.par_iter())
                .map(|(input, target)| frame_file_to(input, target, &config.framer))
                .collect()
        }
        None => inputs
            .iter()
            .map(|input| frame_file(input, &config.framer, &mut io::stdout().lock()))
            .collect(),
    };

    let mut failed = 0;
    for (path, outcome) in inputs.iter().zip(outcomes) {
        match outcome {
            Ok(outcome) => {
                let stats = outcome.stats;
                log::info!(
                    "{:?}: {} events, {} records ({} transactions, {} errors), {} ignored transfers, {} abandoned windows, {} skipped lines",
                    path,
                    stats.events,
                    outcome.records,
                    stats.transactions,
                    stats.errors,
                    stats.ignored_results,
                    stats.abandoned,
                    outcome.skipped_lines
                );
            }
            Err(e) => {
                log::error!("{:#}", e);
                failed += 1;
            }
        }
    }

    Ok(failed)
}

/// Frame a single event file into its own output file
fn frame_file_to(input: &Path, target: &Path, framer_config: &FramerConfig) -> Result<FileOutcome> {
    let file = File::create(target)
        .with_context(|| format!("Failed to create output file: {:?}", target))?;
    let mut writer = BufWriter::new(file);

    let outcome = frame_file(input, framer_config, &mut writer)?;
    log::info!("Wrote {} records to {:?}", outcome.records, target);
    Ok(outcome)
}

/// Frame a single event file with its own framer, writing records as they complete
fn frame_file<W: Write>(path: &Path, framer_config: &FramerConfig, writer: &mut W) -> Result<FileOutcome> {
    let events = formats::open_event_file(path)
        .with_context(|| format!("Failed to open event file: {:?}", path))?;

    let framer = TransactionFramer::with_config(framer_config.clone());
    let mut iter = FramingIterator::new(events, framer);

    let mut records = 0;
    let mut skipped_lines = 0;
    for item in iter.by_ref() {
        match item {
            Ok(record) => {
                output::write_record(writer, &record)
                    .with_context(|| format!("Failed to write records for {:?}", path))?;
                records += 1;
            }
            Err(e @ FramerError::IoError(_)) => {
                return Err(e).with_context(|| format!("Failed to read event file: {:?}", path));
            }
            Err(e) => {
                log::warn!("{:?}: skipping event: {}", path, e);
                skipped_lines += 1;
            }
        }
    }
    writer
        .flush()
        .with_context(|| format!("Failed to write records for {:?}", path))?;

    Ok(FileOutcome {
        records,
        stats: iter.stats(),
        skipped_lines,
    })
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

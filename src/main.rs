use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use time::Duration;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use gaugewatch::batch::{self, BatchProcessor};
use gaugewatch::config::GaugeConfig;
use gaugewatch::core::db::{FailureRepository, GaugeDb, ReadingRepository, format_timestamp};
use gaugewatch::debug::DebugWriter;
use gaugewatch::detection::GaugeDetector;
use gaugewatch::history::{AveragePeriod, History, RelativeIndex, angle_change};
use gaugewatch::models::GaugeReading;
use gaugewatch::timestamp::{Clock, SystemClock};

#[derive(Parser)]
#[command(name = "gaugewatch")]
#[command(about = "Read analog pressure gauge needles from images and track them over time")]
#[command(version)]
struct Cli {
    /// Configuration file (defaults to the standard locations)
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Detect needle angles in a directory of images and store them.
    Process(ProcessArgs),

    /// Print stored readings with changes and rates.
    Report(ReportArgs),

    /// List readings with implausibly large angles, optionally marking them as failures.
    FlagLargeAngles(FlagArgs),
}

#[derive(Debug, Args)]
struct ProcessArgs {
    /// Directory containing gauge images
    #[arg(long)]
    dir: Option<PathBuf>,

    /// File name pattern, `*` and `?` wildcards
    #[arg(long)]
    pattern: Option<String>,

    /// SQLite database file
    #[arg(long)]
    db: Option<PathBuf>,

    /// Save intermediate images
    #[arg(long)]
    debug: bool,

    /// Directory for debug images
    #[arg(long)]
    debug_dir: Option<PathBuf>,

    /// Binary threshold for the gauge face
    #[arg(long)]
    threshold: Option<u8>,

    #[arg(long)]
    min_radius: Option<i32>,

    #[arg(long)]
    max_radius: Option<i32>,

    /// Angle change in degrees considered significant
    #[arg(long)]
    change_threshold: Option<f64>,

    /// Reprocess images that already have results
    #[arg(long)]
    force: bool,

    /// Retry images that previously failed detection
    #[arg(long)]
    retry_failures: bool,

    /// Worker threads
    #[arg(long, default_value = "1")]
    jobs: usize,
}

#[derive(Debug, Args)]
struct ReportArgs {
    #[arg(long)]
    db: Option<PathBuf>,

    /// Days of history to show
    #[arg(long, conflicts_with = "all_time")]
    days: Option<i64>,

    /// Show every stored reading
    #[arg(long)]
    all_time: bool,

    /// Average readings per minute, hour or day
    #[arg(long)]
    average_period: Option<String>,

    /// Number of periods per bucket
    #[arg(long)]
    average_value: Option<u32>,

    #[arg(long, value_enum)]
    unit: Option<Unit>,
}

#[derive(Debug, Args)]
struct FlagArgs {
    #[arg(long)]
    db: Option<PathBuf>,

    /// Angle above which a reading is flagged
    #[arg(long)]
    threshold: Option<f64>,

    /// Move flagged readings into the failure table
    #[arg(long)]
    mark_as_failures: bool,

    /// Do not ask for confirmation
    #[arg(long)]
    yes: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Unit {
    Angle,
    Psi,
    Bar,
}

impl Unit {
    fn label(self) -> &'static str {
        match self {
            Unit::Angle => "deg",
            Unit::Psi => "psi",
            Unit::Bar => "bar",
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_filter = if cli.verbose { "gaugewatch=debug" } else { "gaugewatch=info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)))
        .init();

    let config = GaugeConfig::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Process(args) => process(config, args).await,
        Commands::Report(args) => report(config, args).await,
        Commands::FlagLargeAngles(args) => flag_large_angles(config, args).await,
    }
}

async fn process(mut config: GaugeConfig, args: ProcessArgs) -> Result<()> {
    if let Some(threshold) = args.threshold {
        config.detection.binary_threshold = threshold;
    }
    if let Some(min_radius) = args.min_radius {
        config.detection.min_radius = min_radius;
    }
    if let Some(max_radius) = args.max_radius {
        config.detection.max_radius = max_radius;
    }
    if let Some(change_threshold) = args.change_threshold {
        config.detection.change_threshold = change_threshold;
    }
    let detection_config = config.detection_config();
    detection_config.validate()?;

    let dir = args.dir.unwrap_or_else(|| config.paths.default_image_dir.clone());
    let pattern = args
        .pattern
        .unwrap_or_else(|| config.paths.default_image_pattern.clone());
    let db_file = args.db.unwrap_or_else(|| config.paths.default_db_file.clone());

    let all_images = batch::list_images(&dir, &pattern)?;
    if all_images.is_empty() {
        warn!("No images matching {} found in {}", pattern, dir.display());
        return Ok(());
    }

    let db = GaugeDb::open(&db_file).await?;
    let processed = db.processed_image_names().await?;
    let failed = db.failed_image_names().await?;
    let selected = batch::select_images(&all_images, &processed, &failed, args.force, args.retry_failures);
    info!(
        "{} images found, {} selected ({} already processed, {} known failures)",
        all_images.len(),
        selected.len(),
        processed.len(),
        failed.len()
    );
    if selected.is_empty() {
        println!("No new images to process.");
        db.close().await;
        return Ok(());
    }

    let mut detector = GaugeDetector::new();
    if args.debug {
        let debug_dir = args
            .debug_dir
            .unwrap_or_else(|| config.paths.default_debug_dir.clone());
        detector = detector.with_debug(Arc::new(DebugWriter::new(debug_dir)?));
    }

    let processor = BatchProcessor::new(detector, detection_config).with_jobs(args.jobs);
    let batch_report = tokio::task::spawn_blocking(move || processor.run(&selected))
        .await
        .context("Batch worker panicked")?;

    let mut history = History::new();
    batch_report.append_to(&mut history);
    print_process_table(&history, config.detection.change_threshold);

    let summary = db.save_readings(&batch_report.readings, &config.pressure).await?;

    let now = SystemClock.now();
    let failed_names = batch_report.failed_names();
    if !failed_names.is_empty() {
        db.record_failures(&failed_names, now).await?;
    }
    let recovered: Vec<&str> = batch_report
        .readings
        .iter()
        .map(|r| r.image_name())
        .filter(|name| failed.contains(*name))
        .collect();
    for name in &recovered {
        db.clear_failure(name).await?;
    }

    println!();
    println!("=== Summary ===");
    println!("Processed:       {}", batch_report.readings.len() + batch_report.failures.len());
    println!("Detected:        {}", batch_report.readings.len());
    println!("Saved:           {}", summary.saved);
    println!("Invalid:         {}", summary.skipped);
    println!("Failed:          {}", batch_report.failures.len());
    println!("Recovered:       {}", recovered.len());
    println!("Stored results:  {}", db.result_count().await?);

    if !batch_report.failures.is_empty() {
        println!();
        println!("Failed images:");
        for (path, failure) in &batch_report.failures {
            println!("  {} ({})", path.display(), failure.kind());
        }
    }

    db.close().await;
    Ok(())
}

fn print_process_table(history: &History, change_threshold: f64) {
    println!("{:<32} {:>8} {:>9} {:>10}", "Image", "Angle", "Change", "Rate/min");
    for (i, reading) in history.iter().enumerate() {
        let (change, rate) = match i.checked_sub(1) {
            Some(prev) => {
                let (a, b) = (RelativeIndex::FromStart(prev), RelativeIndex::FromStart(i));
                (history.change(a, b), history.change_rate(a, b))
            }
            None => (None, None),
        };
        let marker = match change {
            Some(c) if c.abs() >= change_threshold => " *",
            _ => "",
        };
        println!(
            "{:<32} {:>8.1} {:>9} {:>10}{}",
            reading.image_name(),
            reading.angle(),
            format_optional(change, 1),
            format_optional(rate, 2),
            marker
        );
    }
}

async fn report(config: GaugeConfig, args: ReportArgs) -> Result<()> {
    let db_file = args.db.unwrap_or_else(|| config.paths.default_db_file.clone());
    let db = GaugeDb::open(&db_file).await?;

    let since = if args.all_time {
        None
    } else {
        let days = args.days.unwrap_or(config.reporting.default_time_window);
        Some(SystemClock.now() - Duration::days(days))
    };
    let readings = db
        .load_readings(
            since,
            &config.paths.default_image_dir,
            &config.repair,
            &config.pressure,
        )
        .await?;
    db.close().await;

    if readings.is_empty() {
        println!("No readings found.");
        return Ok(());
    }

    let unit = match args.unit {
        Some(unit) => unit,
        None => Unit::from_str(&config.reporting.default_pressure_unit, true)
            .map_err(|e| anyhow::anyhow!("Invalid default pressure unit: {}", e))?,
    };
    let value_of = |angle: f64, psi: Option<f64>, bar: Option<f64>| match unit {
        Unit::Angle => angle,
        Unit::Psi => psi.unwrap_or_else(|| config.pressure.psi(angle)),
        Unit::Bar => bar.unwrap_or_else(|| config.pressure.bar(angle)),
    };

    let history: History = readings.into_iter().collect();
    let rows: Vec<ReportRow> = match args.average_period {
        Some(period) => {
            let period: AveragePeriod = period.parse()?;
            let value = args
                .average_value
                .unwrap_or(config.reporting.default_average_value);
            history
                .average_by_period(period, value)
                .into_iter()
                .map(|p| -> Result<ReportRow> {
                    Ok(ReportRow {
                        label: format_timestamp(p.timestamp)?,
                        timestamp: p.timestamp,
                        angle: p.angle,
                        value: value_of(p.angle, p.pressure_psi, p.pressure_bar),
                        count: p.count,
                    })
                })
                .collect::<Result<_>>()?
        }
        None => history
            .iter()
            .map(|r| row_for(r, value_of(r.angle(), r.pressure_psi(), r.pressure_bar())))
            .collect::<Result<_>>()?,
    };

    println!(
        "{:<20} {:>10} {:>9} {:>10} {:>6}",
        "Timestamp",
        unit.label(),
        "Change",
        "Rate/min",
        "Count"
    );
    let mut previous: Option<&ReportRow> = None;
    for row in &rows {
        let (change, rate) = match previous {
            Some(prev) => {
                let change = angle_change(prev.angle, row.angle);
                let minutes = (row.timestamp - prev.timestamp).as_seconds_f64() / 60.0;
                let rate = if minutes == 0.0 { 0.0 } else { change / minutes };
                (Some(change), Some(rate))
            }
            None => (None, None),
        };
        println!(
            "{:<20} {:>10.2} {:>9} {:>10} {:>6}",
            row.label,
            row.value,
            format_optional(change, 1),
            format_optional(rate, 2),
            row.count
        );
        previous = Some(row);
    }
    println!();
    println!("{} rows", rows.len());
    Ok(())
}

struct ReportRow {
    label: String,
    timestamp: time::PrimitiveDateTime,
    angle: f64,
    value: f64,
    count: usize,
}

fn row_for(reading: &GaugeReading, value: f64) -> Result<ReportRow> {
    Ok(ReportRow {
        label: format_timestamp(reading.timestamp())?,
        timestamp: reading.timestamp(),
        angle: reading.angle(),
        value,
        count: 1,
    })
}

async fn flag_large_angles(config: GaugeConfig, args: FlagArgs) -> Result<()> {
    let db_file = args.db.unwrap_or_else(|| config.paths.default_db_file.clone());
    let threshold = args
        .threshold
        .unwrap_or(config.filtering.large_angle_threshold);

    let db = GaugeDb::open(&db_file).await?;
    let flagged = db.readings_above(threshold).await?;
    if flagged.is_empty() {
        println!("No readings with angle above {:.1}°.", threshold);
        db.close().await;
        return Ok(());
    }

    println!("Readings with angle above {:.1}°:", threshold);
    for stored in &flagged {
        println!("  {:<32} {:>8.1}  {}", stored.image_name, stored.angle, stored.timestamp);
    }
    println!("{} readings flagged", flagged.len());

    if args.mark_as_failures {
        if !args.yes && !confirm(&format!("Mark {} readings as detection failures?", flagged.len()))? {
            println!("Aborted.");
            db.close().await;
            return Ok(());
        }
        let names: Vec<String> = flagged.into_iter().map(|s| s.image_name).collect();
        db.mark_as_failures(&names, SystemClock.now()).await?;
        println!(
            "Marked {} readings as failures (backup at {})",
            names.len(),
            db.backup_file().display()
        );
    }

    db.close().await;
    Ok(())
}

fn confirm(question: &str) -> Result<bool> {
    print!("{} [y/N] ", question);
    std::io::stdout().flush()?;
    let mut answer = String::new();
    std::io::stdin().read_line(&mut answer)?;
    Ok(matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes"))
}

fn format_optional(value: Option<f64>, precision: usize) -> String {
    match value {
        Some(v) => format!("{:+.*}", precision, v),
        None => "-".to_string(),
    }
}

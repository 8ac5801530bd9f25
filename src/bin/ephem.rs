//! Batch ephemeris tool
//!
//! Computes the positions of solar system bodies over a range of Julian dates
//! and writes one row (or one block of doubles) per time step.
//!
//! Usage:
//!   cargo run --bin ephem -- --objects mars,jupiter --jd-min 2460000.5 --jd-max 2460010.5 --format 1
//!   cargo run --bin ephem -- --config run.json --output mars.bin --binary
//!   cargo run --bin ephem -- --info --ephemeris data/DE430.bin

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;
use std::time::Instant;

use clap::{ArgAction, Parser};
use log::{info, LevelFilter};

use ephemeris_compute::bodies::catalogue_names;
use ephemeris_compute::jplephem::{calendar, names, synthetic};
use ephemeris_compute::{EphemerisDriver, EphemerisFile, EphemerisRequest, RecordWriter, Settings};

/// Type alias for the error type used throughout this module
type Result<T> = std::result::Result<T, Box<dyn std::error::Error>>;

/// Batch ephemeris tool
#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Computes positions, brightness and geometry of solar system bodies",
    long_about = None
)]
struct Args {
    /// JSON settings file; flags given here override it
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// First sample, as a Julian date or a UTC calendar date
    #[arg(long, value_parser = parse_jd)]
    jd_min: Option<f64>,

    /// End of the sampled range (exclusive)
    #[arg(long, value_parser = parse_jd)]
    jd_max: Option<f64>,

    /// Days between samples
    #[arg(long)]
    jd_step: Option<f64>,

    /// Epoch RA and Dec are referred to
    #[arg(long, value_parser = parse_jd)]
    ra_dec_epoch: Option<f64>,

    /// Correct RA/Dec for the observer's position
    #[arg(long, action = ArgAction::SetTrue)]
    topocentric: bool,

    /// Observer latitude, degrees north
    #[arg(long, allow_hyphen_values = true)]
    latitude: Option<f64>,

    /// Observer longitude, degrees east
    #[arg(long, allow_hyphen_values = true)]
    longitude: Option<f64>,

    /// Propagate orbital elements instead of reading the ephemeris file
    #[arg(long, action = ArgAction::SetTrue)]
    orbital_elements: bool,

    /// Output format: -1 ecliptic xyz, 0 xyz, 1 RA/Dec, 2 photometry, 3 everything
    #[arg(short, long, allow_negative_numbers = true)]
    format: Option<i32>,

    /// Write raw little-endian doubles instead of text
    #[arg(long, action = ArgAction::SetTrue)]
    binary: bool,

    /// Comma or space separated body names
    #[arg(long)]
    objects: Option<String>,

    /// Binary ephemeris file
    #[arg(short, long)]
    ephemeris: Option<PathBuf>,

    /// JSON file with additional orbital-element bodies
    #[arg(long)]
    custom_bodies: Option<PathBuf>,

    /// Worker threads
    #[arg(short = 'j', long)]
    threads: Option<usize>,

    /// Output file; standard output when omitted
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Describe the ephemeris file and exit
    #[arg(long, action = ArgAction::SetTrue)]
    info: bool,

    /// List the built-in bodies and exit
    #[arg(long, action = ArgAction::SetTrue)]
    list_bodies: bool,

    /// Write a small synthetic ephemeris file to this path and exit
    #[arg(long)]
    write_synthetic: Option<PathBuf>,

    /// More log output (-v info, -vv debug)
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
}

fn parse_jd(text: &str) -> std::result::Result<f64, String> {
    calendar::parse_jd(text).map_err(|e| e.to_string())
}

/// Level forced by `-v` flags; `None` leaves `RUST_LOG` in charge
fn verbosity_level(verbose: u8) -> Option<LevelFilter> {
    match verbose {
        0 => None,
        1 => Some(LevelFilter::Info),
        _ => Some(LevelFilter::Debug),
    }
}

fn init_logging(verbose: u8) {
    let env = env_logger::Env::default().default_filter_or("warn");
    let mut builder = env_logger::Builder::from_env(env);
    if let Some(level) = verbosity_level(verbose) {
        builder.filter_level(level);
    }
    builder.format_timestamp(None).init();
}

/// Build settings from the config file, then apply command line overrides
fn build_settings(args: &Args) -> Result<Settings> {
    let mut settings = match &args.config {
        Some(path) => Settings::from_json_file(path)?,
        None => Settings::default(),
    };

    if let Some(jd) = args.jd_min {
        settings.jd_min = jd;
    }
    if let Some(jd) = args.jd_max {
        settings.jd_max = jd;
    }
    if let Some(step) = args.jd_step {
        settings.jd_step = step;
    }
    if let Some(epoch) = args.ra_dec_epoch {
        settings.ra_dec_epoch = epoch;
    }
    if args.topocentric {
        settings.enable_topocentric_correction = true;
    }
    if let Some(latitude) = args.latitude {
        settings.latitude = latitude;
    }
    if let Some(longitude) = args.longitude {
        settings.longitude = longitude;
    }
    if args.orbital_elements {
        settings.use_orbital_elements = 1;
    }
    if let Some(format) = args.format {
        settings.output_format = format;
    }
    if args.binary {
        settings.output_binary = true;
    }
    if let Some(objects) = &args.objects {
        settings.objects = objects.clone();
    }
    if let Some(path) = &args.ephemeris {
        settings.ephemeris_path = path.clone();
    }
    if let Some(path) = &args.custom_bodies {
        settings.custom_bodies = Some(path.clone());
    }
    if let Some(threads) = args.threads {
        settings.threads = Some(threads);
    }

    Ok(settings)
}

/// Print the coverage and contents of an ephemeris file
fn display_info(settings: &Settings) -> Result<()> {
    let start_time = Instant::now();
    let ephemeris = EphemerisFile::load(&settings.ephemeris_path)?;
    let header = ephemeris.header();

    println!("Ephemeris file: {}", settings.ephemeris_path.display());
    println!("-------------------------------------------------------");
    println!("Loaded in {:.2?}", start_time.elapsed());
    println!("Format version: {}", header.version);
    println!(
        "Coverage: JD {} to {} ({} to {})",
        header.jd_start,
        header.jd_end,
        calendar::format_date(header.jd_start),
        calendar::format_date(header.jd_end)
    );
    println!(
        "Records: {} of {} days, {} doubles each",
        header.record_count, header.record_span, header.record_len
    );
    println!("AU: {} km", header.au_km);
    println!("Earth/Moon mass ratio: {}", header.emrat);

    println!("\nBodies:");
    println!("-------------------------------------------------------");
    for index in ephemeris.available_bodies() {
        let layout = header.bodies[index];
        println!(
            "{:>3}  {:<24} {:>2} coefficients x {} sub-intervals",
            index,
            names::table_name(index).map_or_else(|| "(unnamed)".to_string(), names::titlecase),
            layout.n_coeffs,
            layout.n_subintervals
        );
    }
    Ok(())
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.verbose);

    if args.list_bodies {
        for name in catalogue_names() {
            println!("{}", names::titlecase(name));
        }
        return Ok(());
    }

    if let Some(path) = &args.write_synthetic {
        let config = synthetic::SyntheticConfig::default();
        synthetic::write_to(&config, path)?;
        println!(
            "Wrote synthetic ephemeris covering JD {} to {} to {}",
            config.jd_start,
            config.jd_end(),
            path.display()
        );
        return Ok(());
    }

    let settings = build_settings(&args)?;
    if args.info {
        return display_info(&settings);
    }

    let start_time = Instant::now();
    let request = EphemerisRequest::from_settings(settings)?;
    let (format, binary) = (request.format, request.settings.output_binary);
    let mut driver = EphemerisDriver::new(request)?;

    let out: Box<dyn Write> = match &args.output {
        Some(path) => Box::new(BufWriter::new(File::create(path)?)),
        None => Box::new(BufWriter::new(io::stdout().lock())),
    };
    let mut writer = RecordWriter::new(out, format, binary);
    let summary = driver.run(&mut writer)?;

    info!("Finished in {:.2?}", start_time.elapsed());
    if summary.failed_samples > 0 {
        eprintln!(
            "{} of {} samples could not be computed and were written as NaN",
            summary.failed_samples, summary.records
        );
    }
    Ok(())
}

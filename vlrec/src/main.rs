use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use libvicar::{DiodeFilter, ExtractorOptions};
use tracing::{warn, Level};

#[cfg(not(debug_assertions))]
const DEFAULT_DEBUG_LEVEL: u8 = 1;
#[cfg(debug_assertions)]
const DEFAULT_DEBUG_LEVEL: u8 = 99;

/// Converts 1970s Viking Lander era VICAR images to PNGs. The input can
/// be a single VICAR file, a zip archive, or a directory of either, and
/// camera events are reconstructed into the output directory.
#[derive(Parser)]
#[command(version, about, long_about = None, disable_version_flag = true)]
struct Cli {
    /// Turn debugging information on
    #[arg(short = 'V', long = "verbose", default_value_t = DEFAULT_DEBUG_LEVEL, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Show version information
    #[arg(short = 'v', long = "version", action = clap::ArgAction::Version)]
    version: Option<bool>,

    /// Put reconstructed images into subdirectories by band type class
    #[arg(long)]
    directorize_band_class: bool,

    /// Put reconstructed images into subdirectories by lander location
    #[arg(long)]
    directorize_location: bool,

    /// Put reconstructed images into subdirectories by Martian month
    #[arg(long)]
    directorize_month: bool,

    /// Put reconstructed images into subdirectories by solar day
    #[arg(long)]
    directorize_sol: bool,

    /// Don't write anything
    #[arg(long)]
    dry_run: bool,

    /// Look only for the specified camera event ID, such as 22A158
    #[arg(long, value_name = "id")]
    filter_camera_event: Option<String>,

    /// Extract only diode bands of a class: any, broadband, colour,
    /// infrared, sun, or survey
    #[arg(long = "filter-diode", value_name = "class", default_value = "any")]
    filter_diode: DiodeFilter,

    /// Extract from a specific lander only, 1 or 2 (0 for either)
    #[arg(long, value_name = "#")]
    filter_lander: Option<u8>,

    /// Look only for camera events taken on the specified solar day
    #[arg(long, value_name = "#")]
    filter_solar_day: Option<u32>,

    /// Machine generate a metadata text file beside recovered colour images
    #[arg(long)]
    generate_metadata: bool,

    /// Don't stop on corrupt or problematic input files
    #[arg(long)]
    ignore_bad_files: bool,

    /// Encode output with Adam7 interlacing
    #[arg(long)]
    interlace: bool,

    /// Number of threads to run parallelized (accepted but single threaded)
    #[arg(short = 'j', long, value_name = "threads", num_args = 0..=1, require_equals = true, default_missing_value = "0")]
    jobs: Option<usize>,

    /// Disable VT/100 ANSI coloured terminal output
    #[arg(long)]
    no_ansi_colours: bool,

    /// Don't automatically rotate images as needed
    #[arg(long)]
    no_auto_rotate: bool,

    /// Don't reconstruct camera events, just dump all bands separately
    #[arg(long)]
    no_reconstruct: bool,

    /// Overwrite any existing output files
    #[arg(long)]
    overwrite: bool,

    /// Scan subfolders as well if the input is a directory
    #[arg(short, long)]
    recursive: bool,

    /// No warnings or errors displayed, summarize only
    #[arg(long)]
    summarize_only: bool,

    /// Suppress warnings and errors
    #[arg(long)]
    suppress: bool,

    /// A VICAR file, zip archive, or directory containing either
    input: PathBuf,

    /// Directory reconstructed images are written into
    output: Option<PathBuf>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.summarize_only || cli.suppress {
        Level::ERROR
    } else {
        match cli.verbose {
            0 => Level::ERROR,
            1 => Level::WARN,
            2 => Level::INFO,
            3 => Level::DEBUG,
            _ => Level::TRACE,
        }
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_ansi(!cli.no_ansi_colours)
        .with_file(true)
        .with_line_number(true)
        .init();

    if cli.jobs.is_some() {
        warn!("parallelization is not implemented yet, using a single thread");
    }

    let options = ExtractorOptions::builder()
        .auto_rotate(!cli.no_auto_rotate)
        .directorize_band_class(cli.directorize_band_class)
        .directorize_location(cli.directorize_location)
        .directorize_month(cli.directorize_month)
        .directorize_sol(cli.directorize_sol)
        .dry_run(cli.dry_run)
        .maybe_filter_camera_event(cli.filter_camera_event)
        .filter_diode_class(cli.filter_diode)
        .maybe_filter_lander(cli.filter_lander.filter(|&lander| lander != 0))
        .maybe_filter_solar_day(cli.filter_solar_day)
        .generate_metadata(cli.generate_metadata)
        .ignore_bad_files(cli.ignore_bad_files)
        .interlace(cli.interlace)
        .maybe_jobs(cli.jobs)
        .reconstruct(!cli.no_reconstruct)
        .overwrite(cli.overwrite)
        .recursive(cli.recursive)
        .summarize_only(cli.summarize_only)
        .build();

    let output = cli.output.unwrap_or_else(|| PathBuf::from("."));
    let summary = vlrec::extract(&options, &cli.input, &output)?;
    println!("{}", vlrec::summary_report(&options, &summary));
    Ok(())
}

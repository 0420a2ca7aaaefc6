//! Skymatch: source detection evaluation for radio-interferometry simulations.
//!
//! A simulation starts from a known sky model. After imaging and source
//! finding, skymatch measures how well the detected sources recover that
//! model: it projects the sky catalog into the image's pixel space, pairs
//! each detection with at most one ground-truth source within a pixel
//! tolerance, and reports the resulting true/false positives and negatives
//! together with per-match residuals.
//!
//! # Modules
//!
//! - [`catalog`]: Sky and detection catalogs, coordinate transform, CSV I/O
//! - [`matching`]: Tolerance-bounded greedy 1:1 assignment
//! - [`evaluation`]: Evaluation reports, mapped arrays and plot overlays
//! - [`validation`]: Catalog validation and issue reporting
//! - [`error`]: Error types for skymatch operations

pub mod catalog;
pub mod error;
pub mod evaluation;
pub mod matching;
pub mod validation;

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;

use catalog::io_detection_csv::DetectionCsvOptions;
use catalog::{load_detections, DetectionInput, Projection, SkyPosition};
use evaluation::io_mapped_csv::write_mapped_csv;
use evaluation::{evaluate_detections, write_overlay_json, EvaluateOptions};
use matching::{CandidateIndex, PixelBounds};

pub use error::{ErrorKind, SkymatchError};

/// The skymatch CLI application.
#[derive(Parser)]
#[command(name = "skymatch")]
#[command(version, author, about)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

/// Available subcommands.
#[derive(Subcommand)]
enum Commands {
    /// Evaluate a detection catalog against the sky model it was imaged from.
    Evaluate(EvaluateArgs),
    /// Validate catalogs for errors and warnings.
    Validate(ValidateArgs),
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum ProjectionArg {
    Sin,
    Tan,
}

impl From<ProjectionArg> for Projection {
    fn from(arg: ProjectionArg) -> Self {
        match arg {
            ProjectionArg::Sin => Projection::Sin,
            ProjectionArg::Tan => Projection::Tan,
        }
    }
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum IndexArg {
    Exhaustive,
    Grid,
}

impl From<IndexArg> for CandidateIndex {
    fn from(arg: IndexArg) -> Self {
        match arg {
            IndexArg::Exhaustive => CandidateIndex::Exhaustive,
            IndexArg::Grid => CandidateIndex::Grid,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

/// Arguments for the evaluate subcommand.
#[derive(clap::Args)]
struct EvaluateArgs {
    /// Ground-truth sky catalog (headerless CSV).
    #[arg(long)]
    sky: PathBuf,

    /// Detection catalog CSV written by a source finder.
    #[arg(long)]
    detections: PathBuf,

    /// Phase center right ascension in degrees.
    #[arg(long, allow_negative_numbers = true)]
    phase_center_ra: f64,

    /// Phase center declination in degrees.
    #[arg(long, allow_negative_numbers = true)]
    phase_center_dec: f64,

    /// Image pixel scale in degrees per pixel.
    #[arg(long)]
    pixel_scale: f64,

    /// Image width in pixels (also the height unless --image-height is given).
    #[arg(long)]
    image_size: u32,

    /// Image height in pixels.
    #[arg(long)]
    image_height: Option<u32>,

    /// Matching tolerance in pixels.
    #[arg(long, default_value_t = matching::DEFAULT_TOLERANCE_PX, env = "SKYMATCH_TOLERANCE_PX")]
    tolerance: f64,

    /// Sky projection of the image.
    #[arg(long, value_enum, default_value = "sin", env = "SKYMATCH_PROJECTION")]
    projection: ProjectionArg,

    /// Candidate search strategy (both give the same result).
    #[arg(long, value_enum, default_value = "exhaustive")]
    index: IndexArg,

    /// Exclude sources outside the image from matching.
    #[arg(long)]
    clip_to_image: bool,

    /// Image the detections were made on, recorded for plotting.
    #[arg(long)]
    source_image: Option<PathBuf>,

    /// Write the mapped array to this CSV file.
    #[arg(long)]
    mapping_out: Option<PathBuf>,

    /// Write plot overlay data to this JSON file.
    #[arg(long)]
    overlay_out: Option<PathBuf>,

    /// Output format for the report.
    #[arg(long, value_enum, default_value = "text")]
    output: OutputFormat,
}

/// Arguments for the validate subcommand.
#[derive(clap::Args)]
struct ValidateArgs {
    /// Detection catalog CSV to validate.
    #[arg(long)]
    detections: PathBuf,

    /// Sky catalog CSV to validate alongside.
    #[arg(long)]
    sky: Option<PathBuf>,

    /// Image width in pixels, enabling bounds checks.
    #[arg(long)]
    image_size: Option<u32>,

    /// Image height in pixels (defaults to the width).
    #[arg(long, requires = "image_size")]
    image_height: Option<u32>,

    /// Phase center right ascension in degrees. With the other transform
    /// flags, sky sources are also checked against the image.
    #[arg(
        long,
        allow_negative_numbers = true,
        requires = "sky",
        requires = "image_size",
        requires = "phase_center_dec",
        requires = "pixel_scale"
    )]
    phase_center_ra: Option<f64>,

    /// Phase center declination in degrees.
    #[arg(long, allow_negative_numbers = true, requires = "phase_center_ra")]
    phase_center_dec: Option<f64>,

    /// Image pixel scale in degrees per pixel.
    #[arg(long, requires = "phase_center_ra")]
    pixel_scale: Option<f64>,

    /// Sky projection of the image.
    #[arg(long, value_enum, default_value = "sin", env = "SKYMATCH_PROJECTION")]
    projection: ProjectionArg,

    /// Treat warnings as errors (exit non-zero if any warnings).
    #[arg(long)]
    strict: bool,

    /// Output format for the report.
    #[arg(long, value_enum, default_value = "text")]
    output: OutputFormat,
}

/// Run the skymatch CLI.
///
/// This is the main entry point for the CLI, called from `main.rs`.
pub fn run() -> Result<(), SkymatchError> {
    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Evaluate(args)) => run_evaluate(args),
        Some(Commands::Validate(args)) => run_validate(args),
        None => {
            println!("skymatch {}", env!("CARGO_PKG_VERSION"));
            println!();
            println!("Source detection evaluation for radio-interferometry simulations.");
            println!();
            println!("Run 'skymatch --help' for usage information.");
            Ok(())
        }
    }
}

/// Execute the evaluate subcommand.
fn run_evaluate(args: EvaluateArgs) -> Result<(), SkymatchError> {
    let width = args.image_size;
    let height = args.image_height.unwrap_or(width);

    let mut sky = catalog::io_sky_csv::read_sky_csv(&args.sky)?;
    sky.setup_image_transform(
        args.projection.into(),
        SkyPosition::new(args.phase_center_ra, args.phase_center_dec),
        args.pixel_scale,
        width,
        height,
    )?;

    let detections = load_detections(DetectionInput::Csv {
        path: &args.detections,
        options: DetectionCsvOptions {
            source_image: args.source_image.clone(),
            pixel_scale_deg: Some(args.pixel_scale),
        },
    })?;

    let opts = EvaluateOptions {
        tolerance_px: args.tolerance,
        bounds: args.clip_to_image.then_some(PixelBounds::new(width, height)),
        index: args.index.into(),
    };
    let report = evaluate_detections(&sky, &detections, &opts)?;

    if let Some(path) = &args.mapping_out {
        write_mapped_csv(path, &report.mapped_array())?;
        log::info!("wrote mapped array to {}", path.display());
    }
    if let Some(path) = &args.overlay_out {
        write_overlay_json(path, &report.overlay())?;
        log::info!("wrote plot overlay to {}", path.display());
    }

    match args.output {
        OutputFormat::Json => print_json(&report),
        OutputFormat::Text => {
            print!("{}", report);
            Ok(())
        }
    }
}

/// Execute the validate subcommand.
fn run_validate(args: ValidateArgs) -> Result<(), SkymatchError> {
    let opts = validation::ValidateOptions {
        strict: args.strict,
        bounds: args
            .image_size
            .map(|width| PixelBounds::new(width, args.image_height.unwrap_or(width))),
    };

    let detections = catalog::io_detection_csv::read_detection_csv(
        &args.detections,
        &DetectionCsvOptions::default(),
    )?;
    let mut report = validation::validate_detections(detections.sources(), &opts);

    if let Some(sky_path) = &args.sky {
        let mut sky = catalog::io_sky_csv::read_sky_csv(sky_path)?;
        if let (Some(ra), Some(dec), Some(scale), Some(width)) = (
            args.phase_center_ra,
            args.phase_center_dec,
            args.pixel_scale,
            args.image_size,
        ) {
            sky.setup_image_transform(
                args.projection.into(),
                SkyPosition::new(ra, dec),
                scale,
                width,
                args.image_height.unwrap_or(width),
            )?;
        }
        report.merge(validation::validate_sky(&sky, &opts));
    }

    match args.output {
        OutputFormat::Json => print_json(&serde_json::json!({
            "error_count": report.error_count(),
            "warning_count": report.warning_count(),
            "issues": &report.issues,
        }))?,
        OutputFormat::Text => print!("{}", report),
    }

    // Determine exit status
    let has_errors = report.error_count() > 0;
    let has_warnings = report.warning_count() > 0;

    if has_errors || (opts.strict && has_warnings) {
        Err(SkymatchError::ValidationFailed {
            error_count: report.error_count(),
            warning_count: report.warning_count(),
            report,
        })
    } else {
        Ok(())
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<(), SkymatchError> {
    let json = serde_json::to_string_pretty(value).map_err(|source| SkymatchError::JsonWrite {
        path: PathBuf::from("<stdout>"),
        source,
    })?;
    println!("{}", json);
    Ok(())
}

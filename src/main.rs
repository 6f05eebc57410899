use anyhow::{bail, Context};
use blazing_webp::{
    collect_image_paths, format_file_size, is_supported_format, BatchHandle, BatchProcessor, Cli,
    Commands, ConvertArgs, ErrorKind, Image, Loader, LogReporter, MetadataProcessor, Parameters,
    ProgressBarReporter, Snapshot,
};
use clap::Parser;
use log::LevelFilter;
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logger
    env_logger::Builder::new()
        .filter_level(if cli.verbose {
            LevelFilter::Debug
        } else {
            LevelFilter::Info
        })
        .parse_default_env()
        .init();

    match cli.command {
        Commands::Convert(args) => process_convert(args),
        Commands::Info { input } => process_info(input),
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Rejection {
    kind: ErrorKind,
    file: Option<PathBuf>,
    message: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Report {
    snapshot: Snapshot,
    images: Vec<Image>,
    rejected: Vec<Rejection>,
}

fn process_convert(args: ConvertArgs) -> anyhow::Result<()> {
    let parameters = args.parameters().context("Invalid conversion parameters")?;
    let paths = collect_image_paths(&args.inputs, args.recursive);

    if paths.is_empty() {
        log::warn!("No image files found");
        return Ok(());
    }

    let processor = BatchProcessor::new(args.engine_config())?;
    let batch = processor.submit(&paths, parameters)?;

    let snapshot = if args.json {
        batch.run_with(Arc::new(LogReporter))
    } else {
        batch.run_with(Arc::new(ProgressBarReporter::new(batch.snapshot().total)))
    };

    if args.json {
        let report = build_report(&batch, snapshot.clone());
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_summary(&batch, &snapshot);
    }

    let rejected = batch.rejected().len();
    if snapshot.failed > 0 || rejected > 0 {
        bail!(
            "{} images failed to convert, {} were rejected",
            snapshot.failed,
            rejected
        );
    }

    Ok(())
}

fn build_report(batch: &BatchHandle, snapshot: Snapshot) -> Report {
    let rejected = batch
        .rejected()
        .iter()
        .map(|e| Rejection {
            kind: e.kind(),
            file: e.path().map(|p| p.to_path_buf()),
            message: e.to_string(),
        })
        .collect();

    Report {
        snapshot,
        images: batch.images(),
        rejected,
    }
}

fn print_summary(batch: &BatchHandle, snapshot: &Snapshot) {
    for error in batch.rejected() {
        println!("Skipped: {}", error);
    }
    for failure in batch.failures() {
        println!("Failed: {} ({})", failure.full_path.display(), failure.error);
    }

    println!(
        "Converted {} of {} images in {:.2}s: {} -> {} ({:.1}% saved)",
        snapshot.succeeded,
        snapshot.total,
        snapshot.elapsed_ms as f64 / 1000.0,
        format_file_size(snapshot.original_bytes),
        format_file_size(snapshot.webp_bytes),
        snapshot.savings_percent()
    );
}

fn process_info(input: PathBuf) -> anyhow::Result<()> {
    if !input.exists() {
        bail!("File does not exist: {}", input.display());
    }

    let image = Image::from_path(&input)?;
    let (width, height, format) = Loader::new().get_dimensions_and_format(&input)?;
    let orientation = MetadataProcessor::new().orientation(&input);
    let output = Parameters::default().output_path(&image);

    println!("=== Image Information ===");
    println!("File: {}", input.display());
    println!("Size: {}", format_file_size(image.original_size));
    println!("Dimensions: {} x {} pixels", width, height);
    println!("Format: {}", format);
    println!("Convertible: {}", is_supported_format(&input));
    if let Some(orientation) = orientation {
        println!("EXIF orientation: {}", orientation);
    }
    println!("Default output: {}", output.display());

    Ok(())
}

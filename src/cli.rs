// blazing-webp/src/cli.rs
use crate::core::{ConvertError, EngineConfig, Parameters, ResizeAlgorithm, ResizeMode, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "blazing-webp", version, about = "Batch convert images to WebP")]
pub struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Convert images (or directories of images) to WebP
    Convert(ConvertArgs),

    /// Show information about an image
    Info {
        /// Image to inspect
        input: PathBuf,
    },
}

#[derive(Args, Debug)]
pub struct ConvertArgs {
    /// Files or directories to convert
    #[arg(required = true)]
    pub inputs: Vec<PathBuf>,

    /// Folder to write the WebP files to (defaults to each source's folder)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Encode losslessly; quality is ignored
    #[arg(long)]
    pub lossless: bool,

    /// Lossy quality (0-100)
    #[arg(short, long, default_value_t = 80, value_parser = clap::value_parser!(u8).range(0..=100))]
    pub quality: u8,

    /// Side of the image that --resize-to applies to
    #[arg(long, value_enum, default_value_t = ResizeArg::NoResizing)]
    pub resize: ResizeArg,

    /// Target size in pixels for the resized side
    #[arg(long, default_value_t = 0)]
    pub resize_to: u32,

    /// Allow resizing images up
    #[arg(long)]
    pub allow_enlarging: bool,

    /// Number of worker threads (0 = one per CPU)
    #[arg(short = 'j', long, default_value_t = 0)]
    pub threads: usize,

    /// Descend into subdirectories
    #[arg(short, long)]
    pub recursive: bool,

    /// Resampling filter used when resizing
    #[arg(long, value_enum, default_value_t = Algorithm::Lanczos3)]
    pub algorithm: Algorithm,

    /// JSON file with conversion parameters; replaces the flags above
    #[arg(long)]
    pub parameters: Option<PathBuf>,

    /// Skip sources larger than this many bytes
    #[arg(long)]
    pub max_file_size: Option<u64>,

    /// Keep the stored pixel orientation instead of applying EXIF rotation
    #[arg(long)]
    pub no_auto_orient: bool,

    /// Print the final report as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum ResizeArg {
    NoResizing,
    LongerSide,
    ShorterSide,
}

impl From<ResizeArg> for ResizeMode {
    fn from(arg: ResizeArg) -> Self {
        match arg {
            ResizeArg::NoResizing => ResizeMode::NoResizing,
            ResizeArg::LongerSide => ResizeMode::LongerSide,
            ResizeArg::ShorterSide => ResizeMode::ShorterSide,
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum Algorithm {
    Nearest,
    Bilinear,
    Bicubic,
    Lanczos3,
}

impl From<Algorithm> for ResizeAlgorithm {
    fn from(algorithm: Algorithm) -> Self {
        match algorithm {
            Algorithm::Nearest => ResizeAlgorithm::Nearest,
            Algorithm::Bilinear => ResizeAlgorithm::Bilinear,
            Algorithm::Bicubic => ResizeAlgorithm::Bicubic,
            Algorithm::Lanczos3 => ResizeAlgorithm::Lanczos3,
        }
    }
}

impl ConvertArgs {
    /// Batch parameters from `--parameters`, or from the individual flags.
    ///
    /// `--output` always overrides the save folder.
    pub fn parameters(&self) -> Result<Parameters> {
        let mut parameters = match &self.parameters {
            Some(path) => {
                let raw = std::fs::read_to_string(path)?;
                serde_json::from_str(&raw).map_err(|e| {
                    ConvertError::InvalidParameter(format!("{}: {}", path.display(), e))
                })?
            }
            None => Parameters {
                is_lossless: self.lossless,
                quality: self.quality,
                resize: self.resize.into(),
                resize_to: self.resize_to,
                is_enlarging_allowed: self.allow_enlarging,
                save_folder: None,
            },
        };

        if self.output.is_some() {
            parameters.save_folder = self.output.clone();
        }

        Ok(parameters)
    }

    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig {
            concurrency: self.threads,
            algorithm: self.algorithm.into(),
            max_file_size: self.max_file_size,
            auto_orient: !self.no_auto_orient,
        }
    }
}

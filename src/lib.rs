mod cli;
mod core;
mod engine;
mod processors;
mod utils;

pub use cli::{Algorithm, Cli, Commands, ConvertArgs, ResizeArg};
pub use self::core::processor::ImageCodec;
pub use self::core::{
    ConvertError, EngineConfig, ErrorKind, Image, Outcome, Parameters, ProcessError,
    ResizeAlgorithm, ResizeMode, Result, Status, Success, MAX_DIMENSION,
};
pub use engine::{
    CancelToken, ChannelReporter, FnReporter, Job, JobQueue, LogReporter, ProgressBarReporter,
    ProgressEvent, ProgressReporter, Reporters, ResultAggregator, Snapshot, WorkerPool,
};
pub use processors::{
    BatchHandle, BatchProcessor, Compressor, Loader, MetadataProcessor, Resizer,
    WEBP_MAX_DIMENSION,
};
pub use utils::{
    collect_image_paths, format_file_size, get_file_extension, is_supported_format,
    SUPPORTED_EXTENSIONS,
};

pub mod prelude {
    pub use crate::{
        BatchHandle, BatchProcessor, EngineConfig, Image, Parameters, ProgressReporter,
        ResizeMode, Snapshot, Status,
    };
}

// Re-export commonly used types
pub use image::DynamicImage;

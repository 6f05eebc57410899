// blazing-webp/src/engine/mod.rs
mod aggregator;
mod pool;
mod progress;
mod queue;

pub use aggregator::{ResultAggregator, Snapshot};
pub use pool::{CancelToken, WorkerPool};
pub use progress::{
    ChannelReporter, FnReporter, LogReporter, ProgressBarReporter, ProgressEvent,
    ProgressReporter, Reporters,
};
pub use queue::{Job, JobQueue};

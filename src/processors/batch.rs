// blazing-webp/src/processors/batch.rs
use crate::core::processor::ImageCodec;
use crate::core::{ConvertError, EngineConfig, Image, Parameters, Result, Success, ProcessError};
use crate::engine::{
    CancelToken, JobQueue, ProgressReporter, Reporters, ResultAggregator, Snapshot, WorkerPool,
};
use crate::utils::is_supported_format;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Entry point of the engine: owns the worker pool and hands out batches.
pub struct BatchProcessor {
    pool: Arc<WorkerPool>,
    reporters: Reporters,
}

impl BatchProcessor {
    pub fn new(config: EngineConfig) -> Result<Self> {
        config.validate()?;
        let codec = ImageCodec::new(&config);
        let pool = WorkerPool::new(config.concurrency, codec)?;

        Ok(Self {
            pool: Arc::new(pool),
            reporters: Reporters::new(),
        })
    }

    /// Attach a reporter notified by every batch submitted afterwards.
    pub fn with_reporter(mut self, reporter: Arc<dyn ProgressReporter>) -> Self {
        self.reporters.push(reporter);
        self
    }

    pub fn concurrency(&self) -> usize {
        self.pool.concurrency()
    }

    /// Create a batch for `paths` converted with `parameters`.
    ///
    /// Invalid parameters reject the whole batch. A path that can't be
    /// queued is listed in `BatchHandle::rejected` and the rest of the batch
    /// is unaffected.
    pub fn submit<I, P>(&self, paths: I, parameters: Parameters) -> Result<BatchHandle>
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        parameters.validate()?;

        let mut handle = BatchHandle {
            parameters: Arc::new(parameters),
            queue: JobQueue::new(),
            aggregator: ResultAggregator::new(),
            cancel: CancelToken::new(),
            pool: Arc::clone(&self.pool),
            reporters: self.reporters.clone(),
            rejected: Vec::new(),
        };

        for path in paths {
            let path = path.as_ref();
            if let Err(e) = handle.add(path) {
                log::warn!("Rejected {}: {}", path.display(), e);
                handle.rejected.push(e);
            }
        }

        log::info!(
            "Submitted batch of {} images ({} rejected)",
            handle.queue.len(),
            handle.rejected.len()
        );

        Ok(handle)
    }
}

/// One submitted batch: its queue, its results and its cancel signal.
pub struct BatchHandle {
    parameters: Arc<Parameters>,
    queue: JobQueue,
    aggregator: ResultAggregator,
    cancel: CancelToken,
    pool: Arc<WorkerPool>,
    reporters: Reporters,
    rejected: Vec<ConvertError>,
}

impl BatchHandle {
    /// Queue one more source before the batch runs.
    pub fn add<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();

        // Check the extension before touching the file so a bogus path
        // still reports the format problem.
        if !is_supported_format(path) {
            return Err(ConvertError::WrongFormat(path.to_path_buf()));
        }
        if self.queue.contains(path) {
            return Err(ConvertError::AlreadyExists(path.to_path_buf()));
        }

        let image = Image::from_path(path)?;
        self.queue.enqueue(image.clone(), Arc::clone(&self.parameters))?;
        self.aggregator.register(image)
    }

    /// Convert every queued image and block until the workers are idle.
    pub fn run(&self) -> Snapshot {
        self.pool
            .run(&self.queue, &self.aggregator, &self.reporters, &self.cancel)
    }

    /// Same as `run`, with an extra reporter for this run only.
    pub fn run_with(&self, reporter: Arc<dyn ProgressReporter>) -> Snapshot {
        let reporters = self.reporters.clone().with(reporter);
        self.pool
            .run(&self.queue, &self.aggregator, &reporters, &self.cancel)
    }

    pub fn cancel(&self) {
        log::info!("Cancelling batch");
        self.cancel.cancel();
    }

    /// A clonable cancel signal, usable from another thread while `run` blocks.
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    pub fn snapshot(&self) -> Snapshot {
        self.aggregator.snapshot()
    }

    pub fn images(&self) -> Vec<Image> {
        self.aggregator.images()
    }

    pub fn image(&self, full_path: &Path) -> Option<Image> {
        self.aggregator.image(full_path)
    }

    pub fn successes(&self) -> Vec<Success> {
        self.aggregator.successes()
    }

    pub fn failures(&self) -> Vec<ProcessError> {
        self.aggregator.failures()
    }

    /// Submission errors, in submission order.
    pub fn rejected(&self) -> &[ConvertError] {
        &self.rejected
    }

    pub fn parameters(&self) -> &Parameters {
        &self.parameters
    }

    /// Where the WebP for `image` is (or will be) written.
    pub fn output_path(&self, image: &Image) -> PathBuf {
        self.parameters.output_path(image)
    }
}

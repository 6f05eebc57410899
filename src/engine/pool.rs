// blazing-webp/src/engine/pool.rs
use super::{JobQueue, ProgressReporter, ResultAggregator, Snapshot};
use crate::core::processor::ImageCodec;
use crate::core::{ConvertError, Result};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Batch-level stop signal shared between a handle and its workers.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Workers finish the image they hold, then stop claiming new ones.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Fixed number of workers draining a `JobQueue` through one `ImageCodec`.
pub struct WorkerPool {
    concurrency: usize,
    thread_pool: rayon::ThreadPool,
    codec: ImageCodec,
}

impl WorkerPool {
    /// Build a pool of `concurrency` workers; 0 means one per available CPU.
    pub fn new(concurrency: usize, codec: ImageCodec) -> Result<Self> {
        // Initialize thread pool once
        let thread_pool = rayon::ThreadPoolBuilder::new()
            .num_threads(concurrency)
            .thread_name(|index| format!("webp-worker-{}", index))
            .build()
            .map_err(|e| {
                ConvertError::InvalidState(format!("Failed to create thread pool: {}", e))
            })?;

        let concurrency = thread_pool.current_num_threads();
        log::debug!("Worker pool ready with {} workers", concurrency);

        Ok(Self {
            concurrency,
            thread_pool,
            codec,
        })
    }

    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    /// Drain `queue` with every worker and return once none holds an image.
    ///
    /// Jobs left in the queue after `cancel` fires stay TODO.
    pub fn run(
        &self,
        queue: &JobQueue,
        aggregator: &ResultAggregator,
        reporter: &dyn ProgressReporter,
        cancel: &CancelToken,
    ) -> Snapshot {
        let workers = self.concurrency.min(queue.len()).max(1);
        log::info!("Converting {} images with {} workers", queue.len(), workers);

        self.thread_pool.scope(|scope| {
            for worker_id in 0..workers {
                scope.spawn(move |_| self.work(worker_id, queue, aggregator, reporter, cancel));
            }
        });

        if cancel.is_cancelled() {
            aggregator.mark_cancelled();
        }
        aggregator.finish();

        let snapshot = aggregator.snapshot();
        reporter.on_finish(&snapshot);
        snapshot
    }

    fn work(
        &self,
        worker_id: usize,
        queue: &JobQueue,
        aggregator: &ResultAggregator,
        reporter: &dyn ProgressReporter,
        cancel: &CancelToken,
    ) {
        let mut handled = 0usize;

        loop {
            if cancel.is_cancelled() {
                log::debug!("Worker {} stopping: batch cancelled", worker_id);
                break;
            }

            let Some(job) = queue.dequeue() else {
                break;
            };

            match aggregator.claim(&job.image) {
                Ok(image) => reporter.on_update(&image),
                Err(e) => {
                    log::warn!("Worker {} skipping {}: {}", worker_id, job.image.full_path.display(), e);
                    continue;
                }
            }

            let outcome = self.codec.convert(&job.image, &job.parameters);
            handled += 1;

            match aggregator.record(outcome) {
                Ok(image) => reporter.on_update(&image),
                Err(e) => log::warn!("Worker {} dropped an outcome: {}", worker_id, e),
            }
        }

        log::debug!("Worker {} done after {} images", worker_id, handled);
    }
}

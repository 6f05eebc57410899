// blazing-webp/src/engine/queue.rs
use crate::core::{ConvertError, Image, Parameters, Result, Status};
use crate::utils::is_supported_extension;
use std::collections::{HashSet, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// A pending conversion request.
#[derive(Debug, Clone)]
pub struct Job {
    pub image: Image,
    pub parameters: Arc<Parameters>,
}

#[derive(Default)]
struct QueueState {
    pending: VecDeque<Job>,
    // Every path ever accepted, including the ones already dequeued
    known: HashSet<PathBuf>,
    // Output files claimed by accepted jobs
    outputs: HashSet<PathBuf>,
}

/// FIFO of conversion jobs shared by all workers.
#[derive(Default)]
pub struct JobQueue {
    state: Mutex<QueueState>,
}

impl JobQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `image` as a TODO job.
    ///
    /// Fails with `WrongFormat` for unsupported extensions, with
    /// `AlreadyExists` when the same full path was enqueued before and with
    /// `OutputTaken` when another job already writes the same WebP file.
    pub fn enqueue(&self, mut image: Image, parameters: Arc<Parameters>) -> Result<()> {
        if !is_supported_extension(&image.extension) {
            return Err(ConvertError::WrongFormat(image.full_path));
        }

        let output = parameters.output_path(&image);
        let mut state = self.lock();
        if state.known.contains(&image.full_path) {
            return Err(ConvertError::AlreadyExists(image.full_path));
        }
        if state.outputs.contains(&output) {
            return Err(ConvertError::OutputTaken {
                path: image.full_path,
                output,
            });
        }
        state.known.insert(image.full_path.clone());
        state.outputs.insert(output);

        image.status = Status::Todo;
        image.in_progress = false;
        image.webp_size = 0;
        image.error_message.clear();

        log::debug!("Queued {}", image.full_path.display());
        state.pending.push_back(Job { image, parameters });
        Ok(())
    }

    /// Remove and return the oldest job, or `None` when the queue is empty.
    pub fn dequeue(&self) -> Option<Job> {
        self.lock().pending.pop_front()
    }

    pub fn contains(&self, full_path: &Path) -> bool {
        self.lock().known.contains(full_path)
    }

    pub fn len(&self) -> usize {
        self.lock().pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().pending.is_empty()
    }

    fn lock(&self) -> MutexGuard<'_, QueueState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

// blazing-webp/src/engine/aggregator.rs
use crate::core::{ConvertError, Image, Outcome, ProcessError, Result, Status, Success};
use serde::Serialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

/// Point-in-time totals for a batch.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    /// Images still TODO, including the ones a worker is holding.
    pub pending: usize,
    pub in_progress: usize,
    /// Sum of `original_size` over successful images.
    pub original_bytes: u64,
    /// Sum of `webp_size` over successful images.
    pub webp_bytes: u64,
    pub bytes_saved: i64,
    pub elapsed_ms: u64,
    pub cancelled: bool,
}

impl Snapshot {
    pub fn is_complete(&self) -> bool {
        self.pending == 0
    }

    /// Size reduction over successful images, in percent.
    pub fn savings_percent(&self) -> f64 {
        if self.original_bytes == 0 {
            return 0.0;
        }
        self.bytes_saved as f64 / self.original_bytes as f64 * 100.0
    }
}

#[derive(Default)]
struct AggregateState {
    images: Vec<Image>,
    index: HashMap<PathBuf, usize>,
    successes: Vec<Success>,
    failures: Vec<ProcessError>,
    in_progress: usize,
    original_bytes: u64,
    webp_bytes: u64,
    started: Option<Instant>,
    finished: Option<Instant>,
    cancelled: bool,
}

impl AggregateState {
    fn slot(&mut self, full_path: &Path) -> Result<&mut Image> {
        let idx = *self.index.get(full_path).ok_or_else(|| {
            ConvertError::InvalidState(format!("Unknown image: {}", full_path.display()))
        })?;
        Ok(&mut self.images[idx])
    }

    fn insert(&mut self, image: Image) {
        let idx = self.images.len();
        self.index.insert(image.full_path.clone(), idx);
        self.images.push(image);
    }

    fn elapsed(&self) -> Duration {
        match (self.started, self.finished) {
            (Some(start), Some(end)) => end.duration_since(start),
            (Some(start), None) => start.elapsed(),
            _ => Duration::ZERO,
        }
    }
}

/// Owns the per-image records of a batch and the running totals.
#[derive(Default)]
pub struct ResultAggregator {
    state: Mutex<AggregateState>,
}

impl ResultAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start tracking `image`; it counts as pending until an outcome is recorded.
    pub fn register(&self, image: Image) -> Result<()> {
        let mut state = self.lock();
        if state.index.contains_key(&image.full_path) {
            return Err(ConvertError::AlreadyExists(image.full_path));
        }

        state.insert(image);
        Ok(())
    }

    /// `begin` for a job, registering its image first if it was never registered.
    pub fn claim(&self, image: &Image) -> Result<Image> {
        {
            let mut state = self.lock();
            if !state.index.contains_key(&image.full_path) {
                state.insert(image.clone());
            }
        }
        self.begin(&image.full_path)
    }

    /// Mark the image as held by a worker and return its updated record.
    pub fn begin(&self, full_path: &Path) -> Result<Image> {
        let mut state = self.lock();
        if state.started.is_none() {
            state.started = Some(Instant::now());
        }

        let image = state.slot(full_path)?;
        if image.status.is_terminal() || image.in_progress {
            return Err(ConvertError::InvalidState(format!(
                "Image already claimed: {}",
                full_path.display()
            )));
        }
        image.in_progress = true;
        let image = image.clone();

        state.in_progress += 1;
        Ok(image)
    }

    /// Apply the terminal outcome of one image and return its updated record.
    ///
    /// An image accepts exactly one outcome.
    pub fn record(&self, outcome: Outcome) -> Result<Image> {
        let mut state = self.lock();

        let image = state.slot(outcome.full_path())?;
        if image.status.is_terminal() {
            return Err(ConvertError::InvalidState(format!(
                "Outcome already recorded for {}",
                image.full_path.display()
            )));
        }

        let was_in_progress = image.in_progress;
        image.in_progress = false;
        match &outcome {
            Outcome::Success(success) => {
                image.status = Status::Success;
                image.webp_size = success.size;
            }
            Outcome::Error(error) => {
                image.status = Status::Error;
                image.error_message = error.error.clone();
            }
        }
        let image = image.clone();

        if was_in_progress {
            state.in_progress -= 1;
        }
        match outcome {
            Outcome::Success(success) => {
                state.original_bytes += image.original_size;
                state.webp_bytes += success.size;
                state.successes.push(success);
            }
            Outcome::Error(error) => state.failures.push(error),
        }

        Ok(image)
    }

    pub fn mark_cancelled(&self) {
        self.lock().cancelled = true;
    }

    /// Stop the batch clock.
    pub fn finish(&self) {
        let mut state = self.lock();
        if state.finished.is_none() {
            state.finished = Some(Instant::now());
        }
    }

    pub fn snapshot(&self) -> Snapshot {
        let state = self.lock();
        let total = state.images.len();
        let succeeded = state.successes.len();
        let failed = state.failures.len();

        Snapshot {
            total,
            succeeded,
            failed,
            pending: total - succeeded - failed,
            in_progress: state.in_progress,
            original_bytes: state.original_bytes,
            webp_bytes: state.webp_bytes,
            bytes_saved: state.original_bytes as i64 - state.webp_bytes as i64,
            elapsed_ms: state.elapsed().as_millis() as u64,
            cancelled: state.cancelled,
        }
    }

    /// Current records in submission order.
    pub fn images(&self) -> Vec<Image> {
        self.lock().images.clone()
    }

    pub fn image(&self, full_path: &Path) -> Option<Image> {
        let state = self.lock();
        state.index.get(full_path).map(|&idx| state.images[idx].clone())
    }

    /// Successes in completion order.
    pub fn successes(&self) -> Vec<Success> {
        self.lock().successes.clone()
    }

    /// Failures in completion order.
    pub fn failures(&self) -> Vec<ProcessError> {
        self.lock().failures.clone()
    }

    fn lock(&self) -> MutexGuard<'_, AggregateState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::ErrorKind;
    use std::sync::Arc;

    fn aggregator_with(names: &[(&str, u64)]) -> ResultAggregator {
        let aggregator = ResultAggregator::new();
        for (name, size) in names {
            aggregator.register(Image::new(name, *size)).unwrap();
        }
        aggregator
    }

    #[test]
    fn counts_always_sum_to_total() {
        let aggregator = aggregator_with(&[("a.png", 1000), ("b.jpg", 2000), ("c.gif", 10)]);

        let check = |aggregator: &ResultAggregator| {
            let snap = aggregator.snapshot();
            assert_eq!(snap.succeeded + snap.failed + snap.pending, snap.total);
        };

        check(&aggregator);
        aggregator.begin(Path::new("a.png")).unwrap();
        check(&aggregator);
        aggregator
            .record(Outcome::success(Path::new("a.png"), 400, Duration::ZERO))
            .unwrap();
        check(&aggregator);
        aggregator
            .record(Outcome::error(Path::new("c.gif"), "boom", Duration::ZERO))
            .unwrap();
        check(&aggregator);

        let snap = aggregator.snapshot();
        assert_eq!((snap.succeeded, snap.failed, snap.pending), (1, 1, 1));
        assert!(!snap.is_complete());
    }

    #[test]
    fn bytes_saved_only_counts_successes() {
        let aggregator = aggregator_with(&[("a.png", 1000), ("b.jpg", 2000), ("c.gif", 500)]);
        aggregator
            .record(Outcome::success(Path::new("a.png"), 300, Duration::ZERO))
            .unwrap();
        aggregator
            .record(Outcome::success(Path::new("b.jpg"), 700, Duration::ZERO))
            .unwrap();
        aggregator
            .record(Outcome::error(Path::new("c.gif"), "bad", Duration::ZERO))
            .unwrap();

        let snap = aggregator.snapshot();
        assert_eq!(snap.original_bytes, 3000);
        assert_eq!(snap.webp_bytes, 1000);
        assert_eq!(snap.bytes_saved, 2000);
        assert!(snap.is_complete());
    }

    #[test]
    fn status_never_moves_backwards() {
        let aggregator = aggregator_with(&[("a.png", 10)]);
        let image = aggregator.begin(Path::new("a.png")).unwrap();
        assert!(image.in_progress);
        assert_eq!(image.status, Status::Todo);

        let image = aggregator
            .record(Outcome::error(Path::new("a.png"), "decode", Duration::ZERO))
            .unwrap();
        assert_eq!(image.status, Status::Error);
        assert_eq!(image.error_message, "decode");
        assert!(!image.in_progress);

        let err = aggregator
            .record(Outcome::success(Path::new("a.png"), 5, Duration::ZERO))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidState);
        assert!(aggregator.begin(Path::new("a.png")).is_err());
        assert_eq!(aggregator.image(Path::new("a.png")).unwrap().status, Status::Error);
        assert!(aggregator.successes().is_empty());
        assert_eq!(aggregator.failures().len(), 1);
    }

    #[test]
    fn unknown_outcome_is_rejected() {
        let aggregator = aggregator_with(&[("a.png", 10)]);
        let err = aggregator
            .record(Outcome::success(Path::new("zzz.png"), 5, Duration::ZERO))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidState);
    }

    #[test]
    fn concurrent_records_are_not_lost() {
        let names: Vec<String> = (0..200).map(|i| format!("img{}.png", i)).collect();
        let aggregator = Arc::new(ResultAggregator::new());
        for name in &names {
            aggregator.register(Image::new(name, 100)).unwrap();
        }

        std::thread::scope(|scope| {
            for chunk in names.chunks(25) {
                let aggregator = Arc::clone(&aggregator);
                scope.spawn(move || {
                    for name in chunk {
                        aggregator.begin(Path::new(name)).unwrap();
                        aggregator
                            .record(Outcome::success(Path::new(name), 40, Duration::ZERO))
                            .unwrap();
                    }
                });
            }
        });

        let snap = aggregator.snapshot();
        assert_eq!(snap.succeeded, 200);
        assert_eq!(snap.in_progress, 0);
        assert_eq!(snap.bytes_saved, 200 * 60);
    }
}

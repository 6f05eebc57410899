// blazing-webp/src/engine/progress.rs
use super::Snapshot;
use crate::core::{Image, Status};
use crate::utils::format_file_size;
use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};
use indicatif::{ProgressBar, ProgressStyle};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Receives image records as they change state.
///
/// Called from worker threads, so implementations must return quickly and
/// never wait on the consumer.
pub trait ProgressReporter: Send + Sync {
    /// Called when an image is claimed by a worker and when it reaches a
    /// terminal status.
    fn on_update(&self, image: &Image);

    /// Called once when a run returns.
    fn on_finish(&self, _snapshot: &Snapshot) {}
}

#[derive(Debug, Clone)]
pub enum ProgressEvent {
    Updated(Image),
    Finished(Snapshot),
}

/// Forwards events over a bounded channel, dropping them when it is full.
pub struct ChannelReporter {
    sender: Sender<ProgressEvent>,
    dropped: AtomicUsize,
}

impl ChannelReporter {
    pub fn bounded(capacity: usize) -> (Self, Receiver<ProgressEvent>) {
        let (sender, receiver) = bounded(capacity);
        let reporter = Self {
            sender,
            dropped: AtomicUsize::new(0),
        };
        (reporter, receiver)
    }

    /// Events discarded because the receiver fell behind.
    pub fn dropped(&self) -> usize {
        self.dropped.load(Ordering::Relaxed)
    }

    fn send(&self, event: ProgressEvent) {
        match self.sender.try_send(event) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
                log::debug!("Progress channel full, dropping update");
            }
            Err(TrySendError::Disconnected(_)) => {}
        }
    }
}

impl ProgressReporter for ChannelReporter {
    fn on_update(&self, image: &Image) {
        self.send(ProgressEvent::Updated(image.clone()));
    }

    fn on_finish(&self, snapshot: &Snapshot) {
        self.send(ProgressEvent::Finished(snapshot.clone()));
    }
}

/// Writes every transition to the `log` facade.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogReporter;

impl ProgressReporter for LogReporter {
    fn on_update(&self, image: &Image) {
        match image.status {
            Status::Todo if image.in_progress => {
                log::debug!("Converting {}", image.full_path.display());
            }
            Status::Todo => {}
            Status::Success => log::info!(
                "Converted {} ({} -> {})",
                image.full_path.display(),
                format_file_size(image.original_size),
                format_file_size(image.webp_size)
            ),
            Status::Error => log::warn!(
                "Failed {}: {}",
                image.full_path.display(),
                image.error_message
            ),
        }
    }

    fn on_finish(&self, snapshot: &Snapshot) {
        log::info!(
            "Batch finished: {} converted, {} failed, {} not started, {} saved in {} ms",
            snapshot.succeeded,
            snapshot.failed,
            snapshot.pending,
            format_file_size(snapshot.bytes_saved.max(0) as u64),
            snapshot.elapsed_ms
        );
    }
}

/// Terminal progress bar for the command-line front-end.
pub struct ProgressBarReporter {
    bar: ProgressBar,
}

impl ProgressBarReporter {
    pub fn new(total: usize) -> Self {
        let bar = ProgressBar::new(total as u64);
        let style = ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta}) {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("#>-");
        bar.set_style(style);
        Self { bar }
    }

    pub fn with_bar(bar: ProgressBar) -> Self {
        Self { bar }
    }

    pub fn bar(&self) -> &ProgressBar {
        &self.bar
    }
}

impl ProgressReporter for ProgressBarReporter {
    fn on_update(&self, image: &Image) {
        if image.status.is_terminal() {
            self.bar.inc(1);
        }
        self.bar.set_message(image.filename.clone());
    }

    fn on_finish(&self, snapshot: &Snapshot) {
        let message = if snapshot.cancelled {
            format!(
                "Cancelled after {} images ({} not started)",
                snapshot.succeeded + snapshot.failed,
                snapshot.pending
            )
        } else {
            format!(
                "Converted {} images ({:.1}% size reduction)",
                snapshot.succeeded,
                snapshot.savings_percent().clamp(0.0, 100.0)
            )
        };
        self.bar.finish_with_message(message);
    }
}

/// Adapts a closure into a reporter.
pub struct FnReporter<F>(pub F);

impl<F> ProgressReporter for FnReporter<F>
where
    F: Fn(&Image) + Send + Sync,
{
    fn on_update(&self, image: &Image) {
        (self.0)(image)
    }
}

/// Fans every event out to a list of reporters, in order.
#[derive(Default, Clone)]
pub struct Reporters {
    reporters: Vec<Arc<dyn ProgressReporter>>,
}

impl Reporters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, reporter: Arc<dyn ProgressReporter>) -> Self {
        self.reporters.push(reporter);
        self
    }

    pub fn push(&mut self, reporter: Arc<dyn ProgressReporter>) {
        self.reporters.push(reporter);
    }

    pub fn is_empty(&self) -> bool {
        self.reporters.is_empty()
    }

    pub fn len(&self) -> usize {
        self.reporters.len()
    }
}

impl ProgressReporter for Reporters {
    fn on_update(&self, image: &Image) {
        for reporter in &self.reporters {
            reporter.on_update(image);
        }
    }

    fn on_finish(&self, snapshot: &Snapshot) {
        for reporter in &self.reporters {
            reporter.on_finish(snapshot);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[test]
    fn channel_reporter_never_blocks_when_full() {
        let (reporter, receiver) = ChannelReporter::bounded(2);
        let image = Image::new("a.png", 1);

        for _ in 0..5 {
            reporter.on_update(&image);
        }

        assert_eq!(receiver.len(), 2);
        assert_eq!(reporter.dropped(), 3);
    }

    #[test]
    fn channel_reporter_ignores_disconnected_receiver() {
        let (reporter, receiver) = ChannelReporter::bounded(1);
        drop(receiver);
        reporter.on_update(&Image::new("a.png", 1));
        assert_eq!(reporter.dropped(), 0);
    }

    #[test]
    fn fan_out_reaches_every_reporter() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let first = Arc::clone(&seen);
        let second = Arc::clone(&seen);

        let reporters = Reporters::new()
            .with(Arc::new(FnReporter(move |image: &Image| {
                first.lock().unwrap().push(format!("1:{}", image.filename))
            })))
            .with(Arc::new(FnReporter(move |image: &Image| {
                second.lock().unwrap().push(format!("2:{}", image.filename))
            })));

        reporters.on_update(&Image::new("x.png", 1));
        assert_eq!(*seen.lock().unwrap(), vec!["1:x.png", "2:x.png"]);
        assert_eq!(reporters.len(), 2);
    }

    #[test]
    fn progress_bar_counts_terminal_updates() {
        let reporter = ProgressBarReporter::with_bar(ProgressBar::hidden());
        let mut image = Image::new("a.png", 10);

        image.in_progress = true;
        reporter.on_update(&image);
        assert_eq!(reporter.bar().position(), 0);

        image.in_progress = false;
        image.status = Status::Success;
        reporter.on_update(&image);
        assert_eq!(reporter.bar().position(), 1);
    }
}

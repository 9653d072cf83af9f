//! Progress tracking for batch validation.

use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

/// A progress update event.
#[derive(Debug, Clone)]
pub enum ProgressUpdate {
    /// The batch has started.
    Started {
        total_files: usize,
    },
    /// A file has started loading.
    FileStarted {
        path: PathBuf,
        index: usize,
        total: usize,
    },
    /// A file has been validated or has failed to load.
    FileCompleted {
        path: PathBuf,
        duration_ms: u64,
        index: usize,
        total: usize,
    },
    /// A file was skipped because the batch was cancelled.
    FileSkipped {
        path: PathBuf,
    },
    /// Overall progress percentage.
    Progress {
        percent: f32,
        elapsed_ms: u64,
        estimated_remaining_ms: Option<u64>,
    },
    /// The batch was cancelled.
    Cancelled,
    /// The batch has completed.
    Completed {
        total_duration_ms: u64,
        files_processed: usize,
        files_skipped: usize,
    },
}

/// Callback type for progress updates.
pub type ProgressCallback = Box<dyn Fn(ProgressUpdate) + Send + Sync>;

/// Tracks batch progress. Shared by reference across worker threads.
pub struct ProgressTracker {
    /// Total number of files in the batch.
    total_files: usize,
    /// Number of files completed.
    completed_files: AtomicU64,
    /// Number of files skipped.
    skipped_files: AtomicU64,
    /// Start time.
    start_time: Instant,
    /// Progress callback.
    callback: Option<Arc<ProgressCallback>>,
    /// Per-file durations for estimation.
    file_times: parking_lot::Mutex<Vec<u64>>,
}

impl ProgressTracker {
    /// Create a new progress tracker. The clock starts now.
    pub fn new(total_files: usize) -> Self {
        Self {
            total_files,
            completed_files: AtomicU64::new(0),
            skipped_files: AtomicU64::new(0),
            start_time: Instant::now(),
            callback: None,
            file_times: parking_lot::Mutex::new(Vec::new()),
        }
    }

    /// Set a callback for progress updates.
    pub fn with_callback(mut self, callback: Option<Arc<ProgressCallback>>) -> Self {
        self.callback = callback;
        self
    }

    /// Announce the start of the batch.
    pub fn start(&self) {
        self.send_update(ProgressUpdate::Started {
            total_files: self.total_files,
        });
    }

    /// Report that a file has started.
    pub fn file_started(&self, path: PathBuf, index: usize) {
        self.send_update(ProgressUpdate::FileStarted {
            path,
            index,
            total: self.total_files,
        });
    }

    /// Report that a file has completed.
    pub fn file_completed(&self, path: PathBuf, duration_ms: u64) {
        let completed = self.completed_files.fetch_add(1, Ordering::Relaxed) as usize + 1;
        self.file_times.lock().push(duration_ms);

        self.send_update(ProgressUpdate::FileCompleted {
            path,
            duration_ms,
            index: completed,
            total: self.total_files,
        });
        self.send_progress_update();
    }

    /// Report that a file was skipped.
    pub fn file_skipped(&self, path: PathBuf) {
        self.skipped_files.fetch_add(1, Ordering::Relaxed);
        self.send_update(ProgressUpdate::FileSkipped { path });
    }

    /// Announce cancellation.
    pub fn cancelled(&self) {
        self.send_update(ProgressUpdate::Cancelled);
    }

    /// Announce the end of the batch.
    pub fn complete(&self) {
        self.send_update(ProgressUpdate::Completed {
            total_duration_ms: self.elapsed_ms(),
            files_processed: self.completed_files.load(Ordering::Relaxed) as usize,
            files_skipped: self.skipped_files.load(Ordering::Relaxed) as usize,
        });
    }

    /// Get current progress percentage.
    pub fn progress_percent(&self) -> f32 {
        if self.total_files == 0 {
            return 100.0;
        }
        let completed = self.completed_files.load(Ordering::Relaxed);
        let skipped = self.skipped_files.load(Ordering::Relaxed);
        ((completed + skipped) as f32 / self.total_files as f32) * 100.0
    }

    /// Estimate remaining time in milliseconds.
    pub fn estimated_remaining_ms(&self) -> Option<u64> {
        let times = self.file_times.lock();
        if times.is_empty() {
            return None;
        }

        let avg_time: u64 = times.iter().sum::<u64>() / times.len() as u64;
        let done = (self.completed_files.load(Ordering::Relaxed)
            + self.skipped_files.load(Ordering::Relaxed)) as usize;
        let remaining = self.total_files.saturating_sub(done);

        Some(avg_time * remaining as u64)
    }

    fn elapsed_ms(&self) -> u64 {
        self.start_time.elapsed().as_millis() as u64
    }

    fn send_update(&self, update: ProgressUpdate) {
        if let Some(ref callback) = self.callback {
            callback(update);
        }
    }

    fn send_progress_update(&self) {
        self.send_update(ProgressUpdate::Progress {
            percent: self.progress_percent(),
            elapsed_ms: self.elapsed_ms(),
            estimated_remaining_ms: self.estimated_remaining_ms(),
        });
    }
}

impl Default for ProgressTracker {
    fn default() -> Self {
        Self::new(0)
    }
}

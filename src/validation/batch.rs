//! File and batch entry points.
//!
//! These wrap the engine with I/O and parsing. A file that cannot be read or
//! parsed yields a [`FileError`] for that file only; the rest of a batch
//! carries on.

use crate::core::error::{FileError, ValidationResult};
use crate::core::value::ConfigValue;
use crate::input::normalize::{normalize, NormalizeOptions};
use crate::input::parse::{parse_str, Format};
use crate::input::substitute::{substitute, Environment};
use crate::schema::RuleSet;
use crate::validation::engine::ValidationEngine;
use crate::validation::progress::{ProgressCallback, ProgressTracker, ProgressUpdate};
use log::{debug, info, warn};
use rayon::prelude::*;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

// ============================================================================
// Options
// ============================================================================

/// How a single file is turned into a value before validation.
#[derive(Debug, Clone, Default)]
pub struct FileOptions {
    /// Input format; inferred from the extension, then from content, when unset.
    pub format: Option<Format>,
    /// Substitute `${NAME}` references against this environment.
    pub environment: Option<Environment>,
    /// Coerce values before validation.
    pub normalize: Option<NormalizeOptions>,
    /// Fill in rule-set defaults before validation.
    pub apply_defaults: bool,
    /// Reject files larger than this many bytes before reading them.
    pub max_file_size: Option<u64>,
}

impl FileOptions {
    /// Create a new options builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Force an input format.
    pub fn with_format(mut self, format: Format) -> Self {
        self.format = Some(format);
        self
    }

    /// Enable environment substitution.
    pub fn with_environment(mut self, environment: Environment) -> Self {
        self.environment = Some(environment);
        self
    }

    /// Enable normalization.
    pub fn with_normalize(mut self, options: NormalizeOptions) -> Self {
        self.normalize = Some(options);
        self
    }

    /// Enable/disable default filling.
    pub fn with_defaults(mut self, apply: bool) -> Self {
        self.apply_defaults = apply;
        self
    }

    /// Set the size limit in bytes.
    pub fn with_max_file_size(mut self, limit: u64) -> Self {
        self.max_file_size = Some(limit);
        self
    }
}

/// Shared flag that stops the remaining files of a batch.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    /// Create a token that is not cancelled.
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation. Files already running finish normally.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Relaxed);
    }

    /// Whether cancellation was requested.
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Relaxed)
    }
}

/// Batch options.
#[derive(Clone)]
pub struct BatchOptions {
    /// Per-file options.
    pub file: FileOptions,
    /// Whether to validate files in parallel.
    pub parallel: bool,
    /// Maximum number of worker threads (0 = rayon's default).
    pub threads: usize,
    /// Cancellation flag checked before each file.
    pub cancel: CancellationToken,
    /// Progress callback.
    pub progress_callback: Option<Arc<ProgressCallback>>,
}

impl std::fmt::Debug for BatchOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BatchOptions")
            .field("file", &self.file)
            .field("parallel", &self.parallel)
            .field("threads", &self.threads)
            .field("cancel", &self.cancel)
            .field("progress_callback", &self.progress_callback.as_ref().map(|_| "<callback>"))
            .finish()
    }
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self {
            file: FileOptions::default(),
            parallel: true,
            threads: 0,
            cancel: CancellationToken::new(),
            progress_callback: None,
        }
    }
}

impl BatchOptions {
    /// Create a new options builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set per-file options.
    pub fn with_file_options(mut self, file: FileOptions) -> Self {
        self.file = file;
        self
    }

    /// Enable/disable parallel validation.
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Set maximum threads.
    pub fn with_threads(mut self, threads: usize) -> Self {
        self.threads = threads;
        self
    }

    /// Use an existing cancellation token.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    /// Set progress callback.
    pub fn with_progress<F>(mut self, callback: F) -> Self
    where
        F: Fn(ProgressUpdate) + Send + Sync + 'static,
    {
        self.progress_callback = Some(Arc::new(Box::new(callback)));
        self
    }
}

// ============================================================================
// Outcomes
// ============================================================================

/// What happened to one file of a batch.
#[derive(Debug)]
pub enum FileOutcome {
    /// The file was parsed and validated.
    Validated(ValidationResult),
    /// The file could not be read, parsed or substituted.
    Failed(FileError),
    /// The batch was cancelled before this file started.
    Skipped,
}

/// Coarse status of a file, used for summaries and exit codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FileStatus {
    /// Validated with no errors
    Valid,
    /// Validated with at least one error
    Invalid,
    /// Not validated because loading failed
    Failed,
    /// Not validated because the batch was cancelled
    Skipped,
}

impl FileStatus {
    /// Lower-case name.
    pub fn name(&self) -> &'static str {
        match self {
            FileStatus::Valid => "valid",
            FileStatus::Invalid => "invalid",
            FileStatus::Failed => "failed",
            FileStatus::Skipped => "skipped",
        }
    }
}

impl std::fmt::Display for FileStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// The outcome for one input path.
#[derive(Debug)]
pub struct FileReport {
    /// Path as given
    pub path: PathBuf,
    /// What happened
    pub outcome: FileOutcome,
}

impl FileReport {
    /// Coarse status.
    pub fn status(&self) -> FileStatus {
        match &self.outcome {
            FileOutcome::Validated(result) if result.is_valid() => FileStatus::Valid,
            FileOutcome::Validated(_) => FileStatus::Invalid,
            FileOutcome::Failed(_) => FileStatus::Failed,
            FileOutcome::Skipped => FileStatus::Skipped,
        }
    }

    /// Whether the file was validated and has no errors.
    pub fn is_valid(&self) -> bool {
        self.status() == FileStatus::Valid
    }

    /// The validation result, if the file was validated.
    pub fn result(&self) -> Option<&ValidationResult> {
        match &self.outcome {
            FileOutcome::Validated(result) => Some(result),
            _ => None,
        }
    }

    /// The load failure, if any.
    pub fn failure(&self) -> Option<&FileError> {
        match &self.outcome {
            FileOutcome::Failed(error) => Some(error),
            _ => None,
        }
    }
}

// ============================================================================
// Loading
// ============================================================================

/// Read, parse, substitute and normalize one file.
///
/// Defaults are not applied here because they belong to a rule set; see
/// [`ValidationEngine::validate_file`].
pub fn load_file(path: &Path, options: &FileOptions) -> Result<ConfigValue, FileError> {
    if let Some(limit) = options.max_file_size {
        let size = fs::metadata(path)
            .map_err(|e| FileError::from_io(path, e))?
            .len();
        if size > limit {
            return Err(FileError::TooLarge {
                path: path.to_path_buf(),
                size,
                limit,
            });
        }
    }

    let text = fs::read_to_string(path).map_err(|e| FileError::from_io(path, e))?;
    let format = options
        .format
        .or_else(|| Format::from_path(path))
        .unwrap_or_else(|| Format::detect(&text));

    let mut value = parse_str(&text, format).map_err(|source| FileError::Parse {
        path: path.to_path_buf(),
        source,
    })?;

    if let Some(env) = &options.environment {
        value = substitute(&value, env).map_err(|source| FileError::Substitution {
            path: path.to_path_buf(),
            source,
        })?;
    }
    if let Some(normalize_options) = &options.normalize {
        value = normalize(&value, normalize_options);
    }

    debug!("Loaded {} as {}", path.display(), format);
    Ok(value)
}

// ============================================================================
// Engine entry points
// ============================================================================

impl ValidationEngine {
    /// Load and validate one file.
    pub fn validate_file(
        &self,
        path: &Path,
        rules: &RuleSet,
        options: &FileOptions,
    ) -> Result<ValidationResult, FileError> {
        let value = load_file(path, options)?;
        let value = if options.apply_defaults {
            rules.apply_defaults(&value)
        } else {
            value
        };
        Ok(self.validate(&value, rules))
    }

    /// Validate many files, one report per path in input order.
    ///
    /// A failing file never stops the others. When the cancellation token is
    /// set, files that have not started yet are reported as skipped.
    pub fn validate_files<P>(&self, paths: &[P], rules: &RuleSet, options: &BatchOptions) -> Vec<FileReport>
    where
        P: AsRef<Path> + Sync,
    {
        let start = Instant::now();
        let tracker = ProgressTracker::new(paths.len()).with_callback(options.progress_callback.clone());
        tracker.start();

        let run_one = |(index, path): (usize, &P)| self.run_one(path.as_ref(), index, rules, options, &tracker);

        let reports: Vec<FileReport> = if options.parallel && paths.len() > 1 {
            let pool = dedicated_pool(options.threads);
            let work = || -> Vec<FileReport> { paths.par_iter().enumerate().map(run_one).collect() };
            match pool {
                Some(pool) => pool.install(work),
                None => work(),
            }
        } else {
            paths.iter().enumerate().map(run_one).collect()
        };

        if options.cancel.is_cancelled() {
            tracker.cancelled();
        }
        tracker.complete();

        let failed = reports.iter().filter(|r| r.status() == FileStatus::Failed).count();
        let invalid = reports.iter().filter(|r| r.status() == FileStatus::Invalid).count();
        info!(
            "Validated {} file(s) in {:?}: {} invalid, {} failed to load",
            reports.len(),
            start.elapsed(),
            invalid,
            failed
        );
        reports
    }

    fn run_one(
        &self,
        path: &Path,
        index: usize,
        rules: &RuleSet,
        options: &BatchOptions,
        tracker: &ProgressTracker,
    ) -> FileReport {
        if options.cancel.is_cancelled() {
            tracker.file_skipped(path.to_path_buf());
            return FileReport {
                path: path.to_path_buf(),
                outcome: FileOutcome::Skipped,
            };
        }

        tracker.file_started(path.to_path_buf(), index);
        let file_start = Instant::now();
        let outcome = match self.validate_file(path, rules, &options.file) {
            Ok(result) => FileOutcome::Validated(result),
            Err(e) => {
                warn!("{}", e);
                FileOutcome::Failed(e)
            }
        };
        tracker.file_completed(path.to_path_buf(), file_start.elapsed().as_millis() as u64);

        FileReport {
            path: path.to_path_buf(),
            outcome,
        }
    }
}

/// Load and validate one file with the default engine.
pub fn validate_file(path: &Path, rules: &RuleSet, options: &FileOptions) -> Result<ValidationResult, FileError> {
    ValidationEngine::default_engine().validate_file(path, rules, options)
}

/// Validate many files with the default engine.
pub fn validate_files<P>(paths: &[P], rules: &RuleSet, options: &BatchOptions) -> Vec<FileReport>
where
    P: AsRef<Path> + Sync,
{
    ValidationEngine::default_engine().validate_files(paths, rules, options)
}

/// A pool of `threads` workers, or `None` to use rayon's global pool.
fn dedicated_pool(threads: usize) -> Option<rayon::ThreadPool> {
    if threads == 0 {
        return None;
    }
    match rayon::ThreadPoolBuilder::new().num_threads(threads).build() {
        Ok(pool) => Some(pool),
        Err(e) => {
            warn!("Falling back to the global thread pool: {}", e);
            None
        }
    }
}

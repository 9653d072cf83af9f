//! `confguard.toml` settings.
//!
//! Every field is optional. Command-line flags override what is read here.
//!
//! ```toml
//! preset = "terraform"
//! strict = true
//! format = "json"
//! exclude = ["**/.terraform/**"]
//! ```

use crate::core::error::{ConfguardError, ConfguardResult, FileError};
use crate::input::discover::discover;
use crate::input::normalize::NormalizeOptions;
use crate::input::substitute::Environment;
use crate::presets;
use crate::report::OutputFormat;
use crate::schema::{load_schema_file, RuleSet};
use crate::validation::batch::{BatchOptions, FileOptions};
use log::debug;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Settings file looked up in the working directory.
pub const DEFAULT_FILE: &str = "confguard.toml";

/// Options shared by the command line and the settings file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    /// Report unknown fields as errors
    pub strict: bool,
    /// Report format
    pub format: OutputFormat,
    /// Built-in rule set name
    pub preset: Option<String>,
    /// JSON-Schema file (JSON or YAML)
    pub schema: Option<PathBuf>,
    /// `.env` file for substitution
    pub env_file: Option<PathBuf>,
    /// Substitute `${NAME}` from the process environment
    pub substitute_env: bool,
    /// Coerce strings before validation
    pub normalize: bool,
    /// Fill in rule-set defaults before validation
    pub apply_defaults: bool,
    /// Size limit in bytes
    pub max_file_size: Option<u64>,
    /// Glob patterns removed from discovered files
    pub exclude: Vec<String>,
    /// Worker threads (0 = one per core)
    pub threads: usize,
}

impl Settings {
    /// Read a settings file.
    pub fn load(path: &Path) -> ConfguardResult<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| FileError::from_io(path, e))?;
        let settings: Settings = toml::from_str(&text)?;
        debug!("Loaded settings from {}", path.display());
        Ok(settings)
    }

    /// Read `explicit` if given, otherwise [`DEFAULT_FILE`] in `dir` if it
    /// exists, otherwise defaults.
    pub fn discover(explicit: Option<&Path>, dir: &Path) -> ConfguardResult<Self> {
        if let Some(path) = explicit {
            return Self::load(path);
        }
        let fallback = dir.join(DEFAULT_FILE);
        if fallback.is_file() {
            Self::load(&fallback)
        } else {
            Ok(Self::default())
        }
    }

    /// Resolve the rule set: a schema file, a preset, or (with neither) a
    /// syntax-only rule set that accepts any document.
    pub fn rules(&self) -> ConfguardResult<RuleSet> {
        match (&self.schema, &self.preset) {
            (Some(_), Some(_)) => Err(ConfguardError::Other(
                "use either a preset or a schema, not both".to_string(),
            )),
            (Some(schema), None) => Ok(load_schema_file(schema, self.strict)?),
            (None, Some(name)) => Ok(presets::by_name(name, self.strict)?),
            (None, None) => Ok(RuleSet::builder().open("").build()?),
        }
    }

    /// Per-file options implied by these settings.
    pub fn file_options(&self) -> ConfguardResult<FileOptions> {
        let mut options = FileOptions::new().with_defaults(self.apply_defaults);

        let mut environment = None;
        if self.substitute_env {
            environment = Some(Environment::from_process());
        }
        if let Some(path) = &self.env_file {
            let from_file = Environment::from_env_file(path)?;
            environment = Some(environment.unwrap_or_default().merged(from_file));
        }
        if let Some(env) = environment {
            options = options.with_environment(env);
        }

        if self.normalize {
            options = options.with_normalize(NormalizeOptions::default());
        }
        if let Some(limit) = self.max_file_size {
            options = options.with_max_file_size(limit);
        }
        Ok(options)
    }

    /// Batch options implied by these settings.
    pub fn batch_options(&self) -> ConfguardResult<BatchOptions> {
        Ok(BatchOptions::new()
            .with_file_options(self.file_options()?)
            .with_threads(self.threads))
    }

    /// Expand targets, dropping excluded paths.
    pub fn discover_files<S: AsRef<str>>(&self, targets: &[S]) -> ConfguardResult<Vec<PathBuf>> {
        let targets: Vec<&str> = targets.iter().map(AsRef::as_ref).collect();
        let exclude: Vec<&str> = self.exclude.iter().map(String::as_str).collect();
        discover(&targets, &exclude)
    }
}

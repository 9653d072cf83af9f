//! Expand command-line targets into a list of configuration files.

use crate::core::error::ConfguardError;
use crate::input::parse::Format;
use indexmap::IndexSet;
use log::{debug, warn};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Characters that make a target a glob pattern.
const GLOB_CHARS: [char; 3] = ['*', '?', '['];

/// Expand `targets` into file paths.
///
/// - Plain paths are kept as given, even when missing, so the caller reports
///   them as not found.
/// - Directories are walked recursively (hidden entries skipped) for files
///   with a JSON or YAML extension, in file-name order.
/// - Targets containing `*`, `?` or `[` are expanded with `glob`.
///
/// Paths matching any `exclude` pattern are dropped. The result keeps first
/// occurrence order and has no duplicates.
pub fn discover<S: AsRef<str>>(targets: &[S], exclude: &[S]) -> Result<Vec<PathBuf>, ConfguardError> {
    let exclude = exclude
        .iter()
        .map(|pattern| glob::Pattern::new(pattern.as_ref()))
        .collect::<Result<Vec<_>, _>>()?;

    let mut found: IndexSet<PathBuf> = IndexSet::new();
    for target in targets {
        let target = target.as_ref();
        if target.contains(&GLOB_CHARS[..]) {
            expand_glob(target, &mut found)?;
        } else {
            let path = PathBuf::from(target);
            if path.is_dir() {
                walk_dir(&path, &mut found);
            } else {
                found.insert(path);
            }
        }
    }

    let files: Vec<PathBuf> = found
        .into_iter()
        .filter(|path| !exclude.iter().any(|pattern| pattern.matches_path(path)))
        .collect();
    debug!("Discovered {} file(s) from {} target(s)", files.len(), targets.len());
    Ok(files)
}

/// Whether a path has a configuration-file extension.
pub fn is_config_file(path: &Path) -> bool {
    Format::from_path(path).is_some()
}

fn expand_glob(pattern: &str, found: &mut IndexSet<PathBuf>) -> Result<(), ConfguardError> {
    for entry in glob::glob(pattern)? {
        match entry {
            Ok(path) if path.is_dir() => walk_dir(&path, found),
            Ok(path) => {
                found.insert(path);
            }
            Err(e) => warn!("Skipping unreadable glob match: {}", e),
        }
    }
    Ok(())
}

fn walk_dir(root: &Path, found: &mut IndexSet<PathBuf>) {
    let walker = WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| entry.depth() == 0 || !is_hidden(entry.file_name()));

    for entry in walker {
        match entry {
            Ok(entry) if entry.file_type().is_file() && is_config_file(entry.path()) => {
                found.insert(entry.into_path());
            }
            Ok(_) => {}
            Err(e) => warn!("Skipping unreadable entry under {}: {}", root.display(), e),
        }
    }
}

fn is_hidden(name: &std::ffi::OsStr) -> bool {
    name.to_str().is_some_and(|s| s.starts_with('.'))
}

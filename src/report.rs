//! Report rendering and exit-code policy.

use crate::core::error::{ValidationError, ValidationResult};
use crate::validation::batch::{FileReport, FileStatus};
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;
use std::path::Path;
use std::str::FromStr;

/// Exit code when every file validated and is valid.
pub const EXIT_OK: i32 = 0;
/// Exit code when any file is invalid or failed to load.
pub const EXIT_INVALID: i32 = 1;
/// Exit code for usage and setup errors.
pub const EXIT_USAGE: i32 = 2;

/// Report format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Human-readable text
    #[default]
    Human,
    /// Machine-readable JSON
    Json,
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "human" | "text" => Ok(OutputFormat::Human),
            "json" => Ok(OutputFormat::Json),
            other => Err(format!("unknown report format '{}' (expected human or json)", other)),
        }
    }
}

/// Per-status file counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Summary {
    /// Number of files
    pub total: usize,
    /// Validated with no errors
    pub valid: usize,
    /// Validated with errors
    pub invalid: usize,
    /// Failed to load
    pub failed: usize,
    /// Skipped after cancellation
    pub skipped: usize,
}

impl Summary {
    /// Count the reports by status.
    pub fn from_reports(reports: &[FileReport]) -> Self {
        let mut summary = Summary {
            total: reports.len(),
            ..Summary::default()
        };
        for report in reports {
            match report.status() {
                FileStatus::Valid => summary.valid += 1,
                FileStatus::Invalid => summary.invalid += 1,
                FileStatus::Failed => summary.failed += 1,
                FileStatus::Skipped => summary.skipped += 1,
            }
        }
        summary
    }
}

/// Exit code for a finished batch: 0 when every file validated and is valid,
/// 1 otherwise. A batch with no files is treated as valid.
pub fn exit_code(reports: &[FileReport]) -> i32 {
    if reports.iter().all(FileReport::is_valid) {
        EXIT_OK
    } else {
        EXIT_INVALID
    }
}

/// Render reports in the requested format.
pub fn render(reports: &[FileReport], format: OutputFormat) -> Result<String, serde_json::Error> {
    match format {
        OutputFormat::Human => Ok(render_human(reports)),
        OutputFormat::Json => render_json(reports),
    }
}

// ============================================================================
// Human
// ============================================================================

/// Render a plain-text report: one status line per file, numbered errors with
/// suggestions, warnings, then a summary line.
pub fn render_human(reports: &[FileReport]) -> String {
    let mut out = String::new();

    for report in reports {
        let path = report.path.display();
        match report.status() {
            FileStatus::Valid => {
                let _ = writeln!(out, "✓ {}", path);
            }
            FileStatus::Invalid => {
                let errors = report.result().map_or(0, |r| r.errors.len());
                let _ = writeln!(out, "✗ {}: {} error(s)", path, errors);
            }
            FileStatus::Failed => {
                let reason = report
                    .failure()
                    .map(|e| e.to_string())
                    .unwrap_or_default();
                let _ = writeln!(out, "! {}", reason);
            }
            FileStatus::Skipped => {
                let _ = writeln!(out, "- {}: skipped", path);
            }
        }

        if let Some(result) = report.result() {
            write_findings(&mut out, result);
        }
    }

    let summary = Summary::from_reports(reports);
    let _ = write!(
        out,
        "\n{} file(s): {} valid, {} invalid, {} failed",
        summary.total, summary.valid, summary.invalid, summary.failed
    );
    if summary.skipped > 0 {
        let _ = write!(out, ", {} skipped", summary.skipped);
    }
    out.push('\n');
    out
}

fn write_findings(out: &mut String, result: &ValidationResult) {
    for line in result.detailed_errors() {
        for part in line.lines() {
            let _ = writeln!(out, "  {}", part);
        }
    }
    for warning in &result.warnings {
        let _ = writeln!(out, "  warning: [{}] {}", warning.kind, warning);
    }
}

// ============================================================================
// JSON
// ============================================================================

#[derive(Serialize)]
struct JsonReport<'a> {
    files: Vec<JsonFile<'a>>,
    summary: Summary,
}

#[derive(Serialize)]
struct JsonFile<'a> {
    path: &'a Path,
    status: FileStatus,
    is_valid: bool,
    errors: &'a [ValidationError],
    warnings: &'a [ValidationError],
    failure: Option<JsonFailure>,
}

#[derive(Serialize)]
struct JsonFailure {
    kind: &'static str,
    message: String,
}

/// Render a JSON report:
/// `{ files: [{ path, status, is_valid, errors, warnings, failure }], summary }`.
pub fn render_json(reports: &[FileReport]) -> Result<String, serde_json::Error> {
    let files = reports
        .iter()
        .map(|report| {
            let (errors, warnings) = match report.result() {
                Some(result) => (result.errors.as_slice(), result.warnings.as_slice()),
                None => (&[][..], &[][..]),
            };
            JsonFile {
                path: &report.path,
                status: report.status(),
                is_valid: report.is_valid(),
                errors,
                warnings,
                failure: report.failure().map(|e| JsonFailure {
                    kind: e.kind_name(),
                    message: e.to_string(),
                }),
            }
        })
        .collect();

    serde_json::to_string_pretty(&JsonReport {
        files,
        summary: Summary::from_reports(reports),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::error::{ErrorKind, FileError, ParseError};
    use crate::core::path::FieldPath;
    use crate::validation::batch::FileOutcome;
    use std::path::PathBuf;

    fn reports() -> Vec<FileReport> {
        let mut invalid = ValidationResult::new();
        invalid.add_error(ValidationError::new(
            FieldPath::parse("database.port").unwrap(),
            ErrorKind::MissingRequiredField,
            "missing required field",
        ));
        invalid.add_warning(ValidationError::new(
            FieldPath::parse("extra").unwrap(),
            ErrorKind::UnknownField,
            "unknown field 'extra'",
        ));

        vec![
            FileReport {
                path: PathBuf::from("a.json"),
                outcome: FileOutcome::Validated(ValidationResult::new()),
            },
            FileReport {
                path: PathBuf::from("b.json"),
                outcome: FileOutcome::Validated(invalid),
            },
            FileReport {
                path: PathBuf::from("c.json"),
                outcome: FileOutcome::Failed(FileError::Parse {
                    path: PathBuf::from("c.json"),
                    source: ParseError::new("JSON", "EOF while parsing an object").at(3, 1),
                }),
            },
            FileReport {
                path: PathBuf::from("d.json"),
                outcome: FileOutcome::Skipped,
            },
        ]
    }

    #[test]
    fn test_summary_and_exit_code() {
        let reports = reports();
        let summary = Summary::from_reports(&reports);
        assert_eq!(
            summary,
            Summary {
                total: 4,
                valid: 1,
                invalid: 1,
                failed: 1,
                skipped: 1
            }
        );
        assert_eq!(exit_code(&reports), EXIT_INVALID);
        assert_eq!(exit_code(&reports[..1]), EXIT_OK);
        assert_eq!(exit_code(&[]), EXIT_OK);
    }

    #[test]
    fn test_human_report() {
        let text = render_human(&reports());
        assert!(text.contains("✓ a.json"));
        assert!(text.contains("✗ b.json: 1 error(s)"));
        assert!(text.contains("1. [missing_required_field] database.port: missing required field"));
        assert!(text.contains("→ Suggestion: Add a value for 'database.port'"));
        assert!(text.contains("warning: [unknown_field] extra"));
        assert!(text.contains("! c.json: invalid JSON at line 3, column 1"));
        assert!(text.contains("- d.json: skipped"));
        assert!(text.trim_end().ends_with("4 file(s): 1 valid, 1 invalid, 1 failed, 1 skipped"));
    }

    #[test]
    fn test_json_report() {
        let json: serde_json::Value = serde_json::from_str(&render_json(&reports()).unwrap()).unwrap();
        assert_eq!(json["summary"]["total"], 4);
        assert_eq!(json["files"][0]["status"], "valid");
        assert_eq!(json["files"][1]["is_valid"], false);
        assert_eq!(json["files"][1]["errors"][0]["path"], "database.port");
        assert_eq!(json["files"][1]["errors"][0]["kind"], "missing_required_field");
        assert_eq!(json["files"][2]["failure"]["kind"], "parse_error");
        assert!(json["files"][0]["failure"].is_null());
        assert_eq!(json["files"][3]["status"], "skipped");
    }

    #[test]
    fn test_output_format_parse() {
        assert_eq!("JSON".parse::<OutputFormat>(), Ok(OutputFormat::Json));
        assert!("xml".parse::<OutputFormat>().is_err());
    }
}

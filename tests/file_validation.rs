use confguard::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

fn server_rules() -> RuleSet {
    RuleSet::builder()
        .field("name", [Rule::required(), Rule::of_type(ValueKind::String)])
        .field(
            "port",
            [Rule::required(), Rule::of_type(ValueKind::Integer), Rule::range(1.0, 65535.0)],
        )
        .build()
        .unwrap()
}

fn write(dir: &TempDir, name: &str, text: &str) -> PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, text).unwrap();
    path
}

#[test]
fn test_valid_and_invalid_files() {
    let dir = tempfile::tempdir().unwrap();
    let good = write(&dir, "good.json", r#"{"name": "api", "port": 8080}"#);
    let bad = write(&dir, "bad.yaml", "name: api\nport: 70000\n");

    let result = validate_file(&good, &server_rules(), &FileOptions::new()).unwrap();
    assert!(result.is_valid());

    let result = validate_file(&bad, &server_rules(), &FileOptions::new()).unwrap();
    assert_eq!(result.errors.len(), 1);
    assert_eq!(result.errors[0].kind, ErrorKind::OutOfRange);
    assert_eq!(result.errors[0].path.to_string(), "port");
}

#[test]
fn test_missing_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("absent.json");
    let err = validate_file(&path, &server_rules(), &FileOptions::new()).unwrap_err();
    assert!(matches!(err, FileError::NotFound { .. }));
    assert_eq!(err.path(), path.as_path());
    assert!(err.to_string().ends_with("file not found"));
}

#[cfg(unix)]
#[test]
fn test_unreadable_file() {
    use std::os::unix::fs::PermissionsExt;

    let dir = tempfile::tempdir().unwrap();
    let path = write(&dir, "locked.json", r#"{"name": "api", "port": 1}"#);
    fs::set_permissions(&path, fs::Permissions::from_mode(0o000)).unwrap();

    // Root ignores file modes.
    if fs::read(&path).is_ok() {
        return;
    }

    let err = validate_file(&path, &server_rules(), &FileOptions::new()).unwrap_err();
    assert!(matches!(err, FileError::PermissionDenied { .. }));
    assert_eq!(err.kind_name(), "permission_denied");
}

#[test]
fn test_parse_error_position() {
    let dir = tempfile::tempdir().unwrap();
    let path = write(&dir, "broken.json", "{\n  \"name\": \"api\",\n  \"port\": \n");
    let err = validate_file(&path, &server_rules(), &FileOptions::new()).unwrap_err();
    assert!(err.is_parse_error());
    match err {
        FileError::Parse { source, .. } => {
            assert_eq!(source.format, "JSON");
            assert!(source.line.is_some());
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_batch_isolates_failures_and_keeps_order() {
    let dir = tempfile::tempdir().unwrap();
    let paths = vec![
        write(&dir, "one.json", r#"{"name": "a", "port": 1}"#),
        write(&dir, "two.json", r#"{"name": "b", "port": "#),
        write(&dir, "three.yaml", "name: c\nport: 0\n"),
        write(&dir, "four.yml", "name: d\nport: 443\n"),
    ];

    let reports = validate_files(&paths, &server_rules(), &BatchOptions::new().with_threads(4));
    assert_eq!(reports.len(), 4);
    for (report, path) in reports.iter().zip(&paths) {
        assert_eq!(&report.path, path);
    }

    assert!(reports[0].is_valid());
    assert_eq!(reports[1].status(), FileStatus::Failed);
    assert!(reports[1].failure().unwrap().is_parse_error());
    assert_eq!(reports[2].status(), FileStatus::Invalid);
    assert!(reports[2].result().unwrap().has_error(ErrorKind::OutOfRange));
    assert!(reports[3].is_valid());
}

#[test]
fn test_parallel_matches_sequential() {
    let dir = tempfile::tempdir().unwrap();
    let paths: Vec<PathBuf> = (0..24)
        .map(|i| {
            let port = if i % 3 == 0 { 0 } else { 1000 + i };
            write(&dir, &format!("svc{i}.json"), &format!(r#"{{"name": "svc{i}", "port": {port}}}"#))
        })
        .collect();

    let rules = server_rules();
    let parallel = validate_files(&paths, &rules, &BatchOptions::new());
    let sequential = validate_files(&paths, &rules, &BatchOptions::new().with_parallel(false));

    let statuses = |reports: &[FileReport]| reports.iter().map(FileReport::status).collect::<Vec<_>>();
    assert_eq!(statuses(&parallel), statuses(&sequential));
    assert_eq!(parallel.iter().filter(|r| !r.is_valid()).count(), 8);
}

#[test]
fn test_batch_progress_events() {
    let dir = tempfile::tempdir().unwrap();
    let paths = vec![
        write(&dir, "a.json", r#"{"name": "a", "port": 1}"#),
        write(&dir, "b.json", r#"{"name": "b", "port": 2}"#),
        write(&dir, "c.json", r#"{"name": "c", "port": 3}"#),
    ];

    let completed = Arc::new(Mutex::new(Vec::new()));
    let sink = completed.clone();
    let options = BatchOptions::new().with_progress(move |update| {
        if let ProgressUpdate::FileCompleted { path, .. } = update {
            sink.lock().unwrap().push(path);
        }
    });

    let reports = validate_files(&paths, &server_rules(), &options);
    assert!(reports.iter().all(FileReport::is_valid));

    let mut seen = completed.lock().unwrap().clone();
    seen.sort();
    assert_eq!(seen, paths);
}

#[test]
fn test_discovered_directory() {
    let dir = tempfile::tempdir().unwrap();
    fs::create_dir(dir.path().join("nested")).unwrap();
    write(&dir, "a.json", r#"{"name": "a", "port": 1}"#);
    write(&dir, "nested/b.yaml", "name: b\nport: 2\n");
    write(&dir, "notes.txt", "not a config");

    let target = dir.path().to_string_lossy().into_owned();
    let files = discover(&[target.as_str()], &[]).unwrap();
    let names: Vec<&Path> = files
        .iter()
        .map(|p| p.strip_prefix(dir.path()).unwrap())
        .collect();
    assert_eq!(names, vec![Path::new("a.json"), Path::new("nested/b.yaml")]);

    let reports = validate_files(&files, &server_rules(), &BatchOptions::new());
    assert!(reports.iter().all(FileReport::is_valid));
}

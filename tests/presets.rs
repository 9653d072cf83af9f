use confguard::prelude::*;
use confguard::presets;
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

const MAIN_TF_JSON: &str = r#"{
  "terraform": {"required_version": "~> 1.5"},
  "provider": {"aws": {"region": "eu-west-1"}},
  "variable": {"instance_type": {"default": "t3.micro"}},
  "resource": {
    "aws_vpc": {"main": {"cidr_block": "10.0.0.0/16"}},
    "aws_instance": {
      "web": {
        "ami": "ami-0abcdef",
        "instance_type": "${var.instance_type}",
        "depends_on": ["aws_vpc.main"]
      }
    }
  }
}"#;

const CI_WORKFLOW: &str = r#"
name: CI
on:
  push:
    branches: [main]
jobs:
  build:
    runs-on: ubuntu-latest
    steps:
      - uses: actions/checkout@v4
      - run: cargo build
  test:
    needs: build
    runs-on: ubuntu-latest
    timeout-minutes: 30
    steps:
      - run: cargo test
"#;

fn write(dir: &TempDir, name: &str, text: &str) -> PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, text).unwrap();
    path
}

#[test]
fn test_terraform_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = write(&dir, "main.tf.json", MAIN_TF_JSON);
    let rules = presets::by_name("terraform", true).unwrap();

    let result = validate_file(&path, &rules, &FileOptions::new()).unwrap();
    assert!(result.is_valid(), "{:?}", result.errors);
    assert!(result.warnings.is_empty());
}

#[test]
fn test_terraform_cycle_and_bad_values() {
    let dir = tempfile::tempdir().unwrap();
    let path = write(
        &dir,
        "broken.tf.json",
        r#"{
          "resource": {
            "aws_vpc": {"main": {"cidr_block": "10.0.0.0/33", "depends_on": ["aws_subnet.a"]}},
            "aws_subnet": {"a": {"vpc_id": "${aws_vpc.main.id}", "cidr_block": "10.0.1.0/24", "depends_on": ["aws_vpc.main"]}}
          }
        }"#,
    );
    let rules = presets::terraform(false).unwrap();
    let result = validate_file(&path, &rules, &FileOptions::new()).unwrap();

    let format: Vec<String> = result
        .errors_of(ErrorKind::InvalidFormat)
        .map(|e| e.path.to_string())
        .collect();
    assert_eq!(format, vec!["resource.aws_vpc.main.cidr_block"]);

    let cycle = result.errors_of(ErrorKind::CircularDependency).next().unwrap();
    assert_eq!(cycle.related, vec!["aws_vpc.main", "aws_subnet.a"]);

    // Dependency findings come after field findings.
    let last = result.errors.last().unwrap();
    assert_eq!(last.kind, ErrorKind::CircularDependency);
}

#[test]
fn test_workflow_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = write(&dir, "ci.yml", CI_WORKFLOW);
    let rules = presets::workflow(true).unwrap();

    let result = validate_file(&path, &rules, &FileOptions::new()).unwrap();
    assert!(result.is_valid(), "{:?}", result.errors);
}

#[test]
fn test_workflow_step_without_action() {
    let dir = tempfile::tempdir().unwrap();
    let path = write(
        &dir,
        "release.yaml",
        "on: push\njobs:\n  release:\n    runs-on: ubuntu-latest\n    steps:\n      - name: nothing\n",
    );
    let rules = presets::workflow(false).unwrap();

    let result = validate_file(&path, &rules, &FileOptions::new()).unwrap();
    assert_eq!(result.errors.len(), 1);
    let error = &result.errors[0];
    assert_eq!(error.kind, ErrorKind::MissingRequiredField);
    assert_eq!(error.path.to_string(), "jobs.release.steps[0]");
    assert_eq!(
        error.related,
        vec!["jobs.release.steps[0].run", "jobs.release.steps[0].uses"]
    );
}

#[test]
fn test_mixed_preset_batch() {
    let dir = tempfile::tempdir().unwrap();
    let paths = vec![
        write(&dir, "main.tf.json", MAIN_TF_JSON),
        write(&dir, "empty.tf.json", "{}"),
        write(&dir, "null.tf.json", "null"),
    ];
    let rules = presets::terraform(false).unwrap();

    let reports = validate_files(&paths, &rules, &BatchOptions::new());
    assert!(reports[0].is_valid());
    for report in &reports[1..] {
        let result = report.result().unwrap();
        assert_eq!(result.errors[0].kind, ErrorKind::EmptyConfiguration);
    }
}

#[test]
fn test_terraform_variables_through_substitution() {
    let dir = tempfile::tempdir().unwrap();
    let path = write(
        &dir,
        "bucket.tf.json",
        r#"{"resource": {"aws_s3_bucket": {"logs": {"bucket": "${BUCKET_NAME:}"}}}}"#,
    );
    let rules = presets::terraform(false).unwrap();

    let unset = FileOptions::new().with_environment(Environment::new());
    let result = validate_file(&path, &rules, &unset).unwrap();
    assert_eq!(result.errors[0].kind, ErrorKind::InvalidValue);
    assert_eq!(result.errors[0].path.to_string(), "resource.aws_s3_bucket.logs.bucket");

    let set = FileOptions::new().with_environment(Environment::new().with("BUCKET_NAME", "acme-logs"));
    assert!(validate_file(&path, &rules, &set).unwrap().is_valid());
}

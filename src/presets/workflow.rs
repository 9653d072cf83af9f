//! GitHub-Actions-shaped workflow rule set.
//!
//! Generic nested-map validation only: required blocks, job and step shape,
//! and the `needs` graph. Expressions (`${{ ... }}`) are plain strings here.

use crate::core::error::RuleSetError;
use crate::core::rule::Rule;
use crate::core::value::ValueKind;
use crate::schema::{CrossFieldRule, RuleSet};

const JOB_ID_PATTERN: &str = "^[A-Za-z_][A-Za-z0-9_-]*$";

/// Build the workflow rule set.
pub fn workflow(strict: bool) -> Result<RuleSet, RuleSetError> {
    use ValueKind::{Mapping, Sequence};

    RuleSet::builder()
        .strict(strict)
        .reject_empty(true)
        .rule("", Rule::of_type(Mapping))
        .rule("name", Rule::of_type(ValueKind::String))
        .rule("run-name", Rule::of_type(ValueKind::String))
        .field("on", [Rule::required_non_null(), Rule::one_of_types([ValueKind::String, Sequence, Mapping])])
        .rule("env", Rule::of_type(Mapping))
        .rule("permissions", Rule::one_of_types([ValueKind::String, Mapping]))
        .rule("concurrency", Rule::one_of_types([ValueKind::String, Mapping]))
        .rule("defaults", Rule::of_type(Mapping))
        .field(
            "jobs",
            [
                Rule::required_non_null(),
                Rule::of_type(Mapping),
                Rule::not_empty(),
                Rule::key_pattern(JOB_ID_PATTERN)?,
            ],
        )
        .open("on")
        .open("env")
        .open("permissions")
        .open("concurrency")
        .open("defaults")
        // Jobs
        .rule("jobs.*", Rule::of_type(Mapping))
        .open("jobs.*")
        .rule("jobs.*.runs-on", Rule::one_of_types([ValueKind::String, Sequence, Mapping]))
        .rule("jobs.*.uses", Rule::of_type(ValueKind::String))
        .rule("jobs.*.needs", Rule::one_of_types([ValueKind::String, Sequence]))
        .rule("jobs.*.needs[*]", Rule::of_type(ValueKind::String))
        .field("jobs.*.timeout-minutes", [Rule::number(), Rule::min(0.0)])
        .cross_field(CrossFieldRule::at_least_one_of("jobs.*", ["runs-on", "uses"]).named("job runner"))
        // Steps
        .rule("jobs.*.steps", Rule::of_type(Sequence))
        .rule("jobs.*.steps[*]", Rule::of_type(Mapping))
        .open("jobs.*.steps[*]")
        .rule("jobs.*.steps[*].run", Rule::of_type(ValueKind::String))
        .rule("jobs.*.steps[*].uses", Rule::of_type(ValueKind::String))
        .cross_field(CrossFieldRule::at_least_one_of("jobs.*.steps[*]", ["run", "uses"]).named("step action"))
        .cross_field(CrossFieldRule::mutually_exclusive("jobs.*.steps[*]", ["run", "uses"]).named("step action"))
        .dependency("jobs.*", "", "needs")
        .build()
}

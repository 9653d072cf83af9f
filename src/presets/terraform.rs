//! Terraform-JSON rule set.
//!
//! Checks the document shape, a handful of well-known AWS resource arguments
//! and the `depends_on` graph. Provider-specific resource schemas are not
//! modelled; resource bodies accept any extra argument.

use crate::core::error::RuleSetError;
use crate::core::format::FormatKind;
use crate::core::rule::{is_interpolation, Rule};
use crate::core::value::ValueKind;
use crate::schema::{RuleSet, RuleSetBuilder};

/// Top-level blocks of a Terraform-JSON document.
pub const TOP_LEVEL_KEYS: [&str; 8] = [
    "terraform",
    "provider",
    "resource",
    "data",
    "module",
    "output",
    "variable",
    "locals",
];

const NAME_PATTERN: &str = "^[a-z_][a-z0-9_]*$";

/// Build the Terraform-JSON rule set.
pub fn terraform(strict: bool) -> Result<RuleSet, RuleSetError> {
    let mut builder = RuleSet::builder()
        .strict(strict)
        .reject_empty(true)
        .rule("", Rule::one_of_types([ValueKind::Mapping, ValueKind::Null]));

    for key in TOP_LEVEL_KEYS {
        builder = builder.rule(key, Rule::of_type(ValueKind::Mapping));
    }

    builder = builder
        .open("terraform")
        .open("provider")
        .open("variable")
        .open("locals")
        .rule(
            "terraform.required_version",
            Rule::format_or_interpolation(FormatKind::VersionConstraint),
        );

    builder = blocks(builder, "resource")?;
    builder = blocks(builder, "data")?;

    builder = builder
        .rule("module", Rule::key_pattern(NAME_PATTERN)?)
        .rule("module.*", Rule::of_type(ValueKind::Mapping))
        .field(
            "module.*.source",
            [Rule::required(), Rule::of_type(ValueKind::String), Rule::not_empty()],
        )
        .open("module.*")
        .field("module.*.depends_on", depends_on_rules())
        .rule("module.*.depends_on[*]", Rule::of_type(ValueKind::String))
        .rule("output.*", Rule::of_type(ValueKind::Mapping))
        .rule("output.*.value", Rule::required())
        .open("output.*");

    builder = aws_resources(builder);

    builder
        .dependency("resource.*.*", "", "depends_on")
        .dependency("data.*.*", "data.", "depends_on")
        .dependency("module.*", "module.", "depends_on")
        .build()
}

/// `resource` and `data` share one layout: `<block>.<type>.<name>`.
fn blocks(builder: RuleSetBuilder, block: &str) -> Result<RuleSetBuilder, RuleSetError> {
    let types = format!("{}.*", block);
    let items = format!("{}.*.*", block);
    Ok(builder
        .rule(block, Rule::key_pattern(NAME_PATTERN)?)
        .field(&types, [Rule::of_type(ValueKind::Mapping), Rule::key_pattern(NAME_PATTERN)?])
        .rule(&items, Rule::of_type(ValueKind::Mapping))
        .open(&items)
        .field(&format!("{}.depends_on", items), depends_on_rules())
        .rule(&format!("{}.depends_on[*]", items), Rule::of_type(ValueKind::String)))
}

fn depends_on_rules() -> [Rule; 1] {
    [Rule::of_type(ValueKind::Sequence)]
}

fn aws_resources(builder: RuleSetBuilder) -> RuleSetBuilder {
    let non_empty_string = || [Rule::required(), Rule::of_type(ValueKind::String), Rule::not_empty()];
    let cidr = || {
        [
            Rule::required(),
            Rule::of_type(ValueKind::String),
            Rule::format_or_interpolation(FormatKind::Cidr),
        ]
    };

    builder
        .field("resource.aws_instance.*.ami", non_empty_string())
        .field(
            "resource.aws_instance.*.instance_type",
            [
                Rule::required(),
                Rule::of_type(ValueKind::String),
                Rule::predicate(
                    "instance_type",
                    "expected an instance type such as t3.micro",
                    |value| value.as_str().is_some_and(is_instance_type),
                ),
            ],
        )
        .field("resource.aws_s3_bucket.*.bucket", non_empty_string())
        .field("resource.aws_vpc.*.cidr_block", cidr())
        .field("resource.aws_security_group.*.name", non_empty_string())
        .field("resource.aws_subnet.*.vpc_id", non_empty_string())
        .field("resource.aws_subnet.*.cidr_block", cidr())
}

/// `<family><generation>[<attributes>].<size>`, e.g. `t2.micro`, `m5d.xlarge`.
fn is_instance_type(text: &str) -> bool {
    if is_interpolation(text) {
        return true;
    }
    let Some((family, size)) = text.split_once('.') else {
        return false;
    };
    let mut chars = family.chars();
    let starts_alpha = chars.next().is_some_and(|c| c.is_ascii_lowercase());
    starts_alpha
        && family.chars().any(|c| c.is_ascii_digit())
        && family.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
        && !size.is_empty()
        && size.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::error::ErrorKind;
    use crate::core::value::ConfigValue;
    use crate::validation::validate;
    use serde_json::json;

    fn check(value: serde_json::Value) -> crate::core::error::ValidationResult {
        validate(&ConfigValue::from(value), &terraform(false).unwrap())
    }

    #[test]
    fn test_instance_type_grammar() {
        for ok in ["t2.micro", "m5d.xlarge", "c6gn.16xlarge", "${var.instance_type}"] {
            assert!(is_instance_type(ok), "{}", ok);
        }
        for bad in ["invalid_instance_type", "t2", ".micro", "T2.micro", "t.micro"] {
            assert!(!is_instance_type(bad), "{}", bad);
        }
    }

    #[test]
    fn test_complete_configuration_is_valid() {
        let result = check(json!({
            "terraform": {"required_version": ">= 1.0", "required_providers": {"aws": {"source": "hashicorp/aws"}}},
            "provider": {"aws": {"region": "us-west-2"}},
            "resource": {
                "aws_vpc": {"main": {"cidr_block": "10.0.0.0/16"}},
                "aws_subnet": {"public": {"vpc_id": "${aws_vpc.main.id}", "cidr_block": "10.0.1.0/24"}},
                "aws_instance": {"web": {
                    "ami": "ami-12345",
                    "instance_type": "t2.micro",
                    "subnet_id": "${aws_subnet.public.id}",
                    "depends_on": ["aws_subnet.public"]
                }}
            },
            "output": {"ip": {"value": "${aws_instance.web.public_ip}"}}
        }));
        assert!(result.is_valid(), "{:?}", result.errors);
        assert!(result.warnings.is_empty());
    }

    #[test]
    fn test_invalid_field_values() {
        let cases = [
            json!({"resource": {"aws_instance": {"test": {"ami": "", "instance_type": "t2.micro"}}}}),
            json!({"resource": {"aws_instance": {"test": {"ami": "ami-1", "instance_type": "invalid_instance_type"}}}}),
            json!({"resource": {"aws_vpc": {"test": {"cidr_block": "not_a_valid_cidr"}}}}),
            json!({"terraform": {"required_version": "invalid_version_constraint"}}),
            json!({"resource": {"aws_s3_bucket": {"test": {}}}}),
        ];
        for case in cases {
            let result = check(case.clone());
            assert!(!result.is_valid(), "{}", case);
        }
    }

    #[test]
    fn test_version_constraints() {
        for constraint in [">= 0.14", "~> 1.0", ">= 0.12, < 2.0", "= 1.0.0", "!= 0.13.0"] {
            let result = check(json!({
                "terraform": {"required_version": constraint},
                "resource": {"null_resource": {"test": {}}}
            }));
            assert!(result.is_valid(), "{}: {:?}", constraint, result.errors);
        }
    }

    #[test]
    fn test_naming_convention() {
        let result = check(json!({"resource": {"aws_s3_bucket": {"My-Bucket": {"bucket": "b"}}}}));
        assert_eq!(result.errors[0].kind, ErrorKind::InvalidFormat);
        assert_eq!(result.errors[0].path.to_string(), "resource.aws_s3_bucket.My-Bucket");
    }

    #[test]
    fn test_empty_document() {
        let result = check(json!({}));
        assert_eq!(result.errors.len(), 1);
        assert_eq!(result.errors[0].kind, ErrorKind::EmptyConfiguration);
        assert_eq!(result.errors[0].message, "configuration is empty");

        let result = validate(&ConfigValue::Null, &terraform(false).unwrap());
        assert_eq!(result.errors.len(), 1);
        assert!(result.errors[0].message.contains("null"));

        let result = check(json!(["resource"]));
        assert_eq!(result.errors[0].kind, ErrorKind::TypeMismatch);
    }

    #[test]
    fn test_unknown_top_level_key() {
        let lenient = check(json!({"resources": {}, "locals": {"a": 1}}));
        assert!(lenient.is_valid());
        assert_eq!(lenient.warnings[0].path.to_string(), "resources");

        let strict = validate(
            &ConfigValue::from(json!({"resources": {}})),
            &terraform(true).unwrap(),
        );
        assert!(strict.has_error(ErrorKind::UnknownField));
    }

    #[test]
    fn test_circular_dependencies() {
        let instance = |dep: &str| json!({"ami": "ami-1", "instance_type": "t2.micro", "depends_on": [dep]});
        let result = check(json!({
            "resource": {"aws_instance": {
                "web": instance("aws_instance.db"),
                "db": instance("aws_instance.cache"),
                "cache": instance("aws_instance.web")
            }}
        }));
        let cycles: Vec<_> = result.errors_of(ErrorKind::CircularDependency).collect();
        assert_eq!(cycles.len(), 1);
        assert_eq!(
            cycles[0].related,
            vec!["aws_instance.web", "aws_instance.db", "aws_instance.cache"]
        );
    }

    #[test]
    fn test_module_and_data_dependencies() {
        let result = check(json!({
            "data": {"aws_ami": {"ubuntu": {"depends_on": ["module.network"]}}},
            "module": {"network": {"source": "./network", "depends_on": ["data.aws_ami.ubuntu"]}}
        }));
        assert!(result.has_error(ErrorKind::CircularDependency));

        let result = check(json!({"module": {"network": {"source": "./network", "depends_on": ["module.absent"]}}}));
        assert!(result.is_valid());
        assert_eq!(result.warnings[0].kind, ErrorKind::UnresolvedReference);
    }
}

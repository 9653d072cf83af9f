use confguard::prelude::*;
use confguard::presets;
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use serde_json::{json, Map, Value};

fn server_rules() -> RuleSet {
    RuleSet::builder()
        .field("servers", [Rule::required(), Rule::of_type(ValueKind::Sequence)])
        .field("servers[*].name", [Rule::required(), Rule::not_empty()])
        .field(
            "servers[*].port",
            [Rule::required(), Rule::of_type(ValueKind::Integer), Rule::range(1.0, 65535.0)],
        )
        .field("servers[*].endpoint", [Rule::format(FormatKind::Url)])
        .field("servers[*].tags", [Rule::max_length(8)])
        .build()
        .expect("server rules")
}

fn servers(count: usize) -> ConfigValue {
    let servers: Vec<Value> = (0..count)
        .map(|i| {
            json!({
                "name": format!("srv-{i}"),
                "port": 1024 + (i % 60000),
                "endpoint": format!("https://node{i}.cluster.internal:8443/health"),
                "tags": ["web", "eu-west-1"]
            })
        })
        .collect();
    ConfigValue::from(json!({ "servers": servers }))
}

fn terraform_resources(count: usize) -> ConfigValue {
    let mut instances = Map::new();
    for i in 0..count {
        let mut body = json!({"ami": "ami-0abcdef", "instance_type": "t3.micro"});
        if i > 0 {
            body["depends_on"] = json!([format!("aws_instance.web_{}", i - 1)]);
        }
        instances.insert(format!("web_{i}"), body);
    }
    ConfigValue::from(json!({
        "terraform": {"required_version": ">= 1.5"},
        "resource": {
            "aws_vpc": {"main": {"cidr_block": "10.0.0.0/16"}},
            "aws_instance": instances
        }
    }))
}

fn bench_field_rules(c: &mut Criterion) {
    let rules = server_rules();
    let mut group = c.benchmark_group("servers");
    for count in [100, 1_000, 10_000] {
        let value = servers(count);
        group.bench_with_input(BenchmarkId::from_parameter(count), &value, |b, value| {
            b.iter(|| validate(black_box(value), &rules))
        });
    }
    group.finish();
}

fn bench_terraform(c: &mut Criterion) {
    let rules = presets::terraform(true).expect("terraform preset");
    let value = terraform_resources(500);
    c.bench_function("terraform_500_resources", |b| {
        b.iter(|| validate(black_box(&value), &rules))
    });
}

criterion_group!(benches, bench_field_rules, bench_terraform);
criterion_main!(benches);

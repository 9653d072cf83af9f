//! confguard CLI - validate configuration files.
//!
//! ```text
//! confguard validate infra/ --preset terraform --strict
//! confguard validate 'config/*.yaml' --schema schema.json --format json
//! confguard presets --rules
//! ```

use anyhow::{bail, Context};
use clap::{Args, Parser, Subcommand};
use confguard::prelude::*;
use confguard::presets;
use confguard::report::{self, OutputFormat, EXIT_USAGE};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

#[derive(Parser, Debug)]
#[command(name = "confguard", version, about = "Validate JSON, YAML and Terraform-JSON configuration files")]
struct Cli {
    /// Increase log output (-v info, -vv debug); RUST_LOG overrides
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Validate files, directories or glob patterns
    Validate(ValidateArgs),
    /// List the built-in presets
    Presets {
        /// Also list each preset's field rules
        #[arg(long)]
        rules: bool,
    },
}

#[derive(Args, Debug)]
struct ValidateArgs {
    /// Files, directories or glob patterns
    #[arg(required = true)]
    targets: Vec<String>,

    /// Built-in rule set
    #[arg(long, conflicts_with = "schema")]
    preset: Option<String>,

    /// JSON-Schema file (JSON or YAML)
    #[arg(long)]
    schema: Option<PathBuf>,

    /// Report unknown fields as errors
    #[arg(long)]
    strict: bool,

    /// Report format: human or json
    #[arg(long)]
    format: Option<OutputFormat>,

    /// Read substitution variables from a .env file
    #[arg(long)]
    env_file: Option<PathBuf>,

    /// Substitute ${NAME} references from the process environment
    #[arg(long)]
    substitute_env: bool,

    /// Coerce "true"/"false" and numeric strings before validation
    #[arg(long)]
    normalize: bool,

    /// Fill in rule-set defaults before validation
    #[arg(long)]
    defaults: bool,

    /// Reject files larger than this many bytes
    #[arg(long)]
    max_file_size: Option<u64>,

    /// Glob pattern of paths to skip (repeatable)
    #[arg(long)]
    exclude: Vec<String>,

    /// Settings file (default: ./confguard.toml when present)
    #[arg(long, env = "CONFGUARD_CONFIG")]
    config: Option<PathBuf>,

    /// Worker threads (0 = one per core)
    #[arg(long)]
    threads: Option<usize>,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let outcome = match cli.command {
        Command::Validate(args) => run_validate(args),
        Command::Presets { rules } => list_presets(rules),
    };

    match outcome {
        Ok(code) => ExitCode::from(code as u8),
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::from(EXIT_USAGE as u8)
        }
    }
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp(None)
        .init();
}

fn run_validate(args: ValidateArgs) -> anyhow::Result<i32> {
    let mut settings = Settings::discover(args.config.as_deref(), Path::new("."))
        .context("failed to load settings")?;
    apply_overrides(&mut settings, &args);

    let rules = settings.rules().context("failed to build the rule set")?;
    let files = settings.discover_files(&args.targets)?;
    if files.is_empty() {
        bail!("no configuration files found in {}", args.targets.join(", "));
    }

    let options = settings.batch_options()?;
    let reports = validate_files(&files, &rules, &options);
    println!("{}", report::render(&reports, settings.format)?);
    Ok(report::exit_code(&reports))
}

fn apply_overrides(settings: &mut Settings, args: &ValidateArgs) {
    if let Some(preset) = &args.preset {
        settings.preset = Some(preset.clone());
        settings.schema = None;
    }
    if let Some(schema) = &args.schema {
        settings.schema = Some(schema.clone());
        settings.preset = None;
    }
    if let Some(format) = args.format {
        settings.format = format;
    }
    if let Some(env_file) = &args.env_file {
        settings.env_file = Some(env_file.clone());
    }
    if let Some(limit) = args.max_file_size {
        settings.max_file_size = Some(limit);
    }
    if let Some(threads) = args.threads {
        settings.threads = threads;
    }
    settings.strict |= args.strict;
    settings.substitute_env |= args.substitute_env;
    settings.normalize |= args.normalize;
    settings.apply_defaults |= args.defaults;
    settings.exclude.extend(args.exclude.iter().cloned());
}

fn list_presets(with_rules: bool) -> anyhow::Result<i32> {
    for preset in presets::all() {
        println!("{:<12} {}", preset.name, preset.description);
        if !with_rules {
            continue;
        }
        let rules = preset.build(false)?;
        for decl in rules.declarations() {
            let described: Vec<String> = decl.rules.iter().map(Rule::description).collect();
            println!("    {:<40} {}", decl.pattern.to_string(), described.join(", "));
        }
        println!();
    }
    Ok(report::EXIT_OK)
}

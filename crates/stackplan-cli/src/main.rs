//! `stackplan` command line: validate a stack document and synthesize its
//! plan descriptor

mod overrides;

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use stackplan_planner::{PlanConfig, PlanDescriptor, Synthesizer, ValidatedPlan, ValidationReport};
use tracing::{debug, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::overrides::EnvOverrides;

const DEFAULT_FILTER: &str = "stackplan=info,stackplan_planner=info";

fn cli() -> Command {
    Command::new("stackplan")
        .version(stackplan_planner::VERSION)
        .about("Plan a load-balanced, multi-container service stack")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .arg(
            Arg::new("log-format")
                .long("log-format")
                .global(true)
                .default_value("text")
                .value_parser(["text", "json"])
                .help("Format of diagnostic output on stderr"),
        )
        .subcommand(
            Command::new("synth")
                .about("Validate a stack document and emit its plan descriptor")
                .arg(config_arg())
                .arg(
                    Arg::new("format")
                        .long("format")
                        .default_value("json")
                        .value_parser(["json", "yaml"])
                        .help("Descriptor encoding"),
                )
                .arg(
                    Arg::new("output")
                        .long("output")
                        .short('o')
                        .value_parser(value_parser!(PathBuf))
                        .help("Write the descriptor to a file instead of stdout"),
                ),
        )
        .subcommand(
            Command::new("validate")
                .about("Validate a stack document and report what it would create")
                .arg(config_arg())
                .arg(
                    Arg::new("json")
                        .long("json")
                        .action(ArgAction::SetTrue)
                        .help("Output the report as JSON"),
                ),
        )
        .subcommand(Command::new("schema").about("Print the JSON schema of the plan descriptor"))
}

fn config_arg() -> Arg {
    Arg::new("config")
        .required(true)
        .value_parser(value_parser!(PathBuf))
        .help("Stack document (.yaml, .yml, .toml or .json)")
}

fn init_tracing(format: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    let registry = tracing_subscriber::registry().with(filter);
    if format == "json" {
        registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
            .init();
    }
}

/// Load the document, apply `STACKPLAN_*` overrides and validate it.
/// Relative paths in the document resolve against its directory.
fn load_plan(path: &Path) -> Result<ValidatedPlan> {
    let mut config = PlanConfig::from_path(path)
        .with_context(|| format!("failed to load {}", path.display()))?;

    let overrides = EnvOverrides::from_env()?;
    if !overrides.is_empty() {
        debug!(?overrides, "applying environment overrides");
        overrides.apply(&mut config);
    }

    let base_dir = path.parent().unwrap_or_else(|| Path::new("."));
    config
        .build(base_dir)
        .with_context(|| format!("{} is not a valid stack", path.display()))
}

fn synth(args: &ArgMatches) -> Result<()> {
    let path = required_path(args)?;
    let plan = load_plan(path)?;
    let descriptor = Synthesizer::new()
        .synthesize(&plan)
        .context("failed to synthesize descriptor")?;

    let format = args.get_one::<String>("format").map_or("json", String::as_str);
    let rendered = render(&descriptor, format)?;

    match args.get_one::<PathBuf>("output") {
        Some(output) => {
            fs::write(output, rendered)
                .with_context(|| format!("failed to write {}", output.display()))?;
            info!(path = %output.display(), resources = descriptor.resources.len(), "descriptor written");
        }
        None => print!("{rendered}"),
    }
    Ok(())
}

fn render(descriptor: &PlanDescriptor, format: &str) -> Result<String> {
    let rendered = match format {
        "yaml" => descriptor.to_yaml()?,
        _ => descriptor.to_json_pretty()?,
    };
    Ok(rendered)
}

fn validate(args: &ArgMatches) -> Result<()> {
    let path = required_path(args)?;
    let report = load_plan(path)?.report();

    if args.get_flag("json") {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print!("{}", render_report(&report));
    }
    Ok(())
}

fn render_report(report: &ValidationReport) -> String {
    let mut out = format!(
        "Stack {}: {} resources, {} dependencies\n",
        report.stack_name, report.resource_count, report.edge_count
    );
    for (kind, count) in &report.resources {
        out.push_str(&format!("  {kind}: {count}\n"));
    }
    out.push_str("Creation order:\n");
    for (position, id) in report.creation_order.iter().enumerate() {
        out.push_str(&format!("  {:>3}. {id}\n", position + 1));
    }
    if !report.warnings.is_empty() {
        out.push_str("Warnings:\n");
        for warning in &report.warnings {
            out.push_str(&format!("  - {warning}\n"));
        }
    }
    out
}

fn schema() -> Result<()> {
    let schema = schemars::schema_for!(PlanDescriptor);
    println!("{}", serde_json::to_string_pretty(&schema)?);
    Ok(())
}

fn required_path(args: &ArgMatches) -> Result<&Path> {
    args.get_one::<PathBuf>("config")
        .map(PathBuf::as_path)
        .context("missing config path")
}

fn run(matches: &ArgMatches) -> Result<()> {
    match matches.subcommand() {
        Some(("synth", args)) => synth(args),
        Some(("validate", args)) => validate(args),
        Some(("schema", _)) => schema(),
        _ => Ok(()),
    }
}

fn main() {
    let matches = cli().get_matches();
    let log_format = matches.get_one::<String>("log-format").map_or("text", String::as_str);
    init_tracing(log_format);

    if let Err(err) = run(&matches) {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use audioplug_host::PluginModule;
use audioplug_sdk::{ClassCategory, PluginFactory, Uid};
use audioplug_validate::{Suite, Validator, ValidatorConfig};
use clap::Parser;
use tracing_subscriber::EnvFilter;

/// Checks an audioplug module against the lifecycle and processing contract.
#[derive(Parser, Debug)]
#[command(name = "audioplug-validate", version)]
struct Args {
    /// Path to the module binary.
    plugin: PathBuf,
    /// Only validate this processor class (32 hex digits).
    #[arg(long)]
    class: Option<Uid>,
    /// Only run these suites: general, lifecycle, processing.
    #[arg(long = "suite", value_name = "NAME")]
    suites: Vec<Suite>,
    /// List classes and tests without running anything.
    #[arg(long)]
    list: bool,
    /// JSON configuration file; flags override its values.
    #[arg(long)]
    config: Option<PathBuf>,
    #[arg(long = "sample-rate", value_name = "HZ")]
    sample_rates: Vec<f64>,
    #[arg(long)]
    block_size: Option<usize>,
    #[arg(long)]
    max_events: Option<usize>,
    /// Print the report as JSON on stdout.
    #[arg(long)]
    json: bool,
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> ExitCode {
    let args = Args::parse();
    let default_level = if args.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .try_init()
        .ok();

    match run(&args) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::from(1),
        Err(err) => {
            eprintln!("error: {err:#}");
            ExitCode::from(2)
        }
    }
}

fn load_config(args: &Args) -> Result<ValidatorConfig> {
    let mut config = match &args.config {
        Some(path) => ValidatorConfig::load(path)
            .with_context(|| format!("failed to load configuration {}", path.display()))?,
        None => ValidatorConfig::default(),
    };
    if !args.sample_rates.is_empty() {
        config.sample_rates = args.sample_rates.clone();
    }
    if let Some(block_size) = args.block_size {
        config.block_size = block_size;
    }
    if let Some(max_events) = args.max_events {
        config.max_events = max_events;
    }
    if !args.suites.is_empty() {
        config.suites = args.suites.clone();
    }
    config.validate().context("invalid configuration")?;
    Ok(config)
}

/// Returns whether every test passed.
fn run(args: &Args) -> Result<bool> {
    let config = load_config(args)?;
    // SAFETY: loading runs the module's initializers. The path comes from the
    // user, who vouches for the binary.
    let module = unsafe { PluginModule::load(&args.plugin) }
        .with_context(|| format!("failed to load {}", args.plugin.display()))?;
    let validator = Validator::new(config);

    if args.list {
        let info = module.factory_info();
        println!("factory: {} {}", info.vendor, info.url);
        for class in module.classes() {
            let kind = match class.category {
                ClassCategory::Processor => "processor",
                ClassCategory::Controller => "controller",
            };
            println!("  {} {kind:<10} {} [{}]", class.cid, class.name, class.sub_categories);
        }
        println!("tests:");
        for test in validator.tests() {
            println!("  {}/{}: {}", test.suite(), test.name(), test.description());
        }
        return Ok(true);
    }

    let report = validator
        .run(&module, args.class.as_ref())
        .context("validation aborted")?;
    if args.json {
        println!("{}", report.to_json()?);
    } else {
        print!("{}", report.render_text(args.verbose));
    }
    let passed = report.passed();
    tracing::info!(passed, classes = report.classes.len(), "validation finished");
    Ok(passed)
}

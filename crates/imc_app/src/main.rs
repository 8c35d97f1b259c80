//! IMC preprocessing - command line entry point
//!
//! Handles:
//! - Application-level logging initialization
//! - Configuration loading and command-line overrides
//! - Running the standard pipeline
//! - Run summary and exit status

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{bail, Context as _, Result};
use clap::Parser;

use imc_core::config::{ConfigManager, Settings};
use imc_core::logging::{init_tracing, timestamped_run_name, LogConfig, LogLevel, RunLogger};
use imc_core::orchestrator::{create_standard_pipeline, Context, RunState};
use imc_core::tools::ImctoolsRunner;

mod summary;

/// Exit status when conversions failed and `--strict` was given.
const EXIT_FAILURES: u8 = 2;

#[derive(Parser, Debug)]
#[command(
    name = "imc-preprocess",
    version,
    about = "Convert IMC acquisitions to OME-TIFF and export analysis stacks."
)]
struct Cli {
    /// Configuration file
    #[arg(long, value_name = "PATH", default_value = "imc_preprocess.toml")]
    config: PathBuf,

    /// Write a commented default configuration and exit
    #[arg(long)]
    init: bool,

    /// Skip acquisition conversion
    #[arg(long)]
    no_convert: bool,

    /// Skip the "full" stack export
    #[arg(long)]
    no_stacks: bool,

    /// Skip the "ilastik" stack export
    #[arg(long)]
    no_ilastik: bool,

    /// Python interpreter with imctools installed (overrides [tools] python)
    #[arg(long, value_name = "PATH")]
    python: Option<String>,

    /// Exit with status 2 if any acquisition or stack failed
    #[arg(long)]
    strict: bool,

    /// Print the run summary as JSON on stdout when done
    #[arg(long)]
    summary_json: bool,

    /// Debug output
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    init_tracing(if cli.verbose {
        LogLevel::Debug
    } else {
        LogLevel::Warn
    });

    match run(&cli) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> Result<ExitCode> {
    let mut config = ConfigManager::new(&cli.config);

    if cli.init {
        if cli.config.exists() {
            bail!("{} already exists; not overwriting", cli.config.display());
        }
        config
            .save()
            .with_context(|| format!("writing {}", cli.config.display()))?;
        println!("Wrote default configuration to {}", cli.config.display());
        println!("Fill in [paths] and [panel], then run again without --init.");
        return Ok(ExitCode::SUCCESS);
    }

    config.load().with_context(|| {
        format!(
            "loading {} (create one with --init)",
            cli.config.display()
        )
    })?;
    tracing::debug!("Config: {}", config.path().display());
    tracing::debug!("Core version: {}", imc_core::version());

    apply_overrides(config.settings_mut(), cli);
    config.validate()?;
    let settings = config.into_settings();

    let run_name = timestamped_run_name("imc");
    let mut log_config = LogConfig::from(&settings.logging);
    if cli.verbose {
        log_config.level = LogLevel::Debug;
    }
    let logger = RunLogger::new(
        &run_name,
        &settings.paths.logs_folder,
        log_config,
        Some(Box::new(|line: &str| println!("{}", line))),
    )
    .with_context(|| format!("creating log in {}", settings.paths.logs_folder.display()))?;
    let logger = Arc::new(logger);
    logger.info(&format!("Run {} (imc_core {})", run_name, imc_core::version()));
    logger.info(&format!("Log file: {}", logger.log_path().display()));

    let runner = Arc::new(ImctoolsRunner::new(settings.tools.python.clone()));
    let ctx = Context::new(settings, &run_name, Arc::clone(&logger), runner.clone(), runner);

    let mut state = RunState::new(&run_name);
    let outcome = create_standard_pipeline().run(&ctx, &mut state);

    summary::print_summary(&state);
    if cli.summary_json {
        println!("{}", serde_json::to_string_pretty(&state)?);
    }

    let result = match outcome {
        Ok(_) => {
            summary::print_next_steps(&ctx.settings);
            Ok(ExitCode::from(exit_status(cli.strict, &state)))
        }
        Err(e) => Err(e.into()),
    };

    logger.close();
    result
}

/// Apply the phase switches and tool override given on the command line.
///
/// A `--no-*` flag can only turn a phase off.
fn apply_overrides(settings: &mut Settings, cli: &Cli) {
    settings.phases.do_convert &= !cli.no_convert;
    settings.phases.do_stacks &= !cli.no_stacks;
    settings.phases.do_ilastik &= !cli.no_ilastik;
    if let Some(python) = &cli.python {
        settings.tools.python = python.clone();
    }
}

/// Process exit status of a run that completed.
fn exit_status(strict: bool, state: &RunState) -> u8 {
    if strict && state.has_failures() {
        EXIT_FAILURES
    } else {
        0
    }
}

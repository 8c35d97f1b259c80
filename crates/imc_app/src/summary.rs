//! End-of-run console report.

use imc_core::config::Settings;
use imc_core::orchestrator::{format_failure_list, RunState};

/// Print counts per phase and the failure list.
pub fn print_summary(state: &RunState) {
    println!();
    println!("Summary for {}", state.run_id);

    if let Some(convert) = &state.convert {
        println!(
            "  Convert: {} converted, {} already converted, {} failed",
            convert.converted.len(),
            convert.skipped.len(),
            convert.failed.len()
        );
    }
    for (variant, export) in &state.exports {
        println!(
            "  Export {}: {} written, {} failed",
            variant.name(),
            export.written.len(),
            export.failed.len()
        );
    }

    let failed = format_failure_list(state.failed_conversions());
    if failed.is_empty() {
        println!("  No conversion failures");
    } else {
        println!("  Failed acquisitions:");
        for path in failed {
            println!("    {}", path);
        }
    }

    for (variant, export) in &state.exports {
        if export.failed.is_empty() {
            continue;
        }
        println!("  Failed {} stacks:", variant.name());
        for path in format_failure_list(&export.failed) {
            println!("    {}", path);
        }
    }
}

/// Downstream steps that are run by hand after this tool.
pub fn print_next_steps(settings: &Settings) {
    println!();
    println!("Next steps:");
    println!(
        "  1. CellProfiler: run the prepare-ilastik pipeline on {}",
        settings.paths.analysis_folder.display()
    );
    println!("  2. ilastik: train a pixel classifier on the *_ilastik stacks");
    println!(
        "  3. CellProfiler: segment and measure, writing to {}",
        settings.paths.cp_folder.display()
    );
}

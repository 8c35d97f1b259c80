//! Init step - makes sure every output directory exists.

use std::fs;

use crate::orchestrator::errors::{StepError, StepResult};
use crate::orchestrator::step::PipelineStep;
use crate::orchestrator::types::{Context, InitOutput, RunState, StepOutcome};

/// Creates the OME, analysis and CellProfiler output directories.
///
/// Existing directories are left as they are. Any other filesystem error
/// (including a regular file sitting on the path) stops the run.
pub struct InitDirsStep;

impl InitDirsStep {
    pub fn new() -> Self {
        Self
    }
}

impl Default for InitDirsStep {
    fn default() -> Self {
        Self::new()
    }
}

impl PipelineStep for InitDirsStep {
    fn name(&self) -> &str {
        "Init"
    }

    fn description(&self) -> &str {
        "Create output directories"
    }

    fn validate_input(&self, ctx: &Context) -> StepResult<()> {
        if ctx
            .settings
            .output_dirs()
            .iter()
            .any(|d| d.as_os_str().is_empty())
        {
            return Err(StepError::invalid_input("An output directory path is empty"));
        }
        Ok(())
    }

    fn execute(&self, ctx: &Context, state: &mut RunState) -> StepResult<StepOutcome> {
        let mut output = InitOutput::default();

        for dir in ctx.settings.output_dirs() {
            if dir.is_dir() {
                ctx.logger.debug(&format!("Exists: {}", dir.display()));
                output.existing.push(dir);
                continue;
            }

            fs::create_dir_all(&dir).map_err(|e| {
                StepError::io_error(format!("creating {}", dir.display()), e)
            })?;
            ctx.logger.info(&format!("Created {}", dir.display()));
            output.created.push(dir);
        }

        state.init = Some(output);
        Ok(StepOutcome::Success)
    }

    fn validate_output(&self, ctx: &Context, _state: &RunState) -> StepResult<()> {
        for dir in ctx.settings.output_dirs() {
            if !dir.is_dir() {
                return Err(StepError::invalid_output(format!(
                    "{} is not a directory",
                    dir.display()
                )));
            }
        }
        Ok(())
    }
}

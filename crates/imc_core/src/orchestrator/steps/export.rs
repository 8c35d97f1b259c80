//! Export step - writes one analysis stack per OME-TIFF image.
//!
//! The same step type runs once per [`StackVariant`]; each pass lists the
//! OME folder afresh and names its outputs `<base><suffix>`.

use crate::config::ExportFailurePolicy;
use crate::naming::{list_files, variant_output_name};
use crate::orchestrator::errors::{StepError, StepResult};
use crate::orchestrator::step::PipelineStep;
use crate::orchestrator::types::{Context, ExportOutput, RunState, StackVariant, StepOutcome};
use crate::tools::ExportRequest;

/// Export step for one stack variant.
pub struct ExportStep {
    variant: StackVariant,
    name: String,
}

impl ExportStep {
    pub fn new(variant: StackVariant) -> Self {
        let name = match variant {
            StackVariant::Full => "Export-Full",
            StackVariant::Ilastik => "Export-Ilastik",
        };
        Self {
            variant,
            name: name.to_string(),
        }
    }
}

impl PipelineStep for ExportStep {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        match self.variant {
            StackVariant::Full => "Export full analysis stacks",
            StackVariant::Ilastik => "Export ilastik stacks",
        }
    }

    fn is_enabled(&self, ctx: &Context) -> bool {
        self.variant.enabled(&ctx.settings)
    }

    fn validate_input(&self, ctx: &Context) -> StepResult<()> {
        let paths = &ctx.settings.paths;
        for dir in [&paths.ome_folder, &paths.analysis_folder] {
            if !dir.is_dir() {
                return Err(StepError::precondition_failed(format!(
                    "{} does not exist",
                    dir.display()
                )));
            }
        }

        let panel = ctx.panel()?;
        let column = &self.variant.settings(&ctx.settings).column;
        if !panel.has_column(column) {
            return Err(StepError::invalid_input(format!(
                "Panel {} was loaded without column '{}'",
                panel.path.display(),
                column
            )));
        }

        let selected = panel.selected_keys(column);
        if selected.is_empty() {
            return Err(StepError::invalid_input(format!(
                "Panel column '{}' selects no channels",
                column
            )));
        }
        ctx.logger.info(&format!(
            "{} of {} channel(s) selected by '{}': {}",
            selected.len(),
            panel.len(),
            column,
            selected.join(", ")
        ));
        Ok(())
    }

    fn execute(&self, ctx: &Context, state: &mut RunState) -> StepResult<StepOutcome> {
        let settings = &ctx.settings;
        let variant = self.variant.settings(settings);
        let policy = settings.export.on_failure;

        let images = list_files(&settings.paths.ome_folder).map_err(|e| {
            StepError::io_error(format!("listing {}", settings.paths.ome_folder.display()), e)
        })?;
        if images.is_empty() {
            ctx.logger.warn("No images found in the OME folder");
        }

        let mut output = ExportOutput::default();
        for image in &images {
            let basename = variant_output_name(&image.name, &variant.suffix);
            let request = ExportRequest {
                image: &image.path,
                out_dir: &settings.paths.analysis_folder,
                basename: &basename,
                panel_csv: &settings.panel.csv,
                metal_column: &settings.panel.metal_column,
                used_column: &variant.column,
                add_sum: variant.add_sum,
                bigtiff: variant.bigtiff,
                sort_channels: variant.sort_channels,
            };
            ctx.logger.command(&format!(
                "{} export {} -> {} [{}]",
                ctx.exporter.name(),
                image.path.display(),
                basename,
                variant.column
            ));

            match ctx.exporter.export(&request) {
                Ok(()) => {
                    ctx.logger.info(&format!("{} -> {}", image.name, basename));
                    output.written.push(basename);
                }
                Err(e) => {
                    if let Some(tool_output) = e.output() {
                        ctx.logger.tool_output(tool_output);
                        ctx.logger.show_tail(ctx.exporter.name());
                    }
                    match policy {
                        ExportFailurePolicy::Abort => {
                            return Err(StepError::tool(
                                format!("Export {} ({})", image.name, self.variant.name()),
                                e,
                            ));
                        }
                        ExportFailurePolicy::Continue => {
                            ctx.logger
                                .error(&format!("{}: export failed: {}", image.name, e));
                            output.failed.push(image.path.clone());
                        }
                    }
                }
            }
        }

        ctx.logger.info(&format!(
            "{} stack(s) written, {} failed",
            output.written.len(),
            output.failed.len()
        ));

        state.exports.insert(self.variant, output);
        Ok(StepOutcome::Success)
    }

    fn validate_output(&self, _ctx: &Context, state: &RunState) -> StepResult<()> {
        if !state.exports.contains_key(&self.variant) {
            return Err(StepError::invalid_output(format!(
                "No export results recorded for '{}'",
                self.variant.name()
            )));
        }
        Ok(())
    }
}

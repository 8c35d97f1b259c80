//! Convert step - turns raw acquisitions into OME-TIFF images.
//!
//! Scans every input folder for acquisition files passing the name filter,
//! skips those already present in the OME folder, and hands the rest to the
//! configured [`AcquisitionConverter`](crate::tools::AcquisitionConverter).
//! A failed file is recorded and the step moves on to the next one.

use std::path::PathBuf;

use crate::naming::{acquisition_base_name, list_files, matches_filter, FileEntry, OutputIndex};
use crate::orchestrator::errors::{StepError, StepResult};
use crate::orchestrator::step::PipelineStep;
use crate::orchestrator::types::{Context, ConvertOutput, RunState, StepOutcome};
use crate::tools::{ConvertRequest, ToolError};

/// Result of handling one acquisition file.
#[derive(Debug)]
pub enum ConvertOutcome {
    /// The converter ran and succeeded.
    Converted,
    /// An output containing the base name already exists.
    AlreadyConverted,
    /// The converter failed.
    Failed(ToolError),
}

/// Convert step for raw acquisitions.
pub struct ConvertStep;

impl ConvertStep {
    pub fn new() -> Self {
        Self
    }

    /// Acquisition files from all input folders that pass the filter.
    fn collect_candidates(&self, ctx: &Context) -> StepResult<Vec<FileEntry>> {
        let acquisition = &ctx.settings.acquisition;
        let mut candidates = Vec::new();

        for folder in &ctx.settings.paths.input_folders {
            let entries = list_files(folder)
                .map_err(|e| StepError::io_error(format!("listing {}", folder.display()), e))?;
            let total = entries.len();

            let matching: Vec<FileEntry> = entries
                .into_iter()
                .filter(|e| {
                    matches_filter(&e.name, &acquisition.common_file_part, &acquisition.exclude)
                })
                .collect();

            ctx.logger.info(&format!(
                "{}: {} of {} file(s) match '{}'",
                folder.display(),
                matching.len(),
                total,
                acquisition.common_file_part
            ));
            candidates.extend(matching);
        }

        Ok(candidates)
    }

    /// Convert one acquisition unless its output already exists.
    fn convert_one(&self, ctx: &Context, index: &mut OutputIndex, entry: &FileEntry) -> ConvertOutcome {
        let base = acquisition_base_name(&entry.name);
        if index.contains_base(base) {
            return ConvertOutcome::AlreadyConverted;
        }

        let request = ConvertRequest {
            source: &entry.path,
            format: ctx.settings.acquisition.target_format,
            out_dir: &ctx.settings.paths.ome_folder,
        };
        ctx.logger.command(&format!(
            "{} convert {} -> {} ({})",
            ctx.converter.name(),
            entry.path.display(),
            request.out_dir.display(),
            request.format.id()
        ));

        match ctx.converter.convert(&request) {
            Ok(()) => {
                index.record(format!("{}{}", base, request.format.suffix()));
                ConvertOutcome::Converted
            }
            Err(e) => ConvertOutcome::Failed(e),
        }
    }
}

impl Default for ConvertStep {
    fn default() -> Self {
        Self::new()
    }
}

impl PipelineStep for ConvertStep {
    fn name(&self) -> &str {
        "Convert"
    }

    fn description(&self) -> &str {
        "Convert raw acquisitions to OME-TIFF"
    }

    fn is_enabled(&self, ctx: &Context) -> bool {
        ctx.settings.phases.do_convert
    }

    fn validate_input(&self, ctx: &Context) -> StepResult<()> {
        let paths = &ctx.settings.paths;
        if paths.input_folders.is_empty() {
            return Err(StepError::invalid_input("No input folders configured"));
        }
        if let Some(missing) = paths.input_folders.iter().find(|f| !f.is_dir()) {
            return Err(StepError::not_found(missing));
        }
        if !paths.ome_folder.is_dir() {
            return Err(StepError::precondition_failed(format!(
                "OME folder {} does not exist",
                paths.ome_folder.display()
            )));
        }
        Ok(())
    }

    fn execute(&self, ctx: &Context, state: &mut RunState) -> StepResult<StepOutcome> {
        let ome_folder = &ctx.settings.paths.ome_folder;
        let mut index = OutputIndex::scan(ome_folder)
            .map_err(|e| StepError::io_error(format!("listing {}", ome_folder.display()), e))?;
        ctx.logger
            .debug(&format!("{} existing file(s) in {}", index.len(), ome_folder.display()));

        let candidates = self.collect_candidates(ctx)?;
        let mut output = ConvertOutput::default();

        for entry in &candidates {
            match self.convert_one(ctx, &mut index, entry) {
                ConvertOutcome::Converted => {
                    ctx.logger.info(&format!("{}: converted", entry.name));
                    output.converted.push(entry.path.clone());
                }
                ConvertOutcome::AlreadyConverted => {
                    ctx.logger.info(&format!("{}: already converted", entry.name));
                    output.skipped.push(entry.path.clone());
                }
                ConvertOutcome::Failed(e) => {
                    ctx.logger
                        .error(&format!("{}: conversion failed: {}", entry.name, e));
                    if let Some(tool_output) = e.output() {
                        ctx.logger.tool_output(tool_output);
                        ctx.logger.show_tail(ctx.converter.name());
                    }
                    output.failed.push(entry.path.clone());
                }
            }
        }

        ctx.logger.info(&format!(
            "Converted {}, already converted {}, failed {}",
            output.converted.len(),
            output.skipped.len(),
            output.failed.len()
        ));
        if !output.failed.is_empty() {
            ctx.logger.warn(&format!(
                "{} acquisition(s) could not be converted",
                output.failed.len()
            ));
        }

        state.convert = Some(output);
        Ok(StepOutcome::Success)
    }

    fn validate_output(&self, ctx: &Context, state: &RunState) -> StepResult<()> {
        let output = state
            .convert
            .as_ref()
            .ok_or_else(|| StepError::invalid_output("Conversion results were not recorded"))?;

        // a failed converter may still leave a partial file behind
        let index = OutputIndex::scan(&ctx.settings.paths.ome_folder).map_err(|e| {
            StepError::io_error("re-listing OME folder", e)
        })?;
        for failed in &output.failed {
            let name = failed
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_default();
            if index.contains_base(acquisition_base_name(&name)) {
                ctx.logger.warn(&format!(
                    "{} failed but left output in the OME folder; remove it before rerunning",
                    name
                ));
            }
        }
        Ok(())
    }
}

/// Failed acquisitions in a form suitable for printing.
pub fn format_failure_list(failed: &[PathBuf]) -> Vec<String> {
    failed.iter().map(|p| p.display().to_string()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::orchestrator::test_support::{file_names, Fixture, MockConverter};
    use std::sync::Arc;

    fn run(fx: &Fixture) -> RunState {
        let ctx = fx.context();
        let step = ConvertStep::new();
        let mut state = RunState::new("t");
        step.validate_input(&ctx).unwrap();
        step.execute(&ctx, &mut state).unwrap();
        step.validate_output(&ctx, &state).unwrap();
        state
    }

    #[test]
    fn only_matching_names_are_submitted() {
        let fx = Fixture::new();
        fx.create_output_dirs();
        fx.write_raw("sample1.txt");
        fx.write_raw("sample1.mcd");
        fx.write_raw("readme.md");
        std::fs::create_dir(fx.raw_dir().join("nested.txt")).unwrap();

        let state = run(&fx);

        assert_eq!(fx.converter.call_names(), vec!["sample1.txt"]);
        let convert = state.convert.unwrap();
        assert_eq!(convert.converted, vec![fx.raw_dir().join("sample1.txt")]);
        assert!(convert.failed.is_empty());
    }

    #[test]
    fn second_run_converts_nothing() {
        let mut fx = Fixture::new();
        fx.converter = Arc::new(MockConverter::failing_on(&["bad.txt"]));
        fx.create_output_dirs();
        fx.write_raw("a.txt");
        fx.write_raw("bad.txt");
        fx.write_raw("c.txt");

        let first = run(&fx);
        let calls_after_first = fx.converter.calls().len();
        let second = run(&fx);

        assert_eq!(first.convert.as_ref().unwrap().converted.len(), 2);
        let second = second.convert.unwrap();
        assert!(second.converted.is_empty());
        assert_eq!(second.skipped.len(), 2);
        assert_eq!(second.failed, first.convert.unwrap().failed);
        // only the failing file is retried
        assert_eq!(fx.converter.calls().len(), calls_after_first + 1);
    }

    #[test]
    fn failure_is_recorded_and_later_files_processed() {
        let mut fx = Fixture::new();
        fx.converter = Arc::new(MockConverter::failing_on(&["bad.txt"]));
        fx.create_output_dirs();
        fx.write_raw("bad.txt");
        fx.write_raw("good.txt");

        let state = run(&fx);

        assert_eq!(state.failed_conversions(), [fx.raw_dir().join("bad.txt")]);
        assert_eq!(fx.converter.call_names(), vec!["bad.txt", "good.txt"]);
        assert_eq!(
            file_names(&fx.settings.paths.ome_folder),
            vec!["good.ome.tiff"]
        );
        assert_eq!(
            format_failure_list(state.failed_conversions()),
            vec![fx.raw_dir().join("bad.txt").display().to_string()]
        );
    }

    #[test]
    fn same_base_name_converted_once_per_run() {
        let mut fx = Fixture::new();
        fx.settings.acquisition.common_file_part = String::new();
        fx.create_output_dirs();
        fx.write_raw("x.mcd");
        fx.write_raw("x.txt");

        let state = run(&fx);

        assert_eq!(fx.converter.call_names(), vec!["x.mcd"]);
        assert_eq!(state.convert.unwrap().skipped, vec![fx.raw_dir().join("x.txt")]);
    }

    #[test]
    fn existing_output_is_skipped_by_substring() {
        let fx = Fixture::new();
        fx.write_ome("slide_01_ROI_1.ome.tiff");
        fx.create_output_dirs();
        fx.write_raw("slide_01.txt");

        let state = run(&fx);

        assert!(fx.converter.calls().is_empty());
        assert_eq!(state.convert.unwrap().skipped.len(), 1);
    }

    #[test]
    fn excluded_names_are_not_submitted() {
        let mut fx = Fixture::new();
        fx.settings.acquisition.exclude = vec!["tuningtape".to_string()];
        fx.create_output_dirs();
        fx.write_raw("tuningtape_01.txt");
        fx.write_raw("slide.txt");

        run(&fx);

        assert_eq!(fx.converter.call_names(), vec!["slide.txt"]);
    }

    #[test]
    fn missing_input_folder_is_fatal() {
        let mut fx = Fixture::new();
        fx.settings.paths.input_folders.push(fx.dir.path().join("missing"));
        fx.create_output_dirs();
        let ctx = fx.context();

        let err = ConvertStep::new().validate_input(&ctx).unwrap_err();
        assert!(matches!(err, StepError::NotFound { .. }));
    }

    #[test]
    fn disabled_by_phase_switch() {
        let mut fx = Fixture::new();
        fx.settings.phases.do_convert = false;
        let ctx = fx.context();
        assert!(!ConvertStep::new().is_enabled(&ctx));
    }
}

//! Pipeline orchestrator for coordinating a preprocessing run.
//!
//! This module provides the infrastructure for running multi-step
//! processing pipelines. Each run consists of a sequence of steps
//! that validate, execute, and record their results.
//!
//! # Architecture
//!
//! ```text
//! Pipeline
//!     ├── Step: Init
//!     ├── Step: Convert
//!     ├── Step: Export-Full
//!     └── Step: Export-Ilastik
//! ```
//!
//! # Example
//!
//! ```ignore
//! use imc_core::orchestrator::{create_standard_pipeline, Context, RunState};
//!
//! let pipeline = create_standard_pipeline();
//!
//! // the panel is read by the first enabled export step
//! let ctx = Context::new(settings, "imc_run", logger, runner.clone(), runner);
//! let mut state = RunState::new("imc_run");
//!
//! let result = pipeline.run(&ctx, &mut state)?;
//! println!("Failed: {:?}", state.failed_conversions());
//! ```

mod errors;
mod pipeline;
mod step;
pub mod steps;
#[cfg(test)]
pub(crate) mod test_support;
mod types;

pub use errors::{PipelineError, PipelineResult, StepError, StepResult};
pub use pipeline::{CancelHandle, Pipeline, PipelineRunResult};
pub use step::PipelineStep;
pub use steps::{format_failure_list, ConvertOutcome, ConvertStep, ExportStep, InitDirsStep};
pub use types::{
    Context, ConvertOutput, ExportOutput, InitOutput, RunState, StackVariant, StepOutcome,
};

/// Create a standard pipeline with all steps in the correct order.
///
/// 1. Init - create output directories (always runs)
/// 2. Convert - raw acquisitions to OME-TIFF (`do_convert`)
/// 3. Export-Full - "full" analysis stacks (`do_stacks`)
/// 4. Export-Ilastik - "ilastik" stacks (`do_ilastik`)
pub fn create_standard_pipeline() -> Pipeline {
    Pipeline::new()
        .with_step(InitDirsStep::new())
        .with_step(ConvertStep::new())
        .with_step(ExportStep::new(StackVariant::Full))
        .with_step(ExportStep::new(StackVariant::Ilastik))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::orchestrator::test_support::{file_names, Fixture, MockConverter};
    use crate::panel::PanelError;
    use std::sync::Arc;

    #[test]
    fn standard_pipeline_order() {
        assert_eq!(
            create_standard_pipeline().step_names(),
            vec!["Init", "Convert", "Export-Full", "Export-Ilastik"]
        );
    }

    #[test]
    fn full_run_end_to_end() {
        let mut fx = Fixture::new();
        fx.converter = Arc::new(MockConverter::failing_on(&["bad.txt"]));
        fx.write_raw("a.txt");
        fx.write_raw("b.txt");
        fx.write_raw("bad.txt");
        fx.write_raw("notes.csv");

        let ctx = fx.context();
        let mut state = RunState::new("e2e");
        let result = create_standard_pipeline().run(&ctx, &mut state).unwrap();

        assert!(result.all_completed());
        assert_eq!(state.failed_conversions(), [fx.raw_dir().join("bad.txt")]);
        assert_eq!(
            file_names(&fx.settings.paths.analysis_folder),
            vec!["a_full.tiff", "a_ilastik.tiff", "b_full.tiff", "b_ilastik.tiff"]
        );
        assert!(fx.settings.paths.cp_folder.is_dir());
        assert!(file_names(&fx.settings.paths.cp_folder).is_empty());
    }

    #[test]
    fn disabled_phases_are_reported_skipped() {
        let mut fx = Fixture::new();
        fx.settings.phases.do_convert = false;
        fx.settings.phases.do_ilastik = false;
        fx.write_ome("a.ome.tiff");

        let ctx = fx.context();
        let mut state = RunState::new("partial");
        let result = create_standard_pipeline().run(&ctx, &mut state).unwrap();

        assert_eq!(result.steps_completed, vec!["Init", "Export-Full"]);
        assert_eq!(result.steps_skipped, vec!["Convert", "Export-Ilastik"]);
        assert!(state.convert.is_none());
        assert_eq!(fx.exporter.basenames(), vec!["a_full"]);
    }

    #[test]
    fn missing_panel_fails_at_first_export() {
        let mut fx = Fixture::new();
        fx.settings.panel.csv = fx.dir.path().join("no_such_panel.csv");
        fx.write_raw("a.txt");

        let ctx = fx.context();
        let mut state = RunState::new("no-panel");
        let err = create_standard_pipeline().run(&ctx, &mut state).unwrap_err();

        assert_eq!(err.step_name(), Some("Export-Full"));
        match err {
            PipelineError::StepFailed { source, .. } => {
                assert!(matches!(source, StepError::Panel(PanelError::Read { .. })));
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(state.init.is_some());
        assert_eq!(
            state.convert.as_ref().unwrap().converted,
            vec![fx.raw_dir().join("a.txt")]
        );
        assert_eq!(file_names(&fx.settings.paths.ome_folder), vec!["a.ome.tiff"]);
        assert!(fx.exporter.calls().is_empty());
    }
}

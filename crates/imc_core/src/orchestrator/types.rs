//! Core types for the orchestrator pipeline.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::{Arc, OnceLock};

use serde::{Deserialize, Serialize};

use crate::config::{Settings, VariantSettings};
use crate::logging::RunLogger;
use crate::panel::{load_panel, Panel, PanelResult};
use crate::tools::{AcquisitionConverter, StackExporter};

/// Named analysis stack variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StackVariant {
    /// Channels for CellProfiler measurement.
    Full,
    /// Channels (plus sum) for ilastik pixel classification.
    Ilastik,
}

impl StackVariant {
    /// Both variants in run order.
    pub const ALL: [StackVariant; 2] = [StackVariant::Full, StackVariant::Ilastik];

    /// Lowercase variant name.
    pub fn name(&self) -> &'static str {
        match self {
            StackVariant::Full => "full",
            StackVariant::Ilastik => "ilastik",
        }
    }

    /// This variant's settings.
    pub fn settings<'a>(&self, settings: &'a Settings) -> &'a VariantSettings {
        match self {
            StackVariant::Full => &settings.stacks.full,
            StackVariant::Ilastik => &settings.stacks.ilastik,
        }
    }

    /// Whether this variant's phase switch is on.
    pub fn enabled(&self, settings: &Settings) -> bool {
        match self {
            StackVariant::Full => settings.phases.do_stacks,
            StackVariant::Ilastik => settings.phases.do_ilastik,
        }
    }
}

/// Read-only context passed to pipeline steps.
///
/// Contains the run configuration and shared resources that steps can
/// read but not modify. Mutable results go in `RunState`.
pub struct Context {
    /// Run configuration, resolved once.
    pub settings: Settings,
    /// Run name/identifier.
    pub run_name: String,
    /// Per-run logger.
    pub logger: Arc<RunLogger>,
    /// Acquisition → OME-TIFF routine.
    pub converter: Arc<dyn AcquisitionConverter>,
    /// OME-TIFF → analysis stack routine.
    pub exporter: Arc<dyn StackExporter>,
    /// Panel, read by the first export step that asks for it.
    panel: OnceLock<Panel>,
}

impl Context {
    /// Create a new context for a run.
    pub fn new(
        settings: Settings,
        run_name: impl Into<String>,
        logger: Arc<RunLogger>,
        converter: Arc<dyn AcquisitionConverter>,
        exporter: Arc<dyn StackExporter>,
    ) -> Self {
        Self {
            settings,
            run_name: run_name.into(),
            logger,
            converter,
            exporter,
            panel: OnceLock::new(),
        }
    }

    /// The run's panel, loaded on first use.
    ///
    /// A failed load is not cached; the next caller reads the file again.
    pub fn panel(&self) -> PanelResult<&Panel> {
        if let Some(panel) = self.panel.get() {
            return Ok(panel);
        }

        let panel = load_run_panel(&self.settings)?;
        self.logger.info(&format!(
            "Panel {}: {} channel(s)",
            panel.path.display(),
            panel.len()
        ));
        Ok(self.panel.get_or_init(|| panel))
    }
}

/// Load the panel with the selector columns of every enabled variant.
///
/// Columns of disabled variants are not required to exist.
fn load_run_panel(settings: &Settings) -> PanelResult<Panel> {
    let columns: Vec<&str> = StackVariant::ALL
        .iter()
        .filter(|v| v.enabled(settings))
        .map(|v| v.settings(settings).column.as_str())
        .collect();

    load_panel(&settings.panel.csv, &settings.panel.metal_column, &columns)
}

/// Mutable run state that accumulates results from pipeline steps.
///
/// Each step's output is stored in its own section; steps add new data
/// but do not overwrite what earlier steps recorded.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunState {
    /// Run identifier.
    pub run_id: String,
    /// When the run started.
    pub started_at: Option<String>,
    /// Directory initialization results.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub init: Option<InitOutput>,
    /// Conversion results.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub convert: Option<ConvertOutput>,
    /// Export results per variant.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub exports: BTreeMap<StackVariant, ExportOutput>,
}

impl RunState {
    /// Create a new run state with the given ID.
    pub fn new(run_id: impl Into<String>) -> Self {
        Self {
            run_id: run_id.into(),
            started_at: Some(chrono::Local::now().to_rfc3339()),
            ..Default::default()
        }
    }

    /// Acquisitions whose conversion failed (empty if conversion did not run).
    pub fn failed_conversions(&self) -> &[PathBuf] {
        self.convert
            .as_ref()
            .map(|c| c.failed.as_slice())
            .unwrap_or(&[])
    }

    /// Whether any conversion or export failure was recorded.
    pub fn has_failures(&self) -> bool {
        !self.failed_conversions().is_empty()
            || self.exports.values().any(|e| !e.failed.is_empty())
    }
}

/// Output from the directory initialization step.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InitOutput {
    /// Directories that had to be created.
    pub created: Vec<PathBuf>,
    /// Directories that already existed.
    pub existing: Vec<PathBuf>,
}

/// Output from the conversion step.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConvertOutput {
    /// Acquisitions converted in this run.
    pub converted: Vec<PathBuf>,
    /// Acquisitions skipped because an output already existed.
    pub skipped: Vec<PathBuf>,
    /// Acquisitions whose conversion failed, in processing order.
    pub failed: Vec<PathBuf>,
}

/// Output from one export step.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExportOutput {
    /// Output basenames written (`<base><suffix>`).
    pub written: Vec<String>,
    /// Images whose export failed (continue policy only).
    pub failed: Vec<PathBuf>,
}

/// Result of executing a pipeline step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepOutcome {
    /// Step completed successfully.
    Success,
    /// Step was skipped (disabled, not an error).
    Skipped(String),
}

//! Shared fixtures for step and pipeline tests.

use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::Mutex;
use tempfile::TempDir;

use crate::config::Settings;
use crate::logging::{init_test_tracing, LogConfig, RunLogger};
use crate::naming::{acquisition_base_name, OME_TIFF_SUFFIX};
use crate::tools::{
    AcquisitionConverter, ConvertRequest, ExportRequest, StackExporter, ToolError, ToolResult,
};

use super::types::Context;

pub(crate) const PANEL_CSV: &str = "\
Metal Tag,Target,full,ilastik
Ir191,DNA1,1,1
Sm149,CD11b,1,0
Er168,Ki67,0,1
";

/// Converter that writes `<base>.ome.tiff` and fails on chosen file names.
#[derive(Default)]
pub(crate) struct MockConverter {
    fail_on: BTreeSet<String>,
    calls: Mutex<Vec<PathBuf>>,
}

impl MockConverter {
    pub fn failing_on(names: &[&str]) -> Self {
        Self {
            fail_on: names.iter().map(|n| n.to_string()).collect(),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> Vec<PathBuf> {
        self.calls.lock().clone()
    }

    pub fn call_names(&self) -> Vec<String> {
        self.calls()
            .iter()
            .filter_map(|p| p.file_name())
            .map(|n| n.to_string_lossy().to_string())
            .collect()
    }
}

impl AcquisitionConverter for MockConverter {
    fn name(&self) -> &str {
        "mock-convert"
    }

    fn convert(&self, request: &ConvertRequest<'_>) -> ToolResult<()> {
        self.calls.lock().push(request.source.to_path_buf());

        let name = request
            .source
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        if self.fail_on.contains(&name) {
            return Err(ToolError::command_failed(
                "mock-convert",
                1,
                "Traceback (most recent call last):\nValueError: corrupt acquisition",
            ));
        }

        let out = request
            .out_dir
            .join(format!("{}{}", acquisition_base_name(&name), OME_TIFF_SUFFIX));
        fs::write(out, b"ome").map_err(|e| ToolError::other(e.to_string()))
    }
}

/// Exporter that writes `<basename>.tiff` and fails on chosen basenames.
#[derive(Default)]
pub(crate) struct MockExporter {
    fail_on: BTreeSet<String>,
    calls: Mutex<Vec<(String, String, bool)>>,
}

impl MockExporter {
    pub fn failing_on(basenames: &[&str]) -> Self {
        Self {
            fail_on: basenames.iter().map(|n| n.to_string()).collect(),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// `(basename, used_column, add_sum)` per call.
    pub fn calls(&self) -> Vec<(String, String, bool)> {
        self.calls.lock().clone()
    }

    pub fn basenames(&self) -> Vec<String> {
        self.calls().into_iter().map(|(b, _, _)| b).collect()
    }
}

impl StackExporter for MockExporter {
    fn name(&self) -> &str {
        "mock-export"
    }

    fn export(&self, request: &ExportRequest<'_>) -> ToolResult<()> {
        self.calls.lock().push((
            request.basename.to_string(),
            request.used_column.to_string(),
            request.add_sum,
        ));

        if self.fail_on.contains(request.basename) {
            return Err(ToolError::command_failed(
                "mock-export",
                1,
                "KeyError: 'Metal Tag'",
            ));
        }

        fs::write(request.out_dir.join(format!("{}.tiff", request.basename)), b"stack")
            .map_err(|e| ToolError::other(e.to_string()))
    }
}

/// Temporary project layout with settings pointing into it.
pub(crate) struct Fixture {
    pub dir: TempDir,
    pub settings: Settings,
    pub converter: Arc<MockConverter>,
    pub exporter: Arc<MockExporter>,
}

impl Fixture {
    pub fn new() -> Self {
        init_test_tracing();

        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        fs::create_dir_all(root.join("raw")).unwrap();
        fs::write(root.join("panel.csv"), PANEL_CSV).unwrap();

        let mut settings = Settings::default();
        settings.paths.input_folders = vec![root.join("raw")];
        settings.paths.ome_folder = root.join("ome");
        settings.paths.analysis_folder = root.join("analysis");
        settings.paths.cp_folder = root.join("cpoutput");
        settings.paths.logs_folder = root.join("logs");
        settings.panel.csv = root.join("panel.csv");

        Self {
            dir,
            settings,
            converter: Arc::new(MockConverter::default()),
            exporter: Arc::new(MockExporter::default()),
        }
    }

    pub fn raw_dir(&self) -> PathBuf {
        self.dir.path().join("raw")
    }

    pub fn write_raw(&self, name: &str) -> PathBuf {
        let path = self.raw_dir().join(name);
        fs::write(&path, b"raw").unwrap();
        path
    }

    pub fn write_ome(&self, name: &str) {
        fs::create_dir_all(&self.settings.paths.ome_folder).unwrap();
        fs::write(self.settings.paths.ome_folder.join(name), b"ome").unwrap();
    }

    pub fn create_output_dirs(&self) {
        for dir in self.settings.output_dirs() {
            fs::create_dir_all(dir).unwrap();
        }
    }

    /// Build a context from the current settings, loading the panel when an
    /// export phase is enabled.
    pub fn context(&self) -> Context {
        let logger = RunLogger::new(
            "test_run",
            &self.settings.paths.logs_folder,
            LogConfig::default(),
            None,
        )
        .unwrap();

        Context::new(
            self.settings.clone(),
            "test_run",
            Arc::new(logger),
            self.converter.clone(),
            self.exporter.clone(),
        )
    }
}

/// Sorted file names in `dir`.
pub(crate) fn file_names(dir: &Path) -> Vec<String> {
    crate::naming::list_files(dir)
        .unwrap()
        .into_iter()
        .map(|e| e.name)
        .collect()
}

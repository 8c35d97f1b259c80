//! `imctools` wrapper.
//!
//! Runs the configured Python interpreter with a short inline script that
//! calls `imctools.scripts`. All values travel through `sys.argv`, never
//! through string interpolation, so paths with quotes or spaces are safe.

use std::path::Path;
use std::process::{Command, Output};

use super::types::{
    AcquisitionConverter, ConvertRequest, ExportRequest, StackExporter, ToolError, ToolResult,
};

const TOOL_NAME: &str = "imctools";

/// `save_imc_to_tiff(source, tifftype=fmt, outpath=out_dir)`.
const CONVERT_SCRIPT: &str = "\
import sys
from imctools.scripts import imc2tiff
imc2tiff.save_imc_to_tiff(sys.argv[1], tifftype=sys.argv[2], outpath=sys.argv[3])
";

/// `ometiff_2_analysis(image, out_dir, basename, ...)`; flags arrive as "0"/"1".
const EXPORT_SCRIPT: &str = "\
import sys
from imctools.scripts import ometiff2analysis
a = sys.argv
ometiff2analysis.ometiff_2_analysis(
    a[1], a[2], a[3],
    pannelcsv=a[4], metalcolumn=a[5], usedcolumn=a[6],
    addsum=a[7] == '1', bigtiff=a[8] == '1', sort_channels=a[9] == '1')
";

/// Converter and exporter backed by the `imctools` Python package.
#[derive(Debug, Clone)]
pub struct ImctoolsRunner {
    python: String,
}

impl ImctoolsRunner {
    /// Create a runner using the given interpreter (e.g. `python3`).
    pub fn new(python: impl Into<String>) -> Self {
        Self {
            python: python.into(),
        }
    }

    /// The interpreter this runner invokes.
    pub fn python(&self) -> &str {
        &self.python
    }

    /// Arguments (after `-c <script>`) for a conversion.
    pub fn convert_args(request: &ConvertRequest<'_>) -> Vec<String> {
        vec![
            request.source.display().to_string(),
            request.format.id().to_string(),
            request.out_dir.display().to_string(),
        ]
    }

    /// Arguments (after `-c <script>`) for an export.
    pub fn export_args(request: &ExportRequest<'_>) -> Vec<String> {
        let flag = |b: bool| String::from(if b { "1" } else { "0" });
        vec![
            request.image.display().to_string(),
            request.out_dir.display().to_string(),
            request.basename.to_string(),
            request.panel_csv.display().to_string(),
            request.metal_column.to_string(),
            request.used_column.to_string(),
            flag(request.add_sum),
            flag(request.bigtiff),
            flag(request.sort_channels),
        ]
    }

    /// Run the interpreter with an inline script and arguments.
    fn run_script(&self, script: &str, args: &[String]) -> ToolResult<Output> {
        let mut cmd = Command::new(&self.python);
        cmd.arg("-c").arg(script).args(args);

        tracing::debug!("Running: {} -c <{}> {}", self.python, TOOL_NAME, args.join(" "));

        let output = cmd.output().map_err(|e| ToolError::Spawn {
            tool: format!("{} ({})", TOOL_NAME, self.python),
            source: e,
        })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(ToolError::command_failed(
                TOOL_NAME,
                output.status.code().unwrap_or(-1),
                stderr.to_string(),
            ));
        }

        Ok(output)
    }
}

impl Default for ImctoolsRunner {
    fn default() -> Self {
        Self::new("python3")
    }
}

fn require_file(path: &Path) -> ToolResult<()> {
    if path.is_file() {
        Ok(())
    } else {
        Err(ToolError::FileNotFound(path.to_path_buf()))
    }
}

impl AcquisitionConverter for ImctoolsRunner {
    fn name(&self) -> &str {
        TOOL_NAME
    }

    fn convert(&self, request: &ConvertRequest<'_>) -> ToolResult<()> {
        require_file(request.source)?;
        self.run_script(CONVERT_SCRIPT, &Self::convert_args(request))?;

        tracing::info!(
            "Converted {} to {} in {}",
            request.source.display(),
            request.format.id(),
            request.out_dir.display()
        );
        Ok(())
    }
}

impl StackExporter for ImctoolsRunner {
    fn name(&self) -> &str {
        TOOL_NAME
    }

    fn export(&self, request: &ExportRequest<'_>) -> ToolResult<()> {
        require_file(request.image)?;
        require_file(request.panel_csv)?;
        self.run_script(EXPORT_SCRIPT, &Self::export_args(request))?;

        tracing::info!(
            "Exported {} ({}) to {}",
            request.basename,
            request.used_column,
            request.out_dir.display()
        );
        Ok(())
    }
}

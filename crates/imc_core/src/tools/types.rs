//! Types for the external conversion and export routines.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Standardized image format produced by the converter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageFormat {
    /// OME-TIFF (`.ome.tiff`).
    #[default]
    Ome,
}

impl ImageFormat {
    /// Identifier understood by the converter.
    pub fn id(&self) -> &'static str {
        match self {
            ImageFormat::Ome => "ome",
        }
    }

    /// File suffix of images in this format.
    pub fn suffix(&self) -> &'static str {
        match self {
            ImageFormat::Ome => crate::naming::OME_TIFF_SUFFIX,
        }
    }
}

/// Error type for external routine calls.
#[derive(Error, Debug)]
pub enum ToolError {
    /// Input file not found.
    #[error("File not found: {}", .0.display())]
    FileNotFound(PathBuf),

    /// The tool could not be started.
    #[error("Failed to run {tool}: {source}")]
    Spawn {
        tool: String,
        #[source]
        source: std::io::Error,
    },

    /// The tool ran and reported failure.
    #[error("{tool} failed with exit code {exit_code}: {message}")]
    CommandFailed {
        tool: String,
        exit_code: i32,
        /// Last non-empty line of the tool output.
        message: String,
        /// Full captured stderr.
        output: String,
    },

    /// Any other failure reported by a routine.
    #[error("{0}")]
    Other(String),
}

impl ToolError {
    /// Create a command failed error from the captured stderr.
    pub fn command_failed(tool: impl Into<String>, exit_code: i32, output: impl Into<String>) -> Self {
        let output = output.into();
        let message = output
            .lines()
            .rev()
            .map(str::trim)
            .find(|l| !l.is_empty())
            .unwrap_or("no output")
            .to_string();
        Self::CommandFailed {
            tool: tool.into(),
            exit_code,
            message,
            output,
        }
    }

    /// Captured tool output, if any.
    pub fn output(&self) -> Option<&str> {
        match self {
            ToolError::CommandFailed { output, .. } => Some(output),
            _ => None,
        }
    }

    /// Create a generic error.
    pub fn other(message: impl Into<String>) -> Self {
        Self::Other(message.into())
    }
}

/// Result type for external routine calls.
pub type ToolResult<T> = Result<T, ToolError>;

/// Arguments of one acquisition conversion.
#[derive(Debug, Clone, Copy)]
pub struct ConvertRequest<'a> {
    /// Raw `.txt` / `.mcd` acquisition.
    pub source: &'a Path,
    /// Target format.
    pub format: ImageFormat,
    /// Folder receiving the converted image(s).
    pub out_dir: &'a Path,
}

/// Arguments of one analysis stack export.
#[derive(Debug, Clone, Copy)]
pub struct ExportRequest<'a> {
    /// Standardized source image.
    pub image: &'a Path,
    /// Folder receiving the stack.
    pub out_dir: &'a Path,
    /// Output name without extension (`<base><suffix>`).
    pub basename: &'a str,
    /// Panel CSV.
    pub panel_csv: &'a Path,
    /// Panel column with the metal tags.
    pub metal_column: &'a str,
    /// Panel column selecting the channels.
    pub used_column: &'a str,
    /// Append a sum channel.
    pub add_sum: bool,
    /// Write BigTIFF.
    pub bigtiff: bool,
    /// Sort channels by mass.
    pub sort_channels: bool,
}

/// Converts raw acquisitions into standardized images.
pub trait AcquisitionConverter: Send + Sync {
    /// Tool name for logs and errors.
    fn name(&self) -> &str;

    /// Convert one acquisition, writing into `request.out_dir`.
    fn convert(&self, request: &ConvertRequest<'_>) -> ToolResult<()>;
}

/// Writes channel-subset stacks from standardized images.
pub trait StackExporter: Send + Sync {
    /// Tool name for logs and errors.
    fn name(&self) -> &str;

    /// Export one stack, writing into `request.out_dir`.
    fn export(&self, request: &ExportRequest<'_>) -> ToolResult<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_ids() {
        assert_eq!(ImageFormat::Ome.id(), "ome");
        assert_eq!(ImageFormat::Ome.suffix(), ".ome.tiff");
    }

    #[test]
    fn tool_error_displays_context() {
        let err = ToolError::command_failed(
            "imctools",
            1,
            "Traceback (most recent call last):\n  File \"x.py\"\nKeyError: 'Metal Tag'\n\n",
        );
        let msg = err.to_string();
        assert!(msg.contains("imctools"));
        assert!(msg.contains("exit code 1"));
        assert!(msg.ends_with("KeyError: 'Metal Tag'"));
        assert!(err.output().unwrap().contains("Traceback"));
    }
}

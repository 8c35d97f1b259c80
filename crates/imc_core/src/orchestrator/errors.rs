//! Error types for the orchestrator pipeline.
//!
//! Errors carry context that chains through layers:
//! Run → Step → Operation → Detail

use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::panel::PanelError;
use crate::tools::ToolError;

/// Top-level pipeline error with run context.
#[derive(Error, Debug)]
pub enum PipelineError {
    /// A step failed during execution.
    #[error("Run '{run_name}' failed at step '{step_name}': {source}")]
    StepFailed {
        run_name: String,
        step_name: String,
        #[source]
        source: StepError,
    },

    /// Pipeline was cancelled.
    #[error("Run '{run_name}' was cancelled")]
    Cancelled { run_name: String },
}

impl PipelineError {
    /// Create a step failed error.
    pub fn step_failed(
        run_name: impl Into<String>,
        step_name: impl Into<String>,
        source: StepError,
    ) -> Self {
        Self::StepFailed {
            run_name: run_name.into(),
            step_name: step_name.into(),
            source,
        }
    }

    /// Create a cancelled error.
    pub fn cancelled(run_name: impl Into<String>) -> Self {
        Self::Cancelled {
            run_name: run_name.into(),
        }
    }

    /// Name of the failed step, if a step failed.
    pub fn step_name(&self) -> Option<&str> {
        match self {
            PipelineError::StepFailed { step_name, .. } => Some(step_name),
            _ => None,
        }
    }
}

/// Error from a pipeline step with operation context.
#[derive(Error, Debug)]
pub enum StepError {
    /// Input validation failed.
    #[error("Input validation failed: {0}")]
    InvalidInput(String),

    /// Output validation failed.
    #[error("Output validation failed: {0}")]
    InvalidOutput(String),

    /// An external routine failed.
    #[error("{operation}: {source}")]
    Tool {
        operation: String,
        #[source]
        source: ToolError,
    },

    /// File I/O error.
    #[error("I/O error in {operation}: {source}")]
    IoError {
        operation: String,
        #[source]
        source: io::Error,
    },

    /// A required file or directory was not found.
    #[error("Required path not found: {}", .path.display())]
    NotFound { path: PathBuf },

    /// The panel definition is unusable.
    #[error("Panel error: {0}")]
    Panel(#[from] PanelError),

    /// A precondition was not met.
    #[error("Precondition not met: {0}")]
    PreconditionFailed(String),
}

impl StepError {
    /// Create an invalid input error.
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput(message.into())
    }

    /// Create an invalid output error.
    pub fn invalid_output(message: impl Into<String>) -> Self {
        Self::InvalidOutput(message.into())
    }

    /// Wrap an external routine error with the operation it was doing.
    pub fn tool(operation: impl Into<String>, source: ToolError) -> Self {
        Self::Tool {
            operation: operation.into(),
            source,
        }
    }

    /// Create an I/O error with context.
    pub fn io_error(operation: impl Into<String>, source: io::Error) -> Self {
        Self::IoError {
            operation: operation.into(),
            source,
        }
    }

    /// Create a not found error.
    pub fn not_found(path: impl Into<PathBuf>) -> Self {
        Self::NotFound { path: path.into() }
    }

    /// Create a precondition failed error.
    pub fn precondition_failed(message: impl Into<String>) -> Self {
        Self::PreconditionFailed(message.into())
    }
}

/// Result type for step operations.
pub type StepResult<T> = Result<T, StepError>;

/// Result type for pipeline operations.
pub type PipelineResult<T> = Result<T, PipelineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn step_error_displays_context() {
        let err = StepError::tool(
            "Export a.ome.tiff (full)",
            ToolError::command_failed("imctools", 1, "KeyError: 'full'"),
        );
        let msg = err.to_string();
        assert!(msg.contains("a.ome.tiff"));
        assert!(msg.contains("exit code 1"));
    }

    #[test]
    fn pipeline_error_chains_context() {
        let step_err = StepError::not_found("/data/raw");
        let pipeline_err = PipelineError::step_failed("imc_run", "Convert", step_err);

        let msg = pipeline_err.to_string();
        assert!(msg.contains("imc_run"));
        assert!(msg.contains("Convert"));
        assert!(msg.contains("/data/raw"));
        assert_eq!(pipeline_err.step_name(), Some("Convert"));
    }
}

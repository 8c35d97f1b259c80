//! External imaging routines.
//!
//! Conversion (raw acquisition → OME-TIFF) and stack export (OME-TIFF →
//! channel subset) are opaque collaborators. The pipeline only talks to the
//! [`AcquisitionConverter`] and [`StackExporter`] traits; [`ImctoolsRunner`]
//! implements both by shelling out to Python `imctools`.

mod imctools;
mod types;

pub use imctools::ImctoolsRunner;
pub use types::{
    AcquisitionConverter, ConvertRequest, ExportRequest, ImageFormat, StackExporter, ToolError,
    ToolResult,
};

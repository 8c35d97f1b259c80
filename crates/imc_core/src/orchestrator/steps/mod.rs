//! Pipeline step implementations.
//!
//! Each step handles one phase of the preprocessing run.

mod convert;
mod export;
mod init_dirs;

pub use convert::{format_failure_list, ConvertOutcome, ConvertStep};
pub use export::ExportStep;
pub use init_dirs::InitDirsStep;

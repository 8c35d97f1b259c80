//! Panel definitions: which acquired channel goes into which stack.
//!
//! ```text
//!  panel.csv
//!      │
//!      ▼
//!  ┌────────┐
//!  │ loader │  parse CSV → Panel
//!  └────────┘
//!      │
//!      ▼
//!  ┌───────┐
//!  │ Panel │  ordered channels, key column, flag columns
//!  └───────┘
//!      │
//!      ▼
//!  selected_keys("full") / selected_keys("ilastik")
//! ```
//!
//! The panel is loaded once per run and only validated here; the export
//! routine re-reads the same file to build the stacks.

mod loader;
mod types;

pub use loader::{load_panel, parse_flag};
pub use types::{Channel, Panel, PanelError, PanelResult};

//! IMC Core - Backend logic for IMC preprocessing
//!
//! Converts raw imaging mass cytometry acquisitions (`.txt` / `.mcd`) into
//! OME-TIFF and derives per-image analysis stacks ("full" and "ilastik")
//! from a panel definition. The heavy lifting is delegated to external
//! routines behind the [`tools`] traits; this crate owns the batch logic.
//!
//! This crate has zero CLI dependencies. The `imc_app` crate is a thin
//! front end over [`orchestrator::create_standard_pipeline`].

pub mod config;
pub mod logging;
pub mod naming;
pub mod orchestrator;
pub mod panel;
pub mod tools;

/// Returns the crate version.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

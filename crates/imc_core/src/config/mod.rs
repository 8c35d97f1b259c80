//! Configuration management for IMC preprocessing.
//!
//! This module provides:
//! - TOML-based configuration with logical sections
//! - Atomic file writes (write to temp, then rename)
//! - Defaults for every missing field, plus explicit validation
//!
//! # Example
//!
//! ```no_run
//! use imc_core::config::ConfigManager;
//!
//! // Create manager and load (or create default) config
//! let mut config = ConfigManager::new("imc_preprocess.toml");
//! config.load_or_create().unwrap();
//!
//! // Override a phase switch for this run only
//! config.settings_mut().phases.do_ilastik = false;
//! config.validate().unwrap();
//!
//! println!("OME output: {}", config.settings().paths.ome_folder.display());
//! ```

mod manager;
mod settings;

pub use manager::{ConfigError, ConfigManager, ConfigResult};
pub use settings::{
    AcquisitionSettings, ConfigSection, ExportFailurePolicy, ExportSettings, LoggingSettings,
    PanelSettings, PathSettings, PhaseSettings, Settings, StackSettings, ToolSettings,
    VariantSettings,
};

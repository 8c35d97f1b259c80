//! Settings struct with TOML-based sections.
//!
//! Settings are organized into logical sections that map to TOML tables.
//! A run resolves them once; every step reads them through the pipeline
//! context and never mutates them.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::logging::LogLevel;
use crate::tools::ImageFormat;

/// Root settings structure containing all configuration sections.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Settings {
    /// Input and output directories.
    #[serde(default)]
    pub paths: PathSettings,

    /// Acquisition file selection.
    #[serde(default)]
    pub acquisition: AcquisitionSettings,

    /// Panel definition.
    #[serde(default)]
    pub panel: PanelSettings,

    /// Which phases run.
    #[serde(default)]
    pub phases: PhaseSettings,

    /// Per-variant stack settings.
    #[serde(default)]
    pub stacks: StackSettings,

    /// Export failure handling.
    #[serde(default)]
    pub export: ExportSettings,

    /// External tool locations.
    #[serde(default)]
    pub tools: ToolSettings,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingSettings,
}

impl Settings {
    /// Output directories that must exist before conversion starts.
    pub fn output_dirs(&self) -> Vec<PathBuf> {
        vec![
            self.paths.ome_folder.clone(),
            self.paths.analysis_folder.clone(),
            self.paths.cp_folder.clone(),
        ]
    }

    /// Whether any export phase is enabled.
    pub fn any_export_enabled(&self) -> bool {
        self.phases.do_stacks || self.phases.do_ilastik
    }

    /// Check values that serde defaults cannot guarantee.
    ///
    /// Returns one message per problem; an empty list means valid.
    pub fn validate(&self) -> Vec<String> {
        let mut problems = Vec::new();

        if self.phases.do_convert && self.paths.input_folders.is_empty() {
            problems.push("paths.input_folders is empty but do_convert is enabled".to_string());
        }
        if self.any_export_enabled() {
            if self.panel.csv.as_os_str().is_empty() {
                problems.push("panel.csv is required when a stack phase is enabled".to_string());
            }
            if self.panel.metal_column.trim().is_empty() {
                problems.push("panel.metal_column must not be empty".to_string());
            }
        }

        for (name, variant) in [("full", &self.stacks.full), ("ilastik", &self.stacks.ilastik)] {
            if variant.column.trim().is_empty() {
                problems.push(format!("stacks.{name}.column must not be empty"));
            }
            if variant.suffix.is_empty() {
                problems.push(format!("stacks.{name}.suffix must not be empty"));
            }
        }
        if self.stacks.full.suffix == self.stacks.ilastik.suffix {
            problems.push(format!(
                "stacks.full.suffix and stacks.ilastik.suffix are both '{}'",
                self.stacks.full.suffix
            ));
        }

        problems
    }
}

/// Directory configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathSettings {
    /// Folders holding the raw `.txt` / `.mcd` acquisitions.
    #[serde(default)]
    pub input_folders: Vec<PathBuf>,

    /// Output folder for standardized OME-TIFF images.
    #[serde(default = "default_ome_folder")]
    pub ome_folder: PathBuf,

    /// Output folder for analysis stacks.
    #[serde(default = "default_analysis_folder")]
    pub analysis_folder: PathBuf,

    /// Folder reserved for CellProfiler output (created, not populated).
    #[serde(default = "default_cp_folder")]
    pub cp_folder: PathBuf,

    /// Folder for run log files.
    #[serde(default = "default_logs_folder")]
    pub logs_folder: PathBuf,
}

fn default_ome_folder() -> PathBuf {
    PathBuf::from("ome")
}

fn default_analysis_folder() -> PathBuf {
    PathBuf::from("analysis")
}

fn default_cp_folder() -> PathBuf {
    PathBuf::from("cpoutput")
}

fn default_logs_folder() -> PathBuf {
    PathBuf::from(".logs")
}

impl Default for PathSettings {
    fn default() -> Self {
        Self {
            input_folders: Vec::new(),
            ome_folder: default_ome_folder(),
            analysis_folder: default_analysis_folder(),
            cp_folder: default_cp_folder(),
            logs_folder: default_logs_folder(),
        }
    }
}

/// Which acquisition files are converted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AcquisitionSettings {
    /// Substring every acquisition file name must contain ("" = all).
    #[serde(default = "default_common_file_part")]
    pub common_file_part: String,

    /// File names containing any of these are never converted.
    #[serde(default)]
    pub exclude: Vec<String>,

    /// Target format handed to the converter.
    #[serde(default)]
    pub target_format: ImageFormat,
}

fn default_common_file_part() -> String {
    ".txt".to_string()
}

impl Default for AcquisitionSettings {
    fn default() -> Self {
        Self {
            common_file_part: default_common_file_part(),
            exclude: Vec::new(),
            target_format: ImageFormat::default(),
        }
    }
}

/// Panel definition location and key column.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PanelSettings {
    /// Panel CSV path.
    #[serde(default)]
    pub csv: PathBuf,

    /// Column holding the metal tag.
    #[serde(default = "default_metal_column")]
    pub metal_column: String,
}

fn default_metal_column() -> String {
    "Metal Tag".to_string()
}

impl Default for PanelSettings {
    fn default() -> Self {
        Self {
            csv: PathBuf::new(),
            metal_column: default_metal_column(),
        }
    }
}

/// Phase switches.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PhaseSettings {
    /// Convert acquisitions to OME-TIFF.
    #[serde(default = "default_true")]
    pub do_convert: bool,

    /// Export the "full" stacks.
    #[serde(default = "default_true")]
    pub do_stacks: bool,

    /// Export the "ilastik" stacks.
    #[serde(default = "default_true")]
    pub do_ilastik: bool,
}

fn default_true() -> bool {
    true
}

impl Default for PhaseSettings {
    fn default() -> Self {
        Self {
            do_convert: true,
            do_stacks: true,
            do_ilastik: true,
        }
    }
}

/// Settings for one stack variant.
///
/// Read through [`StackSettings`], which fills keys missing from a
/// `[stacks.<variant>]` table with that variant's own defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VariantSettings {
    /// Panel column selecting the channels of this variant.
    pub column: String,
    /// Appended to the image base name.
    pub suffix: String,
    /// Append an aggregate sum channel.
    pub add_sum: bool,
    /// Write BigTIFF.
    pub bigtiff: bool,
    /// Sort channels by mass instead of panel order.
    pub sort_channels: bool,
}

impl VariantSettings {
    /// Defaults for the "full" variant.
    pub fn full() -> Self {
        Self {
            column: "full".to_string(),
            suffix: "_full".to_string(),
            add_sum: false,
            bigtiff: false,
            sort_channels: false,
        }
    }

    /// Defaults for the "ilastik" variant.
    pub fn ilastik() -> Self {
        Self {
            column: "ilastik".to_string(),
            suffix: "_ilastik".to_string(),
            add_sum: true,
            bigtiff: false,
            sort_channels: false,
        }
    }
}

/// Both stack variants.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(from = "StackTables")]
pub struct StackSettings {
    pub full: VariantSettings,
    pub ilastik: VariantSettings,
}

/// `[stacks.*]` tables as written, every key optional.
#[derive(Deserialize)]
struct StackTables {
    #[serde(default)]
    full: VariantTable,
    #[serde(default)]
    ilastik: VariantTable,
}

#[derive(Default, Deserialize)]
struct VariantTable {
    column: Option<String>,
    suffix: Option<String>,
    add_sum: Option<bool>,
    bigtiff: Option<bool>,
    sort_channels: Option<bool>,
}

impl VariantTable {
    fn over(self, base: VariantSettings) -> VariantSettings {
        VariantSettings {
            column: self.column.unwrap_or(base.column),
            suffix: self.suffix.unwrap_or(base.suffix),
            add_sum: self.add_sum.unwrap_or(base.add_sum),
            bigtiff: self.bigtiff.unwrap_or(base.bigtiff),
            sort_channels: self.sort_channels.unwrap_or(base.sort_channels),
        }
    }
}

impl From<StackTables> for StackSettings {
    fn from(tables: StackTables) -> Self {
        Self {
            full: tables.full.over(VariantSettings::full()),
            ilastik: tables.ilastik.over(VariantSettings::ilastik()),
        }
    }
}

impl Default for StackSettings {
    fn default() -> Self {
        Self {
            full: VariantSettings::full(),
            ilastik: VariantSettings::ilastik(),
        }
    }
}

/// What an export failure does to the run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFailurePolicy {
    /// Stop the run at the first failed stack.
    #[default]
    Abort,
    /// Record the failure and keep going.
    Continue,
}

/// Export configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExportSettings {
    #[serde(default)]
    pub on_failure: ExportFailurePolicy,
}

/// External tool configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolSettings {
    /// Python interpreter with `imctools` installed.
    #[serde(default = "default_python")]
    pub python: String,
}

fn default_python() -> String {
    "python3".to_string()
}

impl Default for ToolSettings {
    fn default() -> Self {
        Self {
            python: default_python(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingSettings {
    /// Minimum level written to the run log.
    #[serde(default)]
    pub level: LogLevel,

    /// Prefix lines with a timestamp.
    #[serde(default = "default_true")]
    pub show_timestamps: bool,

    /// Number of tool output lines kept for error diagnosis.
    #[serde(default = "default_error_tail")]
    pub error_tail: usize,
}

fn default_error_tail() -> usize {
    20
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: LogLevel::Info,
            show_timestamps: true,
            error_tail: default_error_tail(),
        }
    }
}

/// Names of config sections.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConfigSection {
    Paths,
    Acquisition,
    Panel,
    Phases,
    Stacks,
    Export,
    Tools,
    Logging,
}

impl ConfigSection {
    /// All sections in file order.
    pub const ALL: [ConfigSection; 8] = [
        ConfigSection::Paths,
        ConfigSection::Acquisition,
        ConfigSection::Panel,
        ConfigSection::Phases,
        ConfigSection::Stacks,
        ConfigSection::Export,
        ConfigSection::Tools,
        ConfigSection::Logging,
    ];

    /// Get the TOML table name for this section.
    pub fn table_name(&self) -> &'static str {
        match self {
            ConfigSection::Paths => "paths",
            ConfigSection::Acquisition => "acquisition",
            ConfigSection::Panel => "panel",
            ConfigSection::Phases => "phases",
            ConfigSection::Stacks => "stacks",
            ConfigSection::Export => "export",
            ConfigSection::Tools => "tools",
            ConfigSection::Logging => "logging",
        }
    }

    /// Comment written above the section in generated files.
    pub fn comment(&self) -> &'static str {
        match self {
            ConfigSection::Paths => "Input acquisition folders and output folders",
            ConfigSection::Acquisition => {
                "Acquisition file filter (\"\" converts every file in the input folders)"
            }
            ConfigSection::Panel => "Panel CSV with the metal tag column and one flag column per stack",
            ConfigSection::Phases => "Which steps to run",
            ConfigSection::Stacks => "Analysis stack variants",
            ConfigSection::Export => "Stack export failure handling: \"abort\" or \"continue\"",
            ConfigSection::Tools => "External tools",
            ConfigSection::Logging => "Logging configuration",
        }
    }
}

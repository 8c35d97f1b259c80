//! Config manager for loading and saving the run configuration.
//!
//! Key features:
//! - Atomic writes (write to temp file, then rename)
//! - Commented default file on first use
//! - Unknown top-level sections reported on load (via toml_edit)

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use thiserror::Error;
use toml_edit::DocumentMut;

use super::settings::{ConfigSection, Settings};

/// Errors that can occur during config operations.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] io::Error),

    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Failed to serialize config: {0}")]
    SerializeError(#[from] toml::ser::Error),

    #[error("Failed to parse config for inspection: {0}")]
    EditParseError(#[from] toml_edit::TomlError),

    #[error("Config file not found: {0}")]
    NotFound(PathBuf),

    #[error("Invalid config: {}", .0.join("; "))]
    Invalid(Vec<String>),
}

/// Result type for config operations.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Manages the run configuration file.
pub struct ConfigManager {
    /// Path to the config file.
    config_path: PathBuf,
    /// Current settings loaded in memory.
    settings: Settings,
    /// Top-level sections found on load that this version does not know.
    unknown_sections: Vec<String>,
}

impl ConfigManager {
    /// Create a new config manager with the given config file path.
    ///
    /// Does not load the config - call `load()` or `load_or_create()` after.
    pub fn new(config_path: impl Into<PathBuf>) -> Self {
        Self {
            config_path: config_path.into(),
            settings: Settings::default(),
            unknown_sections: Vec::new(),
        }
    }

    /// Get the config file path.
    pub fn path(&self) -> &Path {
        &self.config_path
    }

    /// Get a reference to the current settings.
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Get a mutable reference to the current settings.
    ///
    /// Used for command-line overrides before the run starts; changes stay
    /// in memory until `save()` is called.
    pub fn settings_mut(&mut self) -> &mut Settings {
        &mut self.settings
    }

    /// Consume the manager and return the settings.
    pub fn into_settings(self) -> Settings {
        self.settings
    }

    /// Unknown top-level sections seen by the last load.
    pub fn unknown_sections(&self) -> &[String] {
        &self.unknown_sections
    }

    /// Load config from file.
    ///
    /// Returns error if file doesn't exist.
    pub fn load(&mut self) -> ConfigResult<()> {
        if !self.config_path.exists() {
            return Err(ConfigError::NotFound(self.config_path.clone()));
        }

        let content = fs::read_to_string(&self.config_path)?;
        let (settings, unknown) = parse_and_inspect(&content)?;

        for section in &unknown {
            tracing::warn!(
                "Ignoring unknown section '{}' in {}",
                section,
                self.config_path.display()
            );
        }

        self.settings = settings;
        self.unknown_sections = unknown;
        Ok(())
    }

    /// Load config from file, creating it with defaults if it doesn't exist.
    pub fn load_or_create(&mut self) -> ConfigResult<()> {
        if self.config_path.exists() {
            self.load()
        } else {
            self.settings = Settings::default();
            self.unknown_sections.clear();
            self.save()
        }
    }

    /// Fail with every validation problem of the current settings.
    pub fn validate(&self) -> ConfigResult<()> {
        let problems = self.settings.validate();
        if problems.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Invalid(problems))
        }
    }

    /// Save the entire config atomically.
    ///
    /// Writes to a temp file first, then renames to ensure atomic write.
    pub fn save(&self) -> ConfigResult<()> {
        let content = self.generate_config_with_comments()?;
        self.atomic_write(&content)?;
        Ok(())
    }

    /// Generate config content with a comment above each section.
    fn generate_config_with_comments(&self) -> ConfigResult<String> {
        let mut output = String::new();

        output.push_str("# IMC preprocessing configuration\n");
        output.push_str("# Edit the paths below, then run `imc-preprocess --config <this file>`.\n\n");

        for section in ConfigSection::ALL {
            output.push_str(&format!("# {}\n", section.comment()));
            output.push_str(&self.section_toml(section)?);
            output.push('\n');
        }

        Ok(output)
    }

    /// Serialize one section as a standalone table (with its header).
    fn section_toml(&self, section: ConfigSection) -> ConfigResult<String> {
        let s = &self.settings;
        let name = section.table_name();
        let body = match section {
            ConfigSection::Paths => toml::to_string_pretty(&s.paths)?,
            ConfigSection::Acquisition => toml::to_string_pretty(&s.acquisition)?,
            ConfigSection::Panel => toml::to_string_pretty(&s.panel)?,
            ConfigSection::Phases => toml::to_string_pretty(&s.phases)?,
            ConfigSection::Export => toml::to_string_pretty(&s.export)?,
            ConfigSection::Tools => toml::to_string_pretty(&s.tools)?,
            ConfigSection::Logging => toml::to_string_pretty(&s.logging)?,
            ConfigSection::Stacks => {
                // Only sub-tables, no plain keys
                let full = toml::to_string_pretty(&s.stacks.full)?;
                let ilastik = toml::to_string_pretty(&s.stacks.ilastik)?;
                return Ok(format!(
                    "[{name}.full]\n{}\n[{name}.ilastik]\n{}",
                    full.trim_end(),
                    ilastik.trim_end()
                ) + "\n");
            }
        };

        Ok(format!("[{name}]\n{}\n", body.trim_end()))
    }

    /// Write content to config file atomically.
    ///
    /// Writes to a temp file first, then renames.
    fn atomic_write(&self, content: &str) -> io::Result<()> {
        // Create parent directory if needed
        if let Some(parent) = self.config_path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        // Write to temp file in same directory (for atomic rename)
        let temp_path = self.config_path.with_extension("toml.tmp");

        {
            let mut file = fs::File::create(&temp_path)?;
            file.write_all(content.as_bytes())?;
            file.sync_all()?;
        }

        fs::rename(&temp_path, &self.config_path)?;

        Ok(())
    }
}

/// Parse settings (defaults fill the gaps) and list unknown sections.
fn parse_and_inspect(content: &str) -> ConfigResult<(Settings, Vec<String>)> {
    let doc: DocumentMut = content.parse()?;
    let settings: Settings = toml::from_str(content)?;

    let unknown = doc
        .iter()
        .map(|(key, _)| key)
        .filter(|key| !ConfigSection::ALL.iter().any(|s| s.table_name() == *key))
        .map(str::to_string)
        .collect();

    Ok((settings, unknown))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ExportFailurePolicy;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn load_or_create_creates_default() {
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("conf").join("imc.toml");

        let mut manager = ConfigManager::new(&config_path);
        manager.load_or_create().unwrap();

        assert!(config_path.exists());
        let content = fs::read_to_string(&config_path).unwrap();
        assert!(content.contains("[paths]"));
        assert!(content.contains("[stacks.full]"));
        assert!(content.contains("[stacks.ilastik]"));
        assert!(content.contains("# Which steps to run"));
    }

    #[test]
    fn generated_file_parses_back() {
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("imc.toml");

        let mut manager = ConfigManager::new(&config_path);
        manager.settings_mut().export.on_failure = ExportFailurePolicy::Continue;
        manager.settings_mut().acquisition.exclude = vec!["tuningtape".to_string()];
        manager.save().unwrap();

        let mut reloaded = ConfigManager::new(&config_path);
        reloaded.load().unwrap();
        assert_eq!(reloaded.settings().export.on_failure, ExportFailurePolicy::Continue);
        assert_eq!(reloaded.settings().acquisition.exclude, vec!["tuningtape"]);
        assert_eq!(reloaded.settings().stacks.ilastik.suffix, "_ilastik");
        assert!(reloaded.unknown_sections().is_empty());
    }

    #[test]
    fn load_or_create_preserves_existing() {
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("imc.toml");

        fs::write(&config_path, "[paths]\nome_folder = \"my_ome\"\n").unwrap();

        let mut manager = ConfigManager::new(&config_path);
        manager.load_or_create().unwrap();

        assert_eq!(manager.settings().paths.ome_folder, PathBuf::from("my_ome"));
        // File is left untouched
        let content = fs::read_to_string(&config_path).unwrap();
        assert_eq!(content, "[paths]\nome_folder = \"my_ome\"\n");
    }

    #[test]
    fn load_reports_unknown_sections() {
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("imc.toml");
        fs::write(&config_path, "[paths]\n\n[resize]\nscale = 2\n").unwrap();

        let mut manager = ConfigManager::new(&config_path);
        manager.load().unwrap();
        assert_eq!(manager.unknown_sections(), ["resize".to_string()]);
    }

    #[test]
    fn load_missing_file_errors() {
        let dir = tempdir().unwrap();
        let mut manager = ConfigManager::new(dir.path().join("missing.toml"));
        assert!(matches!(manager.load(), Err(ConfigError::NotFound(_))));
    }

    #[test]
    fn validate_collects_all_problems() {
        let manager = ConfigManager::new("unused.toml");
        match manager.validate() {
            Err(ConfigError::Invalid(problems)) => assert!(problems.len() >= 2),
            other => panic!("expected Invalid, got {other:?}"),
        }
    }

    #[test]
    fn atomic_write_creates_no_temp_on_success() {
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("imc.toml");

        let mut manager = ConfigManager::new(&config_path);
        manager.load_or_create().unwrap();

        let temp_path = config_path.with_extension("toml.tmp");
        assert!(!temp_path.exists());
    }
}

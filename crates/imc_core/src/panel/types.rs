use std::collections::BTreeMap;
use std::path::PathBuf;

use thiserror::Error;

/// Errors from reading or validating a panel definition.
#[derive(Error, Debug)]
pub enum PanelError {
    #[error("Failed to read panel {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("Panel {path} has no column '{column}' (columns: {available})")]
    MissingColumn {
        path: PathBuf,
        column: String,
        available: String,
    },

    #[error("Panel row {row}: empty value in key column '{column}'")]
    EmptyKey { row: usize, column: String },

    #[error("Panel row {row}: duplicate key '{key}'")]
    DuplicateKey { row: usize, key: String },

    #[error("Panel row {row}, column '{column}': '{value}' is not a flag (expected 1/0, true/false, yes/no)")]
    InvalidFlag {
        row: usize,
        column: String,
        value: String,
    },
}

/// Result type for panel operations.
pub type PanelResult<T> = Result<T, PanelError>;

/// One row of the panel: a channel tag and its per-column flags.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Channel {
    /// Metal tag, e.g. `Ir191`.
    pub key: String,
    /// Flag column name → selected.
    pub flags: BTreeMap<String, bool>,
}

/// A loaded panel definition.
#[derive(Debug, Clone)]
pub struct Panel {
    /// File the panel was read from.
    pub path: PathBuf,
    /// Name of the key (metal tag) column.
    pub key_column: String,
    /// Flag columns that were parsed, in the order they were requested.
    pub flag_columns: Vec<String>,
    /// Channels in file order.
    pub channels: Vec<Channel>,
}

impl Panel {
    /// Number of channels.
    pub fn len(&self) -> usize {
        self.channels.len()
    }

    /// Whether the panel has no channels.
    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }

    /// Whether `column` was parsed as a flag column.
    pub fn has_column(&self, column: &str) -> bool {
        self.flag_columns.iter().any(|c| c == column)
    }

    /// Keys of the channels selected by `column`, in panel order.
    pub fn selected_keys(&self, column: &str) -> Vec<&str> {
        self.channels
            .iter()
            .filter(|ch| ch.flags.get(column).copied().unwrap_or(false))
            .map(|ch| ch.key.as_str())
            .collect()
    }
}

use std::collections::{BTreeMap, HashSet};
use std::path::Path;

use super::types::{Channel, Panel, PanelError, PanelResult};

/// Load a panel CSV and parse the given flag columns.
///
/// Layout: header row, one row per channel. `key_column` holds the metal
/// tag and must be unique and non-empty. Every name in `flag_columns` must
/// be present; other columns are ignored.
pub fn load_panel(path: &Path, key_column: &str, flag_columns: &[&str]) -> PanelResult<Panel> {
    let read_err = |source: csv::Error| PanelError::Read {
        path: path.to_path_buf(),
        source,
    };

    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(read_err)?;

    let headers: Vec<String> = reader
        .headers()
        .map_err(read_err)?
        .iter()
        .map(|h| h.to_string())
        .collect();

    let column_index = |column: &str| {
        headers
            .iter()
            .position(|h| h == column)
            .ok_or_else(|| PanelError::MissingColumn {
                path: path.to_path_buf(),
                column: column.to_string(),
                available: headers.join(", "),
            })
    };

    let key_idx = column_index(key_column)?;
    let flag_idx: Vec<(String, usize)> = flag_columns
        .iter()
        .map(|col| column_index(*col).map(|i| (col.to_string(), i)))
        .collect::<PanelResult<_>>()?;

    let mut channels = Vec::new();
    let mut seen = HashSet::new();

    for (row_no, result) in reader.records().enumerate() {
        // 1-based, header is row 1
        let row = row_no + 2;
        let record = result.map_err(read_err)?;

        let key = record.get(key_idx).unwrap_or("").to_string();
        if key.is_empty() {
            return Err(PanelError::EmptyKey {
                row,
                column: key_column.to_string(),
            });
        }
        if !seen.insert(key.clone()) {
            return Err(PanelError::DuplicateKey { row, key });
        }

        let mut flags = BTreeMap::new();
        for (col, idx) in &flag_idx {
            let value = record.get(*idx).unwrap_or("");
            let flag = parse_flag(value).ok_or_else(|| PanelError::InvalidFlag {
                row,
                column: col.clone(),
                value: value.to_string(),
            })?;
            flags.insert(col.clone(), flag);
        }

        channels.push(Channel { key, flags });
    }

    Ok(Panel {
        path: path.to_path_buf(),
        key_column: key_column.to_string(),
        flag_columns: flag_idx.into_iter().map(|(c, _)| c).collect(),
        channels,
    })
}

/// Interpret a panel flag cell. Empty means "not selected".
pub fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "" | "0" | "0.0" | "false" | "no" | "n" => Some(false),
        "1" | "1.0" | "true" | "yes" | "y" => Some(true),
        _ => None,
    }
}

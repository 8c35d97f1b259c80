//! File naming rules shared by the conversion and export steps.
//!
//! Acquisition base names are derived by stripping a trailing `.txt` or
//! `.mcd`; image base names by stripping `.ome.tiff`. The "already
//! converted" check is plain substring containment of an acquisition base
//! name in any standardized-output file name.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Suffixes stripped from acquisition file names, applied in this order.
pub const ACQUISITION_SUFFIXES: [&str; 2] = [".txt", ".mcd"];

/// Suffix of standardized (OME-TIFF) images written by the converter.
pub const OME_TIFF_SUFFIX: &str = ".ome.tiff";

/// Strip the acquisition suffixes from a file name.
///
/// `.txt` is removed first, then `.mcd`, so `run.mcd.txt` becomes `run`.
pub fn acquisition_base_name(file_name: &str) -> &str {
    ACQUISITION_SUFFIXES
        .iter()
        .fold(file_name, |name, suffix| {
            name.strip_suffix(suffix).unwrap_or(name)
        })
}

/// Strip the OME-TIFF suffix from a file name (unchanged if absent).
pub fn image_base_name(file_name: &str) -> &str {
    file_name.strip_suffix(OME_TIFF_SUFFIX).unwrap_or(file_name)
}

/// Output basename for one image and variant: `<base><suffix>`.
pub fn variant_output_name(image_file_name: &str, suffix: &str) -> String {
    format!("{}{}", image_base_name(image_file_name), suffix)
}

/// Whether `file_name` passes the acquisition filter.
///
/// An empty `common_part` matches everything; any exclusion substring
/// rejects the name.
pub fn matches_filter(file_name: &str, common_part: &str, exclude: &[String]) -> bool {
    file_name.contains(common_part)
        && !exclude
            .iter()
            .any(|ex| !ex.is_empty() && file_name.contains(ex.as_str()))
}

/// A directory entry that is a regular file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileEntry {
    /// File name (lossy UTF-8).
    pub name: String,
    /// Full path.
    pub path: PathBuf,
}

/// List the regular files in a directory, sorted by name.
///
/// Sub-directories are ignored.
pub fn list_files(dir: &Path) -> io::Result<Vec<FileEntry>> {
    let mut entries = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        if !entry.file_type()?.is_file() {
            continue;
        }
        entries.push(FileEntry {
            name: entry.file_name().to_string_lossy().to_string(),
            path: entry.path(),
        });
    }
    entries.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(entries)
}

/// Snapshot of the file names in the standardized-output directory.
///
/// Built once per conversion phase. Names of acquisitions converted during
/// the phase are recorded so that later inputs sharing a base name are
/// treated as converted, the same as a fresh listing would.
#[derive(Debug, Clone, Default)]
pub struct OutputIndex {
    names: Vec<String>,
}

impl OutputIndex {
    /// Scan `dir` once.
    pub fn scan(dir: &Path) -> io::Result<Self> {
        let names = list_files(dir)?.into_iter().map(|e| e.name).collect();
        Ok(Self { names })
    }

    /// Build from explicit names.
    pub fn from_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            names: names.into_iter().map(Into::into).collect(),
        }
    }

    /// Whether any known output name contains `base_name`.
    pub fn contains_base(&self, base_name: &str) -> bool {
        self.names.iter().any(|n| n.contains(base_name))
    }

    /// Record an output produced during this phase.
    pub fn record(&mut self, name: impl Into<String>) {
        self.names.push(name.into());
    }

    /// Number of known output names.
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// Whether the index is empty.
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn strips_acquisition_suffixes() {
        assert_eq!(acquisition_base_name("sample1.txt"), "sample1");
        assert_eq!(acquisition_base_name("sample1.mcd"), "sample1");
        assert_eq!(acquisition_base_name("run.mcd.txt"), "run");
        assert_eq!(acquisition_base_name("readme.md"), "readme.md");
        // Suffix removal, not character trimming
        assert_eq!(acquisition_base_name("test.txt"), "test");
    }

    #[test]
    fn strips_ome_suffix() {
        assert_eq!(image_base_name("a.ome.tiff"), "a");
        assert_eq!(image_base_name("notes.tiff"), "notes.tiff");
        assert_eq!(variant_output_name("a.ome.tiff", "_full"), "a_full");
    }

    #[test]
    fn filter_semantics() {
        assert!(matches_filter("sample1.txt", ".txt", &[]));
        assert!(!matches_filter("sample1.mcd", ".txt", &[]));
        assert!(matches_filter("anything", "", &[]));

        let exclude = vec!["tuningtape".to_string()];
        assert!(!matches_filter("tuningtape_01.txt", ".txt", &exclude));
        assert!(matches_filter("slide_01.txt", ".txt", &exclude));

        // Empty exclusion entries never reject
        assert!(matches_filter("slide_01.txt", ".txt", &[String::new()]));
    }

    #[test]
    fn list_files_skips_directories() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("b.txt"), "b").unwrap();
        fs::write(dir.path().join("a.txt"), "a").unwrap();
        fs::create_dir(dir.path().join("sub.txt")).unwrap();

        let names: Vec<String> = list_files(dir.path())
            .unwrap()
            .into_iter()
            .map(|e| e.name)
            .collect();
        assert_eq!(names, vec!["a.txt", "b.txt"]);
    }

    #[test]
    fn output_index_matches_substrings() {
        let mut index = OutputIndex::from_names(["slide_s0_a1_ac.ome.tiff"]);
        assert!(index.contains_base("slide_s0_a1"));
        assert!(!index.contains_base("slide_s0_a2"));

        index.record("slide_s0_a2");
        assert!(index.contains_base("slide_s0_a2"));
        assert_eq!(index.len(), 2);
    }
}

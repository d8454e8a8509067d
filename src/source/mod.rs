// src/source/mod.rs
//! Format-specific readers that turn one input file into ordered rows.

pub mod csv;
pub mod json;
pub mod xml;

use std::{fs, io, path::Path};

use tracing::debug;

use crate::error::{EtlError, Result};

/// One input row: column name → text value, in the order the file gave them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawRow {
    fields: Vec<(String, String)>,
}

impl RawRow {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a field. A repeated key overwrites the earlier value in place.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        match self.fields.iter_mut().find(|(k, _)| *k == key) {
            Some(slot) => slot.1 = value,
            None => self.fields.push((key, value)),
        }
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(k, _)| k.as_str())
    }

    pub fn values(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(_, v)| v.as_str())
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for RawRow {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut row = RawRow::new();
        for (k, v) in iter {
            row.insert(k, v);
        }
        row
    }
}

/// What a reader hands back: the header list plus every row.
///
/// CSV knows its headers even without data rows; JSON and XML take them
/// from the first row.
#[derive(Debug, Clone, Default)]
pub struct RowSet {
    pub headers: Vec<String>,
    pub rows: Vec<RawRow>,
}

impl RowSet {
    /// Build a set whose headers are the keys of the first row.
    pub fn from_rows(rows: Vec<RawRow>) -> Self {
        let headers = rows
            .first()
            .map(|r| r.keys().map(str::to_string).collect())
            .unwrap_or_default();
        Self { headers, rows }
    }
}

/// Produce rows from the text of one input file.
pub trait RowSource {
    /// `file` is only used to label errors.
    fn read_rows(&self, file: &str, text: &str) -> Result<RowSet>;
}

/// Supported input formats, selected by file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceFormat {
    Csv,
    Json,
    Xml,
}

impl SourceFormat {
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "csv" => Some(SourceFormat::Csv),
            "json" => Some(SourceFormat::Json),
            "xml" => Some(SourceFormat::Xml),
            _ => None,
        }
    }

    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|e| e.to_str())
            .and_then(Self::from_extension)
    }

    pub fn reader(self) -> &'static dyn RowSource {
        match self {
            SourceFormat::Csv => &csv::CsvSource,
            SourceFormat::Json => &json::JsonSource,
            SourceFormat::Xml => &xml::XmlSource,
        }
    }
}

/// Relation name for an input: the file name up to its first `.`.
pub fn source_id(path: &Path) -> String {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();
    match name.split_once('.') {
        Some((stem, _)) => stem.to_string(),
        None => name,
    }
}

/// Open `path`, pick the reader from its extension and parse every row.
#[tracing::instrument(level = "debug", skip(path), fields(path = %path.display()))]
pub fn read_source(path: &Path) -> Result<RowSet> {
    let label = path.display().to_string();
    let text = match fs::read_to_string(path) {
        Ok(t) => t,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            return Err(EtlError::NotFound(path.to_path_buf()))
        }
        Err(e) => {
            return Err(EtlError::Read {
                path: path.to_path_buf(),
                source: e,
            })
        }
    };

    let format = SourceFormat::from_path(path)
        .ok_or_else(|| EtlError::format(&label, "unsupported file extension"))?;
    debug!(?format, bytes = text.len(), "parsing source");

    format.reader().read_rows(&label, &text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use std::path::PathBuf;
    use tempfile::tempdir;

    #[test]
    fn repeated_key_overwrites_in_place() {
        let mut row = RawRow::new();
        row.insert("D1", "a");
        row.insert("M1", "1");
        row.insert("D1", "b");
        assert_eq!(row.keys().collect::<Vec<_>>(), vec!["D1", "M1"]);
        assert_eq!(row.values().collect::<Vec<_>>(), vec!["b", "1"]);
    }

    #[test]
    fn extension_lookup() {
        assert_eq!(
            SourceFormat::from_path(Path::new("x.CSV")),
            Some(SourceFormat::Csv)
        );
        assert_eq!(
            SourceFormat::from_path(Path::new("dir/y.json")),
            Some(SourceFormat::Json)
        );
        assert_eq!(
            SourceFormat::from_path(Path::new("z.xml")),
            Some(SourceFormat::Xml)
        );
        assert_eq!(SourceFormat::from_path(Path::new("z.txt")), None);
        assert_eq!(SourceFormat::from_path(Path::new("noext")), None);
    }

    #[test]
    fn id_is_name_before_first_dot() {
        assert_eq!(source_id(Path::new("data/csv_data_1.csv")), "csv_data_1");
        assert_eq!(source_id(Path::new("a.b.json")), "a");
        assert_eq!(source_id(Path::new("plain")), "plain");
    }

    #[test]
    fn missing_file_is_not_found() {
        let err = read_source(&PathBuf::from("definitely/not/here.csv")).unwrap_err();
        assert!(matches!(err, EtlError::NotFound(_)));
    }

    #[test]
    fn missing_file_with_unknown_extension_is_not_found() {
        let err = read_source(&PathBuf::from("definitely/not/here.txt")).unwrap_err();
        assert!(matches!(err, EtlError::NotFound(_)));
    }

    #[test]
    fn unknown_extension_is_format_error() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("data.txt");
        fs::write(&path, "D1,M1\na,1\n")?;
        let err = read_source(&path).unwrap_err();
        assert!(matches!(err, EtlError::Format { .. }));
        Ok(())
    }

    #[test]
    fn dispatches_on_extension() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("data.csv");
        fs::write(&path, "D1,M1\na,1\n")?;
        let set = read_source(&path)?;
        assert_eq!(set.headers, vec!["D1", "M1"]);
        assert_eq!(set.rows.len(), 1);
        Ok(())
    }
}

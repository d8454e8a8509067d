// src/source/csv.rs

use csv::ReaderBuilder;

use super::{RawRow, RowSet, RowSource};
use crate::error::{EtlError, Result};

/// First record is the header; each later record becomes a row keyed by it.
pub struct CsvSource;

impl RowSource for CsvSource {
    fn read_rows(&self, file: &str, text: &str) -> Result<RowSet> {
        let mut rdr = ReaderBuilder::new()
            .has_headers(true)
            .flexible(false)
            .from_reader(text.as_bytes());

        let headers: Vec<String> = rdr
            .headers()
            .map_err(|e| EtlError::format(file, format!("CSV header: {}", e)))?
            .iter()
            .map(str::to_string)
            .collect();

        let mut rows = Vec::new();
        for (idx, result) in rdr.records().enumerate() {
            let record = result
                .map_err(|e| EtlError::format(file, format!("CSV record {}: {}", idx + 1, e)))?;
            rows.push(
                headers
                    .iter()
                    .zip(record.iter())
                    .collect::<RawRow>(),
            );
        }

        Ok(RowSet { headers, rows })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_header_and_rows() {
        let set = CsvSource
            .read_rows("t.csv", "D1,D2,M1\na,b,1\nc,d,2\n")
            .unwrap();
        assert_eq!(set.headers, vec!["D1", "D2", "M1"]);
        assert_eq!(set.rows.len(), 2);
        assert_eq!(set.rows[1].get("D2"), Some("d"));
        assert_eq!(set.rows[1].values().collect::<Vec<_>>(), vec!["c", "d", "2"]);
    }

    #[test]
    fn header_only_is_empty_source() {
        let set = CsvSource.read_rows("t.csv", "D1,M1\n").unwrap();
        assert_eq!(set.headers, vec!["D1", "M1"]);
        assert!(set.rows.is_empty());
    }

    #[test]
    fn ragged_record_is_rejected() {
        let err = CsvSource
            .read_rows("t.csv", "D1,M1\na,1\nb\n")
            .unwrap_err();
        assert!(matches!(err, EtlError::Format { .. }));
    }
}

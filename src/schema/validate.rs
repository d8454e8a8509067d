// src/schema/validate.rs

use std::collections::HashSet;

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

use super::types::{ColumnKind, SourceTable};
use crate::error::{EtlError, Result};
use crate::source::{RawRow, RowSet};

// Digits are ASCII only: measures are summed as decimal text and the regex
// crate's `\d` would also admit other scripts' digits.
static HEADER_D: Lazy<Regex> = Lazy::new(|| Regex::new(r"^D[0-9]+$").unwrap());
static HEADER_M: Lazy<Regex> = Lazy::new(|| Regex::new(r"^M[0-9]+$").unwrap());
static VALUE_D: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\w+$").unwrap());
static VALUE_M: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[0-9]+$").unwrap());

/// Classify a single header, or `None` when it follows neither pattern.
pub fn classify_header(header: &str) -> Option<ColumnKind> {
    if HEADER_D.is_match(header) {
        Some(ColumnKind::Dimension)
    } else if HEADER_M.is_match(header) {
        Some(ColumnKind::Measure)
    } else {
        None
    }
}

/// Check every header and return how many are dimension headers.
///
/// Only the count matters: the numeric suffixes need not be contiguous and
/// the `D` headers need not come first.
pub fn validate_headers(file: &str, headers: &[String]) -> Result<usize> {
    let mut seen = HashSet::with_capacity(headers.len());
    let mut dimensions = 0;
    for header in headers {
        match classify_header(header) {
            Some(ColumnKind::Dimension) => dimensions += 1,
            Some(ColumnKind::Measure) => {}
            None => {
                return Err(EtlError::format(
                    file,
                    format!("header `{}` is neither D<n> nor M<n>", header),
                ))
            }
        }
        if !seen.insert(header.as_str()) {
            return Err(EtlError::format(
                file,
                format!("header `{}` appears more than once", header),
            ));
        }
    }
    Ok(dimensions)
}

/// Check one row positionally: values before `dimensions` must be word
/// characters, the rest must be unsigned integer literals.
pub fn validate_row(file: &str, row: &RawRow, dimensions: usize) -> Result<()> {
    for (i, value) in row.values().enumerate() {
        let (pattern, kind) = if i < dimensions {
            (&*VALUE_D, "dimension")
        } else {
            (&*VALUE_M, "measure")
        };
        if !pattern.is_match(value) {
            return Err(EtlError::format(
                file,
                format!("{} value `{}` at position {} is invalid", kind, value, i),
            ));
        }
    }
    Ok(())
}

/// Validate a whole row set. Any bad row rejects the entire source.
pub fn validate_source(id: &str, file: &str, set: RowSet) -> Result<SourceTable> {
    if set.headers.is_empty() {
        return Err(EtlError::format(file, "source has no columns"));
    }
    let dimensions = validate_headers(file, &set.headers)?;

    for (idx, row) in set.rows.iter().enumerate() {
        if !row.keys().eq(set.headers.iter().map(String::as_str)) {
            return Err(EtlError::format(
                file,
                format!("row {} does not match the header columns", idx),
            ));
        }
        validate_row(file, row, dimensions)?;
    }

    debug!(
        id,
        dimensions,
        rows = set.rows.len(),
        "source passed validation"
    );
    Ok(SourceTable {
        id: id.to_string(),
        headers: set.headers,
        rows: set.rows,
        dimensions,
    })
}

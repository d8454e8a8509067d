// src/schema/types.rs

use std::fmt;

use crate::source::RawRow;

/// Role of a column under the dimension/measure convention.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ColumnKind {
    Dimension,
    Measure,
}

impl ColumnKind {
    pub fn prefix(self) -> char {
        match self {
            ColumnKind::Dimension => 'D',
            ColumnKind::Measure => 'M',
        }
    }
}

/// A generated column name such as `D3` or `M1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Column {
    pub kind: ColumnKind,
    pub index: usize,
}

impl Column {
    pub fn dimension(index: usize) -> Self {
        Self {
            kind: ColumnKind::Dimension,
            index,
        }
    }

    pub fn measure(index: usize) -> Self {
        Self {
            kind: ColumnKind::Measure,
            index,
        }
    }

    pub fn name(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Column {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.kind.prefix(), self.index)
    }
}

/// A parsed input that passed validation and is ready to load.
#[derive(Debug, Clone)]
pub struct SourceTable {
    /// Relation name, derived from the file name.
    pub id: String,
    pub headers: Vec<String>,
    pub rows: Vec<RawRow>,
    /// Number of `D` headers; the first `dimensions` values of each row are
    /// dimension values.
    pub dimensions: usize,
}

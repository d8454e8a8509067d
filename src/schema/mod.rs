pub mod types;
pub mod validate;

pub use types::{Column, ColumnKind, SourceTable};
pub use validate::{classify_header, validate_headers, validate_row, validate_source};

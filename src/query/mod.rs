pub mod builder;
pub mod index;

pub use builder::{column_universe, QueryBuilder};
pub use index::{DimensionIndex, LoadedSource, SourceRegistry};

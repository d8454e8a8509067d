pub mod config;
pub mod error;
pub mod pipeline;
pub mod query;
pub mod report;
pub mod schema;
pub mod source;
pub mod store;

pub use error::{EtlError, Result};
pub use pipeline::{run, NarrowSourcePolicy, Pipeline, PipelineConfig, RunSummary};

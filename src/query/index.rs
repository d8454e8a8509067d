// src/query/index.rs

use crate::error::{EtlError, Result};

/// Dimension counts recorded for every loaded source.
#[derive(Debug, Default, Clone)]
pub struct DimensionIndex {
    recorded: Vec<usize>,
}

impl DimensionIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, dimensions: usize) {
        self.recorded.push(dimensions);
    }

    /// Largest count recorded so far.
    pub fn current_max(&self) -> Result<usize> {
        self.recorded.iter().copied().max().ok_or(EtlError::EmptyIndex)
    }
}

/// A source that made it into the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadedSource {
    pub id: String,
    pub file: String,
    pub columns: Vec<String>,
}

impl LoadedSource {
    /// True when the relation has every one of `columns`.
    pub fn covers(&self, columns: &[String]) -> bool {
        columns.iter().all(|c| self.columns.contains(c))
    }
}

/// Loaded sources in processing order; this is the union order of the
/// consolidated report.
#[derive(Debug, Default, Clone)]
pub struct SourceRegistry {
    sources: Vec<LoadedSource>,
}

impl SourceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, source: LoadedSource) {
        self.sources.push(source);
    }

    pub fn ids(&self) -> Vec<&str> {
        self.sources.iter().map(|s| s.id.as_str()).collect()
    }

    pub fn sources(&self) -> &[LoadedSource] {
        &self.sources
    }

    /// Split into sources that have all of `columns` and those missing some.
    pub fn partition_covering(
        &self,
        columns: &[String],
    ) -> (Vec<&LoadedSource>, Vec<&LoadedSource>) {
        self.sources.iter().partition(|s| s.covers(columns))
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }
}

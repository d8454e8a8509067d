// src/pipeline.rs
//! One consolidation run: owns the store and everything accumulated while
//! loading sources, then renders both reports.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::Result;
use crate::query::{DimensionIndex, LoadedSource, QueryBuilder, SourceRegistry};
use crate::report::{self, Report, ReportKind, ResultTable};
use crate::schema::validate_source;
use crate::source::{read_source, source_id};
use crate::store::{load_table, Store};

/// What to do with a loaded source that lacks some column of the universe.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum NarrowSourcePolicy {
    /// Keep it in the union; the consolidated query then fails.
    #[default]
    Fail,
    /// Leave it out of both reports and list it as skipped.
    Exclude,
}

#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub inputs: Vec<PathBuf>,
    pub consolidated_path: PathBuf,
    pub aggregated_path: PathBuf,
    /// Backing file for the store; a temporary directory when unset.
    pub store_path: Option<PathBuf>,
    pub narrow_sources: NarrowSourcePolicy,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            inputs: Vec::new(),
            consolidated_path: PathBuf::from("./basic_results.tsv"),
            aggregated_path: PathBuf::from("./advanced_results.tsv"),
            store_path: None,
            narrow_sources: NarrowSourcePolicy::Fail,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedSource {
    pub file: String,
    pub reason: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    /// Files whose rows made it into the reports, in processing order.
    pub processed: Vec<String>,
    pub skipped: Vec<SkippedSource>,
    pub consolidated_rows: usize,
    pub aggregated_rows: usize,
}

impl RunSummary {
    pub fn reports_written(&self) -> bool {
        !self.processed.is_empty()
    }
}

/// State of a single run. Dropping it tears the store down.
pub struct Pipeline {
    config: PipelineConfig,
    store: Store,
    index: DimensionIndex,
    registry: SourceRegistry,
    skipped: Vec<SkippedSource>,
    started_at: DateTime<Utc>,
}

impl Pipeline {
    pub fn open(config: PipelineConfig) -> Result<Self> {
        let store = match &config.store_path {
            Some(path) => Store::open_at(path)?,
            None => Store::open_temp()?,
        };
        Ok(Self {
            config,
            store,
            index: DimensionIndex::new(),
            registry: SourceRegistry::new(),
            skipped: Vec::new(),
            started_at: Utc::now(),
        })
    }

    pub fn index(&self) -> &DimensionIndex {
        &self.index
    }

    pub fn registry(&self) -> &SourceRegistry {
        &self.registry
    }

    pub fn skipped(&self) -> &[SkippedSource] {
        &self.skipped
    }

    /// Read, validate and load one input.
    ///
    /// Returns `Ok(false)` when the file was skipped for a per-file reason;
    /// store failures are returned as errors.
    #[tracing::instrument(level = "info", skip(self, path), fields(path = %path.display()))]
    pub fn ingest(&mut self, path: &Path) -> Result<bool> {
        let file = path.display().to_string();
        let id = source_id(path);

        let table = match read_source(path).and_then(|set| validate_source(&id, &file, set)) {
            Ok(table) => table,
            Err(e) if e.is_recoverable() => {
                warn!(error = %e, "skipping source");
                self.skipped.push(SkippedSource {
                    file,
                    reason: e.to_string(),
                });
                return Ok(false);
            }
            Err(e) => return Err(e),
        };

        load_table(&mut self.store, &table)?;
        self.index.record(table.dimensions);
        self.registry.push(LoadedSource {
            id: table.id,
            file,
            columns: table.headers,
        });
        Ok(true)
    }

    /// Build both report queries over the loaded sources.
    ///
    /// Also returns the sources that went into the union; with
    /// [`NarrowSourcePolicy::Exclude`] that can be fewer than were loaded.
    /// When exclusion leaves nothing, both lists are empty.
    pub fn reports(&mut self) -> Result<(Vec<Report>, Vec<LoadedSource>)> {
        let dimensions = self.index.current_max()?;
        let builder = QueryBuilder::new(dimensions)?;
        let universe: Vec<String> = builder.universe().iter().map(|c| c.name()).collect();

        let included: Vec<LoadedSource> = match self.config.narrow_sources {
            NarrowSourcePolicy::Fail => self.registry.sources().to_vec(),
            NarrowSourcePolicy::Exclude => {
                let (wide, narrow) = self.registry.partition_covering(&universe);
                for source in narrow {
                    warn!(source = %source.id, "excluding source without the full column set");
                    self.skipped.push(SkippedSource {
                        file: source.file.clone(),
                        reason: format!(
                            "lacks some of the columns {} required by the widest source",
                            universe.join(", ")
                        ),
                    });
                }
                wide.into_iter().cloned().collect()
            }
        };

        if included.is_empty() {
            return Ok((Vec::new(), included));
        }

        let ids: Vec<&str> = included.iter().map(|s| s.id.as_str()).collect();
        let consolidated = builder.consolidated(&ids)?;
        let aggregated = builder.aggregated(&consolidated);

        let reports = vec![
            Report {
                kind: ReportKind::Consolidated,
                query: consolidated,
                destination: self.config.consolidated_path.clone(),
            },
            Report {
                kind: ReportKind::Aggregated { dimensions },
                query: aggregated,
                destination: self.config.aggregated_path.clone(),
            },
        ];
        Ok((reports, included))
    }

    /// Render the reports (when anything loaded) and close the run.
    pub fn finish(mut self) -> Result<RunSummary> {
        if self.registry.is_empty() {
            info!("no valid sources; no reports written");
            return Ok(self.summary(Vec::new(), 0, 0));
        }

        let (reports, included) = self.reports()?;
        if reports.is_empty() {
            info!("every source was excluded; no reports written");
            return Ok(self.summary(Vec::new(), 0, 0));
        }

        // Run every query before touching any destination.
        let results = reports
            .iter()
            .map(|r| report::render(&self.store, r))
            .collect::<Result<Vec<ResultTable>>>()?;

        let mut consolidated_rows = 0;
        let mut aggregated_rows = 0;
        for (r, result) in reports.iter().zip(&results) {
            report::emit(result, &r.destination)?;
            match r.kind {
                ReportKind::Consolidated => consolidated_rows = result.rows.len(),
                ReportKind::Aggregated { .. } => aggregated_rows = result.rows.len(),
            }
        }

        let processed = included.into_iter().map(|s| s.file).collect();
        Ok(self.summary(processed, consolidated_rows, aggregated_rows))
    }

    fn summary(
        &self,
        processed: Vec<String>,
        consolidated_rows: usize,
        aggregated_rows: usize,
    ) -> RunSummary {
        RunSummary {
            started_at: self.started_at,
            finished_at: Utc::now(),
            processed,
            skipped: self.skipped.clone(),
            consolidated_rows,
            aggregated_rows,
        }
    }
}

/// Process every input in order and write both reports.
///
/// Per-file problems are collected in the summary. Anything else aborts the
/// run; the store is torn down either way.
pub fn run(config: PipelineConfig) -> Result<RunSummary> {
    let inputs = config.inputs.clone();
    let mut pipeline = Pipeline::open(config)?;
    for input in &inputs {
        pipeline.ingest(input)?;
    }
    info!(
        loaded = pipeline.registry().len(),
        skipped = pipeline.skipped().len(),
        "all sources processed"
    );
    pipeline.finish()
}

// src/config.rs
//! Command line and YAML configuration, resolved into a [`PipelineConfig`].

use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use clap::Parser;
use serde::Deserialize;
use tracing::debug;

use crate::pipeline::{NarrowSourcePolicy, PipelineConfig};

// ── CLI ────────────────────────────────────────────────────────────────────────

/// Consolidate dimension/measure tables from CSV, JSON and XML files into
/// two TSV reports.
#[derive(Parser, Debug, Clone, Default)]
#[command(name = "tabmerge", version)]
pub struct Cli {
    /// Input files or glob patterns (.csv, .json, .xml)
    pub inputs: Vec<String>,

    /// Destination of the row-level consolidated report
    #[arg(long, value_name = "PATH")]
    pub consolidated: Option<PathBuf>,

    /// Destination of the grouped and summed report
    #[arg(long, value_name = "PATH")]
    pub aggregated: Option<PathBuf>,

    /// Backing file for the transient store (deleted when the run ends)
    #[arg(long, value_name = "PATH")]
    pub store: Option<PathBuf>,

    /// What to do with sources missing some of the report columns
    #[arg(long, value_enum)]
    pub narrow_sources: Option<NarrowSourcePolicy>,

    /// YAML file with defaults for any of the options above
    #[arg(long, value_name = "FILE", env = "TABMERGE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Also write the run summary as JSON
    #[arg(long, value_name = "PATH")]
    pub summary_json: Option<PathBuf>,

    /// Log level used when RUST_LOG is not set
    #[arg(long)]
    pub log_level: Option<String>,
}

// ── YAML file ──────────────────────────────────────────────────────────────────

/// Same keys as the CLI, all optional.
#[derive(Debug, Default, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    pub inputs: Vec<String>,
    pub consolidated: Option<PathBuf>,
    pub aggregated: Option<PathBuf>,
    pub store: Option<PathBuf>,
    pub narrow_sources: Option<NarrowSourcePolicy>,
    pub summary_json: Option<PathBuf>,
    pub log_level: Option<String>,
}

impl FileConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        serde_yaml::from_str(&text).with_context(|| format!("parsing config {}", path.display()))
    }
}

// ── Resolved settings ──────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct Settings {
    pub pipeline: PipelineConfig,
    pub summary_json: Option<PathBuf>,
    pub log_level: String,
}

impl Settings {
    /// Command line beats the config file, which beats the defaults.
    pub fn resolve(cli: Cli) -> Result<Self> {
        let file = match &cli.config {
            Some(path) => FileConfig::load(path)?,
            None => FileConfig::default(),
        };
        let defaults = PipelineConfig::default();

        let patterns = if cli.inputs.is_empty() {
            file.inputs
        } else {
            cli.inputs
        };
        let inputs = expand_inputs(&patterns)?;
        debug!(?inputs, "resolved inputs");

        Ok(Self {
            pipeline: PipelineConfig {
                inputs,
                consolidated_path: cli
                    .consolidated
                    .or(file.consolidated)
                    .unwrap_or(defaults.consolidated_path),
                aggregated_path: cli
                    .aggregated
                    .or(file.aggregated)
                    .unwrap_or(defaults.aggregated_path),
                store_path: cli.store.or(file.store),
                narrow_sources: cli
                    .narrow_sources
                    .or(file.narrow_sources)
                    .unwrap_or(defaults.narrow_sources),
            },
            summary_json: cli.summary_json.or(file.summary_json),
            log_level: cli
                .log_level
                .or(file.log_level)
                .unwrap_or_else(|| "info".to_string()),
        })
    }
}

/// Expand glob patterns, keeping argument order. Matches of one pattern are
/// sorted by path; a pattern that matches nothing is kept literally so the
/// missing file is reported as not found.
pub fn expand_inputs(patterns: &[String]) -> Result<Vec<PathBuf>> {
    let mut inputs = Vec::with_capacity(patterns.len());
    for pattern in patterns {
        let mut matched: Vec<PathBuf> = glob::glob(pattern)
            .with_context(|| format!("invalid input pattern `{}`", pattern))?
            .filter_map(|entry| entry.ok())
            .collect();
        if matched.is_empty() {
            inputs.push(PathBuf::from(pattern));
        } else {
            matched.sort();
            inputs.append(&mut matched);
        }
    }
    Ok(inputs)
}

use std::fs;

use anyhow::{Context, Result};
use clap::Parser;
use tabmerge::config::{Cli, Settings};
use tabmerge::pipeline;
use tracing::{error, info};
use tracing_subscriber::{fmt, EnvFilter};

fn main() -> Result<()> {
    let settings = Settings::resolve(Cli::parse())?;

    // ─── 1) init logging ─────────────────────────────────────────────
    let env = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(settings.log_level.to_lowercase()));
    fmt::Subscriber::builder()
        .with_env_filter(env)
        .with_writer(std::io::stderr)
        .init();
    info!("startup");

    if settings.pipeline.inputs.is_empty() {
        println!("no input files specified");
        return Ok(());
    }

    // ─── 2) load sources & write reports ─────────────────────────────
    let summary = match pipeline::run(settings.pipeline.clone()) {
        Ok(summary) => summary,
        Err(e) => {
            error!(error = %e, "run aborted");
            return Err(e).context("consolidation run failed");
        }
    };

    // ─── 3) report outcome ───────────────────────────────────────────
    for skipped in &summary.skipped {
        println!("skipped {}: {}", skipped.file, skipped.reason);
    }
    if summary.reports_written() {
        println!("processed: {}", summary.processed.join(", "));
    } else {
        println!("no input files were processed");
    }

    if let Some(path) = &settings.summary_json {
        let json = serde_json::to_string_pretty(&summary)?;
        fs::write(path, json).with_context(|| format!("writing {}", path.display()))?;
    }

    info!(
        elapsed = ?(summary.finished_at - summary.started_at),
        "done"
    );
    Ok(())
}

//! Scan command: detect, scan and write events as JSON lines.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use rayon::prelude::*;
use serde::Serialize;
use tl_core::{
    Artifact, CollectingSink, EventData, LineScanner, Registry, ScanContext, ScanStats, scan_rows,
};

use super::util::{self, EvidenceKind};

/// Settings that apply to every file of one invocation.
#[derive(Debug, Clone, Copy)]
pub struct ScanOptions<'a> {
    /// Scan with this parser instead of detecting one.
    pub parser: Option<&'a str>,
    /// Year for timestamps that carry none.
    pub year: i32,
    pub max_text_file_size: u64,
}

/// One output line: the event plus the file it came from.
#[derive(Serialize)]
struct EventLine<'a> {
    path: &'a Path,
    #[serde(flatten)]
    event: &'a EventData,
}

#[derive(Debug)]
enum Outcome {
    Scanned {
        artifact: &'static str,
        sink: CollectingSink,
        stats: ScanStats,
    },
    Unclaimed,
    TooLarge(u64),
    Failed(anyhow::Error),
}

/// Scans `paths` in parallel and writes results in input order.
///
/// Events go to `out`; a summary line per file goes to `diagnostics`.
/// Returns how many files failed.
pub fn run<W: Write, E: Write>(
    out: &mut W,
    diagnostics: &mut E,
    registry: &Registry,
    paths: &[PathBuf],
    options: &ScanOptions<'_>,
) -> Result<usize> {
    let forced = options
        .parser
        .map(|name| {
            registry
                .get(name)
                .with_context(|| format!("unknown or disabled parser `{name}`"))
        })
        .transpose()?;

    let outcomes: Vec<Outcome> = paths
        .par_iter()
        .map(|path| scan_file(registry, path, forced, options).unwrap_or_else(Outcome::Failed))
        .collect();

    let mut failed = 0;
    for (path, outcome) in paths.iter().zip(outcomes) {
        let shown = path.display();
        match outcome {
            Outcome::Scanned {
                artifact,
                sink,
                stats,
            } => {
                for event in &sink.events {
                    serde_json::to_writer(&mut *out, &EventLine { path, event })?;
                    writeln!(out)?;
                }
                for warning in &sink.warnings {
                    tracing::warn!(path = %shown, unit = %warning.unit, "{warning}");
                }
                writeln!(
                    diagnostics,
                    "{shown}: {artifact}: {} units, {} events, {} warnings",
                    stats.units, stats.events, stats.warnings
                )?;
            }
            Outcome::Unclaimed => writeln!(diagnostics, "{shown}: no parser claims this file")?,
            Outcome::TooLarge(size) => writeln!(
                diagnostics,
                "{shown}: skipped, {size} bytes exceeds the {} byte limit",
                options.max_text_file_size
            )?,
            Outcome::Failed(err) => {
                failed += 1;
                tracing::warn!(path = %shown, "scan aborted: {err:#}");
                writeln!(diagnostics, "{shown}: failed: {err:#}")?;
            }
        }
    }
    out.flush()?;

    Ok(failed)
}

fn scan_file(
    registry: &Registry,
    path: &Path,
    forced: Option<Artifact>,
    options: &ScanOptions<'_>,
) -> Result<Outcome> {
    let kind = EvidenceKind::of(path)?;
    if kind == EvidenceKind::Text {
        let size = fs::metadata(path)
            .with_context(|| format!("failed to stat {}", path.display()))?
            .len();
        if size > options.max_text_file_size {
            return Ok(Outcome::TooLarge(size));
        }
    }

    let artifact = match forced {
        Some(artifact) if kind.reads(artifact) => artifact,
        Some(artifact) => bail!("parser `{}` does not read {kind} files", artifact.name()),
        None => match util::claimants(registry, path)?.first() {
            Some(artifact) => *artifact,
            None => return Ok(Outcome::Unclaimed),
        },
    };

    let mut sink = CollectingSink::new();
    let stats = match artifact {
        Artifact::Text(text) => {
            let mut lines = util::open_text(path)?;
            let context = ScanContext {
                year: Some(options.year),
            };
            LineScanner::new(text, context).scan(&mut lines, &mut sink)
        }
        Artifact::Rows(rows) => {
            let source = util::open_database(path)?;
            scan_rows(rows, &source, &mut sink)
        }
    }
    .with_context(|| format!("{} could not scan {}", artifact.name(), path.display()))?;

    tracing::debug!(
        path = %path.display(),
        artifact = artifact.name(),
        units = stats.units,
        events = stats.events,
        warnings = stats.warnings,
        "scanned file"
    );
    Ok(Outcome::Scanned {
        artifact: artifact.name(),
        sink,
        stats,
    })
}

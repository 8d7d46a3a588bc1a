//! Shared utilities for CLI commands.

use std::fmt;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use anyhow::{Context, Result};
use tl_core::{Artifact, LineSource, Registry, SourceError, TextLines, detect_rows, detect_text};
use tl_db::SqliteSource;

/// How a file is read: line by line, or as a database.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EvidenceKind {
    Text,
    Database,
}

impl EvidenceKind {
    /// Sniffs the SQLite header; everything else is text.
    pub fn of(path: &Path) -> Result<Self> {
        let is_database = tl_db::is_sqlite_file(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        Ok(if is_database {
            Self::Database
        } else {
            Self::Text
        })
    }

    /// Whether `artifact` can read this kind of evidence.
    pub const fn reads(self, artifact: Artifact) -> bool {
        matches!(
            (self, artifact),
            (Self::Text, Artifact::Text(_)) | (Self::Database, Artifact::Rows(_))
        )
    }
}

impl fmt::Display for EvidenceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Text => "text",
            Self::Database => "SQLite",
        })
    }
}

pub fn open_text(path: &Path) -> Result<TextLines<BufReader<File>>> {
    let file = File::open(path).with_context(|| format!("failed to open {}", path.display()))?;
    Ok(TextLines::new(BufReader::new(file)))
}

pub fn open_database(path: &Path) -> Result<SqliteSource> {
    SqliteSource::open(path).with_context(|| format!("failed to open {}", path.display()))
}

/// Every text artifact in `registry` that claims `lines`. Detection only
/// peeks, so all detectors share the one reader.
fn text_claimants(
    registry: &Registry,
    lines: &mut dyn LineSource,
) -> Result<Vec<Artifact>, SourceError> {
    let mut claimed = Vec::new();
    for artifact in registry.text_artifacts() {
        if detect_text(artifact, lines)? {
            claimed.push(Artifact::Text(artifact));
        }
    }
    Ok(claimed)
}

/// Every artifact in `registry` that claims `path`, in registry order.
pub fn claimants(registry: &Registry, path: &Path) -> Result<Vec<Artifact>> {
    let mut claimed = Vec::new();
    match EvidenceKind::of(path)? {
        EvidenceKind::Text => {
            let mut lines = open_text(path)?;
            claimed = text_claimants(registry, &mut lines)
                .with_context(|| format!("failed to read {}", path.display()))?;
        }
        EvidenceKind::Database => {
            let source = open_database(path)?;
            for artifact in registry.row_artifacts() {
                if detect_rows(artifact, &source)
                    .with_context(|| format!("failed to inspect {}", path.display()))?
                {
                    claimed.push(Artifact::Rows(artifact));
                }
            }
        }
    }
    tracing::debug!(
        path = %path.display(),
        claimed = ?claimed.iter().map(Artifact::name).collect::<Vec<_>>(),
        "detection finished"
    );
    Ok(claimed)
}

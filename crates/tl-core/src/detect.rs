//! Bounded, non-consuming applicability checks.

use tracing::{debug, trace};

use crate::emit::to_event_data;
use crate::event::UnitLocation;
use crate::grammar::UnitBoundary;
use crate::registry::{RequiredTable, RowArtifact, TextArtifact};
use crate::source::{LineSource, RowSource, SchemaCatalog, SourceError, SourceLine};

/// Upper bound on lines inspected while detecting a text artifact.
pub const MAX_DETECT_LINES: usize = 64;

/// Stand-in year for validating year-less timestamps when no preamble
/// supplies one. A leap year, so Feb 29 is not rejected.
const DETECT_FALLBACK_YEAR: i32 = 2000;

/// Peeks, treating a closed source as empty.
fn peek(source: &mut dyn LineSource, offset: usize) -> Result<Option<SourceLine>, SourceError> {
    match source.peek_line(offset) {
        Ok(line) => Ok(line.cloned()),
        Err(SourceError::Closed) => Ok(None),
        Err(err) => Err(err),
    }
}

/// Whether `artifact` applies to `source`. Only peeks, so the source is
/// left exactly as it was.
pub fn detect_text(
    artifact: &TextArtifact,
    source: &mut dyn LineSource,
) -> Result<bool, SourceError> {
    let claims = first_unit_matches(artifact, source)?;
    debug!(artifact = artifact.name, claims, "Text detection finished");
    Ok(claims)
}

fn first_unit_matches(
    artifact: &TextArtifact,
    source: &mut dyn LineSource,
) -> Result<bool, SourceError> {
    let Some(first) = peek(source, 0)? else {
        return Ok(false);
    };
    if !first.valid_utf8 || !artifact.anchor.is_match(&first.text) {
        return Ok(false);
    }

    let mut index = 0;
    let mut year = None;
    if let Some(preamble) = artifact.preamble {
        while index < MAX_DETECT_LINES {
            let Some(line) = peek(source, index)? else {
                break;
            };
            let Some(found) = preamble.classify(&line.text) else {
                break;
            };
            year = found.or(year);
            index += 1;
        }
    }

    let Some(line) = peek(source, index)? else {
        // A preamble with no records yet is still this artifact.
        return Ok(index > 0);
    };
    if !line.valid_utf8 {
        return Ok(false);
    }

    let mut unit = line.text;
    if let UnitBoundary::Lookahead(boundary) = artifact.grammar.boundary {
        let mut offset = index + 1;
        while offset < MAX_DETECT_LINES {
            match peek(source, offset)? {
                Some(next) if next.valid_utf8 && !boundary.is_match(&next.text) => {
                    unit.push('\n');
                    unit.push_str(&next.text);
                    offset += 1;
                }
                _ => break,
            }
        }
    }

    let record = match artifact
        .grammar
        .extract(unit.trim_end_matches('\n'), year.or(Some(DETECT_FALLBACK_YEAR)))
    {
        Ok(record) => record,
        Err(err) => {
            trace!(artifact = artifact.name, error = %err, "First unit does not parse");
            return Ok(false);
        }
    };
    let location = UnitLocation::Line {
        number: line.number,
    };
    match to_event_data(artifact.name, &artifact.emission, location, &record, &artifact.hints) {
        Ok(_) => Ok(true),
        Err(err) => {
            trace!(artifact = artifact.name, error = %err, "First unit has an invalid time");
            Ok(false)
        }
    }
}

/// Whether every required table and column exists in `source`.
pub fn detect_rows(artifact: &RowArtifact, source: &dyn RowSource) -> Result<bool, SourceError> {
    let catalog = source.tables()?;
    let missing = missing_requirement(artifact.required, &catalog);
    if let Some(reason) = &missing {
        trace!(artifact = artifact.name, %reason, "Schema does not match");
    }
    let claims = missing.is_none();
    debug!(artifact = artifact.name, claims, "Row detection finished");
    Ok(claims)
}

/// Describes the first required table or column absent from `catalog`.
/// Extra tables and columns are ignored.
pub fn missing_requirement(required: &[RequiredTable], catalog: &SchemaCatalog) -> Option<String> {
    for table in required {
        let Some(columns) = catalog.get(table.name) else {
            return Some(format!("table `{}` is missing", table.name));
        };
        if let Some(column) = table
            .columns
            .iter()
            .find(|column| !columns.contains(**column))
        {
            return Some(format!("table `{}` has no column `{column}`", table.name));
        }
    }
    None
}

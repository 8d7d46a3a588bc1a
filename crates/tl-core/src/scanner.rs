//! Line-oriented record scanning.

use serde::Serialize;
use thiserror::Error;
use tracing::{debug, trace};

use crate::emit::emit_record;
use crate::event::{Sink, UnitLocation, Warning};
use crate::grammar::UnitBoundary;
use crate::record::ExtractedRecord;
use crate::registry::TextArtifact;
use crate::source::{LineSource, SourceError, SourceLine};

/// Failures that abort a whole scan.
#[derive(Debug, Error)]
pub enum ScanError {
    #[error(transparent)]
    Source(#[from] SourceError),
    #[error("`{artifact}` schema contract violated: {detail}")]
    SchemaContractViolation {
        artifact: &'static str,
        detail: String,
    },
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ScanStats {
    pub units: usize,
    pub events: usize,
    pub warnings: usize,
}

/// Scan-wide inputs that do not come from the source itself.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScanContext {
    /// Year for timestamps that carry none; a preamble year overrides it.
    pub year: Option<i32>,
}

/// One logical unit read from the source.
#[derive(Debug)]
struct Unit {
    location: UnitLocation,
    text: String,
}

#[derive(Debug)]
enum ScanState {
    Idle,
    ReadingUnit,
    UnitMatched(Unit, ExtractedRecord),
    UnitFailed(Unit, String),
    Exhausted,
}

pub struct LineScanner<'a> {
    artifact: &'a TextArtifact,
    context: ScanContext,
    stats: ScanStats,
}

impl<'a> LineScanner<'a> {
    pub const fn new(artifact: &'a TextArtifact, context: ScanContext) -> Self {
        Self {
            artifact,
            context,
            stats: ScanStats {
                units: 0,
                events: 0,
                warnings: 0,
            },
        }
    }

    /// Scans `source` to the end, emitting events in source order. Units that
    /// fail become warnings; only source faults abort.
    pub fn scan(
        mut self,
        source: &mut dyn LineSource,
        sink: &mut dyn Sink,
    ) -> Result<ScanStats, ScanError> {
        debug!(artifact = self.artifact.name, "Starting line scan");

        let mut state = ScanState::Idle;
        loop {
            state = match state {
                ScanState::Idle => {
                    self.consume_preamble(source)?;
                    ScanState::ReadingUnit
                }
                ScanState::ReadingUnit => match self.read_unit(source)? {
                    None => ScanState::Exhausted,
                    Some(Err(unit)) => {
                        ScanState::UnitFailed(unit, "line is not valid UTF-8".to_string())
                    }
                    Some(Ok(unit)) => {
                        match self.artifact.grammar.extract(&unit.text, self.context.year) {
                            Ok(record) => ScanState::UnitMatched(unit, record),
                            Err(err) => ScanState::UnitFailed(unit, err.to_string()),
                        }
                    }
                },
                ScanState::UnitMatched(unit, record) => {
                    match emit_record(
                        self.artifact.name,
                        &self.artifact.emission,
                        unit.location,
                        &record,
                        &self.artifact.hints,
                        sink,
                    ) {
                        Ok(()) => {
                            self.stats.events += 1;
                            ScanState::ReadingUnit
                        }
                        Err(err) => ScanState::UnitFailed(unit, err.to_string()),
                    }
                }
                ScanState::UnitFailed(unit, message) => {
                    self.warn(sink, unit, message);
                    ScanState::ReadingUnit
                }
                ScanState::Exhausted => break,
            };
        }

        debug!(
            artifact = self.artifact.name,
            units = self.stats.units,
            events = self.stats.events,
            warnings = self.stats.warnings,
            "Line scan finished"
        );
        Ok(self.stats)
    }

    fn warn(&mut self, sink: &mut dyn Sink, unit: Unit, message: String) {
        trace!(artifact = self.artifact.name, location = %unit.location, %message, "Skipping unit");
        self.stats.warnings += 1;
        sink.emit_warning(Warning {
            artifact: self.artifact.name,
            location: unit.location,
            unit: unit.text,
            message,
        });
    }

    fn consume_preamble(&mut self, source: &mut dyn LineSource) -> Result<(), ScanError> {
        let Some(preamble) = self.artifact.preamble else {
            return Ok(());
        };
        while let Some(line) = peek(source)? {
            let Some(found) = preamble.classify(&line.text) else {
                break;
            };
            if let Some(year) = found {
                debug!(artifact = self.artifact.name, year, "Year taken from preamble");
                self.context.year = Some(year);
            }
            next(source)?;
        }
        Ok(())
    }

    /// Reads the next unit. `Err` carries a line that is not valid UTF-8.
    fn read_unit(
        &mut self,
        source: &mut dyn LineSource,
    ) -> Result<Option<Result<Unit, Unit>>, ScanError> {
        let first = loop {
            match next(source)? {
                None => return Ok(None),
                Some(line) if line.valid_utf8 && line.text.trim().is_empty() => {}
                Some(line) => break line,
            }
        };
        self.stats.units += 1;

        let location = UnitLocation::Line {
            number: first.number,
        };
        if !first.valid_utf8 {
            return Ok(Some(Err(Unit {
                location,
                text: first.text,
            })));
        }

        let mut text = first.text;
        if let UnitBoundary::Lookahead(boundary) = self.artifact.grammar.boundary {
            while let Some(line) = peek(source)? {
                if !line.valid_utf8 || boundary.is_match(&line.text) {
                    break;
                }
                text.push('\n');
                text.push_str(&line.text);
                next(source)?;
            }
            let trimmed = text.trim_end_matches('\n').len();
            text.truncate(trimmed);
        }
        Ok(Some(Ok(Unit { location, text })))
    }
}

/// Treats a closed source as exhausted.
fn next(source: &mut dyn LineSource) -> Result<Option<SourceLine>, ScanError> {
    match source.next_line() {
        Ok(line) => Ok(line),
        Err(SourceError::Closed) => {
            debug!("Source closed, treating as end of data");
            Ok(None)
        }
        Err(err) => Err(err.into()),
    }
}

fn peek(source: &mut dyn LineSource) -> Result<Option<SourceLine>, ScanError> {
    match source.peek_line(0) {
        Ok(line) => Ok(line.cloned()),
        Err(SourceError::Closed) => Ok(None),
        Err(err) => Err(err.into()),
    }
}

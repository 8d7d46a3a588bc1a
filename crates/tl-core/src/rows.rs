//! Row-oriented record scanning.

use tracing::{debug, trace};

use crate::detect::missing_requirement;
use crate::emit::emit_record;
use crate::event::{Sink, UnitLocation, Warning};
use crate::record::{ExtractedRecord, FieldValue};
use crate::registry::{ColumnKind, ColumnSpec, RowArtifact, RowQuery};
use crate::scanner::{ScanError, ScanStats};
use crate::source::{Row, RowSource, Scalar};
use crate::time::RawTimeValue;

/// Why a single row could not be turned into a record.
enum RowError {
    /// The result set lacks a declared column.
    MissingColumn(&'static str),
    Coercion { column: &'static str, reason: String },
}

/// Scans every declared query of `artifact`. A schema mismatch is fatal;
/// a row whose values cannot be coerced is skipped with a warning.
pub fn scan_rows(
    artifact: &RowArtifact,
    source: &dyn RowSource,
    sink: &mut dyn Sink,
) -> Result<ScanStats, ScanError> {
    debug!(artifact = artifact.name, "Starting row scan");

    let catalog = source.tables()?;
    if let Some(detail) = missing_requirement(artifact.required, &catalog) {
        return Err(ScanError::SchemaContractViolation {
            artifact: artifact.name,
            detail,
        });
    }

    let mut stats = ScanStats::default();
    for (query_index, query) in artifact.queries.iter().enumerate() {
        let mut row_index = 0;
        source.for_each_row(query.sql, &mut |row: &dyn Row| {
            let location = UnitLocation::Row {
                query: query_index,
                row: row_index,
            };
            row_index += 1;
            stats.units += 1;

            let message = match extract_row(query, row) {
                Ok(record) => match emit_record(
                    artifact.name,
                    &artifact.emission,
                    location,
                    &record,
                    &artifact.hints,
                    sink,
                ) {
                    Ok(()) => {
                        stats.events += 1;
                        return Ok(());
                    }
                    Err(err) => err.to_string(),
                },
                Err(RowError::MissingColumn(column)) => {
                    return Err(ScanError::SchemaContractViolation {
                        artifact: artifact.name,
                        detail: format!("query {query_index} returned no column `{column}`"),
                    });
                }
                Err(RowError::Coercion { column, reason }) => format!("column `{column}`: {reason}"),
            };

            trace!(artifact = artifact.name, %location, %message, "Skipping row");
            stats.warnings += 1;
            sink.emit_warning(Warning {
                artifact: artifact.name,
                location,
                unit: describe_row(query, row),
                message,
            });
            Ok(())
        })?;
    }

    debug!(
        artifact = artifact.name,
        units = stats.units,
        events = stats.events,
        warnings = stats.warnings,
        "Row scan finished"
    );
    Ok(stats)
}

fn extract_row(query: &RowQuery, row: &dyn Row) -> Result<ExtractedRecord, RowError> {
    let mut record = ExtractedRecord::new();
    for spec in query.columns {
        let value = row
            .column_value(spec.column)
            .ok_or(RowError::MissingColumn(spec.column))?;
        let coerced = coerce(spec.kind, value).map_err(|reason| RowError::Coercion {
            column: spec.column,
            reason,
        })?;
        if let Some(value) = coerced {
            record.insert(spec.attribute, value);
        }
    }
    if let Some(finish) = query.finish {
        finish(&mut record);
    }
    Ok(record)
}

/// `Ok(None)` means the attribute is absent for this row.
fn coerce(kind: ColumnKind, value: Scalar) -> Result<Option<FieldValue>, String> {
    if value == Scalar::Null {
        return Ok(None);
    }
    let coerced = match kind {
        ColumnKind::Int => FieldValue::Int(integer(&value)?),
        ColumnKind::Text => FieldValue::Str(text(value)?),
        ColumnKind::Bool => match integer(&value)? {
            0 => FieldValue::Bool(false),
            1 => FieldValue::Bool(true),
            other => return Err(format!("expected 0 or 1, found {other}")),
        },
        ColumnKind::PosixTime => FieldValue::Time(RawTimeValue::EpochSeconds(integer(&value)?)),
        ColumnKind::JavaTime => FieldValue::Time(RawTimeValue::EpochMillis(integer(&value)?)),
        ColumnKind::WebKitTime => match integer(&value)? {
            0 => return Ok(None),
            micros => FieldValue::Time(RawTimeValue::WebKitMicros(micros)),
        },
        ColumnKind::CocoaTime => {
            FieldValue::Time(RawTimeValue::CocoaMicros(cocoa_micros(&value)?))
        }
    };
    Ok(Some(coerced))
}

/// Cocoa seconds to whole microseconds, rounding the fraction.
#[allow(clippy::cast_possible_truncation)]
fn cocoa_micros(value: &Scalar) -> Result<i64, String> {
    const LIMIT: f64 = 9.0e18;

    let seconds = match value {
        Scalar::Real(seconds) => *seconds,
        Scalar::Integer(seconds) => {
            return seconds
                .checked_mul(1_000_000)
                .ok_or_else(|| format!("seconds out of range: {seconds}"));
        }
        Scalar::Text(text) => text
            .trim()
            .parse()
            .map_err(|_| format!("expected number, found text {text:?}"))?,
        other => return Err(format!("expected number, found {}", other.storage_class())),
    };
    let micros = (seconds * 1_000_000.0).round();
    if !micros.is_finite() || micros.abs() >= LIMIT {
        return Err(format!("seconds out of range: {seconds}"));
    }
    Ok(micros as i64)
}

fn integer(value: &Scalar) -> Result<i64, String> {
    match value {
        Scalar::Integer(value) => Ok(*value),
        Scalar::Text(text) => text
            .trim()
            .parse()
            .map_err(|_| format!("expected integer, found text {text:?}")),
        other => Err(format!("expected integer, found {}", other.storage_class())),
    }
}

fn text(value: Scalar) -> Result<String, String> {
    match value {
        Scalar::Text(text) => Ok(text),
        Scalar::Integer(value) => Ok(value.to_string()),
        Scalar::Real(value) => Ok(value.to_string()),
        Scalar::Blob(bytes) => {
            String::from_utf8(bytes).map_err(|_| "expected text, found non UTF-8 blob".to_string())
        }
        Scalar::Null => Err("expected text, found null".to_string()),
    }
}

/// `column=value` pairs for the declared columns, for warnings.
fn describe_row(query: &RowQuery, row: &dyn Row) -> String {
    query
        .columns
        .iter()
        .map(|ColumnSpec { column, .. }| match row.column_value(column) {
            None => format!("{column}=<missing>"),
            Some(Scalar::Null) => format!("{column}=NULL"),
            Some(Scalar::Integer(value)) => format!("{column}={value}"),
            Some(Scalar::Real(value)) => format!("{column}={value}"),
            Some(Scalar::Text(value)) => format!("{column}={value:?}"),
            Some(Scalar::Blob(bytes)) => format!("{column}=<{} bytes>", bytes.len()),
        })
        .collect::<Vec<_>>()
        .join(", ")
}

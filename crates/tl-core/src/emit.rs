//! Turns extracted records into events.

use std::collections::BTreeMap;

use thiserror::Error;

use crate::event::{AttributeValue, EventData, Sink, UnitLocation};
use crate::record::{ExtractedRecord, FieldValue};
use crate::time::{TimeHints, TimeParseError, normalize};

/// Maps one record field onto one event attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttributeSpec {
    pub attribute: &'static str,
    pub field: &'static str,
}

impl AttributeSpec {
    pub const fn new(attribute: &'static str, field: &'static str) -> Self {
        Self { attribute, field }
    }

    /// Attribute read from the record field of the same name.
    pub const fn same(name: &'static str) -> Self {
        Self::new(name, name)
    }
}

/// The declared output of an artifact.
#[derive(Debug, Clone, Copy)]
pub struct EmissionSchema {
    pub data_type: &'static str,
    pub attributes: &'static [AttributeSpec],
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("attribute `{attribute}`: {source}")]
pub struct EmitError {
    pub attribute: &'static str,
    pub source: TimeParseError,
}

/// Builds the event for `record`. Declared attributes missing from the
/// record are [`AttributeValue::Unset`]; undeclared fields are dropped.
pub fn to_event_data(
    artifact: &'static str,
    schema: &EmissionSchema,
    location: UnitLocation,
    record: &ExtractedRecord,
    hints: &TimeHints,
) -> Result<EventData, EmitError> {
    let mut attributes = BTreeMap::new();
    for spec in schema.attributes {
        let value = match record.get(spec.field) {
            None => AttributeValue::Unset,
            Some(FieldValue::Str(value)) => AttributeValue::Str(value.clone()),
            Some(FieldValue::Int(value)) => AttributeValue::Int(*value),
            Some(FieldValue::Bool(value)) => AttributeValue::Bool(*value),
            Some(FieldValue::Time(raw)) => {
                let timestamp = normalize(raw, hints).map_err(|source| EmitError {
                    attribute: spec.attribute,
                    source,
                })?;
                AttributeValue::Timestamp(timestamp)
            }
        };
        attributes.insert(spec.attribute, value);
    }

    Ok(EventData {
        artifact,
        data_type: schema.data_type,
        location,
        attributes,
    })
}

/// Normalizes `record` and hands exactly one event to `sink`.
pub fn emit_record(
    artifact: &'static str,
    schema: &EmissionSchema,
    location: UnitLocation,
    record: &ExtractedRecord,
    hints: &TimeHints,
    sink: &mut dyn Sink,
) -> Result<(), EmitError> {
    let event = to_event_data(artifact, schema, location, record, hints)?;
    sink.emit(event);
    Ok(())
}

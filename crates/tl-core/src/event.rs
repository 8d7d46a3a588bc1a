//! Output types: normalized events, warnings and the sink they go to.

use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;

use crate::time::CanonicalTimestamp;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum AttributeValue {
    /// Declared by the artifact but absent from this unit.
    Unset,
    Str(String),
    Int(i64),
    Bool(bool),
    Timestamp(CanonicalTimestamp),
}

impl AttributeValue {
    pub const fn is_unset(&self) -> bool {
        matches!(self, Self::Unset)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(value) => Some(value),
            _ => None,
        }
    }

    pub const fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(value) => Some(*value),
            _ => None,
        }
    }

    pub const fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(value) => Some(*value),
            _ => None,
        }
    }

    pub const fn as_timestamp(&self) -> Option<&CanonicalTimestamp> {
        match self {
            Self::Timestamp(value) => Some(value),
            _ => None,
        }
    }
}

/// Where a unit came from in its evidence source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum UnitLocation {
    /// First line of the unit, 1-based.
    Line { number: usize },
    /// Query index within the artifact and row index within that query.
    Row { query: usize, row: usize },
}

impl fmt::Display for UnitLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Line { number } => write!(f, "line {number}"),
            Self::Row { query, row } => write!(f, "query {query} row {row}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EventData {
    pub artifact: &'static str,
    pub data_type: &'static str,
    pub location: UnitLocation,
    pub attributes: BTreeMap<&'static str, AttributeValue>,
}

impl EventData {
    pub fn get(&self, attribute: &str) -> Option<&AttributeValue> {
        self.attributes.get(attribute)
    }
}

/// A unit that produced no event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Warning {
    pub artifact: &'static str,
    pub location: UnitLocation,
    /// The unit's raw text, or a description of the row.
    pub unit: String,
    pub message: String,
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}: {}", self.artifact, self.location, self.message)
    }
}

pub trait Sink {
    fn emit(&mut self, event: EventData);
    fn emit_warning(&mut self, warning: Warning);
}

/// Keeps events and warnings in arrival order.
#[derive(Debug, Default)]
pub struct CollectingSink {
    pub events: Vec<EventData>,
    pub warnings: Vec<Warning>,
}

impl CollectingSink {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Sink for CollectingSink {
    fn emit(&mut self, event: EventData) {
        self.events.push(event);
    }

    fn emit_warning(&mut self, warning: Warning) {
        self.warnings.push(warning);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::Resolution;

    #[test]
    fn serializes_unset_as_null_and_location_tagged() {
        let event = EventData {
            artifact: "zsh_extended_history",
            data_type: "shell:zsh:history",
            location: UnitLocation::Line { number: 3 },
            attributes: BTreeMap::from([
                ("command", AttributeValue::Str("ls".into())),
                ("elapsed_seconds", AttributeValue::Int(0)),
                ("missing", AttributeValue::Unset),
                (
                    "last_written_time",
                    AttributeValue::Timestamp(
                        CanonicalTimestamp::new(Resolution::Seconds, 1673, false).unwrap(),
                    ),
                ),
            ]),
        };

        let json = serde_json::to_string(&event).unwrap();
        insta::assert_snapshot!(json, @r#"{"artifact":"zsh_extended_history","data_type":"shell:zsh:history","location":{"kind":"line","number":3},"attributes":{"command":"ls","elapsed_seconds":0,"last_written_time":{"resolution":"seconds","value":1673,"is_local_time":false,"iso":"1970-01-01T00:27:53Z"},"missing":null}}"#);
    }

    #[test]
    fn warning_display_names_artifact_and_location() {
        let warning = Warning {
            artifact: "android_native_downloads",
            location: UnitLocation::Row { query: 0, row: 4 },
            unit: "_id=5".into(),
            message: "column `lastmod`: expected integer, found text".into(),
        };
        assert_eq!(
            warning.to_string(),
            "android_native_downloads query 0 row 4: column `lastmod`: expected integer, found text"
        );
    }
}

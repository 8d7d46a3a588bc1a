//! Artifact declarations and the explicit table that lists them.

use std::collections::BTreeSet;
use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use thiserror::Error;

use crate::emit::EmissionSchema;
use crate::grammar::Grammar;
use crate::record::ExtractedRecord;
use crate::time::TimeHints;

/// Leading lines of a text artifact that carry metadata instead of records.
#[derive(Debug, Clone, Copy)]
pub struct Preamble {
    /// Matches any preamble line; an optional `year` group supplies the scan year.
    pub pattern: &'static LazyLock<Regex>,
}

impl Preamble {
    /// `None` if `line` is not part of the preamble, otherwise the year it
    /// carries, if any.
    pub fn classify(&self, line: &str) -> Option<Option<i32>> {
        let captures = self.pattern.captures(line)?;
        Some(
            captures
                .name("year")
                .and_then(|year| year.as_str().parse().ok()),
        )
    }
}

#[derive(Debug, Clone, Copy)]
pub struct TextArtifact {
    pub name: &'static str,
    pub description: &'static str,
    /// Cheap first-line check run before the full grammar.
    pub anchor: &'static LazyLock<Regex>,
    pub preamble: Option<Preamble>,
    pub grammar: Grammar,
    pub emission: EmissionSchema,
    pub hints: TimeHints,
}

/// Semantic type of a column value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    Int,
    Text,
    /// 0 or 1.
    Bool,
    PosixTime,
    JavaTime,
    /// Microseconds since 1601; 0 means never.
    WebKitTime,
    /// Seconds since 2001, usually REAL with a fraction.
    CocoaTime,
}

/// Reads `column` from each row into record field `attribute`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnSpec {
    pub column: &'static str,
    pub attribute: &'static str,
    pub kind: ColumnKind,
}

impl ColumnSpec {
    pub const fn new(column: &'static str, attribute: &'static str, kind: ColumnKind) -> Self {
        Self {
            column,
            attribute,
            kind,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct RowQuery {
    pub sql: &'static str,
    pub columns: &'static [ColumnSpec],
    /// Derives extra fields before emission.
    pub finish: Option<fn(&mut ExtractedRecord)>,
    /// Fields `finish` may add.
    pub derived: &'static [&'static str],
}

#[derive(Debug, Clone, Copy)]
pub struct RequiredTable {
    pub name: &'static str,
    pub columns: &'static [&'static str],
}

#[derive(Debug, Clone, Copy)]
pub struct RowArtifact {
    pub name: &'static str,
    pub description: &'static str,
    pub required: &'static [RequiredTable],
    pub queries: &'static [RowQuery],
    pub emission: EmissionSchema,
    pub hints: TimeHints,
}

#[derive(Debug, Clone, Copy)]
pub enum Artifact {
    Text(&'static TextArtifact),
    Rows(&'static RowArtifact),
}

impl Artifact {
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Text(artifact) => artifact.name,
            Self::Rows(artifact) => artifact.name,
        }
    }

    pub const fn description(&self) -> &'static str {
        match self {
            Self::Text(artifact) => artifact.description,
            Self::Rows(artifact) => artifact.description,
        }
    }

    pub const fn data_type(&self) -> &'static str {
        match self {
            Self::Text(artifact) => artifact.emission.data_type,
            Self::Rows(artifact) => artifact.emission.data_type,
        }
    }

    pub const fn kind(&self) -> ArtifactKind {
        match self {
            Self::Text(_) => ArtifactKind::Text,
            Self::Rows(_) => ArtifactKind::Rows,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactKind {
    Text,
    Rows,
}

impl fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(match self {
            Self::Text => "text",
            Self::Rows => "rows",
        })
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RegistryError {
    #[error("artifact `{0}` is registered twice")]
    DuplicateArtifact(&'static str),
    #[error("artifact `{artifact}` declares field `{field}` twice")]
    DuplicateField {
        artifact: &'static str,
        field: &'static str,
    },
    #[error("artifact `{artifact}` captures a field without a name")]
    UnnamedField { artifact: &'static str },
    #[error("artifact `{artifact}`: time `{time}` uses unknown field `{field}`")]
    UnknownTimeComponent {
        artifact: &'static str,
        time: &'static str,
        field: &'static str,
    },
    #[error("artifact `{artifact}`: attribute `{attribute}` reads unknown field `{field}`")]
    UnknownAttributeField {
        artifact: &'static str,
        attribute: &'static str,
        field: &'static str,
    },
    #[error("unknown artifact: {0}")]
    UnknownArtifact(String),
}

/// The explicit, ordered artifact table.
#[derive(Debug, Clone)]
pub struct Registry {
    artifacts: Vec<Artifact>,
}

impl Registry {
    /// Validates every declaration and builds the table.
    pub fn new(artifacts: impl IntoIterator<Item = Artifact>) -> Result<Self, RegistryError> {
        let artifacts: Vec<Artifact> = artifacts.into_iter().collect();
        let mut names = BTreeSet::new();
        for artifact in &artifacts {
            if !names.insert(artifact.name()) {
                return Err(RegistryError::DuplicateArtifact(artifact.name()));
            }
            match artifact {
                Artifact::Text(text) => validate_text(text)?,
                Artifact::Rows(rows) => validate_rows(rows)?,
            }
        }
        Ok(Self { artifacts })
    }

    /// Every artifact shipped with the engine.
    pub fn builtin() -> Result<Self, RegistryError> {
        Self::new(crate::artifacts::BUILTIN)
    }

    /// Narrows the table to `names`, keeping registry order. An empty list keeps everything.
    pub fn select<S: AsRef<str>>(&self, names: &[S]) -> Result<Self, RegistryError> {
        if names.is_empty() {
            return Ok(self.clone());
        }
        for name in names {
            if self.get(name.as_ref()).is_none() {
                return Err(RegistryError::UnknownArtifact(name.as_ref().to_string()));
            }
        }
        let artifacts = self
            .artifacts
            .iter()
            .filter(|artifact| names.iter().any(|name| name.as_ref() == artifact.name()))
            .copied()
            .collect();
        Ok(Self { artifacts })
    }

    pub fn get(&self, name: &str) -> Option<Artifact> {
        self.artifacts
            .iter()
            .find(|artifact| artifact.name() == name)
            .copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = Artifact> + '_ {
        self.artifacts.iter().copied()
    }

    pub fn text_artifacts(&self) -> impl Iterator<Item = &'static TextArtifact> + '_ {
        self.iter().filter_map(|artifact| match artifact {
            Artifact::Text(text) => Some(text),
            Artifact::Rows(_) => None,
        })
    }

    pub fn row_artifacts(&self) -> impl Iterator<Item = &'static RowArtifact> + '_ {
        self.iter().filter_map(|artifact| match artifact {
            Artifact::Rows(rows) => Some(rows),
            Artifact::Text(_) => None,
        })
    }

    pub fn len(&self) -> usize {
        self.artifacts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.artifacts.is_empty()
    }
}

fn validate_text(artifact: &TextArtifact) -> Result<(), RegistryError> {
    let name = artifact.name;
    let mut captured = BTreeSet::new();
    for spec in artifact.grammar.fields {
        if spec.name.is_empty() {
            if spec.suppress {
                continue;
            }
            return Err(RegistryError::UnnamedField { artifact: name });
        }
        if !captured.insert(spec.name) {
            return Err(RegistryError::DuplicateField {
                artifact: name,
                field: spec.name,
            });
        }
    }

    let mut available: BTreeSet<&'static str> = artifact.grammar.captured().collect();
    for time in artifact.grammar.times {
        for component in time.layout.components() {
            if !available.remove(component) {
                return Err(RegistryError::UnknownTimeComponent {
                    artifact: name,
                    time: time.name,
                    field: component,
                });
            }
        }
        available.insert(time.name);
    }
    check_attributes(name, &artifact.emission, &available)
}

fn validate_rows(artifact: &RowArtifact) -> Result<(), RegistryError> {
    let name = artifact.name;
    let mut available = BTreeSet::new();
    for query in artifact.queries {
        let mut fields = BTreeSet::new();
        for field in query
            .columns
            .iter()
            .map(|column| column.attribute)
            .chain(query.derived.iter().copied())
        {
            if !fields.insert(field) {
                return Err(RegistryError::DuplicateField {
                    artifact: name,
                    field,
                });
            }
        }
        available.extend(fields);
    }
    check_attributes(name, &artifact.emission, &available)
}

fn check_attributes(
    artifact: &'static str,
    emission: &EmissionSchema,
    available: &BTreeSet<&'static str>,
) -> Result<(), RegistryError> {
    for spec in emission.attributes {
        if !available.contains(spec.field) {
            return Err(RegistryError::UnknownAttributeField {
                artifact,
                attribute: spec.attribute,
                field: spec.field,
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::emit::AttributeSpec;
    use crate::grammar::{FieldSpec, Matcher, TimeField, TimeLayout, UnitBoundary};

    static ANY_LINE: LazyLock<Regex> = LazyLock::new(|| Regex::new(".").unwrap());

    static DUPLICATED: TextArtifact = TextArtifact {
        name: "duplicated",
        description: "",
        anchor: &ANY_LINE,
        preamble: None,
        grammar: Grammar {
            fields: &[
                FieldSpec::new("value", Matcher::integer()),
                FieldSpec::literal(","),
                FieldSpec::new("value", Matcher::integer()),
            ],
            times: &[],
            boundary: UnitBoundary::Line,
        },
        emission: EmissionSchema {
            data_type: "test",
            attributes: &[],
        },
        hints: TimeHints::DEFAULT,
    };

    static DANGLING_TIME: TextArtifact = TextArtifact {
        name: "dangling_time",
        description: "",
        anchor: &ANY_LINE,
        preamble: None,
        grammar: Grammar {
            fields: &[FieldSpec::new("value", Matcher::integer())],
            times: &[TimeField {
                name: "when",
                layout: TimeLayout::EpochSeconds("seconds"),
            }],
            boundary: UnitBoundary::Line,
        },
        emission: EmissionSchema {
            data_type: "test",
            attributes: &[],
        },
        hints: TimeHints::DEFAULT,
    };

    static CONSUMED_COMPONENT: TextArtifact = TextArtifact {
        name: "consumed_component",
        description: "",
        anchor: &ANY_LINE,
        preamble: None,
        grammar: Grammar {
            fields: &[FieldSpec::new("seconds", Matcher::integer())],
            times: &[TimeField {
                name: "when",
                layout: TimeLayout::EpochSeconds("seconds"),
            }],
            boundary: UnitBoundary::Line,
        },
        emission: EmissionSchema {
            data_type: "test",
            attributes: &[AttributeSpec::same("seconds")],
        },
        hints: TimeHints::DEFAULT,
    };

    #[test]
    fn builtin_table_validates() {
        let registry = Registry::builtin().unwrap();
        assert_eq!(registry.len(), 8);
        assert_eq!(registry.text_artifacts().count(), 4);
        assert_eq!(registry.row_artifacts().count(), 4);
    }

    #[test]
    fn rejects_duplicate_field_names() {
        assert_eq!(
            Registry::new([Artifact::Text(&DUPLICATED)]).unwrap_err(),
            RegistryError::DuplicateField {
                artifact: "duplicated",
                field: "value",
            }
        );
    }

    #[test]
    fn rejects_duplicate_artifacts() {
        let err = Registry::new([
            Artifact::Text(&crate::artifacts::zsh::ZSH_EXTENDED_HISTORY),
            Artifact::Text(&crate::artifacts::zsh::ZSH_EXTENDED_HISTORY),
        ])
        .unwrap_err();
        assert_eq!(err, RegistryError::DuplicateArtifact("zsh_extended_history"));
    }

    #[test]
    fn time_components_must_be_captured() {
        assert!(matches!(
            Registry::new([Artifact::Text(&DANGLING_TIME)]),
            Err(RegistryError::UnknownTimeComponent { field: "seconds", .. })
        ));
    }

    #[test]
    fn attributes_cannot_read_consumed_time_components() {
        assert!(matches!(
            Registry::new([Artifact::Text(&CONSUMED_COMPONENT)]),
            Err(RegistryError::UnknownAttributeField { field: "seconds", .. })
        ));
    }

    #[test]
    fn select_keeps_registry_order() {
        let registry = Registry::builtin().unwrap();
        let selected = registry.select(&["vsftpd", "zsh_extended_history"]).unwrap();

        let names: Vec<_> = selected.iter().map(|artifact| artifact.name()).collect();
        assert_eq!(names, vec!["zsh_extended_history", "vsftpd"]);
        assert_eq!(selected.select::<&str>(&[]).unwrap().len(), 2);
    }

    #[test]
    fn select_rejects_unknown_names() {
        let registry = Registry::builtin().unwrap();
        assert_eq!(
            registry.select(&["nope"]).unwrap_err(),
            RegistryError::UnknownArtifact("nope".into())
        );
    }

    #[test]
    fn preamble_reports_year_when_present() {
        static HEADER: LazyLock<Regex> = LazyLock::new(|| {
            Regex::new(r"^(?:Created: (?P<year>\d{4})|Host: .*)$").unwrap()
        });
        let preamble = Preamble { pattern: &HEADER };

        assert_eq!(preamble.classify("Created: 2019"), Some(Some(2019)));
        assert_eq!(preamble.classify("Host: box"), Some(None));
        assert_eq!(preamble.classify("I0101 record"), None);
    }
}

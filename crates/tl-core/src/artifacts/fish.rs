//! Fish shell history (`fish_history`), a YAML-like list of entries.
//!
//! ```text
//! - cmd: cd /tmp
//!   when: 1564829612
//!   paths:
//!     - /tmp
//! ```

use std::sync::LazyLock;

use regex::Regex;

use crate::emit::{AttributeSpec, EmissionSchema};
use crate::grammar::{FieldSpec, Grammar, Matcher, TimeField, TimeLayout, UnitBoundary};
use crate::registry::TextArtifact;
use crate::time::TimeHints;

static ANCHOR: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^- cmd: \S+").unwrap());

static ENTRY_START: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^- cmd:").unwrap());

pub static FISH_HISTORY: TextArtifact = TextArtifact {
    name: "fish_history",
    description: "Fish history file",
    anchor: &ANCHOR,
    preamble: None,
    grammar: Grammar {
        fields: &[
            FieldSpec::literal("- cmd:"),
            FieldSpec::new("command", Matcher::Until("\n")),
            FieldSpec::literal("\n"),
            FieldSpec::literal("when:"),
            FieldSpec::new("when", Matcher::integer()),
            FieldSpec::new("paths", Matcher::Rest { allow_empty: true }).suppressed(),
        ],
        times: &[TimeField {
            name: "written_time",
            layout: TimeLayout::EpochSeconds("when"),
        }],
        boundary: UnitBoundary::Lookahead(&ENTRY_START),
    },
    emission: EmissionSchema {
        data_type: "fish:history:entry",
        attributes: &[AttributeSpec::same("command"), AttributeSpec::same("written_time")],
    },
    hints: TimeHints::DEFAULT,
};

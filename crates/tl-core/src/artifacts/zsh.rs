//! Zsh extended history (`setopt EXTENDED_HISTORY`).
//!
//! ```text
//! : 1457771210:0;cd evidence
//! ```
//!
//! A command may continue over several lines; the next record starts at the
//! next `: <digits>:<digits>;` line.

use std::sync::LazyLock;

use regex::Regex;

use crate::emit::{AttributeSpec, EmissionSchema};
use crate::grammar::{FieldSpec, Grammar, Matcher, TimeField, TimeLayout, UnitBoundary};
use crate::registry::TextArtifact;
use crate::time::TimeHints;

static ANCHOR: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^:\s?\d+:\d+;").unwrap());

static RECORD_START: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^:\s*\d+:\d+;").unwrap());

pub static ZSH_EXTENDED_HISTORY: TextArtifact = TextArtifact {
    name: "zsh_extended_history",
    description: "Zsh extended history file",
    anchor: &ANCHOR,
    preamble: None,
    grammar: Grammar {
        fields: &[
            FieldSpec::literal(":"),
            FieldSpec::new("timestamp", Matcher::integer()),
            FieldSpec::literal(":"),
            FieldSpec::new("elapsed_seconds", Matcher::integer()),
            FieldSpec::literal(";"),
            FieldSpec::new("command", Matcher::Rest { allow_empty: false }),
        ],
        times: &[TimeField {
            name: "timestamp",
            layout: TimeLayout::EpochSeconds("timestamp"),
        }],
        boundary: UnitBoundary::Lookahead(&RECORD_START),
    },
    emission: EmissionSchema {
        data_type: "shell:zsh:history",
        attributes: &[
            AttributeSpec::same("command"),
            AttributeSpec::same("elapsed_seconds"),
            AttributeSpec::new("last_written_time", "timestamp"),
        ],
    },
    hints: TimeHints::DEFAULT,
};

//! vsftpd transfer log (`vsftpd.log`).
//!
//! ```text
//! Mon Jun  6 18:43:28 2016 [pid 3] CONNECT: Client "::ffff:10.0.2.2"
//! ```
//!
//! Timestamps are host-local wall-clock time.

use std::sync::LazyLock;

use regex::Regex;

use crate::emit::{AttributeSpec, EmissionSchema};
use crate::grammar::{
    FieldSpec, Grammar, Matcher, TimeField, TimeLayout, TupleLayout, UnitBoundary, YearSource,
};
use crate::registry::TextArtifact;
use crate::time::TimeHints;

static ANCHOR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z]{3} [A-Za-z]{3} +\d{1,2} \d{2}:\d{2}:\d{2} \d{4} .*\[pid .*: Client ")
        .unwrap()
});

pub static VSFTPD: TextArtifact = TextArtifact {
    name: "vsftpd",
    description: "vsftpd log file",
    anchor: &ANCHOR,
    preamble: None,
    grammar: Grammar {
        fields: &[
            FieldSpec::new("weekday", Matcher::alpha(3)).suppressed(),
            FieldSpec::new("month", Matcher::alpha(3)),
            FieldSpec::new("day", Matcher::Digits { min: 1, max: 2 }),
            FieldSpec::new("hour", Matcher::digits(2)),
            FieldSpec::literal(":"),
            FieldSpec::new("minute", Matcher::digits(2)),
            FieldSpec::literal(":"),
            FieldSpec::new("second", Matcher::digits(2)),
            FieldSpec::new("year", Matcher::digits(4)),
            FieldSpec::new("text", Matcher::Rest { allow_empty: true }),
        ],
        times: &[TimeField {
            name: "added_time",
            layout: TimeLayout::Tuple(TupleLayout {
                year: YearSource::Field("year"),
                month: "month",
                day: "day",
                hour: "hour",
                minute: "minute",
                second: "second",
                fraction: None,
            }),
        }],
        boundary: UnitBoundary::Line,
    },
    emission: EmissionSchema {
        data_type: "vsftpd:log",
        attributes: &[AttributeSpec::same("added_time"), AttributeSpec::same("text")],
    },
    hints: TimeHints::DEFAULT,
};

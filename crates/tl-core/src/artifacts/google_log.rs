//! Google logging (glog / absl) text logs.
//!
//! ```text
//! Log file created at: 2019/12/31 23:59:59
//! Running on machine: host
//! Log line format: [IWEF]mmdd hh:mm:ss.uuuuuu threadid file:line] msg
//! I1231 23:59:59.000002  1234 logging_test.py:65] Interesting Stuff
//! ```
//!
//! Record timestamps have no year; the header supplies it when present.

use std::sync::LazyLock;

use regex::Regex;

use crate::emit::{AttributeSpec, EmissionSchema};
use crate::grammar::{
    FieldSpec, FractionField, Grammar, Matcher, TimeField, TimeLayout, TupleLayout, UnitBoundary,
    YearSource,
};
use crate::registry::{Preamble, TextArtifact};
use crate::time::TimeHints;

static ANCHOR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^(?:Log file created at: \d{4}/\d{2}/\d{2} \d{2}:\d{2}:\d{2}|[IWEF]\d{4} \d{2}:\d{2}:\d{2}\.\d{6} +\d+ )",
    )
    .unwrap()
});

static HEADER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^(?:Log file created at: (?P<year>\d{4})/\d{2}/\d{2} \d{2}:\d{2}:\d{2}|Running on machine: .*|Running duration \(h:mm:ss\): .*|Log line format: .*)$",
    )
    .unwrap()
});

static RECORD_START: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[IWEF]\d{4} \d{2}:\d{2}:\d{2}\.\d{6}").unwrap());

pub static GOOGLE_LOG: TextArtifact = TextArtifact {
    name: "google_log",
    description: "Google logging (glog) text log",
    anchor: &ANCHOR,
    preamble: Some(Preamble { pattern: &HEADER }),
    grammar: Grammar {
        fields: &[
            FieldSpec::new("priority", Matcher::alpha(1)),
            FieldSpec::new("month", Matcher::digits(2)),
            FieldSpec::new("day", Matcher::digits(2)),
            FieldSpec::new("hour", Matcher::digits(2)),
            FieldSpec::literal(":"),
            FieldSpec::new("minute", Matcher::digits(2)),
            FieldSpec::literal(":"),
            FieldSpec::new("second", Matcher::digits(2)),
            FieldSpec::literal("."),
            FieldSpec::new("fraction", Matcher::digits(6)),
            FieldSpec::new("thread_identifier", Matcher::integer()),
            FieldSpec::new("file_name", Matcher::Until(":")),
            FieldSpec::literal(":"),
            FieldSpec::new("line_number", Matcher::integer()),
            FieldSpec::literal("]"),
            FieldSpec::new("message", Matcher::Rest { allow_empty: true }),
        ],
        times: &[TimeField {
            name: "last_written_time",
            layout: TimeLayout::Tuple(TupleLayout {
                year: YearSource::Scan,
                month: "month",
                day: "day",
                hour: "hour",
                minute: "minute",
                second: "second",
                fraction: Some(FractionField {
                    field: "fraction",
                    digits: 6,
                }),
            }),
        }],
        boundary: UnitBoundary::Lookahead(&RECORD_START),
    },
    emission: EmissionSchema {
        data_type: "googlelog:log",
        attributes: &[
            AttributeSpec::same("priority"),
            AttributeSpec::same("thread_identifier"),
            AttributeSpec::same("file_name"),
            AttributeSpec::same("line_number"),
            AttributeSpec::same("message"),
            AttributeSpec::same("last_written_time"),
        ],
    },
    hints: TimeHints::DEFAULT,
};

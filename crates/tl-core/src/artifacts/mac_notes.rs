//! Apple Notes `NotesV7.storedata` (OS X Core Data store).
//!
//! Each note row in `ZNOTE` joins its HTML body in `ZNOTEBODY`. Times are
//! Cocoa seconds with a fraction.

use std::sync::LazyLock;

use regex::Regex;

use crate::emit::{AttributeSpec, EmissionSchema};
use crate::record::ExtractedRecord;
use crate::registry::{ColumnKind, ColumnSpec, RequiredTable, RowArtifact, RowQuery};
use crate::time::TimeHints;

pub const NOTE_COLUMNS: &[&str] = &["Z_PK", "ZTITLE", "ZDATECREATED", "ZDATEEDITED"];

pub const BODY_COLUMNS: &[&str] = &["ZNOTE", "ZHTMLSTRING"];

static TAG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]*>").unwrap());

static WHITESPACE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());

/// Visible text of the HTML body: each text run, whitespace collapsed,
/// followed by a single space.
fn body_text(html: &str) -> String {
    let mut text = String::new();
    for run in TAG.split(html) {
        let run = WHITESPACE.replace_all(run.trim(), " ");
        if run.is_empty() {
            continue;
        }
        text.push_str(&decode_entities(&run));
        text.push(' ');
    }
    text
}

fn decode_entities(text: &str) -> String {
    text.replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&amp;", "&")
}

fn derive_text(record: &mut ExtractedRecord) {
    if let Some(html) = record.get_str("html") {
        let text = body_text(html);
        record.insert("text", text);
    }
}

pub static MAC_NOTES: RowArtifact = RowArtifact {
    name: "mac_notes",
    description: "Mac Notes SQLite database",
    required: &[
        RequiredTable {
            name: "ZNOTE",
            columns: NOTE_COLUMNS,
        },
        RequiredTable {
            name: "ZNOTEBODY",
            columns: BODY_COLUMNS,
        },
    ],
    queries: &[RowQuery {
        sql: "SELECT n.ZTITLE AS ZTITLE, n.ZDATECREATED AS ZDATECREATED, \
              n.ZDATEEDITED AS ZDATEEDITED, nb.ZHTMLSTRING AS ZHTMLSTRING \
              FROM ZNOTE AS n, ZNOTEBODY AS nb WHERE nb.ZNOTE = n.Z_PK ORDER BY n.Z_PK",
        columns: &[
            ColumnSpec::new("ZTITLE", "title", ColumnKind::Text),
            ColumnSpec::new("ZDATECREATED", "creation_time", ColumnKind::CocoaTime),
            ColumnSpec::new("ZDATEEDITED", "modification_time", ColumnKind::CocoaTime),
            ColumnSpec::new("ZHTMLSTRING", "html", ColumnKind::Text),
        ],
        finish: Some(derive_text),
        derived: &["text"],
    }],
    emission: EmissionSchema {
        data_type: "mac:notes:note",
        attributes: &[
            AttributeSpec::same("title"),
            AttributeSpec::same("text"),
            AttributeSpec::same("creation_time"),
            AttributeSpec::same("modification_time"),
        ],
    },
    hints: TimeHints::DEFAULT,
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn body_text_drops_markup() {
        let html = "<html><head></head><body><div>building 4th brandy gibs</div>\
                    <div><br></div><div>microsoft   office</div></body></html>";
        assert_eq!(body_text(html), "building 4th brandy gibs microsoft office ");
    }

    #[test]
    fn entities_are_decoded_once() {
        assert_eq!(body_text("<p>a &amp;lt; b&nbsp;&gt; c</p>"), "a &lt; b > c ");
    }

    #[test]
    fn empty_body_has_empty_text() {
        let mut record = ExtractedRecord::new();
        record.insert("html", "<div><br></div>");
        derive_text(&mut record);
        assert_eq!(record.get_str("text"), Some(""));

        let mut missing = ExtractedRecord::new();
        derive_text(&mut missing);
        assert!(!missing.contains("text"));
    }
}

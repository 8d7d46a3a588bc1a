//! Record recognition and normalization engine for forensic timelines.
//!
//! Evidence comes in as lines of text or rows of a table. Each artifact
//! declares how its units look ([`grammar`] or [`registry::RowQuery`]), the
//! [`detect`] module decides which artifact applies, the scanners
//! ([`scanner`], [`rows`]) turn units into records and [`emit`] normalizes
//! them into [`event::EventData`].

pub mod artifacts;
pub mod detect;
pub mod emit;
pub mod event;
pub mod grammar;
pub mod record;
pub mod registry;
pub mod rows;
pub mod scanner;
pub mod source;
pub mod time;

pub use detect::{MAX_DETECT_LINES, detect_rows, detect_text};
pub use emit::{emit_record, to_event_data};
pub use event::{AttributeValue, CollectingSink, EventData, Sink, UnitLocation, Warning};
pub use record::{ExtractedRecord, FieldValue};
pub use registry::{Artifact, ArtifactKind, Registry, RegistryError, RowArtifact, TextArtifact};
pub use rows::scan_rows;
pub use scanner::{LineScanner, ScanContext, ScanError, ScanStats};
pub use source::{LineSource, Row, RowSource, Scalar, SchemaCatalog, SourceError, TextLines};
pub use time::{CanonicalTimestamp, RawTimeValue, Resolution, TimeParseError, normalize};

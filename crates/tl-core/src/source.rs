//! Evidence sources: line-oriented text and row-oriented tables.

use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::io::{self, BufRead};

use thiserror::Error;

use crate::scanner::ScanError;

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("I/O error: {0}")]
    Io(io::Error),
    /// The underlying stream went away; scanners treat this as end of data.
    #[error("source was closed")]
    Closed,
    #[error("backend error: {0}")]
    Backend(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl From<io::Error> for SourceError {
    fn from(err: io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::BrokenPipe | io::ErrorKind::NotConnected => Self::Closed,
            _ => Self::Io(err),
        }
    }
}

/// One physical line, terminator stripped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceLine {
    /// 1-based.
    pub number: usize,
    /// Lossily decoded when `valid_utf8` is false.
    pub text: String,
    pub valid_utf8: bool,
}

/// Sequential line access with bounded lookahead.
pub trait LineSource {
    fn next_line(&mut self) -> Result<Option<SourceLine>, SourceError>;

    /// Looks `offset` lines ahead without consuming; `0` is the next line.
    fn peek_line(&mut self, offset: usize) -> Result<Option<&SourceLine>, SourceError>;
}

/// [`LineSource`] over any buffered reader.
pub struct TextLines<R> {
    reader: R,
    buffered: VecDeque<SourceLine>,
    line_number: usize,
    exhausted: bool,
}

impl<R: BufRead> TextLines<R> {
    pub const fn new(reader: R) -> Self {
        Self {
            reader,
            buffered: VecDeque::new(),
            line_number: 0,
            exhausted: false,
        }
    }

    fn read_line(&mut self) -> Result<Option<SourceLine>, SourceError> {
        if self.exhausted {
            return Ok(None);
        }

        let mut bytes = Vec::new();
        if self.reader.read_until(b'\n', &mut bytes)? == 0 {
            self.exhausted = true;
            return Ok(None);
        }
        if bytes.last() == Some(&b'\n') {
            bytes.pop();
            if bytes.last() == Some(&b'\r') {
                bytes.pop();
            }
        }
        self.line_number += 1;
        if self.line_number == 1 && bytes.starts_with(b"\xEF\xBB\xBF") {
            bytes.drain(..3);
        }

        let (text, valid_utf8) = match String::from_utf8(bytes) {
            Ok(text) => (text, true),
            Err(err) => (String::from_utf8_lossy(err.as_bytes()).into_owned(), false),
        };
        Ok(Some(SourceLine {
            number: self.line_number,
            text,
            valid_utf8,
        }))
    }
}

impl<R: BufRead> LineSource for TextLines<R> {
    fn next_line(&mut self) -> Result<Option<SourceLine>, SourceError> {
        match self.buffered.pop_front() {
            Some(line) => Ok(Some(line)),
            None => self.read_line(),
        }
    }

    fn peek_line(&mut self, offset: usize) -> Result<Option<&SourceLine>, SourceError> {
        while self.buffered.len() <= offset {
            match self.read_line()? {
                Some(line) => self.buffered.push_back(line),
                None => return Ok(None),
            }
        }
        Ok(self.buffered.get(offset))
    }
}

/// Table name to column names.
pub type SchemaCatalog = BTreeMap<String, BTreeSet<String>>;

/// A single cell, by storage class.
#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
    Blob(Vec<u8>),
}

impl Scalar {
    pub const fn storage_class(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Integer(_) => "integer",
            Self::Real(_) => "real",
            Self::Text(_) => "text",
            Self::Blob(_) => "blob",
        }
    }
}

pub trait Row {
    /// `None` when the result set has no such column.
    fn column_value(&self, name: &str) -> Option<Scalar>;
}

/// Table-like evidence (an embedded database).
pub trait RowSource {
    fn tables(&self) -> Result<SchemaCatalog, SourceError>;

    /// Runs `sql` and hands each row to `visit` in native order, stopping at
    /// the first error.
    fn for_each_row(
        &self,
        sql: &str,
        visit: &mut dyn FnMut(&dyn Row) -> Result<(), ScanError>,
    ) -> Result<(), ScanError>;
}

#[cfg(test)]
mod tests {
    use std::fs::File;
    use std::io::{BufReader, Cursor, Read, Write};

    use super::*;

    fn lines(input: &[u8]) -> TextLines<Cursor<Vec<u8>>> {
        TextLines::new(Cursor::new(input.to_vec()))
    }

    #[test]
    fn strips_lf_and_crlf_terminators() {
        let mut source = lines(b"one\r\ntwo\nthree");

        let texts: Vec<_> = std::iter::from_fn(|| source.next_line().unwrap())
            .map(|line| (line.number, line.text))
            .collect();
        assert_eq!(
            texts,
            vec![
                (1, "one".to_string()),
                (2, "two".to_string()),
                (3, "three".to_string())
            ]
        );
    }

    #[test]
    fn peek_does_not_consume() {
        let mut source = lines(b"a\nb\nc\n");

        assert_eq!(source.peek_line(2).unwrap().unwrap().text, "c");
        assert_eq!(source.peek_line(0).unwrap().unwrap().text, "a");
        assert!(source.peek_line(3).unwrap().is_none());

        assert_eq!(source.next_line().unwrap().unwrap().text, "a");
        assert_eq!(source.next_line().unwrap().unwrap().number, 2);
        assert_eq!(source.next_line().unwrap().unwrap().text, "c");
        assert!(source.next_line().unwrap().is_none());
    }

    #[test]
    fn invalid_utf8_is_flagged_not_fatal() {
        let mut source = lines(b"ok\n\xff\xfebad\nok again\n");

        assert!(source.next_line().unwrap().unwrap().valid_utf8);
        let bad = source.next_line().unwrap().unwrap();
        assert!(!bad.valid_utf8);
        assert!(bad.text.ends_with("bad"));
        assert!(source.next_line().unwrap().unwrap().valid_utf8);
    }

    #[test]
    fn reads_lines_from_a_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, ": 1:0;ls").unwrap();
        writeln!(file).unwrap();
        write!(file, ": 2:0;pwd").unwrap();

        let mut source = TextLines::new(BufReader::new(File::open(file.path()).unwrap()));
        let texts: Vec<_> = std::iter::from_fn(|| source.next_line().unwrap())
            .map(|line| line.text)
            .collect();
        assert_eq!(texts, vec![": 1:0;ls", "", ": 2:0;pwd"]);
    }

    #[test]
    fn leading_byte_order_mark_is_dropped() {
        let mut source = lines(b"\xEF\xBB\xBF: 1:0;ls\n");
        assert_eq!(source.next_line().unwrap().unwrap().text, ": 1:0;ls");
    }

    struct Hangup;

    impl Read for Hangup {
        fn read(&mut self, _buf: &mut [u8]) -> io::Result<usize> {
            Err(io::Error::from(io::ErrorKind::BrokenPipe))
        }
    }

    struct Faulty;

    impl Read for Faulty {
        fn read(&mut self, _buf: &mut [u8]) -> io::Result<usize> {
            Err(io::Error::other("disk on fire"))
        }
    }

    #[test]
    fn broken_pipe_maps_to_closed() {
        let mut source = TextLines::new(BufReader::new(Hangup));
        assert!(matches!(source.next_line(), Err(SourceError::Closed)));
    }

    #[test]
    fn other_io_errors_stay_io() {
        let mut source = TextLines::new(BufReader::new(Faulty));
        assert!(matches!(source.peek_line(0), Err(SourceError::Io(_))));
    }
}

//! SQLite row source for the timeline normalizer.
//!
//! Evidence databases are opened read-only through `rusqlite` and exposed to
//! the engine as a [`RowSource`].
//!
//! # Thread Safety
//!
//! [`SqliteSource`] wraps a `rusqlite::Connection`, which is `Send` but not
//! `Sync`. Open one source per thread when scanning files in parallel.

use std::fs::File;
use std::io::{self, Read};
use std::path::{Path, PathBuf};

use rusqlite::types::ValueRef;
use rusqlite::{Connection, OpenFlags};
use thiserror::Error;
use tl_core::scanner::ScanError;
use tl_core::source::{Row, RowSource, Scalar, SchemaCatalog, SourceError};
use tracing::debug;

/// Every SQLite 3 database file starts with these 16 bytes.
const SQLITE_HEADER: &[u8; 16] = b"SQLite format 3\0";

/// Database errors.
#[derive(Debug, Error)]
pub enum DbError {
    /// An error from the underlying database.
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    /// The file does not carry the SQLite header.
    #[error("not a SQLite database: {}", .0.display())]
    NotSqlite(PathBuf),
}

/// Whether `path` starts with the SQLite 3 file header.
pub fn is_sqlite_file(path: &Path) -> io::Result<bool> {
    let mut header = [0_u8; 16];
    let mut file = File::open(path)?;
    match file.read_exact(&mut header) {
        Ok(()) => Ok(&header == SQLITE_HEADER),
        Err(err) if err.kind() == io::ErrorKind::UnexpectedEof => Ok(false),
        Err(err) => Err(err),
    }
}

/// Read-only connection to an evidence database.
pub struct SqliteSource {
    conn: Connection,
}

impl SqliteSource {
    /// Opens `path` read-only after checking the file header.
    pub fn open(path: &Path) -> Result<Self, DbError> {
        if !is_sqlite_file(path)? {
            return Err(DbError::NotSqlite(path.to_path_buf()));
        }
        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )?;
        debug!(path = %path.display(), "Opened SQLite evidence");
        Ok(Self { conn })
    }

    /// Wraps an existing connection. Useful for in-memory fixtures.
    pub const fn from_connection(conn: Connection) -> Self {
        Self { conn }
    }

    fn catalog(&self) -> rusqlite::Result<SchemaCatalog> {
        let mut tables = self
            .conn
            .prepare("SELECT name FROM sqlite_master WHERE type = 'table' ORDER BY name")?;
        let names = tables
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;

        let mut columns = self
            .conn
            .prepare("SELECT name FROM pragma_table_info(?1)")?;
        let mut catalog = SchemaCatalog::new();
        for name in names {
            let table_columns = columns
                .query_map([&name], |row| row.get::<_, String>(0))?
                .collect::<Result<_, _>>()?;
            catalog.insert(name, table_columns);
        }
        Ok(catalog)
    }
}

fn backend(err: rusqlite::Error) -> SourceError {
    SourceError::Backend(Box::new(err))
}

impl RowSource for SqliteSource {
    fn tables(&self) -> Result<SchemaCatalog, SourceError> {
        self.catalog().map_err(backend)
    }

    fn for_each_row(
        &self,
        sql: &str,
        visit: &mut dyn FnMut(&dyn Row) -> Result<(), ScanError>,
    ) -> Result<(), ScanError> {
        let mut stmt = self.conn.prepare(sql).map_err(backend)?;
        let names: Vec<String> = stmt
            .column_names()
            .into_iter()
            .map(str::to_string)
            .collect();
        let mut rows = stmt.query([]).map_err(backend)?;
        while let Some(row) = rows.next().map_err(backend)? {
            visit(&SqliteRow {
                row,
                names: &names,
            })?;
        }
        Ok(())
    }
}

struct SqliteRow<'a, 'stmt> {
    row: &'a rusqlite::Row<'stmt>,
    names: &'a [String],
}

impl Row for SqliteRow<'_, '_> {
    fn column_value(&self, name: &str) -> Option<Scalar> {
        let index = self
            .names
            .iter()
            .position(|column| column == name)
            .or_else(|| {
                self.names
                    .iter()
                    .position(|column| column.eq_ignore_ascii_case(name))
            })?;
        let value = match self.row.get_ref(index).ok()? {
            ValueRef::Null => Scalar::Null,
            ValueRef::Integer(value) => Scalar::Integer(value),
            ValueRef::Real(value) => Scalar::Real(value),
            ValueRef::Text(bytes) => Scalar::Text(String::from_utf8_lossy(bytes).into_owned()),
            ValueRef::Blob(bytes) => Scalar::Blob(bytes.to_vec()),
        };
        Some(value)
    }
}

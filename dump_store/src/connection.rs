//! An opened dump file: a SQLite connection plus its eagerly-read `meta` row.

use crate::error::StoreError;
use parking_lot::Mutex;
use precise_types::document::{Document, ResultChunk};
use rusqlite::OptionalExtension;

/// The only dump format version this reader understands.
///
/// Per the data-model invariant, a reader must reject any other version with
/// [`StoreError::UnsupportedFormatVersion`] rather than guess at its shape.
pub const SUPPORTED_FORMAT_VERSION: u32 = 1;

/// An opened dump file.
///
/// Cheap to clone behind an `Arc` (as held by the connection cache); the
/// SQLite connection itself is wrapped in a [`parking_lot::Mutex`] since
/// `rusqlite::Connection` is `Send` but not `Sync`.
#[derive(Debug)]
pub struct DumpConnection {
    filename: String,
    conn: Mutex<rusqlite::Connection>,
    num_result_chunks: u32,
}

impl DumpConnection {
    /// Open `filename` read-only and eagerly read its `meta` row.
    pub fn open(filename: &str) -> Result<Self, StoreError> {
        let conn = rusqlite::Connection::open_with_flags(
            filename,
            rusqlite::OpenFlags::SQLITE_OPEN_READ_ONLY,
        )
        .map_err(|e| StoreError::from((filename, e)))?;

        let (format_version, num_result_chunks): (u32, u32) = conn
            .query_row(
                "SELECT format_version, num_result_chunks FROM meta",
                [],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .map_err(|e| StoreError::from((filename, e)))?;

        if format_version != SUPPORTED_FORMAT_VERSION {
            return Err(StoreError::UnsupportedFormatVersion {
                filename: filename.to_string(),
                format_version,
            });
        }

        Ok(Self {
            filename: filename.to_string(),
            conn: Mutex::new(conn),
            num_result_chunks,
        })
    }

    /// The filename this connection was opened from.
    pub fn filename(&self) -> &str {
        &self.filename
    }

    /// Number of result chunks this dump was written with; used to compute
    /// `result_chunk_id` without a separate index.
    pub fn num_result_chunks(&self) -> u32 {
        self.num_result_chunks
    }

    /// `true` iff `documents` has a row for `path`.
    pub fn document_exists(&self, path: &str) -> Result<bool, StoreError> {
        let conn = self.conn.lock();
        conn.query_row(
            "SELECT 1 FROM documents WHERE path = ?1",
            [path],
            |_| Ok(()),
        )
        .optional()
        .map(|row| row.is_some())
        .map_err(|e| StoreError::from((self.filename.as_str(), e)))
    }

    /// Decode the document stored at `path`, if any.
    pub fn read_document(&self, path: &str) -> Result<Option<Document>, StoreError> {
        let blob: Option<Vec<u8>> = {
            let conn = self.conn.lock();
            conn.query_row("SELECT data FROM documents WHERE path = ?1", [path], |row| {
                row.get(0)
            })
            .optional()
            .map_err(|e| StoreError::from((self.filename.as_str(), e)))?
        };

        blob.map(|bytes| {
            serde_json::from_slice(&bytes).map_err(|source| StoreError::Malformed {
                filename: self.filename.clone(),
                source,
            })
        })
        .transpose()
    }

    /// Decode the result chunk stored at `chunk_id`, if any.
    pub fn read_result_chunk(&self, chunk_id: u32) -> Result<Option<ResultChunk>, StoreError> {
        let blob: Option<Vec<u8>> = {
            let conn = self.conn.lock();
            conn.query_row("SELECT data FROM result_chunks WHERE id = ?1", [chunk_id], |row| {
                row.get(0)
            })
            .optional()
            .map_err(|e| StoreError::from((self.filename.as_str(), e)))?
        };

        blob.map(|bytes| {
            serde_json::from_slice(&bytes).map_err(|source| StoreError::Malformed {
                filename: self.filename.clone(),
                source,
            })
        })
        .transpose()
    }

    /// Raw rows from the `definitions`/`references` table matching
    /// `(scheme, identifier)`, as `(document_path, start_line, start_character,
    /// end_line, end_character)`, ordered by rowid for stable pagination.
    pub fn moniker_table_rows(
        &self,
        table: &'static str,
        scheme: &str,
        identifier: &str,
        skip: usize,
        take: usize,
    ) -> Result<(Vec<(String, u32, u32, u32, u32)>, usize), StoreError> {
        debug_assert!(table == "definitions" || table == "references");

        let conn = self.conn.lock();
        let count: i64 = conn
            .query_row(
                &format!("SELECT COUNT(*) FROM {table} WHERE scheme = ?1 AND identifier = ?2"),
                rusqlite::params![scheme, identifier],
                |row| row.get(0),
            )
            .map_err(|e| StoreError::from((self.filename.as_str(), e)))?;

        let query = format!(
            "SELECT document_path, start_line, start_character, end_line, end_character \
             FROM {table} WHERE scheme = ?1 AND identifier = ?2 \
             ORDER BY rowid LIMIT ?3 OFFSET ?4"
        );
        let mut stmt = conn
            .prepare(&query)
            .map_err(|e| StoreError::from((self.filename.as_str(), e)))?;
        let rows = stmt
            .query_map(
                rusqlite::params![scheme, identifier, take as i64, skip as i64],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, u32>(1)?,
                        row.get::<_, u32>(2)?,
                        row.get::<_, u32>(3)?,
                        row.get::<_, u32>(4)?,
                    ))
                },
            )
            .map_err(|e| StoreError::from((self.filename.as_str(), e)))?
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| StoreError::from((self.filename.as_str(), e)))?;

        Ok((rows, count as usize))
    }
}

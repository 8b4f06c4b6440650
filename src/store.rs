//! SQLite-backed document store.
//!
//! Two operations only: append one row per successfully processed PDF, and
//! read every row back for export. Rows are never updated or deleted by
//! this system, and no dedup is enforced — re-importing a statement with
//! the same filename appends a second row.
//!
//! The connection is opened once at process start and reused for all
//! writes/reads; no transaction spans more than a single insert or a single
//! bulk read. Concurrent external writers to the same file are unsupported.

use crate::document::{DocumentMetadata, StoredDocument};
use crate::error::Stmt2CsvError;
use rusqlite::{params, Connection};
use std::path::Path;
use tracing::info;

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS documents (
    id INTEGER PRIMARY KEY,
    document_name TEXT NOT NULL,
    document_data TEXT NOT NULL
);
";

const INSERT_DOCUMENT: &str =
    "INSERT INTO documents (document_name, document_data) VALUES (?1, ?2)";
const EXPORT_ALL_DOCUMENTS: &str = "SELECT document_name, document_data FROM documents ORDER BY id";

/// Handle on the SQLite document store.
pub struct DocumentStore {
    conn: Connection,
}

impl DocumentStore {
    /// Open (or create) the store at `path`, creating the parent directory
    /// and the schema as needed.
    pub fn open(path: &Path) -> Result<Self, Stmt2CsvError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|source| {
                    Stmt2CsvError::DirectoryCreateFailed {
                        path: parent.to_path_buf(),
                        source,
                    }
                })?;
            }
        }

        info!("Connecting to database '{}'...", path.display());
        let conn = Connection::open(path)?;
        conn.execute_batch(SCHEMA)?;
        info!("DB handler initialized");
        Ok(Self { conn })
    }

    /// Open an in-memory store (for testing).
    pub fn in_memory() -> Result<Self, Stmt2CsvError> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self { conn })
    }

    /// Append one row for a processed document. The document name is the
    /// PDF's base filename; the data column is the JSON-serialised metadata.
    pub fn insert_document(&self, metadata: &DocumentMetadata) -> Result<(), Stmt2CsvError> {
        let document_name = Path::new(&metadata.pdf_path)
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| metadata.pdf_path.clone());
        let json = serde_json::to_string(metadata)?;

        self.conn
            .execute(INSERT_DOCUMENT, params![document_name, json])?;
        info!("Data for document '{document_name}' written to db");
        Ok(())
    }

    /// Read every stored document back, in insertion order.
    pub fn export_all(&self) -> Result<Vec<StoredDocument>, Stmt2CsvError> {
        let mut stmt = self.conn.prepare(EXPORT_ALL_DOCUMENTS)?;
        let rows = stmt.query_map([], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?;

        let mut documents = Vec::new();
        for row in rows {
            let (document_name, data) = row?;
            let document_data: DocumentMetadata = serde_json::from_str(&data)?;
            documents.push(StoredDocument {
                document_name,
                document_data,
            });
        }
        Ok(documents)
    }
}

//! CSV export: one file per stored document.
//!
//! Export is the only place transactions are filtered: a row needs both a
//! date and an amount, and anything else is dropped with a logged error.
//! Row order follows storage order — pages in physical order, transactions
//! in page order — so the CSV reads like the statement does.
//!
//! A document whose export fails is logged and skipped; the remaining
//! documents still get their files.

use crate::document::{DocumentMetadata, StoredDocument};
use crate::error::Stmt2CsvError;
use crate::store::DocumentStore;
use std::path::{Path, PathBuf};
use tracing::{error, info};

/// Header row of every exported CSV file.
pub const CSV_HEADERS: [&str; 3] = ["Transaction Date", "Transaction Amount", "Transaction Text"];

/// Derive the CSV filename from the stored document name: lowercased,
/// `.pdf` suffix replaced with `.csv`.
pub fn csv_file_name(document_name: &str) -> String {
    let lower = document_name.to_lowercase();
    match lower.strip_suffix(".pdf") {
        Some(stem) => format!("{stem}.csv"),
        None => format!("{lower}.csv"),
    }
}

/// Flatten a document into exportable CSV rows, dropping transactions with
/// a missing date or amount.
fn transaction_rows(metadata: &DocumentMetadata) -> Vec<[String; 3]> {
    let mut rows = Vec::new();
    for page in &metadata.page_content {
        for txn in &page.transactions.transactions {
            if !txn.is_exportable() {
                error!(
                    "Error reading transaction data on page '{}', date or amount was missing",
                    page.page_path.display()
                );
                continue;
            }
            rows.push([
                txn.date.clone(),
                txn.amount.clone(),
                txn.transaction_text.clone(),
            ]);
        }
    }
    rows
}

/// Write one document's CSV file into `export_dir`; returns the file path.
pub fn export_document(
    document: &StoredDocument,
    export_dir: &Path,
) -> Result<PathBuf, Stmt2CsvError> {
    let path = export_dir.join(csv_file_name(&document.document_name));
    let write_failed = |path: &Path, detail: String| Stmt2CsvError::ExportWriteFailed {
        path: path.to_path_buf(),
        detail,
    };

    let mut writer =
        csv::Writer::from_path(&path).map_err(|e| write_failed(&path, e.to_string()))?;
    writer
        .write_record(CSV_HEADERS)
        .map_err(|e| write_failed(&path, e.to_string()))?;
    for row in transaction_rows(&document.document_data) {
        writer
            .write_record(&row)
            .map_err(|e| write_failed(&path, e.to_string()))?;
    }
    writer
        .flush()
        .map_err(|e| write_failed(&path, e.to_string()))?;
    Ok(path)
}

/// Export every stored document; returns how many files were written.
///
/// Per-document failures are logged and skipped — the batch contract is the
/// same as for processing.
pub fn export_documents(store: &DocumentStore, export_dir: &Path) -> Result<usize, Stmt2CsvError> {
    let documents = store.export_all()?;
    let mut exported = 0;
    for document in &documents {
        info!(
            "Exporting transactions for pdf file '{}'",
            document.document_name
        );
        match export_document(document, export_dir) {
            Ok(path) => {
                info!("CSV file exported to '{}'", path.display());
                exported += 1;
            }
            Err(err) => {
                error!(
                    "Error exporting transactions for file '{}'. Trace: {err}",
                    document.document_name
                );
            }
        }
    }
    Ok(exported)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{AccountInformation, PageRecord, Transaction, TransactionBlock};

    fn txn(date: &str, amount: &str, text: &str) -> Transaction {
        Transaction {
            date: date.into(),
            amount: amount.into(),
            transaction_text: text.into(),
        }
    }

    fn document(pages: Vec<Vec<Transaction>>) -> StoredDocument {
        let page_content = pages
            .into_iter()
            .enumerate()
            .map(|(i, transactions)| PageRecord {
                page_path: PathBuf::from(format!("scratch/doc/page_{i}.png")),
                transactions: TransactionBlock { transactions },
            })
            .collect::<Vec<_>>();
        StoredDocument {
            document_name: "Statement_March.pdf".into(),
            document_data: DocumentMetadata {
                pdf_path: "source/Statement_March.pdf".into(),
                page_count: page_content.len(),
                page_content,
                account_information: AccountInformation::default(),
            },
        }
    }

    #[test]
    fn csv_file_name_lowercases_and_swaps_extension() {
        assert_eq!(csv_file_name("Statement_March.PDF"), "statement_march.csv");
        assert_eq!(csv_file_name("plain"), "plain.csv");
    }

    #[test]
    fn incomplete_transactions_are_dropped() {
        let doc = document(vec![vec![
            txn("2024-01-01", "10.00", "REWE"),
            txn("", "5.00", "no date"),
            txn("2024-01-02", "", "no amount"),
        ]]);
        let rows = transaction_rows(&doc.document_data);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0][0], "2024-01-01");
    }

    #[test]
    fn rows_keep_page_then_transaction_order() {
        let doc = document(vec![
            vec![txn("2024-01-02", "2.00", ""), txn("2024-01-01", "1.00", "")],
            vec![txn("2024-01-03", "3.00", "")],
        ]);
        let rows = transaction_rows(&doc.document_data);
        let dates: Vec<_> = rows.iter().map(|r| r[0].as_str()).collect();
        // Page order then on-page order, never re-sorted by date.
        assert_eq!(dates, vec!["2024-01-02", "2024-01-01", "2024-01-03"]);
    }

    #[test]
    fn exported_file_has_header_and_filtered_rows() {
        let dir = tempfile::tempdir().unwrap();
        let doc = document(vec![vec![
            txn("2024-01-01", "10.00", ""),
            txn("", "", "dropped"),
        ]]);

        let path = export_document(&doc, dir.path()).unwrap();

        assert_eq!(path, dir.path().join("statement_march.csv"));
        let content = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<_> = content.lines().collect();
        assert_eq!(
            lines,
            vec![
                "Transaction Date,Transaction Amount,Transaction Text",
                "2024-01-01,10.00,",
            ]
        );
    }

    #[test]
    fn export_documents_continues_past_a_bad_document() {
        let store = DocumentStore::in_memory().unwrap();
        let blocked = document(vec![vec![txn("2024-01-01", "10.00", "")]]);
        store.insert_document(&blocked.document_data).unwrap();
        let mut good = document(vec![vec![txn("2024-02-01", "20.00", "")]]);
        good.document_data.pdf_path = "source/other.pdf".into();
        store.insert_document(&good.document_data).unwrap();

        let dir = tempfile::tempdir().unwrap();
        // Pre-create a directory where the first csv file should go so that
        // document's export fails.
        std::fs::create_dir(dir.path().join("statement_march.csv")).unwrap();

        let exported = export_documents(&store, dir.path()).unwrap();
        assert_eq!(exported, 1);
        assert!(dir.path().join("other.csv").exists());
    }
}

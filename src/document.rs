//! Structured records produced by the pipeline and persisted to the store.
//!
//! Everything here is plain serde data. The shapes mirror what the vision
//! model is prompted to return, so assembly is a straight deserialisation of
//! the sanitised response — no field-by-field mapping layer in between.
//!
//! A transaction with a missing `date` or `amount` is *kept* at assembly
//! time and stored exactly as the model produced it; it is only filtered out
//! when CSV rows are generated. Storage stays a faithful record of what the
//! model saw, and export policy can change without reprocessing documents.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// One bank transaction as read off a statement page.
///
/// The model is told `date` and `amount` are required, but scans are messy
/// and models disobey; absent fields deserialise to empty strings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    #[serde(default)]
    pub date: String,
    #[serde(default)]
    pub amount: String,
    #[serde(default)]
    pub transaction_text: String,
}

impl Transaction {
    /// A transaction is exportable only when both date and amount are set.
    pub fn is_exportable(&self) -> bool {
        !self.date.is_empty() && !self.amount.is_empty()
    }
}

/// The `{"transactions": [...]}` envelope returned by the transactions
/// prompt. Insertion order is page order and is preserved.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionBlock {
    #[serde(default)]
    pub transactions: Vec<Transaction>,
}

/// One processed page: the rendered image it came from plus the
/// transactions the model extracted from it. Immutable once built.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageRecord {
    pub page_path: PathBuf,
    pub transactions: TransactionBlock,
}

/// Account-level data extracted from the cover page.
///
/// Every field is optional: a cover page that carries no account data is
/// represented by the empty mapping, which is a valid model response.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountInformation {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, rename = "IBAN", skip_serializing_if = "Option::is_none")]
    pub iban: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub document_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub previous_account_balance: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub new_account_balance: Option<String>,
}

/// The `{"account_data": {...}}` envelope returned by the account-info
/// prompt.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AccountEnvelope {
    #[serde(default)]
    pub account_data: AccountInformation,
}

/// The full structured record for one processed PDF — the unit persisted to
/// the store and the unit retrieved for export.
///
/// Invariants: `page_count == page_content.len()`, `page_content` ordering
/// matches physical page order, and page 0 is the cover page the account
/// information was read from.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentMetadata {
    pub pdf_path: String,
    pub page_count: usize,
    pub page_content: Vec<PageRecord>,
    pub account_information: AccountInformation,
}

/// One row read back from the document store.
#[derive(Debug, Clone)]
pub struct StoredDocument {
    /// PDF base filename at import time. Unique per import only in the
    /// sense that each import appends a row; no dedup is enforced.
    pub document_name: String,
    pub document_data: DocumentMetadata,
}

//! Document assembly: one OCR pass over the page images of a single PDF.
//!
//! The cover page (`images[0]`) gets an extra account-info request; every
//! page, cover included, gets a transactions request. Calls are strictly
//! sequential — one blocking round trip at a time, page 0 first — so total
//! latency is linear in page count plus one.
//!
//! A response that fails to parse as JSON aborts the whole document, not
//! just the page: partially assembled metadata is never persisted.

use crate::document::{AccountEnvelope, DocumentMetadata, PageRecord, TransactionBlock};
use crate::error::Stmt2CsvError;
use crate::ocr::OcrClient;
use crate::prompts::{ACCOUNT_INFO_PROMPT, TRANSACTIONS_PROMPT};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Build the full [`DocumentMetadata`] record for one PDF from its rendered
/// page images.
pub async fn build_metadata(
    ocr: &OcrClient,
    pdf_path: &Path,
    images: &[PathBuf],
) -> Result<DocumentMetadata, Stmt2CsvError> {
    let cover_page = images.first().ok_or_else(|| Stmt2CsvError::NoPages {
        path: pdf_path.to_path_buf(),
    })?;

    debug!(
        "Performing account info request with page path '{}'",
        cover_page.display()
    );
    let account_raw = ocr.ask(ACCOUNT_INFO_PROMPT, Some(cover_page)).await?;
    let envelope: AccountEnvelope =
        serde_json::from_str(&account_raw).map_err(|source| Stmt2CsvError::MalformedResponse {
            context: format!("account info on '{}'", cover_page.display()),
            source,
        })?;

    let mut page_content = Vec::with_capacity(images.len());
    for page_path in images {
        debug!(
            "Performing transactions request with page path '{}'",
            page_path.display()
        );
        let raw = ocr.ask(TRANSACTIONS_PROMPT, Some(page_path)).await?;
        let transactions: TransactionBlock =
            serde_json::from_str(&raw).map_err(|source| Stmt2CsvError::MalformedResponse {
                context: format!("transactions on '{}'", page_path.display()),
                source,
            })?;
        page_content.push(PageRecord {
            page_path: page_path.clone(),
            transactions,
        });
    }

    Ok(DocumentMetadata {
        pdf_path: pdf_path.display().to_string(),
        page_count: page_content.len(),
        page_content,
        account_information: envelope.account_data,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ocr::{ImageAttachment, VisionModel, VisionResponse};
    use crate::prompts;
    use async_trait::async_trait;
    use std::sync::Arc;

    /// Answers the account prompt and the transactions prompt with canned
    /// JSON, keyed off the prompt text.
    struct CannedModel {
        account: String,
        transactions: String,
    }

    #[async_trait]
    impl VisionModel for CannedModel {
        async fn complete(
            &self,
            prompt: &str,
            _image: Option<&ImageAttachment>,
        ) -> Result<VisionResponse, Stmt2CsvError> {
            let text = if prompt == prompts::ACCOUNT_INFO_PROMPT {
                self.account.clone()
            } else {
                self.transactions.clone()
            };
            Ok(VisionResponse {
                text,
                usage: Default::default(),
            })
        }
    }

    fn page_images(dir: &Path, count: usize) -> Vec<PathBuf> {
        (0..count)
            .map(|i| {
                let p = dir.join(format!("page_{i}.png"));
                std::fs::write(&p, b"not a real png").unwrap();
                p
            })
            .collect()
    }

    #[tokio::test]
    async fn assembles_pages_in_order_with_account_info() {
        let dir = tempfile::tempdir().unwrap();
        let images = page_images(dir.path(), 3);
        let model = Arc::new(CannedModel {
            account: r#"{"account_data": {"name": "X"}}"#.into(),
            transactions: r#"{"transactions": [{"date": "2024-01-01", "amount": "10.00"}]}"#
                .into(),
        });
        let ocr = OcrClient::new(model, 10);

        let metadata = build_metadata(&ocr, Path::new("in/statement.pdf"), &images)
            .await
            .unwrap();

        assert_eq!(metadata.page_count, 3);
        assert_eq!(metadata.page_content.len(), 3);
        assert_eq!(metadata.account_information.name.as_deref(), Some("X"));
        for (i, page) in metadata.page_content.iter().enumerate() {
            assert_eq!(page.page_path, images[i]);
            assert_eq!(page.transactions.transactions.len(), 1);
        }
    }

    #[tokio::test]
    async fn empty_account_mapping_is_accepted() {
        let dir = tempfile::tempdir().unwrap();
        let images = page_images(dir.path(), 1);
        let model = Arc::new(CannedModel {
            account: r#"{"account_data": {}}"#.into(),
            transactions: r#"{"transactions": []}"#.into(),
        });
        let ocr = OcrClient::new(model, 10);

        let metadata = build_metadata(&ocr, Path::new("statement.pdf"), &images)
            .await
            .unwrap();

        assert_eq!(metadata.account_information, Default::default());
    }

    #[tokio::test]
    async fn malformed_account_response_aborts_the_document() {
        let dir = tempfile::tempdir().unwrap();
        let images = page_images(dir.path(), 2);
        let model = Arc::new(CannedModel {
            account: "the dog ate the cover page".into(),
            transactions: r#"{"transactions": []}"#.into(),
        });
        let ocr = OcrClient::new(model, 10);

        let result = build_metadata(&ocr, Path::new("statement.pdf"), &images).await;
        assert!(matches!(
            result,
            Err(Stmt2CsvError::MalformedResponse { .. })
        ));
    }

    #[tokio::test]
    async fn no_images_is_an_error() {
        let model = Arc::new(CannedModel {
            account: "{}".into(),
            transactions: "{}".into(),
        });
        let ocr = OcrClient::new(model, 10);

        let result = build_metadata(&ocr, Path::new("statement.pdf"), &[]).await;
        assert!(matches!(result, Err(Stmt2CsvError::NoPages { .. })));
    }
}

//! OCR client: drive one vision-model call with rate-limit retry.
//!
//! The transport sits behind the [`VisionModel`] trait so the client (and
//! everything above it) can be exercised against a scripted double; the
//! production implementation is [`crate::ocr::azure::AzureVisionModel`].
//!
//! ## Retry strategy
//!
//! Only rate-limit errors are retried. The service recommends waiting at
//! least one second before resending; we sleep `2 + uniform(0,1)` seconds so
//! repeated callers don't resynchronise on the same instant. Every other
//! error — transport failures, HTTP 4xx/5xx, auth — propagates immediately
//! and fails the file being processed.

use crate::error::Stmt2CsvError;
use crate::ocr::sanitize::sanitize_response;
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use rand::Rng;
use std::path::Path;
use std::sync::Arc;
use tokio::time::{sleep, Duration};
use tracing::{debug, warn};

/// A base64-encoded page image ready for the request body.
#[derive(Debug, Clone)]
pub struct ImageAttachment {
    /// Base64 payload of the raw file bytes.
    pub data: String,
    /// Image type token for the data URI, inferred from the file extension.
    pub image_type: &'static str,
}

/// Per-call usage accounting as reported by the service.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Usage {
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
    pub cost_usd: f64,
}

/// One raw (unsanitised) model response.
#[derive(Debug, Clone)]
pub struct VisionResponse {
    pub text: String,
    pub usage: Usage,
}

/// The vision-transport seam.
///
/// Exactly one call: send a prompt, optionally with an inline image, and get
/// the raw response text plus usage accounting back. Rate limits must be
/// reported as [`Stmt2CsvError::RateLimited`] so the client can retry them.
#[async_trait]
pub trait VisionModel: Send + Sync {
    async fn complete(
        &self,
        prompt: &str,
        image: Option<&ImageAttachment>,
    ) -> Result<VisionResponse, Stmt2CsvError>;
}

/// Infer the data-URI image type from the file extension.
///
/// `png` and `jpeg` map to themselves; everything else — including plain
/// `jpg` — is sent as `jpg`.
pub fn image_type_for(path: &Path) -> &'static str {
    match path.extension().and_then(|e| e.to_str()) {
        Some(ext) if ext.eq_ignore_ascii_case("png") => "png",
        Some(ext) if ext.eq_ignore_ascii_case("jpeg") => "jpeg",
        _ => "jpg",
    }
}

/// Read an image file and wrap it as a base64 request attachment.
pub fn load_image_attachment(path: &Path) -> Result<ImageAttachment, Stmt2CsvError> {
    let bytes = std::fs::read(path).map_err(|source| Stmt2CsvError::ImageReadFailed {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(ImageAttachment {
        data: STANDARD.encode(bytes),
        image_type: image_type_for(path),
    })
}

/// Client for OCR requests against a vision model.
///
/// Holds the transport as a trait object plus the configured retry bound;
/// construct once and share by reference for the whole batch.
pub struct OcrClient {
    model: Arc<dyn VisionModel>,
    max_retries: u32,
}

impl OcrClient {
    pub fn new(model: Arc<dyn VisionModel>, max_retries: u32) -> Self {
        Self { model, max_retries }
    }

    /// Send `prompt` (plus the image at `image_path`, if any) and return the
    /// sanitised JSON text, using the configured retry bound.
    pub async fn ask(
        &self,
        prompt: &str,
        image_path: Option<&Path>,
    ) -> Result<String, Stmt2CsvError> {
        self.ask_with_retries(prompt, image_path, self.max_retries)
            .await
    }

    /// Like [`OcrClient::ask`] with an explicit retry bound.
    ///
    /// The bound is inclusive: up to `max_retries + 1` attempts are made
    /// before the rate-limit error escalates to
    /// [`Stmt2CsvError::RateLimitExhausted`].
    pub async fn ask_with_retries(
        &self,
        prompt: &str,
        image_path: Option<&Path>,
        max_retries: u32,
    ) -> Result<String, Stmt2CsvError> {
        let attachment = match image_path {
            Some(path) if !path.as_os_str().is_empty() => Some(load_image_attachment(path)?),
            _ => None,
        };

        let mut retries = 0u32;
        loop {
            match self.model.complete(prompt, attachment.as_ref()).await {
                Ok(response) => {
                    let text = sanitize_response(&response.text);
                    debug!("Sanitised response: {text}");
                    debug!(
                        "Call usage: {} in / {} out, cost (USD): ${:.6}",
                        response.usage.prompt_tokens,
                        response.usage.completion_tokens,
                        response.usage.cost_usd
                    );
                    return Ok(text);
                }
                Err(err) if err.is_rate_limit() => {
                    if retries >= max_retries {
                        warn!("Max retries exceeded for rate limit error");
                        return Err(Stmt2CsvError::RateLimitExhausted { retries });
                    }
                    let wait_secs: f64 = 2.0 + rand::rng().random_range(0.0..1.0);
                    warn!("Rate limit error encountered. Retrying in {wait_secs:.2}s...");
                    sleep(Duration::from_secs_f64(wait_secs)).await;
                    retries += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use std::sync::atomic::{AtomicU32, Ordering};

    /// Scripted transport: errors for the first `failures` calls, then
    /// returns `text`.
    struct ScriptedModel {
        calls: AtomicU32,
        failures: u32,
        error_is_rate_limit: bool,
        text: String,
    }

    impl ScriptedModel {
        fn rate_limited(failures: u32, text: &str) -> Self {
            Self {
                calls: AtomicU32::new(0),
                failures,
                error_is_rate_limit: true,
                text: text.to_string(),
            }
        }

        fn calls(&self) -> u32 {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl VisionModel for ScriptedModel {
        async fn complete(
            &self,
            _prompt: &str,
            _image: Option<&ImageAttachment>,
        ) -> Result<VisionResponse, Stmt2CsvError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if call < self.failures {
                if self.error_is_rate_limit {
                    return Err(Stmt2CsvError::RateLimited {
                        retry_after_secs: None,
                    });
                }
                return Err(Stmt2CsvError::ApiError {
                    status: 500,
                    detail: "scripted failure".into(),
                });
            }
            Ok(VisionResponse {
                text: self.text.clone(),
                usage: Usage::default(),
            })
        }
    }

    #[tokio::test(start_paused = true)]
    async fn rate_limit_exhaustion_makes_max_retries_plus_one_attempts() {
        let model = Arc::new(ScriptedModel::rate_limited(u32::MAX, "{}"));
        let client = OcrClient::new(Arc::clone(&model) as Arc<dyn VisionModel>, 10);

        let result = client.ask_with_retries("prompt", None, 2).await;

        assert!(matches!(
            result,
            Err(Stmt2CsvError::RateLimitExhausted { retries: 2 })
        ));
        assert_eq!(model.calls(), 3, "bound is inclusive: 3 attempts total");
    }

    #[tokio::test(start_paused = true)]
    async fn recovers_after_one_rate_limit() {
        let model = Arc::new(ScriptedModel::rate_limited(1, "{\"transactions\": []}"));
        let client = OcrClient::new(Arc::clone(&model) as Arc<dyn VisionModel>, 10);

        let text = client
            .ask_with_retries("prompt", None, 2)
            .await
            .expect("second attempt succeeds");

        assert_eq!(text, "{\"transactions\": []}");
        assert_eq!(model.calls(), 2);
    }

    #[tokio::test]
    async fn non_rate_limit_errors_are_not_retried() {
        let model = Arc::new(ScriptedModel {
            calls: AtomicU32::new(0),
            failures: u32::MAX,
            error_is_rate_limit: false,
            text: String::new(),
        });
        let client = OcrClient::new(Arc::clone(&model) as Arc<dyn VisionModel>, 10);

        let result = client.ask("prompt", None).await;

        assert!(matches!(result, Err(Stmt2CsvError::ApiError { .. })));
        assert_eq!(model.calls(), 1);
    }

    #[tokio::test]
    async fn responses_are_sanitised() {
        let model = Arc::new(ScriptedModel::rate_limited(
            0,
            "Here you go:\n{\"transactions\": []}\nHope that helps!",
        ));
        let client = OcrClient::new(model as Arc<dyn VisionModel>, 10);

        let text = client.ask("prompt", None).await.unwrap();
        assert_eq!(text, "{\"transactions\": []}");
    }

    #[test]
    fn image_type_inference() {
        assert_eq!(image_type_for(&PathBuf::from("page_0.png")), "png");
        assert_eq!(image_type_for(&PathBuf::from("page_0.PNG")), "png");
        assert_eq!(image_type_for(&PathBuf::from("scan.jpeg")), "jpeg");
        // jpg and unknown extensions both fall back to jpg
        assert_eq!(image_type_for(&PathBuf::from("scan.jpg")), "jpg");
        assert_eq!(image_type_for(&PathBuf::from("scan.tiff")), "jpg");
        assert_eq!(image_type_for(&PathBuf::from("noext")), "jpg");
    }

    #[tokio::test]
    async fn missing_image_file_fails_before_any_call() {
        let model = Arc::new(ScriptedModel::rate_limited(0, "{}"));
        let client = OcrClient::new(Arc::clone(&model) as Arc<dyn VisionModel>, 10);

        let result = client
            .ask("prompt", Some(Path::new("/definitely/missing.png")))
            .await;

        assert!(matches!(result, Err(Stmt2CsvError::ImageReadFailed { .. })));
        assert_eq!(model.calls(), 0);
    }
}

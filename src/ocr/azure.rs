//! Azure OpenAI chat-completions transport for the [`VisionModel`] seam.
//!
//! One POST per call against
//! `{base}/openai/deployments/{deployment}/chat/completions`, authenticated
//! with the `api-key` header. The request declares
//! `response_format: {"type": "json_object"}` so the model is steered toward
//! bare JSON before the sanitiser ever sees the text.
//!
//! HTTP 429 is mapped to [`Stmt2CsvError::RateLimited`] (honouring a
//! `Retry-After` header when present) so the OCR client can back off and
//! resend; every other non-success status is terminal for the call.

use crate::config::AzureEndpoint;
use crate::error::Stmt2CsvError;
use crate::ocr::client::{ImageAttachment, Usage, VisionModel, VisionResponse};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::debug;

/// Vision transport backed by an Azure OpenAI deployment.
pub struct AzureVisionModel {
    http: reqwest::Client,
    endpoint: AzureEndpoint,
}

impl AzureVisionModel {
    /// Build the transport. The per-call timeout is baked into the HTTP
    /// client; endpoint/credential validation already happened in
    /// [`AzureEndpoint::from_env`].
    pub fn new(endpoint: AzureEndpoint, api_timeout_secs: u64) -> Result<Self, Stmt2CsvError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(api_timeout_secs))
            .build()?;
        Ok(Self { http, endpoint })
    }
}

/// Assemble the multi-part `content` array: the text prompt first, then the
/// inline image as a base64 data URI when one is attached.
fn build_content(prompt: &str, image: Option<&ImageAttachment>) -> Value {
    let mut parts = vec![json!({ "type": "text", "text": prompt })];
    if let Some(img) = image {
        parts.push(json!({
            "type": "image_url",
            "image_url": {
                "url": format!("data:image/{};base64,{}", img.image_type, img.data)
            }
        }));
    }
    Value::Array(parts)
}

#[derive(Deserialize)]
struct ChatCompletion {
    #[serde(default)]
    choices: Vec<Choice>,
    #[serde(default)]
    usage: Option<ApiUsage>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: String,
}

#[derive(Deserialize, Default)]
struct ApiUsage {
    #[serde(default)]
    prompt_tokens: u64,
    #[serde(default)]
    completion_tokens: u64,
}

/// Price the call from the reported token counts.
fn call_cost(endpoint: &AzureEndpoint, usage: &ApiUsage) -> f64 {
    usage.prompt_tokens as f64 * endpoint.input_price_per_mtok / 1_000_000.0
        + usage.completion_tokens as f64 * endpoint.output_price_per_mtok / 1_000_000.0
}

#[async_trait]
impl VisionModel for AzureVisionModel {
    async fn complete(
        &self,
        prompt: &str,
        image: Option<&ImageAttachment>,
    ) -> Result<VisionResponse, Stmt2CsvError> {
        let body = json!({
            "messages": [{
                "role": "user",
                "content": build_content(prompt, image),
            }],
            "response_format": { "type": "json_object" },
        });

        let response = self
            .http
            .post(self.endpoint.completions_url())
            .header("api-key", &self.endpoint.api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if status.as_u16() == 429 {
            let retry_after_secs = response
                .headers()
                .get(reqwest::header::RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse().ok());
            return Err(Stmt2CsvError::RateLimited { retry_after_secs });
        }
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(Stmt2CsvError::ApiError {
                status: status.as_u16(),
                detail,
            });
        }

        let completion: ChatCompletion = response.json().await?;
        let usage = completion.usage.unwrap_or_default();
        let cost_usd = call_cost(&self.endpoint, &usage);
        debug!(
            "Azure call: {} prompt tokens, {} completion tokens",
            usage.prompt_tokens, usage.completion_tokens
        );

        let text = completion
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| Stmt2CsvError::Internal("vision response contained no choices".into()))?;

        Ok(VisionResponse {
            text,
            usage: Usage {
                prompt_tokens: usage.prompt_tokens,
                completion_tokens: usage.completion_tokens,
                cost_usd,
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn endpoint() -> AzureEndpoint {
        AzureEndpoint {
            api_base: "https://example.openai.azure.com".into(),
            api_version: "2024-02-01".into(),
            deployment: "gpt-4o".into(),
            api_key: "k".into(),
            input_price_per_mtok: 2.50,
            output_price_per_mtok: 10.00,
        }
    }

    #[test]
    fn content_without_image_is_text_only() {
        let content = build_content("read this page", None);
        let parts = content.as_array().unwrap();
        assert_eq!(parts.len(), 1);
        assert_eq!(parts[0]["type"], "text");
    }

    #[test]
    fn content_with_image_carries_data_uri() {
        let img = ImageAttachment {
            data: "QUJD".into(),
            image_type: "png",
        };
        let content = build_content("read this page", Some(&img));
        let parts = content.as_array().unwrap();
        assert_eq!(parts.len(), 2);
        assert_eq!(
            parts[1]["image_url"]["url"],
            "data:image/png;base64,QUJD"
        );
    }

    #[test]
    fn cost_uses_both_price_rates() {
        let usage = ApiUsage {
            prompt_tokens: 1_000_000,
            completion_tokens: 500_000,
        };
        let cost = call_cost(&endpoint(), &usage);
        assert!((cost - 7.50).abs() < 1e-9, "got {cost}");
    }

    #[test]
    fn completion_parses_without_usage() {
        let raw = r#"{"choices": [{"message": {"content": "{}"}}]}"#;
        let completion: ChatCompletion = serde_json::from_str(raw).unwrap();
        assert!(completion.usage.is_none());
        assert_eq!(completion.choices[0].message.content, "{}");
    }
}

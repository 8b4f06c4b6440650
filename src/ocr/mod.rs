//! OCR against an external vision model.
//!
//! Three layers, outermost first:
//!
//! 1. [`client`] — the [`client::OcrClient`]: request assembly (prompt +
//!    optional inline image), rate-limit retry with randomised backoff, and
//!    per-call cost logging. The only layer the pipeline talks to.
//! 2. [`azure`] — the production [`client::VisionModel`] transport against
//!    an Azure OpenAI deployment. Tests substitute scripted doubles at the
//!    same seam.
//! 3. [`sanitize`] — deterministic extraction of the JSON object from the
//!    raw response text.

pub mod azure;
pub mod client;
pub mod sanitize;

pub use azure::AzureVisionModel;
pub use client::{ImageAttachment, OcrClient, Usage, VisionModel, VisionResponse};
pub use sanitize::sanitize_response;

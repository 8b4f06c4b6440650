//! Configuration types for the statement-processing pipeline.
//!
//! All pipeline behaviour is controlled through [`PipelineConfig`], built via
//! its [`PipelineConfigBuilder`]. Keeping every knob in one struct makes it
//! trivial to share the config between the driver, the rasteriser, and the
//! exporter, and to log one value that fully describes a run.
//!
//! The Azure endpoint settings live in their own [`AzureEndpoint`] struct
//! because they are consumed only by the vision transport and carry the API
//! credential; [`AzureEndpoint::from_env`] is the startup validation step
//! that makes a missing credential fatal before any file is touched.

use crate::error::Stmt2CsvError;
use std::fmt;
use std::path::{Path, PathBuf};

/// Environment variable holding the API credential.
pub const API_KEY_VAR: &str = "AZURE_OPENAI_API_KEY";

/// Azure OpenAI endpoint configuration for the vision transport.
#[derive(Clone)]
pub struct AzureEndpoint {
    /// Resource base URL, e.g. `https://my-resource.openai.azure.com`.
    pub api_base: String,
    /// REST API version query parameter.
    pub api_version: String,
    /// Deployment name of the vision-capable model.
    pub deployment: String,
    /// API credential. Never logged; see the manual [`fmt::Debug`] impl.
    pub api_key: String,
    /// USD per million input tokens, used for per-call cost accounting.
    pub input_price_per_mtok: f64,
    /// USD per million output tokens.
    pub output_price_per_mtok: f64,
}

impl AzureEndpoint {
    /// Build the endpoint config, reading the credential from
    /// [`API_KEY_VAR`].
    ///
    /// This is the "fail at startup, not mid-batch" gate: a missing or empty
    /// credential and an empty base URL are both rejected here, before the
    /// first PDF is picked up.
    pub fn from_env(
        api_base: impl Into<String>,
        api_version: impl Into<String>,
        deployment: impl Into<String>,
    ) -> Result<Self, Stmt2CsvError> {
        let api_key = std::env::var(API_KEY_VAR)
            .ok()
            .filter(|k| !k.is_empty())
            .ok_or(Stmt2CsvError::MissingApiKey)?;

        let api_base = api_base.into();
        if api_base.is_empty() {
            return Err(Stmt2CsvError::InvalidEndpoint {
                detail: "base URL is empty".into(),
            });
        }

        Ok(Self {
            api_base,
            api_version: api_version.into(),
            deployment: deployment.into(),
            api_key,
            // gpt-4o list prices; override for other deployments.
            input_price_per_mtok: 2.50,
            output_price_per_mtok: 10.00,
        })
    }

    /// The chat-completions URL for this deployment.
    pub fn completions_url(&self) -> String {
        format!(
            "{}/openai/deployments/{}/chat/completions?api-version={}",
            self.api_base.trim_end_matches('/'),
            self.deployment,
            self.api_version
        )
    }
}

impl fmt::Debug for AzureEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AzureEndpoint")
            .field("api_base", &self.api_base)
            .field("api_version", &self.api_version)
            .field("deployment", &self.deployment)
            .field("api_key", &"<redacted>")
            .finish()
    }
}

/// Configuration for one pipeline run.
///
/// Built via [`PipelineConfig::builder()`] or [`PipelineConfig::default()`].
///
/// # Example
/// ```rust
/// use stmt2csv::PipelineConfig;
///
/// let config = PipelineConfig::builder()
///     .source_dir("inbox")
///     .max_retries(5)
///     .build()
///     .unwrap();
/// ```
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Directory scanned for `*.pdf` input files. Default: `source`.
    pub source_dir: PathBuf,

    /// Destination for successfully processed originals. Default: `dest`.
    pub target_dir: PathBuf,

    /// Destination for originals whose processing errored. Default: `failed`.
    pub failed_dir: PathBuf,

    /// Scratch directory under which one working directory per in-flight
    /// document is created and removed. Default: `scratch`.
    pub scratch_dir: PathBuf,

    /// Directory holding the SQLite file and CSV outputs. Default: `export`.
    pub export_dir: PathBuf,

    /// Path of the SQLite document store. Default: `export/database.db`.
    pub db_path: PathBuf,

    /// Maximum rendered page dimension (width or height) in pixels.
    /// Default: 2000.
    ///
    /// A safety cap independent of the page's physical size: an A3 statement
    /// scan rendered unbounded could produce a pixel buffer in the hundreds
    /// of megabytes. 2000 px on the long edge keeps every page well inside
    /// the vision API's image limits while the fine print stays legible.
    pub max_rendered_pixels: u32,

    /// Maximum retries per OCR call on a rate-limit error. Default: 10.
    ///
    /// The bound is inclusive: a call makes up to `max_retries + 1` attempts
    /// before the rate-limit error is handed to the caller. Only rate limits
    /// are retried — every other API error fails the file immediately.
    pub max_retries: u32,

    /// Per-call HTTP timeout in seconds for the vision API. Default: 120.
    pub api_timeout_secs: u64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            source_dir: PathBuf::from("source"),
            target_dir: PathBuf::from("dest"),
            failed_dir: PathBuf::from("failed"),
            scratch_dir: PathBuf::from("scratch"),
            export_dir: PathBuf::from("export"),
            db_path: PathBuf::from("export").join("database.db"),
            max_rendered_pixels: 2000,
            max_retries: 10,
            api_timeout_secs: 120,
        }
    }
}

impl PipelineConfig {
    /// Create a new builder for `PipelineConfig`.
    pub fn builder() -> PipelineConfigBuilder {
        PipelineConfigBuilder {
            config: Self::default(),
        }
    }

    /// Create every directory the pipeline relies on, plus the parent of the
    /// database file. Idempotent; existing directories are left alone.
    pub fn ensure_directories(&self) -> Result<(), Stmt2CsvError> {
        let mut required: Vec<&Path> = vec![
            &self.source_dir,
            &self.target_dir,
            &self.failed_dir,
            &self.scratch_dir,
            &self.export_dir,
        ];
        let db_parent = self.db_path.parent();
        if let Some(parent) = db_parent {
            required.push(parent);
        }
        for dir in required {
            if dir.as_os_str().is_empty() || dir.is_dir() {
                continue;
            }
            std::fs::create_dir_all(dir).map_err(|source| {
                Stmt2CsvError::DirectoryCreateFailed {
                    path: dir.to_path_buf(),
                    source,
                }
            })?;
            tracing::info!("Created directory '{}'", dir.display());
        }
        Ok(())
    }
}

/// Builder for [`PipelineConfig`].
#[derive(Debug)]
pub struct PipelineConfigBuilder {
    config: PipelineConfig,
}

impl PipelineConfigBuilder {
    pub fn source_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.source_dir = dir.into();
        self
    }

    pub fn target_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.target_dir = dir.into();
        self
    }

    pub fn failed_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.failed_dir = dir.into();
        self
    }

    pub fn scratch_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.scratch_dir = dir.into();
        self
    }

    /// Set the export directory and, unless overridden later, the database
    /// path inside it.
    pub fn export_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        let dir = dir.into();
        self.config.db_path = dir.join("database.db");
        self.config.export_dir = dir;
        self
    }

    pub fn db_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.db_path = path.into();
        self
    }

    pub fn max_rendered_pixels(mut self, px: u32) -> Self {
        self.config.max_rendered_pixels = px.max(100);
        self
    }

    pub fn max_retries(mut self, n: u32) -> Self {
        self.config.max_retries = n;
        self
    }

    pub fn api_timeout_secs(mut self, secs: u64) -> Self {
        self.config.api_timeout_secs = secs;
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<PipelineConfig, Stmt2CsvError> {
        let c = &self.config;
        if c.source_dir == c.target_dir || c.source_dir == c.failed_dir {
            return Err(Stmt2CsvError::Internal(
                "source directory must differ from dest and failed directories".into(),
            ));
        }
        Ok(self.config)
    }
}

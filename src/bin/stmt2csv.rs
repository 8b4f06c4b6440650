//! CLI binary for stmt2csv.
//!
//! A thin shim over the library crate: maps flags to `PipelineConfig`,
//! validates the vision endpoint before any file is touched, runs the
//! batch, and exports CSVs.

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use stmt2csv::{
    enumerate_pdfs, export_documents, AzureEndpoint, AzureVisionModel, BatchSummary,
    DocumentStore, FileOutcome, OcrClient, Pipeline, PipelineConfig,
};
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Process everything in ./source and export CSVs to ./export
  stmt2csv --api-base https://my-resource.openai.azure.com --deployment gpt-4o

  # Custom directory layout
  stmt2csv --source-dir inbox --dest-dir done --failed-dir rejects \
           --api-base https://my-resource.openai.azure.com --deployment gpt-4o

  # Re-export CSVs from the store without processing new files (no API key needed)
  stmt2csv --export-only

FILE FLOW:
  source/   scanned for *.pdf; each file is processed exactly once
  scratch/  per-document working directory with the rendered page images
  dest/     originals that processed successfully
  failed/   originals whose processing errored, kept for manual inspection
  export/   SQLite store (database.db) and one CSV per document

ENVIRONMENT VARIABLES:
  AZURE_OPENAI_API_KEY      API credential (required unless --export-only)
  AZURE_OPENAI_ENDPOINT     Resource base URL (--api-base)
  AZURE_OPENAI_API_VERSION  REST API version (--api-version)
  AZURE_OPENAI_DEPLOYMENT   Vision deployment name (--deployment)
"#;

/// Digitise scanned bank-statement PDFs and export transactions as CSV.
#[derive(Parser, Debug)]
#[command(
    name = "stmt2csv",
    version,
    about = "Digitise scanned bank-statement PDFs and export transactions as CSV",
    long_about = "Rasterises each PDF in the source directory, extracts transactions and \
account data per page with a vision-capable Azure OpenAI deployment, stores the result \
in SQLite, and writes one CSV per document.",
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Directory scanned for *.pdf input files.
    #[arg(long, env = "STMT2CSV_SOURCE_DIR", default_value = "source")]
    source_dir: PathBuf,

    /// Destination for successfully processed originals.
    #[arg(long, env = "STMT2CSV_DEST_DIR", default_value = "dest")]
    dest_dir: PathBuf,

    /// Destination for originals whose processing errored.
    #[arg(long, env = "STMT2CSV_FAILED_DIR", default_value = "failed")]
    failed_dir: PathBuf,

    /// Scratch directory for per-document working directories.
    #[arg(long, env = "STMT2CSV_SCRATCH_DIR", default_value = "scratch")]
    scratch_dir: PathBuf,

    /// Directory for the SQLite store and CSV outputs.
    #[arg(long, env = "STMT2CSV_EXPORT_DIR", default_value = "export")]
    export_dir: PathBuf,

    /// SQLite file override (default: <export-dir>/database.db).
    #[arg(long, env = "STMT2CSV_DB")]
    db: Option<PathBuf>,

    /// Azure OpenAI resource base URL.
    #[arg(long, env = "AZURE_OPENAI_ENDPOINT")]
    api_base: Option<String>,

    /// Azure OpenAI REST API version.
    #[arg(long, env = "AZURE_OPENAI_API_VERSION", default_value = "2024-02-01")]
    api_version: String,

    /// Deployment name of the vision-capable model.
    #[arg(long, env = "AZURE_OPENAI_DEPLOYMENT")]
    deployment: Option<String>,

    /// Maximum retries per OCR call on a rate-limit error.
    #[arg(long, env = "STMT2CSV_MAX_RETRIES", default_value_t = 10)]
    max_retries: u32,

    /// Maximum rendered page dimension in pixels.
    #[arg(long, env = "STMT2CSV_MAX_PIXELS", default_value_t = 2000)]
    max_pixels: u32,

    /// Per-call vision API timeout in seconds.
    #[arg(long, env = "STMT2CSV_API_TIMEOUT", default_value_t = 120)]
    api_timeout: u64,

    /// Export CSVs from the store without processing new files.
    #[arg(long)]
    export_only: bool,

    /// Process files but skip the CSV export step.
    #[arg(long, conflicts_with = "export_only")]
    no_export: bool,

    /// Disable the progress bar.
    #[arg(long, env = "STMT2CSV_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "STMT2CSV_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "STMT2CSV_QUIET")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // With the progress bar active, library INFO logs would tear the bar;
    // the bar provides the per-file feedback instead.
    let show_progress = !cli.quiet && !cli.no_progress;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    // ── Config & layout ──────────────────────────────────────────────────
    let mut builder = PipelineConfig::builder()
        .source_dir(cli.source_dir.clone())
        .target_dir(cli.dest_dir.clone())
        .failed_dir(cli.failed_dir.clone())
        .scratch_dir(cli.scratch_dir.clone())
        .export_dir(cli.export_dir.clone())
        .max_rendered_pixels(cli.max_pixels)
        .max_retries(cli.max_retries)
        .api_timeout_secs(cli.api_timeout);
    if let Some(ref db) = cli.db {
        builder = builder.db_path(db.clone());
    }
    let config = builder.build().context("Invalid configuration")?;
    config
        .ensure_directories()
        .context("Failed to create the directory layout")?;

    let store = DocumentStore::open(&config.db_path).context("Failed to open document store")?;

    // ── Export-only mode (no API key needed) ─────────────────────────────
    if cli.export_only {
        let exported = export_documents(&store, &config.export_dir)?;
        if !cli.quiet {
            eprintln!(
                "{} {} CSV file(s) written to {}",
                green("✔"),
                bold(&exported.to_string()),
                config.export_dir.display()
            );
        }
        return Ok(());
    }

    // ── Startup validation: fail before any file is touched ──────────────
    let api_base = cli
        .api_base
        .clone()
        .context("Missing Azure endpoint: pass --api-base or set AZURE_OPENAI_ENDPOINT")?;
    let deployment = cli
        .deployment
        .clone()
        .context("Missing deployment: pass --deployment or set AZURE_OPENAI_DEPLOYMENT")?;
    let endpoint = AzureEndpoint::from_env(api_base, &cli.api_version, deployment)
        .context("Vision endpoint configuration invalid")?;
    let model = Arc::new(
        AzureVisionModel::new(endpoint, config.api_timeout_secs)
            .context("Failed to build the vision transport")?,
    );
    let ocr = OcrClient::new(model, config.max_retries);

    // ── Batch run ────────────────────────────────────────────────────────
    let files = enumerate_pdfs(&config.source_dir)?;
    let pipeline = Pipeline::new(ocr, store, config.clone());

    let summary = if show_progress && !files.is_empty() {
        run_with_progress(&pipeline, &files).await
    } else {
        pipeline.process_files(&files).await
    };

    if !cli.quiet {
        let tick = if summary.failed == 0 {
            green("✔")
        } else {
            red("✘")
        };
        eprintln!(
            "{tick} {} processed  {} failed  {} skipped",
            bold(&summary.succeeded.to_string()),
            summary.failed,
            summary.skipped,
        );
    }

    // ── Export ───────────────────────────────────────────────────────────
    if !cli.no_export {
        let exported = export_documents(pipeline.store(), &config.export_dir)?;
        if !cli.quiet {
            eprintln!(
                "{} {} CSV file(s) written to {}",
                green("✔"),
                bold(&exported.to_string()),
                config.export_dir.display()
            );
        }
    }

    Ok(())
}

/// Drive the batch with an indicatif bar and one log line per file.
async fn run_with_progress(pipeline: &Pipeline, files: &[PathBuf]) -> BatchSummary {
    let bar = ProgressBar::new(files.len() as u64);
    bar.set_style(
        ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  \
             [{bar:42.green/238}] {pos:>3}/{len} files  ⏱ {elapsed_precise}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  "),
    );
    bar.set_prefix("Processing");
    bar.enable_steady_tick(Duration::from_millis(80));

    let mut summary = BatchSummary::default();
    for path in files {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        bar.set_message(name.clone());

        let outcome = pipeline.process_file(path).await;
        summary.record(outcome);
        match outcome {
            FileOutcome::Succeeded => bar.println(format!("  {} {name}", green("✓"))),
            FileOutcome::Failed => bar.println(format!("  {} {name}", red("✗"))),
            FileOutcome::Skipped => {
                bar.println(format!("  {} {name}  {}", dim("−"), dim("(already processed)")))
            }
        }
        bar.inc(1);
    }
    bar.finish_and_clear();
    summary
}

//! CLI binary for docs-parser.
//!
//! A thin shim over the library crate that maps CLI flags
//! to `ProcessingConfig` and prints where the artefacts went.

use anyhow::{Context, Result};
use clap::Parser;
use docs_parser::config::{api_key_var, require_api_key};
use docs_parser::{
    process, ProcessingConfig, ProcessingOutput, ProcessingProgressCallback, ProgressCallback,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
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
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

const TICKS: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"];

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Terminal progress callback: a page bar during OCR, then a spinner while
/// the classification request is in flight.
struct CliProgressCallback {
    bar: ProgressBar,
    artefacts: AtomicUsize,
}

impl CliProgressCallback {
    fn new_dynamic() -> Arc<Self> {
        let bar = ProgressBar::new(0); // length set in on_processing_start

        let spinner_style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(TICKS);

        bar.set_style(spinner_style);
        bar.set_prefix("Preparing");
        bar.set_message("Loading pages…");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self {
            bar,
            artefacts: AtomicUsize::new(0),
        })
    }

    fn activate_bar(&self, total: usize) {
        let progress_style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  \
             [{bar:42.green/238}] {pos:>3}/{len} pages  \
             ⏱ {elapsed_precise}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(TICKS);

        self.bar.set_length(total as u64);
        self.bar.set_style(progress_style);
        self.bar.set_prefix("OCR");
    }
}

impl ProcessingProgressCallback for CliProgressCallback {
    fn on_processing_start(&self, total_pages: usize) {
        self.activate_bar(total_pages);
        self.bar.println(format!(
            "{} {}",
            cyan("◆"),
            bold(&format!("Running OCR on {total_pages} page(s)…"))
        ));
    }

    fn on_page_ocr_complete(&self, page_num: u32, total_pages: usize, blocks: usize) {
        self.bar.println(format!(
            "  {} Page {:>3}/{:<3}  {}",
            green("✓"),
            page_num,
            total_pages,
            dim(&format!("{blocks:>5} blocks")),
        ));
        self.bar.inc(1);
    }

    fn on_classification_start(&self, blocks: usize) {
        let spinner_style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  {msg}  ⏱ {elapsed_precise}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_spinner())
        .tick_strings(TICKS);

        self.bar.set_style(spinner_style);
        self.bar.set_prefix("Classifying");
        self.bar.set_message(format!("{blocks} blocks"));
    }

    fn on_classification_complete(&self, classified_blocks: usize) {
        self.bar.println(format!(
            "  {} {} blocks classified",
            green("✓"),
            classified_blocks
        ));
    }

    fn on_artifact_written(&self, path: &Path) {
        self.artefacts.fetch_add(1, Ordering::SeqCst);
        self.bar.println(format!("  {} {}", dim("→"), dim(&path.display().to_string())));
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Classify headings and paragraphs of a scanned image
  docs-parser --input-file invoice.png

  # Multi-page PDF, custom output directory
  docs-parser --input-file Report.pdf --output-dir out

  # OCR only, no API key needed
  docs-parser --input-file scan.jpg --ocr-only

  # German text, a different model
  docs-parser --input-file brief.png --lang deu --model gpt-4.1

OUTPUT (under <output-dir>/<lowercased file stem>/):
  ocr_annotated_page_N.png   red outline around every OCR block
  <stem>_ocr.json            OCR records (id, text, confidence, location)
  <stem>_summary.json        headings and paragraphs, grouped by page
  llm_annotated_page_N.png   blue headings, green paragraphs

ENVIRONMENT VARIABLES:
  OPENAI_API_KEY          OpenAI API key (default provider)
  ANTHROPIC_API_KEY       Anthropic API key
  GEMINI_API_KEY          Google Gemini API key
  DOCS_PARSER_PROVIDER    Override provider
  DOCS_PARSER_MODEL       Override model ID
  PDFIUM_LIB_PATH         Path to the libpdfium shared library, for PDF input

  A .env file in the working directory is loaded at startup.

REQUIREMENTS:
  tesseract on PATH with the language data for --lang installed.
"#;

/// Locate headings and paragraphs in scanned images and PDFs.
#[derive(Parser, Debug)]
#[command(
    name = "docs-parser",
    version,
    about = "Locate headings and paragraphs in scanned images and PDFs",
    long_about = "Runs OCR over every page of an image or PDF, then asks a vision LLM to \
classify each OCR block as a heading or a paragraph. Writes annotated page images and JSON \
results for both passes.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Image (.png .jpg .jpeg) or PDF to process.
    #[arg(long)]
    input_file: PathBuf,

    /// Root directory for results; one subdirectory per document.
    #[arg(long, env = "DOCS_PARSER_OUTPUT_DIR", default_value = "data/output")]
    output_dir: PathBuf,

    /// Tesseract language code (e.g. eng, deu, eng+fra).
    #[arg(long, env = "DOCS_PARSER_LANG", default_value = "eng")]
    lang: String,

    /// LLM model ID (default: gpt-4.1-mini).
    #[arg(long, env = "DOCS_PARSER_MODEL")]
    model: Option<String>,

    /// LLM provider: openai, anthropic, gemini, mistral, openrouter, ollama.
    #[arg(long, env = "DOCS_PARSER_PROVIDER")]
    provider: Option<String>,

    /// PDF rendering DPI (72–600).
    #[arg(long, env = "DOCS_PARSER_DPI", default_value_t = 300,
          value_parser = clap::value_parser!(u32).range(72..=600))]
    dpi: u32,

    /// Stop after the OCR pass; no LLM call.
    #[arg(long)]
    ocr_only: bool,

    /// Path to a text file containing a custom system prompt.
    #[arg(long, env = "DOCS_PARSER_SYSTEM_PROMPT")]
    system_prompt: Option<PathBuf>,

    /// Max LLM output tokens.
    #[arg(long, env = "DOCS_PARSER_MAX_TOKENS", default_value_t = 16384)]
    max_tokens: usize,

    /// LLM temperature (0.0–2.0).
    #[arg(long, env = "DOCS_PARSER_TEMPERATURE", default_value_t = 0.0)]
    temperature: f32,

    /// Print the result (ProcessingOutput) as JSON on stdout.
    #[arg(long)]
    json: bool,

    /// Disable progress bar.
    #[arg(long, env = "DOCS_PARSER_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "DOCS_PARSER_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "DOCS_PARSER_QUIET")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json;
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

    // ── Startup checks ───────────────────────────────────────────────────
    if !cli.input_file.exists() {
        anyhow::bail!("Input file not found: {}", cli.input_file.display());
    }
    if !cli.ocr_only {
        let provider = cli.provider.as_deref().unwrap_or(docs_parser::config::DEFAULT_PROVIDER);
        require_api_key(provider, |var| std::env::var(var).ok()).with_context(|| {
            match api_key_var(provider) {
                Some(var) => format!("Set {var} or pass --ocr-only"),
                None => "Provider is not configured".to_string(),
            }
        })?;
    }

    // ── Build config ─────────────────────────────────────────────────────
    let cli_cb = show_progress.then(CliProgressCallback::new_dynamic);
    let progress_cb: Option<ProgressCallback> = cli_cb
        .clone()
        .map(|cb| cb as Arc<dyn ProcessingProgressCallback>);

    let config = build_config(&cli, progress_cb).await?;

    // ── Run ──────────────────────────────────────────────────────────────
    let result = process(&cli.input_file, &config).await;
    let artefacts = match cli_cb {
        Some(cb) => {
            cb.bar.finish_and_clear();
            cb.artefacts.load(Ordering::SeqCst)
        }
        None => 0,
    };

    let output = match result {
        Ok(output) => output,
        Err(e) => {
            if !cli.quiet {
                eprintln!("{} {}", red("✘"), e);
            }
            return Err(e).context("Processing failed");
        }
    };

    if cli.json {
        let json = serde_json::to_string_pretty(&output).context("Failed to serialise output")?;
        println!("{json}");
    } else if !cli.quiet {
        print_summary(&output, artefacts);
    }

    Ok(())
}

/// Map CLI args to `ProcessingConfig`.
async fn build_config(cli: &Cli, progress: Option<ProgressCallback>) -> Result<ProcessingConfig> {
    let mut builder = ProcessingConfig::builder()
        .output_dir(&cli.output_dir)
        .language(&cli.lang)
        .dpi(cli.dpi)
        .ocr_only(cli.ocr_only)
        .max_tokens(cli.max_tokens)
        .temperature(cli.temperature);

    if let Some(ref path) = cli.system_prompt {
        let prompt = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read system prompt from {:?}", path))?;
        builder = builder.system_prompt(prompt);
    }
    if let Some(ref model) = cli.model {
        builder = builder.model(model);
    }
    if let Some(ref provider) = cli.provider {
        builder = builder.provider_name(provider);
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}

fn print_summary(output: &ProcessingOutput, artefacts: usize) {
    let stats = &output.stats;
    eprintln!(
        "{}  {} page(s)  {} OCR blocks  {}ms  →  {}",
        green("✔"),
        stats.total_pages,
        stats.ocr_blocks,
        stats.total_duration_ms,
        bold(&output.document_dir.display().to_string()),
    );
    if artefacts > 0 {
        eprintln!("   {} files written", dim(&artefacts.to_string()));
    }

    if let Some(ref summary) = output.summary {
        let headings = summary
            .blocks()
            .filter(|b| b.content_type == docs_parser::ContentType::Heading)
            .count();
        eprintln!(
            "   {} headings  /  {} paragraphs",
            bold(&headings.to_string()),
            bold(&(stats.classified_blocks - headings).to_string()),
        );
        eprintln!(
            "   {} tokens in  /  {} tokens out",
            dim(&stats.input_tokens.to_string()),
            dim(&stats.output_tokens.to_string()),
        );
    } else {
        eprintln!("   {}", dim("OCR only: no classification"));
    }
}

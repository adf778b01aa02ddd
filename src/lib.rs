//! # docs-parser
//!
//! Find the headings and paragraphs of a scanned document.
//!
//! An OCR engine locates every word on every page; a multimodal LLM then
//! looks at the page images together with those words and labels each OCR
//! block as a `heading` or a `paragraph`. Every stage leaves an artefact on
//! disk so a run can be inspected afterwards.
//!
//! ## Pipeline Overview
//!
//! ```text
//! image / PDF
//!  │
//!  ├─ 1. Input     existence, permission and extension checks
//!  ├─ 2. Render    PDF pages rasterised via pdfium at 300 dpi (spawn_blocking)
//!  ├─ 3. OCR       tesseract TSV → OcrRecord list, ids across pages
//!  ├─ 4. Annotate  red outlines per page → ocr_annotated_page_N.png
//!  ├─ 5. Persist   {stem}_ocr.json
//!  ├─ 6. Classify  one VLM call with every page image and block
//!  ├─ 7. Validate  DocumentSummary checked against the OCR records
//!  └─ 8. Output    {stem}_summary.json + llm_annotated_page_N.png
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use docs_parser::{process, ProcessingConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Reads OPENAI_API_KEY for the default provider
//!     let config = ProcessingConfig::default();
//!     let output = process("invoice.png", &config).await?;
//!     if let Some(summary) = &output.summary {
//!         for block in summary.blocks() {
//!             println!("{:>9}  {}", block.content_type.as_str(), block.text);
//!         }
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `docs-parser` binary (clap + anyhow + tracing-subscriber + dotenvy) |
//!
//! ## External Tools
//!
//! - `tesseract` on `PATH` with the requested language data installed
//! - the pdfium shared library for PDF input (`PDFIUM_LIB_PATH`, the working
//!   directory, or the system library path)

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod error;
pub mod output;
pub mod pipeline;
pub mod process;
pub mod progress;
pub mod prompts;
pub mod schema;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{ProcessingConfig, ProcessingConfigBuilder};
pub use error::DocsParserError;
pub use output::{ProcessingOutput, ProcessingStats};
pub use pipeline::ocr::{OcrEngine, RecognizedWord, TesseractCli};
pub use process::{accept_classification, process, process_sync, AcceptedClassification};
pub use progress::{NoopProgressCallback, ProcessingProgressCallback, ProgressCallback};
pub use schema::{ContentType, DocumentSummary, Location, OcrRecord, Page, TextBlock};

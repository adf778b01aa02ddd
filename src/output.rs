//! Result types returned by [`crate::process::process`].

use crate::schema::{DocumentSummary, OcrRecord};
use serde::Serialize;
use std::path::PathBuf;

/// Everything one processing run produced.
#[derive(Debug, Clone, Serialize)]
pub struct ProcessingOutput {
    /// Input file stem.
    pub document_name: String,
    /// `<output-dir>/<lowercased-stem>/`
    pub document_dir: PathBuf,
    pub ocr_json: PathBuf,
    /// `None` in OCR-only mode.
    pub summary_json: Option<PathBuf>,
    pub records: Vec<OcrRecord>,
    /// `None` in OCR-only mode.
    pub summary: Option<DocumentSummary>,
    /// OCR-pass overlays first, then LLM-pass overlays, each in page order.
    pub annotated_images: Vec<PathBuf>,
    pub stats: ProcessingStats,
}

/// Counters and timings for one run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ProcessingStats {
    pub total_pages: usize,
    /// Pages with at least one OCR record.
    pub pages_with_text: usize,
    pub ocr_blocks: usize,
    pub classified_blocks: usize,
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub render_duration_ms: u64,
    pub ocr_duration_ms: u64,
    pub llm_duration_ms: u64,
    pub total_duration_ms: u64,
}

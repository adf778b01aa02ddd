//! Result persistence: the per-document output directory and its JSON files.
//!
//! Layout under the configured output root:
//!
//! ```text
//! <output-dir>/<lowercased-stem>/
//!   <stem>_ocr.json              raw OCR records, written before the LLM call
//!   <stem>_summary.json          validated DocumentSummary
//!   ocr_annotated_page_<n>.png
//!   llm_annotated_page_<n>.png
//! ```
//!
//! Writes are plain `std::fs::write`; a failed write can leave a partial file.

use crate::error::DocsParserError;
use crate::pipeline::input::ResolvedInput;
use crate::schema::{DocumentSummary, OcrRecord};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::info;

/// The output directory of one document.
#[derive(Debug, Clone)]
pub struct DocumentDir {
    path: PathBuf,
    stem: String,
}

impl DocumentDir {
    /// Create `<output_dir>/<lowercased-stem>/` if absent.
    pub fn create(output_dir: &Path, input: &ResolvedInput) -> Result<Self, DocsParserError> {
        let path = output_dir.join(input.dir_name());
        std::fs::create_dir_all(&path).map_err(|e| DocsParserError::OutputWriteFailed {
            path: path.clone(),
            source: e,
        })?;
        Ok(Self {
            path,
            stem: input.document_name.clone(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn ocr_json_path(&self) -> PathBuf {
        self.path.join(format!("{}_ocr.json", self.stem))
    }

    pub fn summary_json_path(&self) -> PathBuf {
        self.path.join(format!("{}_summary.json", self.stem))
    }

    /// Write the raw OCR records.
    pub fn write_ocr_results(&self, records: &[OcrRecord]) -> Result<PathBuf, DocsParserError> {
        let path = self.ocr_json_path();
        write_json(&path, records)?;
        info!("OCR results saved to {}", path.display());
        Ok(path)
    }

    /// Write a validated summary.
    pub fn write_summary(&self, summary: &DocumentSummary) -> Result<PathBuf, DocsParserError> {
        let path = self.summary_json_path();
        write_json(&path, summary)?;
        info!("Summary saved to {}", path.display());
        Ok(path)
    }
}

fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<(), DocsParserError> {
    let json = serde_json::to_string_pretty(value)
        .map_err(|e| DocsParserError::Internal(format!("serialise {}: {}", path.display(), e)))?;
    std::fs::write(path, json).map_err(|e| DocsParserError::OutputWriteFailed {
        path: path.to_path_buf(),
        source: e,
    })
}

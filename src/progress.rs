//! Progress-callback trait for per-stage processing events.
//!
//! Inject an [`Arc<dyn ProcessingProgressCallback>`] via
//! [`crate::config::ProcessingConfigBuilder::progress_callback`] to receive
//! events as the pipeline OCRs each page, classifies the document and writes
//! its artefacts. The CLI uses it to drive a terminal progress bar.
//!
//! # Example
//!
//! ```rust
//! use docs_parser::{ProcessingConfig, ProcessingProgressCallback};
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct CountingCallback {
//!     pages: AtomicUsize,
//! }
//!
//! impl ProcessingProgressCallback for CountingCallback {
//!     fn on_page_ocr_complete(&self, page_num: u32, total_pages: usize, blocks: usize) {
//!         self.pages.fetch_add(1, Ordering::SeqCst);
//!         eprintln!("Page {}/{}: {} blocks", page_num, total_pages, blocks);
//!     }
//! }
//!
//! let counter = Arc::new(CountingCallback { pages: AtomicUsize::new(0) });
//!
//! let config = ProcessingConfig::builder()
//!     .progress_callback(counter as Arc<dyn ProcessingProgressCallback>)
//!     .build()
//!     .unwrap();
//! ```

use std::path::Path;
use std::sync::Arc;

/// Called by the processing pipeline as it moves through its stages.
///
/// OCR runs on a blocking thread, so implementations must be `Send + Sync`.
/// Events are still delivered one at a time and in order. All methods have
/// default no-op implementations.
pub trait ProcessingProgressCallback: Send + Sync {
    /// Called once the page images are loaded, before OCR starts.
    fn on_processing_start(&self, total_pages: usize) {
        let _ = total_pages;
    }

    /// Called after the OCR engine finished a page.
    ///
    /// # Arguments
    /// * `page_num`: 1-indexed page number
    /// * `total_pages`: pages in the document
    /// * `blocks`: records kept for this page
    fn on_page_ocr_complete(&self, page_num: u32, total_pages: usize, blocks: usize) {
        let _ = (page_num, total_pages, blocks);
    }

    /// Called just before the classification request is sent.
    fn on_classification_start(&self, blocks: usize) {
        let _ = blocks;
    }

    /// Called after the LLM response passed validation.
    fn on_classification_complete(&self, classified_blocks: usize) {
        let _ = classified_blocks;
    }

    /// Called after each artefact (JSON or annotated PNG) is written.
    fn on_artifact_written(&self, path: &Path) {
        let _ = path;
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl ProcessingProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::ProcessingConfig`].
pub type ProgressCallback = Arc<dyn ProcessingProgressCallback>;

//! Pipeline stages for OCR extraction and block classification.
//!
//! Each submodule implements exactly one step, so each can be tested on its
//! own and the OCR engine or LLM provider can be swapped without touching
//! the other stages.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ render ──▶ ocr ──▶ annotate ──▶ persist ──▶ encode ──▶ llm ──▶ persist ──▶ annotate
//! (path)   (pages)   (words)  (OCR pass)   (OCR json)  (base64)  (VLM)   (summary)   (LLM pass)
//! ```
//!
//! 1. [`input`]: existence, permission and extension checks
//! 2. [`render`]: image → page 1, or PDF → one image per page at fixed DPI
//! 3. [`ocr`]: words, confidences and boxes per page; ids across pages
//! 4. [`annotate`]: outline overlays per page and stage
//! 5. [`persist`]: per-document directory and JSON artefacts
//! 6. [`encode`]: base64 PNG payloads for the multimodal request
//! 7. [`llm`]: the single classification call plus schema validation

pub mod annotate;
pub mod encode;
pub mod input;
pub mod llm;
pub mod ocr;
pub mod persist;
pub mod render;

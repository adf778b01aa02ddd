//! Error types for the docs-parser library.
//!
//! Every failure in this pipeline is fatal: one document, one run, and any
//! error aborts it. [`DocsParserError`] groups the failure kinds by the stage
//! that raises them so callers (and the CLI) can print a useful hint.
//!
//! The only artefact that survives a failed run is the OCR JSON, which is
//! flushed to disk before the LLM stage starts.

use std::path::PathBuf;
use thiserror::Error;

/// All errors returned by the docs-parser library.
#[derive(Debug, Error)]
pub enum DocsParserError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// Input file was not found at the given path.
    #[error("Input file not found: '{path}'\nCheck the path exists and is readable.")]
    InputNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// The extension is not one of pdf, png, jpg, jpeg.
    #[error("Unsupported file format '{extension}' for '{path}'\nSupported formats: pdf, png, jpg, jpeg.")]
    UnsupportedFormat { path: PathBuf, extension: String },

    /// The image file exists but could not be decoded.
    #[error("Failed to decode image '{path}': {detail}")]
    ImageDecodeFailed { path: PathBuf, detail: String },

    // ── PDF errors ────────────────────────────────────────────────────────
    /// PDF header/trailer/xref is corrupt and cannot be parsed.
    #[error("PDF '{path}' could not be opened: {detail}")]
    CorruptPdf { path: PathBuf, detail: String },

    /// pdfium-render returned an error for a specific page.
    #[error("Rasterisation failed for page {page}: {detail}")]
    RasterisationFailed { page: u32, detail: String },

    /// Could not bind to a pdfium library.
    #[error(
        "Failed to bind to pdfium library: {0}\n\n\
PDF input needs the pdfium shared library. You can:\n\
  • Set PDFIUM_LIB_PATH=/path/to/libpdfium to use an existing copy.\n\
  • Place libpdfium next to the working directory.\n\
  • Install pdfium system-wide.\n"
    )]
    PdfiumBindingFailed(String),

    // ── OCR errors ────────────────────────────────────────────────────────
    /// The OCR engine binary could not be started.
    #[error("OCR engine '{engine}' is not available: {detail}\nInstall tesseract-ocr and make sure it is on PATH.")]
    OcrEngineUnavailable { engine: String, detail: String },

    /// The OCR engine ran but reported a failure for a page.
    #[error("OCR failed for page {page}: {detail}")]
    OcrFailed { page: u32, detail: String },

    // ── Encoding errors ───────────────────────────────────────────────────
    /// A page image could not be encoded for the classification request.
    #[error("Failed to encode page {page} for the LLM request: {detail}")]
    ImageEncodeFailed { page: u32, detail: String },

    // ── LLM errors ────────────────────────────────────────────────────────
    /// The configured provider is not initialised (missing API key etc.).
    #[error("LLM provider '{provider}' is not configured.\n{hint}")]
    ProviderNotConfigured { provider: String, hint: String },

    /// The LLM API call failed (network, auth, rate limit, …).
    #[error("LLM API error: {message}")]
    LlmApiError { message: String },

    /// The LLM answered, but the payload does not match the summary schema.
    #[error("LLM response failed schema validation: {detail}")]
    SchemaValidation { detail: String },

    // ── I/O errors ────────────────────────────────────────────────────────
    /// Could not create or write an output artefact.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl DocsParserError {
    /// Shorthand for a [`DocsParserError::SchemaValidation`] error.
    pub(crate) fn schema(detail: impl Into<String>) -> Self {
        DocsParserError::SchemaValidation {
            detail: detail.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unsupported_format_display() {
        let e = DocsParserError::UnsupportedFormat {
            path: PathBuf::from("notes.docx"),
            extension: "docx".into(),
        };
        let msg = e.to_string();
        assert!(msg.contains("docx"), "got: {msg}");
        assert!(msg.contains("pdf, png, jpg, jpeg"), "got: {msg}");
    }

    #[test]
    fn rasterisation_display_names_page() {
        let e = DocsParserError::RasterisationFailed {
            page: 3,
            detail: "bad xobject".into(),
        };
        assert!(e.to_string().contains("page 3"));
    }

    #[test]
    fn encode_failure_is_not_a_rasterisation_error() {
        let e = DocsParserError::ImageEncodeFailed {
            page: 2,
            detail: "zero width".into(),
        };
        let msg = e.to_string();
        assert!(msg.contains("encode page 2"), "got: {msg}");
        assert!(!msg.contains("Rasterisation"), "got: {msg}");
    }

    #[test]
    fn schema_validation_display() {
        let e = DocsParserError::schema("missing field `pages`");
        assert!(e.to_string().contains("missing field `pages`"));
    }

    #[test]
    fn provider_not_configured_display() {
        let e = DocsParserError::ProviderNotConfigured {
            provider: "openai".into(),
            hint: "Set OPENAI_API_KEY".into(),
        };
        assert!(e.to_string().contains("openai"));
        assert!(e.to_string().contains("OPENAI_API_KEY"));
    }

    #[test]
    fn output_write_failed_keeps_source() {
        use std::error::Error as _;
        let e = DocsParserError::OutputWriteFailed {
            path: PathBuf::from("/nope/out.json"),
            source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        };
        assert!(e.source().is_some());
    }
}

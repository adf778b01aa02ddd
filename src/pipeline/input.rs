//! Input resolution: validate the user-supplied path and classify its format.
//!
//! Everything here runs before any page is loaded, so a missing file or an
//! unsupported extension fails the run before the OCR engine is touched.

use crate::error::DocsParserError;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Supported input formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputKind {
    /// Multi-page document, rasterised page by page.
    Pdf,
    /// Single raster image, treated as page 1.
    Image,
}

impl InputKind {
    /// Map a file extension (without the dot, any case) to a kind.
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "pdf" => Some(InputKind::Pdf),
            "png" | "jpg" | "jpeg" => Some(InputKind::Image),
            _ => None,
        }
    }
}

/// A validated input file.
#[derive(Debug, Clone)]
pub struct ResolvedInput {
    pub path: PathBuf,
    pub kind: InputKind,
    /// File stem as given, e.g. `Invoice` for `scans/Invoice.PNG`.
    pub document_name: String,
}

impl ResolvedInput {
    /// Name of the per-document output directory: the lowercased stem.
    pub fn dir_name(&self) -> String {
        self.document_name.to_lowercase()
    }
}

/// Validate that `path` exists, is readable and has a supported extension.
pub fn resolve_input(path: impl AsRef<Path>) -> Result<ResolvedInput, DocsParserError> {
    let path = path.as_ref().to_path_buf();

    if !path.exists() {
        return Err(DocsParserError::InputNotFound { path });
    }

    match std::fs::File::open(&path) {
        Ok(_) => {}
        Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => {
            return Err(DocsParserError::PermissionDenied { path });
        }
        Err(_) => return Err(DocsParserError::InputNotFound { path }),
    }

    let extension = path
        .extension()
        .map(|e| e.to_string_lossy().to_string())
        .unwrap_or_default();

    let kind = InputKind::from_extension(&extension).ok_or_else(|| {
        DocsParserError::UnsupportedFormat {
            path: path.clone(),
            extension: if extension.is_empty() {
                "<none>".to_string()
            } else {
                format!(".{}", extension.to_ascii_lowercase())
            },
        }
    })?;

    let document_name = path
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| "document".to_string());

    debug!("Resolved {:?} input: {}", kind, path.display());

    Ok(ResolvedInput {
        path,
        kind,
        document_name,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extension_mapping() {
        assert_eq!(InputKind::from_extension("pdf"), Some(InputKind::Pdf));
        assert_eq!(InputKind::from_extension("PDF"), Some(InputKind::Pdf));
        assert_eq!(InputKind::from_extension("png"), Some(InputKind::Image));
        assert_eq!(InputKind::from_extension("Jpg"), Some(InputKind::Image));
        assert_eq!(InputKind::from_extension("jpeg"), Some(InputKind::Image));
        assert_eq!(InputKind::from_extension("docx"), None);
        assert_eq!(InputKind::from_extension(""), None);
    }

    #[test]
    fn missing_file_is_not_found() {
        let err = resolve_input("/definitely/not/here.png").unwrap_err();
        assert!(matches!(err, DocsParserError::InputNotFound { .. }));
    }

    #[test]
    fn docx_is_unsupported() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.docx");
        std::fs::write(&path, b"PK\x03\x04").unwrap();

        match resolve_input(&path).unwrap_err() {
            DocsParserError::UnsupportedFormat { extension, .. } => {
                assert_eq!(extension, ".docx")
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn document_name_keeps_case_dir_name_lowercases() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("Invoice.PNG");
        std::fs::write(&path, b"not really a png").unwrap();

        let resolved = resolve_input(&path).unwrap();
        assert_eq!(resolved.kind, InputKind::Image);
        assert_eq!(resolved.document_name, "Invoice");
        assert_eq!(resolved.dir_name(), "invoice");
    }
}

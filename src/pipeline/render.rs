//! Page loading: turn the input file into an ordered map of page images.
//!
//! A raster image becomes page 1 as-is. A PDF is rasterised page by page via
//! pdfium at a fixed DPI, so every bounding box the OCR engine reports is in
//! pixels of that rendering.
//!
//! Decoding and pdfium rendering run on tokio's blocking pool.

use crate::error::DocsParserError;
use crate::pipeline::input::{InputKind, ResolvedInput};
use image::DynamicImage;
use pdfium_render::prelude::*;
use std::collections::BTreeMap;
use std::path::Path;
use tracing::{debug, info};

/// Page images of one run, keyed by 1-based page number.
///
/// Owned by a single processing run and handed explicitly from stage to
/// stage; never persisted.
pub type PageImages = BTreeMap<u32, DynamicImage>;

/// PostScript points per inch; pdfium page sizes are in points.
const POINTS_PER_INCH: f32 = 72.0;

/// Load every page of `input` as an image.
pub async fn load_pages(input: &ResolvedInput, dpi: u32) -> Result<PageImages, DocsParserError> {
    let path = input.path.clone();
    let kind = input.kind;

    tokio::task::spawn_blocking(move || match kind {
        InputKind::Image => load_image(&path),
        InputKind::Pdf => rasterise_pdf(&path, dpi),
    })
    .await
    .map_err(|e| DocsParserError::Internal(format!("Page loading task panicked: {}", e)))?
}

/// Decode a single raster image as page 1.
pub fn load_image(path: &Path) -> Result<PageImages, DocsParserError> {
    let image = image::open(path).map_err(|e| DocsParserError::ImageDecodeFailed {
        path: path.to_path_buf(),
        detail: e.to_string(),
    })?;

    debug!(
        "Loaded image {} → {}x{} px",
        path.display(),
        image.width(),
        image.height()
    );

    let mut pages = PageImages::new();
    pages.insert(1, image);
    Ok(pages)
}

/// Rasterise every page of a PDF at `dpi`.
///
/// Any page failure aborts the whole document; no partial page set is
/// returned.
pub fn rasterise_pdf(pdf_path: &Path, dpi: u32) -> Result<PageImages, DocsParserError> {
    let pdfium = bind_pdfium()?;

    let document = pdfium
        .load_pdf_from_file(pdf_path, None)
        .map_err(|e| DocsParserError::CorruptPdf {
            path: pdf_path.to_path_buf(),
            detail: format!("{:?}", e),
        })?;

    let render_config = PdfRenderConfig::new().scale_page_by_factor(dpi as f32 / POINTS_PER_INCH);

    let pages = document.pages();
    info!("PDF loaded: {} pages, rendering at {} DPI", pages.len(), dpi);

    let mut images = PageImages::new();
    for (index, page) in pages.iter().enumerate() {
        let page_num = index as u32 + 1;

        let bitmap = page.render_with_config(&render_config).map_err(|e| {
            DocsParserError::RasterisationFailed {
                page: page_num,
                detail: format!("{:?}", e),
            }
        })?;

        let image = bitmap.as_image();
        debug!(
            "Rendered page {} → {}x{} px",
            page_num,
            image.width(),
            image.height()
        );
        images.insert(page_num, image);
    }

    Ok(images)
}

/// Bind to a pdfium shared library.
///
/// Lookup order: `PDFIUM_LIB_PATH`, then the current directory, then the
/// system library path.
fn bind_pdfium() -> Result<Pdfium, DocsParserError> {
    let bindings = match std::env::var("PDFIUM_LIB_PATH") {
        Ok(path) if !path.is_empty() => Pdfium::bind_to_library(&path),
        _ => Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path("./"))
            .or_else(|_| Pdfium::bind_to_system_library()),
    }
    .map_err(|e| DocsParserError::PdfiumBindingFailed(format!("{:?}", e)))?;

    Ok(Pdfium::new(bindings))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};

    #[test]
    fn image_is_page_one() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scan.png");
        RgbaImage::from_pixel(40, 20, Rgba([255, 255, 255, 255]))
            .save(&path)
            .unwrap();

        let pages = load_image(&path).unwrap();
        assert_eq!(pages.len(), 1);
        let page = pages.get(&1).expect("page 1");
        assert_eq!((page.width(), page.height()), (40, 20));
    }

    #[test]
    fn undecodable_image_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.png");
        std::fs::write(&path, b"definitely not a png").unwrap();

        let err = load_image(&path).unwrap_err();
        assert!(matches!(err, DocsParserError::ImageDecodeFailed { .. }));
    }
}

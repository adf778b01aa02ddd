//! Debug overlays: draw block outlines on page images.
//!
//! Annotated copies are written once per stage so the OCR pass and the LLM
//! pass over the same page never overwrite each other. The source image is
//! never modified.

use crate::error::DocsParserError;
use crate::schema::Location;
use image::{DynamicImage, Rgba, RgbaImage};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Outline thickness in pixels.
pub const STROKE_WIDTH: u32 = 2;

/// Outline for raw OCR boxes.
pub const OCR_COLOR: Rgba<u8> = Rgba([255, 0, 0, 255]);
/// Outline for blocks classified as headings.
pub const HEADING_COLOR: Rgba<u8> = Rgba([0, 90, 255, 255]);
/// Outline for blocks classified as paragraphs.
pub const PARAGRAPH_COLOR: Rgba<u8> = Rgba([0, 170, 60, 255]);

/// The pipeline stage an overlay belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnnotationStage {
    Ocr,
    Llm,
}

impl AnnotationStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            AnnotationStage::Ocr => "ocr",
            AnnotationStage::Llm => "llm",
        }
    }

    /// `<stage>_annotated_page_<n>.png`
    pub fn file_name(&self, page_num: u32) -> String {
        format!("{}_annotated_page_{}.png", self.as_str(), page_num)
    }
}

/// Return a copy of `image` with an outline around every box.
pub fn annotate_page<'a>(
    image: &DynamicImage,
    boxes: impl IntoIterator<Item = &'a Location>,
    color: Rgba<u8>,
) -> RgbaImage {
    let mut canvas = image.to_rgba8();
    draw_boxes(&mut canvas, boxes, color);
    canvas
}

/// Draw outlines on an existing canvas.
pub fn draw_boxes<'a>(
    canvas: &mut RgbaImage,
    boxes: impl IntoIterator<Item = &'a Location>,
    color: Rgba<u8>,
) {
    for location in boxes {
        draw_rect(canvas, location, color, STROKE_WIDTH);
    }
}

/// Draw a hollow rectangle, `stroke` pixels thick, growing inwards from the
/// box edges and clipped to the canvas.
fn draw_rect(canvas: &mut RgbaImage, location: &Location, color: Rgba<u8>, stroke: u32) {
    let (cw, ch) = canvas.dimensions();
    if cw == 0 || ch == 0 {
        return;
    }

    let x0 = location.x.max(0.0).floor() as u32;
    let y0 = location.y.max(0.0).floor() as u32;
    let x1 = ((location.x + location.width).ceil().max(0.0) as u32).min(cw);
    let y1 = ((location.y + location.height).ceil().max(0.0) as u32).min(ch);
    if x0 >= x1 || y0 >= y1 {
        return;
    }

    for y in y0..y1 {
        for x in x0..x1 {
            let on_edge = x < x0 + stroke
                || x + stroke >= x1
                || y < y0 + stroke
                || y + stroke >= y1;
            if on_edge {
                canvas.put_pixel(x, y, color);
            }
        }
    }
}

/// Save an annotated page under `dir` and return its path.
pub fn save_annotated(
    canvas: &RgbaImage,
    dir: &Path,
    stage: AnnotationStage,
    page_num: u32,
) -> Result<PathBuf, DocsParserError> {
    let path = dir.join(stage.file_name(page_num));
    canvas
        .save_with_format(&path, image::ImageFormat::Png)
        .map_err(|e| DocsParserError::OutputWriteFailed {
            path: path.clone(),
            source: match e {
                image::ImageError::IoError(io) => io,
                other => std::io::Error::new(std::io::ErrorKind::Other, other.to_string()),
            },
        })?;
    debug!("Saved annotated image to {}", path.display());
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    const WHITE: Rgba<u8> = Rgba([255, 255, 255, 255]);

    fn page(w: u32, h: u32) -> DynamicImage {
        DynamicImage::ImageRgba8(RgbaImage::from_pixel(w, h, WHITE))
    }

    fn loc(x: f64, y: f64, w: f64, h: f64) -> Location {
        Location {
            x,
            y,
            width: w,
            height: h,
            page: Some(1),
        }
    }

    #[test]
    fn outline_is_drawn_and_interior_untouched() {
        let src = page(50, 50);
        let boxes = [loc(10.0, 10.0, 20.0, 10.0)];
        let out = annotate_page(&src, &boxes, OCR_COLOR);

        // corners and edges
        assert_eq!(*out.get_pixel(10, 10), OCR_COLOR);
        assert_eq!(*out.get_pixel(29, 19), OCR_COLOR);
        assert_eq!(*out.get_pixel(11, 15), OCR_COLOR);
        // interior
        assert_eq!(*out.get_pixel(20, 15), WHITE);
        // outside
        assert_eq!(*out.get_pixel(5, 5), WHITE);
        assert_eq!(*out.get_pixel(30, 10), WHITE);
    }

    #[test]
    fn source_image_is_not_mutated() {
        let src = page(20, 20);
        let _ = annotate_page(&src, &[loc(0.0, 0.0, 20.0, 20.0)], OCR_COLOR);
        assert_eq!(*src.to_rgba8().get_pixel(0, 0), WHITE);
    }

    #[test]
    fn boxes_are_clipped_to_canvas() {
        let src = page(10, 10);
        let out = annotate_page(&src, &[loc(5.0, 5.0, 100.0, 100.0)], OCR_COLOR);
        assert_eq!(*out.get_pixel(5, 5), OCR_COLOR);
        assert_eq!(*out.get_pixel(9, 9), OCR_COLOR);

        let out = annotate_page(&src, &[loc(50.0, 50.0, 5.0, 5.0)], OCR_COLOR);
        assert!(out.pixels().all(|p| *p == WHITE));
    }

    #[test]
    fn file_names_are_stage_scoped() {
        assert_eq!(AnnotationStage::Ocr.file_name(2), "ocr_annotated_page_2.png");
        assert_eq!(AnnotationStage::Llm.file_name(2), "llm_annotated_page_2.png");
    }

    #[test]
    fn save_writes_png() {
        let dir = tempfile::tempdir().unwrap();
        let canvas = annotate_page(&page(8, 8), &[loc(1.0, 1.0, 4.0, 4.0)], HEADING_COLOR);
        let path = save_annotated(&canvas, dir.path(), AnnotationStage::Llm, 1).unwrap();
        assert!(path.ends_with("llm_annotated_page_1.png"));
        let reloaded = image::open(&path).unwrap().to_rgba8();
        assert_eq!(*reloaded.get_pixel(1, 1), HEADING_COLOR);
    }
}

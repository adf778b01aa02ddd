//! Image encoding: page images → base64 PNG payloads for the LLM request.
//!
//! Pages are encoded at full resolution: the classifier relies on visual
//! cues (font size, weight, whitespace) that downscaling would blur, and the
//! boxes it echoes back are in the pixel space of these exact images.

use crate::error::DocsParserError;
use crate::pipeline::render::PageImages;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use edgequake_llm::ImageData;
use image::DynamicImage;
use std::io::Cursor;
use tracing::debug;

/// Encode one page as a base64 PNG with `detail: "high"`.
pub fn encode_page(img: &DynamicImage) -> Result<ImageData, image::ImageError> {
    let mut buf = Vec::new();
    img.write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)?;

    let b64 = STANDARD.encode(&buf);
    debug!("Encoded image → {} bytes base64", b64.len());

    Ok(ImageData::new(b64, "image/png").with_detail("high"))
}

/// Encode every page in ascending page order.
pub fn encode_pages(pages: &PageImages) -> Result<Vec<ImageData>, DocsParserError> {
    pages
        .iter()
        .map(|(page_num, img)| {
            encode_page(img).map_err(|e| DocsParserError::ImageEncodeFailed {
                page: *page_num,
                detail: e.to_string(),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};

    #[test]
    fn encoded_page_is_valid_png() {
        let img = DynamicImage::ImageRgba8(RgbaImage::from_pixel(10, 10, Rgba([0, 0, 255, 255])));
        let data = encode_page(&img).expect("encode should succeed");
        assert_eq!(data.mime_type, "image/png");
        let decoded = STANDARD.decode(&data.data).expect("valid base64");
        assert_eq!(&decoded[..4], b"\x89PNG");
    }

    #[test]
    fn pages_are_encoded_in_order() {
        let mut pages = PageImages::new();
        for (num, w) in [(2u32, 30u32), (1, 10), (3, 20)] {
            pages.insert(
                num,
                DynamicImage::ImageRgba8(RgbaImage::from_pixel(w, 5, Rgba([0, 0, 0, 255]))),
            );
        }

        let encoded = encode_pages(&pages).unwrap();
        assert_eq!(encoded.len(), 3);

        let widths: Vec<u32> = encoded
            .iter()
            .map(|d| {
                let bytes = STANDARD.decode(&d.data).unwrap();
                image::load_from_memory(&bytes).unwrap().width()
            })
            .collect();
        assert_eq!(widths, vec![10, 30, 20]);
    }

    #[test]
    fn empty_page_reports_encode_failure() {
        let mut pages = PageImages::new();
        pages.insert(1, DynamicImage::ImageRgba8(RgbaImage::new(0, 0)));

        match encode_pages(&pages) {
            Err(DocsParserError::ImageEncodeFailed { page, .. }) => assert_eq!(page, 1),
            other => panic!("unexpected result: {:?}", other.map(|v| v.len())),
        }
    }
}

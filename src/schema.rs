//! Document schema: locations, raw OCR records and the classified summary.
//!
//! Two record families live here:
//!
//! * [`OcrRecord`]: one recognised word straight out of the OCR engine.
//!   This is what the `<stem>_ocr.json` artefact contains.
//! * [`DocumentSummary`] → [`Page`] → [`TextBlock`]: the structured output
//!   the LLM must produce. It is validated at the boundary by
//!   [`DocumentSummary::validate`] before anything is written.
//!
//! Only the paginated summary layout is supported. Blocks are grouped by page
//! and classified as either a heading or a paragraph.

use crate::error::DocsParserError;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// A bounding box in pixel units, relative to one rasterised page image.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Location {
    /// Left edge.
    pub x: f64,
    /// Top edge.
    pub y: f64,
    pub width: f64,
    pub height: f64,
    /// 1-based page number. Always set on OCR records; optional inside a
    /// [`Page`], where the enclosing page already identifies it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
}

impl Location {
    /// Build a location from the integer pixel box reported by the OCR engine.
    pub fn from_pixels(left: u32, top: u32, width: u32, height: u32, page: u32) -> Self {
        Self {
            x: left as f64,
            y: top as f64,
            width: width as f64,
            height: height as f64,
            page: Some(page),
        }
    }

    /// Check `x, y >= 0`, `width, height > 0`, all finite, page ≥ 1.
    pub fn validate(&self) -> Result<(), String> {
        let all_finite = [self.x, self.y, self.width, self.height]
            .iter()
            .all(|v| v.is_finite());
        if !all_finite {
            return Err(format!("non-finite coordinate in {:?}", self));
        }
        if self.x < 0.0 || self.y < 0.0 {
            return Err(format!(
                "negative origin ({}, {})",
                self.x, self.y
            ));
        }
        if self.width <= 0.0 || self.height <= 0.0 {
            return Err(format!(
                "empty box {}x{}",
                self.width, self.height
            ));
        }
        if self.page == Some(0) {
            return Err("page numbers are 1-based".to_string());
        }
        Ok(())
    }
}

/// One recognised word, as written to the OCR JSON artefact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OcrRecord {
    /// Unique, strictly increasing across the whole document.
    pub id: u64,
    pub text: String,
    /// Raw engine confidence (Tesseract reports 0–100).
    pub confidence: f32,
    pub location: Location,
}

impl OcrRecord {
    /// Page this record was found on.
    pub fn page(&self) -> u32 {
        self.location.page.unwrap_or(1)
    }
}

/// Content type assigned by the classifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentType {
    Heading,
    Paragraph,
}

impl ContentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContentType::Heading => "heading",
            ContentType::Paragraph => "paragraph",
        }
    }
}

/// A classified text block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextBlock {
    /// Id of the OCR record this block annotates.
    pub block_id: u64,
    /// Original OCR text.
    pub text: String,
    pub confidence: f32,
    pub location: Location,
    /// Optional short summary produced by the LLM.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    pub content_type: ContentType,
}

/// All classified blocks of one page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page {
    /// 1-based.
    pub page_number: u32,
    pub blocks: Vec<TextBlock>,
}

/// Top-level structured summary returned by the LLM.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentSummary {
    pub document_name: String,
    pub page_count: u32,
    pub pages: Vec<Page>,
}

impl DocumentSummary {
    /// Total number of classified blocks across all pages.
    pub fn block_count(&self) -> usize {
        self.pages.iter().map(|p| p.blocks.len()).sum()
    }

    /// Iterate every block in page order.
    pub fn blocks(&self) -> impl Iterator<Item = &TextBlock> {
        self.pages.iter().flat_map(|p| p.blocks.iter())
    }

    /// Validate the summary against its own invariants and the OCR records of
    /// the same run.
    ///
    /// Classification annotates the existing OCR blocks: every record must be
    /// classified exactly once, on the page it was found on, and nothing may
    /// be invented. `page_count` is the number of pages of this run.
    pub fn validate(&self, records: &[OcrRecord], page_count: u32) -> Result<(), DocsParserError> {
        if self.page_count != page_count {
            return Err(DocsParserError::schema(format!(
                "page_count is {} but the document has {} pages",
                self.page_count, page_count
            )));
        }

        let record_pages: HashMap<u64, u32> = records.iter().map(|r| (r.id, r.page())).collect();
        let mut seen_pages = HashSet::new();
        let mut seen_blocks = HashSet::new();

        for page in &self.pages {
            if page.page_number == 0 || page.page_number > page_count {
                return Err(DocsParserError::schema(format!(
                    "page {} does not exist (document has {} pages)",
                    page.page_number, page_count
                )));
            }
            if !seen_pages.insert(page.page_number) {
                return Err(DocsParserError::schema(format!(
                    "page {} appears more than once",
                    page.page_number
                )));
            }

            for block in &page.blocks {
                block.location.validate().map_err(|e| {
                    DocsParserError::schema(format!(
                        "block {} on page {}: {}",
                        block.block_id, page.page_number, e
                    ))
                })?;
                if !seen_blocks.insert(block.block_id) {
                    return Err(DocsParserError::schema(format!(
                        "block {} appears more than once",
                        block.block_id
                    )));
                }

                let Some(&ocr_page) = record_pages.get(&block.block_id) else {
                    return Err(DocsParserError::schema(format!(
                        "block {} does not match any OCR record",
                        block.block_id
                    )));
                };
                if ocr_page != page.page_number {
                    return Err(DocsParserError::schema(format!(
                        "block {} was found on page {} but is listed under page {}",
                        block.block_id, ocr_page, page.page_number
                    )));
                }
                if let Some(loc_page) = block.location.page {
                    if loc_page != page.page_number {
                        return Err(DocsParserError::schema(format!(
                            "block {} has location page {} but is listed under page {}",
                            block.block_id, loc_page, page.page_number
                        )));
                    }
                }
            }
        }

        let mut missing: Vec<u64> = record_pages
            .keys()
            .filter(|id| !seen_blocks.contains(*id))
            .copied()
            .collect();
        if !missing.is_empty() {
            missing.sort_unstable();
            return Err(DocsParserError::schema(format!(
                "{} OCR block(s) were not classified: {:?}",
                missing.len(),
                missing
            )));
        }

        Ok(())
    }
}

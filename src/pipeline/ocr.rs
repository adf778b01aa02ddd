//! OCR extraction: page images → flat list of [`OcrRecord`]s.
//!
//! The engine itself is a black box behind the [`OcrEngine`] trait. The
//! default implementation, [`TesseractCli`], shells out to the `tesseract`
//! binary in TSV mode, which reports one row per recognised word with its
//! confidence and pixel box.
//!
//! Record ids are assigned here, not by the engine: a single counter runs
//! across the whole document so ids stay unique and strictly increasing even
//! though every page is recognised separately.

use crate::error::DocsParserError;
use crate::pipeline::render::PageImages;
use crate::progress::ProgressCallback;
use crate::schema::{Location, OcrRecord};
use image::DynamicImage;
use std::io::ErrorKind;
use std::process::Command;
use tracing::{debug, info, warn};

/// One word as reported by an OCR engine, before filtering and id assignment.
#[derive(Debug, Clone, PartialEq)]
pub struct RecognizedWord {
    pub text: String,
    pub confidence: f32,
    pub left: u32,
    pub top: u32,
    pub width: u32,
    pub height: u32,
}

/// A local OCR engine.
///
/// Called once per page from a blocking thread.
pub trait OcrEngine: Send + Sync {
    /// Short engine name for logs and errors.
    fn name(&self) -> &str;

    /// Recognise the words of one page.
    ///
    /// `page_num` is only used for error reporting.
    fn recognize(
        &self,
        image: &DynamicImage,
        language: &str,
        page_num: u32,
    ) -> Result<Vec<RecognizedWord>, DocsParserError>;
}

/// OCR via the `tesseract` command-line tool.
#[derive(Debug, Clone)]
pub struct TesseractCli {
    binary: String,
}

impl Default for TesseractCli {
    fn default() -> Self {
        Self {
            binary: "tesseract".to_string(),
        }
    }
}

impl TesseractCli {
    /// Use a specific binary instead of `tesseract` from `PATH`.
    pub fn with_binary(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
        }
    }
}

impl OcrEngine for TesseractCli {
    fn name(&self) -> &str {
        "tesseract"
    }

    fn recognize(
        &self,
        image: &DynamicImage,
        language: &str,
        page_num: u32,
    ) -> Result<Vec<RecognizedWord>, DocsParserError> {
        // tesseract reads from a file path; hand it a temporary PNG.
        let tmp = tempfile::Builder::new()
            .prefix("docs-parser-page-")
            .suffix(".png")
            .tempfile()
            .map_err(|e| DocsParserError::Internal(format!("tempfile: {e}")))?;
        image
            .save_with_format(tmp.path(), image::ImageFormat::Png)
            .map_err(|e| DocsParserError::OcrFailed {
                page: page_num,
                detail: format!("could not stage page image: {e}"),
            })?;

        let output = Command::new(&self.binary)
            .arg(tmp.path())
            .arg("stdout")
            .arg("-l")
            .arg(language)
            .arg("tsv")
            .output()
            .map_err(|e| {
                if e.kind() == ErrorKind::NotFound {
                    DocsParserError::OcrEngineUnavailable {
                        engine: self.binary.clone(),
                        detail: e.to_string(),
                    }
                } else {
                    DocsParserError::OcrFailed {
                        page: page_num,
                        detail: format!("failed to run {}: {}", self.binary, e),
                    }
                }
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(DocsParserError::OcrFailed {
                page: page_num,
                detail: format!("{} exited with {}: {}", self.binary, output.status, stderr.trim()),
            });
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        Ok(parse_tsv(&stdout))
    }
}

/// Parse Tesseract TSV output into words.
///
/// Columns: `level page_num block_num par_num line_num word_num left top
/// width height conf text`. The header row, short rows and rows whose numeric
/// columns do not parse are skipped. Structural rows (page, block, line)
/// carry an empty text and are dropped later by the whitespace filter.
pub fn parse_tsv(tsv: &str) -> Vec<RecognizedWord> {
    tsv.lines()
        .filter(|line| !line.starts_with("level"))
        .filter_map(|line| {
            let cols: Vec<&str> = line.split('\t').collect();
            if cols.len() < 11 {
                return None;
            }
            Some(RecognizedWord {
                left: cols[6].trim().parse().ok()?,
                top: cols[7].trim().parse().ok()?,
                width: cols[8].trim().parse().ok()?,
                height: cols[9].trim().parse().ok()?,
                confidence: cols[10].trim().parse().ok()?,
                text: cols.get(11).map(|t| t.to_string()).unwrap_or_default(),
            })
        })
        .collect()
}

/// Turn one page's words into records.
///
/// Drops empty/whitespace-only text and zero-area boxes, then numbers the
/// survivors from `next_id`, which is advanced past the last id used.
pub fn records_from_words(
    words: Vec<RecognizedWord>,
    page_num: u32,
    next_id: &mut u64,
) -> Vec<OcrRecord> {
    words
        .into_iter()
        .filter(|w| !w.text.trim().is_empty())
        .filter(|w| w.width > 0 && w.height > 0)
        .map(|w| {
            let id = *next_id;
            *next_id += 1;
            OcrRecord {
                id,
                text: w.text,
                confidence: w.confidence,
                location: Location::from_pixels(w.left, w.top, w.width, w.height, page_num),
            }
        })
        .collect()
}

/// OCR every page in ascending page order.
pub fn extract_records(
    engine: &dyn OcrEngine,
    pages: &PageImages,
    language: &str,
    progress: Option<&ProgressCallback>,
) -> Result<Vec<OcrRecord>, DocsParserError> {
    let total = pages.len();
    let mut next_id = 1u64;
    let mut records = Vec::new();

    for (&page_num, image) in pages {
        let words = engine.recognize(image, language, page_num)?;
        let raw = words.len();
        let page_records = records_from_words(words, page_num, &mut next_id);

        debug!(
            "Page {}: {} raw entries, {} records kept",
            page_num,
            raw,
            page_records.len()
        );
        if page_records.is_empty() {
            warn!("Page {}: no text found", page_num);
        }
        if let Some(cb) = progress {
            cb.on_page_ocr_complete(page_num, total, page_records.len());
        }

        records.extend(page_records);
    }

    info!(
        "OCR ({}) complete: {} records across {} pages",
        engine.name(),
        records.len(),
        total
    );
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};
    use std::collections::HashMap;

    fn word(text: &str, left: u32) -> RecognizedWord {
        RecognizedWord {
            text: text.to_string(),
            confidence: 90.0,
            left,
            top: 5,
            width: 20,
            height: 10,
        }
    }

    struct ScriptedEngine(HashMap<u32, Vec<RecognizedWord>>);

    impl OcrEngine for ScriptedEngine {
        fn name(&self) -> &str {
            "scripted"
        }

        fn recognize(
            &self,
            _image: &DynamicImage,
            _language: &str,
            page_num: u32,
        ) -> Result<Vec<RecognizedWord>, DocsParserError> {
            Ok(self.0.get(&page_num).cloned().unwrap_or_default())
        }
    }

    fn blank_pages(n: u32) -> PageImages {
        (1..=n)
            .map(|p| {
                let img = RgbaImage::from_pixel(8, 8, Rgba([255, 255, 255, 255]));
                (p, DynamicImage::ImageRgba8(img))
            })
            .collect()
    }

    #[test]
    fn parse_tsv_reads_words_and_structure_rows() {
        let tsv = "level\tpage_num\tblock_num\tpar_num\tline_num\tword_num\tleft\ttop\twidth\theight\tconf\ttext\n\
1\t1\t0\t0\t0\t0\t0\t0\t640\t480\t-1\t\n\
5\t1\t1\t1\t1\t1\t36\t92\t60\t18\t91.5\tTotal\n\
5\t1\t1\t1\t1\t2\t110\t92\t72\t18\t88\t$42.00\n";
        let words = parse_tsv(tsv);
        assert_eq!(words.len(), 3);
        assert_eq!(words[0].text, "");
        assert_eq!(words[0].confidence, -1.0);
        assert_eq!(
            words[1],
            RecognizedWord {
                text: "Total".into(),
                confidence: 91.5,
                left: 36,
                top: 92,
                width: 60,
                height: 18,
            }
        );
        assert_eq!(words[2].text, "$42.00");
    }

    #[test]
    fn parse_tsv_skips_malformed_rows() {
        let tsv = "5\t1\t1\n5\t1\t1\t1\t1\t1\tx\t0\t1\t1\t50\tbad\n";
        assert!(parse_tsv(tsv).is_empty());
    }

    #[test]
    fn whitespace_and_empty_boxes_are_dropped() {
        let mut next = 1;
        let mut zero = word("ghost", 0);
        zero.width = 0;
        let records = records_from_words(
            vec![word("Total", 0), word("   ", 30), word("", 40), zero, word("$42.00", 60)],
            1,
            &mut next,
        );
        let texts: Vec<&str> = records.iter().map(|r| r.text.as_str()).collect();
        assert_eq!(texts, vec!["Total", "$42.00"]);
        assert_eq!(records[0].id, 1);
        assert_eq!(records[1].id, 2);
        assert_eq!(next, 3);
    }

    #[test]
    fn ids_continue_across_pages() {
        let mut script = HashMap::new();
        script.insert(1, vec![word("Intro", 0), word("text", 30)]);
        script.insert(2, vec![]);
        script.insert(3, vec![word("End", 0)]);
        let engine = ScriptedEngine(script);

        let records = extract_records(&engine, &blank_pages(3), "eng", None).unwrap();
        let ids: Vec<u64> = records.iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![1, 2, 3]);
        assert!(ids.windows(2).all(|w| w[0] < w[1]));

        let pages: Vec<u32> = records.iter().map(|r| r.page()).collect();
        assert_eq!(pages, vec![1, 1, 3]);
    }

    #[test]
    fn single_image_records_are_page_one() {
        let mut script = HashMap::new();
        script.insert(1, vec![word("a", 0), word("b", 25)]);
        let records = extract_records(&ScriptedEngine(script), &blank_pages(1), "eng", None).unwrap();
        assert!(records.iter().all(|r| r.location.page == Some(1)));
    }

    #[test]
    fn missing_binary_is_unavailable() {
        let engine = TesseractCli::with_binary("docs-parser-no-such-ocr-binary");
        let image = DynamicImage::ImageRgba8(RgbaImage::from_pixel(4, 4, Rgba([0, 0, 0, 255])));
        let err = engine.recognize(&image, "eng", 1).unwrap_err();
        assert!(matches!(err, DocsParserError::OcrEngineUnavailable { .. }));
    }
}

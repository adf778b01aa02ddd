//! Prompts for the block-classification request.
//!
//! Callers can override the system prompt via
//! [`crate::config::ProcessingConfig::system_prompt`]; the constant here is
//! used only when no override is provided. The user message is always built
//! by [`classification_request`] because it carries the run's OCR data.

use crate::schema::OcrRecord;
use serde::Serialize;

/// Default system prompt for classifying OCR blocks into a `DocumentSummary`.
pub const CLASSIFICATION_SYSTEM_PROMPT: &str = r#"You are a document layout analyst. You receive the page images of one scanned document together with the words an OCR engine found on them. Each OCR block has an id, a page number and a pixel bounding box measured on the attached page image of that page.

Follow these rules precisely:

1. VISUAL ANALYSIS
   - Examine the page images for layout cues: font size, font weight, position on the page and surrounding whitespace
   - Headings are typically larger, bolder, isolated by whitespace or placed at the top of a section

2. CROSS-REFERENCE
   - Match every OCR block to the text you see at its bounding box
   - Keep the block's id, text, confidence and location exactly as provided

3. CLASSIFICATION
   - Classify EVERY OCR block as either "heading" or "paragraph"
   - Do not invent blocks, do not merge blocks, do not drop blocks
   - You may add a one-sentence "summary" to a block when it helps, otherwise omit the field

4. OUTPUT FORMAT
   - Output ONLY one JSON object, with no commentary and no markdown fences
   - The object must match this schema exactly:

{
  "document_name": string,
  "page_count": integer,
  "pages": [
    {
      "page_number": integer (1-based),
      "blocks": [
        {
          "block_id": integer (the OCR id),
          "text": string,
          "confidence": number,
          "location": { "x": number, "y": number, "width": number, "height": number, "page": integer },
          "summary": string (optional),
          "content_type": "heading" | "paragraph"
        }
      ]
    }
  ]
}

   - Group blocks under the page they appear on, pages in ascending order
   - Omit pages that have no OCR blocks"#;

/// Compact form of an OCR record sent to the model.
#[derive(Serialize)]
struct PromptBlock<'a> {
    id: u64,
    page: u32,
    text: &'a str,
    confidence: f32,
    x: f64,
    y: f64,
    width: f64,
    height: f64,
}

/// Build the user-message text: document facts plus the OCR blocks as JSON.
///
/// The page images are attached to the same message, in ascending page
/// order, by the caller.
pub fn classification_request(document_name: &str, page_count: usize, records: &[OcrRecord]) -> String {
    let blocks: Vec<PromptBlock<'_>> = records
        .iter()
        .map(|r| PromptBlock {
            id: r.id,
            page: r.page(),
            text: &r.text,
            confidence: r.confidence,
            x: r.location.x,
            y: r.location.y,
            width: r.location.width,
            height: r.location.height,
        })
        .collect();

    // Serialising plain structs of numbers and strings cannot fail.
    let blocks_json = serde_json::to_string(&blocks).unwrap_or_else(|_| "[]".to_string());

    format!(
        "Document name: {document_name}\n\
         Page count: {page_count}\n\
         The {page_count} page image(s) are attached in order, starting with page 1.\n\n\
         OCR blocks ({count}):\n{blocks_json}",
        count = records.len(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::Location;

    #[test]
    fn system_prompt_names_both_classes() {
        assert!(CLASSIFICATION_SYSTEM_PROMPT.contains("\"heading\""));
        assert!(CLASSIFICATION_SYSTEM_PROMPT.contains("\"paragraph\""));
        assert!(CLASSIFICATION_SYSTEM_PROMPT.contains("page_number"));
    }

    #[test]
    fn request_lists_every_block() {
        let records = vec![
            OcrRecord {
                id: 1,
                text: "Total".into(),
                confidence: 91.0,
                location: Location::from_pixels(36, 92, 60, 18, 1),
            },
            OcrRecord {
                id: 2,
                text: "$42.00".into(),
                confidence: 88.0,
                location: Location::from_pixels(110, 92, 72, 18, 1),
            },
        ];

        let text = classification_request("invoice", 1, &records);
        assert!(text.contains("Document name: invoice"));
        assert!(text.contains("Page count: 1"));
        assert!(text.contains("OCR blocks (2)"));

        let json_start = text.find('[').unwrap();
        let blocks: serde_json::Value = serde_json::from_str(&text[json_start..]).unwrap();
        assert_eq!(blocks[1]["id"], 2);
        assert_eq!(blocks[1]["text"], "$42.00");
        assert_eq!(blocks[0]["page"], 1);
    }
}

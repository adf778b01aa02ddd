//! Block classification: one multimodal request per document.
//!
//! The request carries the classification prompt, the OCR blocks as JSON and
//! every page image. The answer must be a [`DocumentSummary`]; it is parsed
//! and validated here and anything that does not fit is a hard error. There
//! is no retry and no repair: a provider error or a malformed answer aborts
//! the run.

use crate::config::ProcessingConfig;
use crate::error::DocsParserError;
use crate::prompts::{classification_request, CLASSIFICATION_SYSTEM_PROMPT};
use crate::schema::{DocumentSummary, OcrRecord};
use edgequake_llm::{ChatMessage, CompletionOptions, ImageData, LLMProvider};
use once_cell::sync::Lazy;
use regex::Regex;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

/// The raw answer to a classification request and its cost.
///
/// `content` is unvalidated; run it through [`parse_summary`].
#[derive(Debug, Clone)]
pub struct ClassificationResponse {
    pub content: String,
    pub input_tokens: usize,
    pub output_tokens: usize,
    pub duration_ms: u64,
}

/// Build the message list for the classification request.
///
/// ## Message Layout
///
/// 1. **System message**: the classification prompt (or user override)
/// 2. **User message**: document facts and OCR blocks as text, with every
///    page image attached in ascending page order
pub fn build_messages(
    document_name: &str,
    records: &[OcrRecord],
    images: Vec<ImageData>,
    config: &ProcessingConfig,
) -> Vec<ChatMessage> {
    let system_prompt = config
        .system_prompt
        .as_deref()
        .unwrap_or(CLASSIFICATION_SYSTEM_PROMPT);

    let text = classification_request(document_name, images.len(), records);

    vec![
        ChatMessage::system(system_prompt),
        ChatMessage::user_with_images(text, images),
    ]
}

/// Send the classification request.
///
/// Exactly one attempt; any provider error is returned as
/// [`DocsParserError::LlmApiError`].
pub async fn request_classification(
    provider: &Arc<dyn LLMProvider>,
    document_name: &str,
    records: &[OcrRecord],
    images: Vec<ImageData>,
    config: &ProcessingConfig,
) -> Result<ClassificationResponse, DocsParserError> {
    let start = Instant::now();
    let page_count = images.len();
    let messages = build_messages(document_name, records, images, config);
    let options = build_options(config);

    info!(
        "Classifying {} blocks on {} pages with {}",
        records.len(),
        page_count,
        config.model_or_default()
    );

    let response = provider
        .chat(&messages, Some(&options))
        .await
        .map_err(|e| DocsParserError::LlmApiError {
            message: e.to_string(),
        })?;

    let duration = start.elapsed();
    debug!(
        "Classification: {} input tokens, {} output tokens, {:?}",
        response.prompt_tokens, response.completion_tokens, duration
    );

    Ok(ClassificationResponse {
        content: response.content,
        input_tokens: response.prompt_tokens,
        output_tokens: response.completion_tokens,
        duration_ms: duration.as_millis() as u64,
    })
}

/// Build `CompletionOptions` from the processing config.
fn build_options(config: &ProcessingConfig) -> CompletionOptions {
    CompletionOptions {
        temperature: Some(config.temperature),
        max_tokens: Some(config.max_tokens),
        ..Default::default()
    }
}

static RE_JSON_FENCE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)^```(?:json)?\s*\n(.*?)\n?```$").unwrap());

/// Strip one surrounding ```` ```json ```` fence, if present.
///
/// Models sometimes wrap JSON in a fence despite the prompt.
pub fn strip_code_fence(raw: &str) -> &str {
    let trimmed = raw.trim();
    match RE_JSON_FENCE.captures(trimmed).and_then(|c| c.get(1)) {
        Some(inner) => inner.as_str().trim(),
        None => trimmed,
    }
}

/// Parse the model's answer into a [`DocumentSummary`] and validate it
/// against the OCR records and page count of this run.
pub fn parse_summary(
    raw: &str,
    records: &[OcrRecord],
    page_count: u32,
) -> Result<DocumentSummary, DocsParserError> {
    let body = strip_code_fence(raw);
    if body.is_empty() {
        return Err(DocsParserError::schema("empty response"));
    }

    let summary: DocumentSummary =
        serde_json::from_str(body).map_err(|e| DocsParserError::schema(e.to_string()))?;
    summary.validate(records, page_count)?;
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{ContentType, Location};

    fn records() -> Vec<OcrRecord> {
        vec![
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
        ]
    }

    const VALID: &str = r#"{
      "document_name": "invoice",
      "page_count": 1,
      "pages": [
        {
          "page_number": 1,
          "blocks": [
            {"block_id": 1, "text": "Total", "confidence": 91,
             "location": {"x": 36, "y": 92, "width": 60, "height": 18, "page": 1},
             "content_type": "heading"},
            {"block_id": 2, "text": "$42.00", "confidence": 88,
             "location": {"x": 110, "y": 92, "width": 72, "height": 18},
             "summary": "Amount due", "content_type": "paragraph"}
          ]
        }
      ]
    }"#;

    #[test]
    fn build_options_defaults() {
        let opts = build_options(&ProcessingConfig::default());
        assert_eq!(opts.temperature, Some(0.0));
        assert_eq!(opts.max_tokens, Some(16384));
    }

    #[test]
    fn messages_carry_prompt_text_and_images() {
        let config = ProcessingConfig::default();
        let images = vec![
            ImageData::new("AAAA".to_string(), "image/png"),
            ImageData::new("BBBB".to_string(), "image/png"),
        ];
        let messages = build_messages("report", &records(), images, &config);

        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].content, CLASSIFICATION_SYSTEM_PROMPT);
        assert!(messages[1].content.contains("Page count: 2"));
        assert!(messages[1].content.contains("$42.00"));
        assert_eq!(messages[1].images.as_ref().map(|v| v.len()), Some(2));
    }

    #[test]
    fn custom_system_prompt_wins() {
        let config = ProcessingConfig::builder()
            .system_prompt("classify please")
            .build()
            .unwrap();
        let messages = build_messages("doc", &records(), vec![], &config);
        assert_eq!(messages[0].content, "classify please");
    }

    #[test]
    fn valid_response_parses() {
        let summary = parse_summary(VALID, &records(), 1).unwrap();
        assert_eq!(summary.document_name, "invoice");
        assert_eq!(summary.pages[0].blocks[0].content_type, ContentType::Heading);
        assert_eq!(summary.pages[0].blocks[1].summary.as_deref(), Some("Amount due"));
    }

    #[test]
    fn fenced_response_parses() {
        let fenced = format!("```json\n{VALID}\n```");
        assert!(parse_summary(&fenced, &records(), 1).is_ok());
        let bare_fence = format!("```\n{VALID}\n```");
        assert!(parse_summary(&bare_fence, &records(), 1).is_ok());
    }

    #[test]
    fn missing_required_field_fails() {
        let missing = VALID.replace(r#""content_type": "heading""#, r#""kind": "heading""#);
        let err = parse_summary(&missing, &records(), 1).unwrap_err();
        match err {
            DocsParserError::SchemaValidation { detail } => {
                assert!(detail.contains("content_type"), "got: {detail}")
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn unknown_content_type_fails() {
        let table = VALID.replace(r#""content_type": "heading""#, r#""content_type": "table""#);
        assert!(parse_summary(&table, &records(), 1).is_err());
    }

    #[test]
    fn invented_block_fails() {
        let invented = VALID.replace(r#""block_id": 2"#, r#""block_id": 3"#);
        assert!(matches!(
            parse_summary(&invented, &records(), 1),
            Err(DocsParserError::SchemaValidation { .. })
        ));
    }

    #[test]
    fn dropped_block_fails() {
        let mut value: serde_json::Value = serde_json::from_str(VALID).unwrap();
        value["pages"][0]["blocks"].as_array_mut().unwrap().pop();
        let err = parse_summary(&value.to_string(), &records(), 1).unwrap_err();
        assert!(err.to_string().contains("not classified"), "got: {err}");
    }

    #[test]
    fn wrong_page_count_fails() {
        assert!(parse_summary(VALID, &records(), 2).is_err());
    }

    #[test]
    fn prose_and_empty_responses_fail() {
        assert!(parse_summary("Sure! Here is the summary.", &records(), 1).is_err());
        assert!(parse_summary("   ", &records(), 1).is_err());
    }

    #[test]
    fn strip_code_fence_leaves_plain_json() {
        assert_eq!(strip_code_fence("  {\"a\":1}  "), "{\"a\":1}");
        assert_eq!(strip_code_fence("```json\n{\"a\":1}\n```"), "{\"a\":1}");
    }
}

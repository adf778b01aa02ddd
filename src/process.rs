//! Document processing entry points.
//!
//! [`process`] runs one document through every stage in sequence:
//!
//! ```text
//! resolve input ─▶ provider ─▶ output dir ─▶ load pages ─▶ OCR ─▶ OCR overlays
//!   ─▶ OCR json ─▶ classify ─▶ validate ─▶ summary json ─▶ LLM overlays
//! ```
//!
//! The OCR JSON is written before the LLM call, so OCR work survives a
//! failed classification. The summary JSON is written only after the
//! response passed validation.

use crate::config::{require_api_key, ProcessingConfig};
use crate::error::DocsParserError;
use crate::output::{ProcessingOutput, ProcessingStats};
use crate::pipeline::annotate::{
    self, AnnotationStage, HEADING_COLOR, OCR_COLOR, PARAGRAPH_COLOR,
};
use crate::pipeline::ocr::{self, OcrEngine, TesseractCli};
use crate::pipeline::persist::DocumentDir;
use crate::pipeline::render::{self, PageImages};
use crate::pipeline::{encode, input, llm};
use crate::progress::ProgressCallback;
use crate::schema::{ContentType, DocumentSummary, Location, OcrRecord};
use edgequake_llm::{LLMProvider, ProviderFactory};
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

/// Process one image or PDF.
///
/// # Errors
/// Every failure is fatal. See [`DocsParserError`] for the kinds; an input
/// that does not exist or has an unsupported extension fails before any
/// page is loaded.
pub async fn process(
    input_path: impl AsRef<Path>,
    config: &ProcessingConfig,
) -> Result<ProcessingOutput, DocsParserError> {
    let total_start = Instant::now();

    // ── Step 1: Resolve input ────────────────────────────────────────────
    let resolved = input::resolve_input(input_path)?;
    info!("Processing {}", resolved.path.display());

    // ── Step 2: Get/create provider ──────────────────────────────────────
    let provider = if config.ocr_only {
        None
    } else {
        Some(resolve_provider(config)?)
    };

    // ── Step 3: Output directory ─────────────────────────────────────────
    let dir = DocumentDir::create(&config.output_dir, &resolved)?;

    // ── Step 4: Load / rasterise pages ───────────────────────────────────
    let render_start = Instant::now();
    let pages = render::load_pages(&resolved, config.dpi).await?;
    let render_duration_ms = render_start.elapsed().as_millis() as u64;
    info!("Loaded {} page(s) in {}ms", pages.len(), render_duration_ms);

    if let Some(ref cb) = config.progress_callback {
        cb.on_processing_start(pages.len());
    }

    // ── Step 5: OCR ──────────────────────────────────────────────────────
    let ocr_start = Instant::now();
    let (records, pages) = run_ocr(resolve_ocr_engine(config), pages, config).await?;
    let ocr_duration_ms = ocr_start.elapsed().as_millis() as u64;

    // ── Step 6: OCR overlays + OCR json ──────────────────────────────────
    let mut annotated_images =
        annotate_ocr_pass(&dir, &pages, &records, config.progress_callback.as_ref())?;

    let ocr_json = dir.write_ocr_results(&records)?;
    notify_written(config.progress_callback.as_ref(), &ocr_json);

    let mut stats = ProcessingStats {
        total_pages: pages.len(),
        pages_with_text: pages_with_records(&records).len(),
        ocr_blocks: records.len(),
        render_duration_ms,
        ocr_duration_ms,
        ..Default::default()
    };

    // ── Step 7: Classify ─────────────────────────────────────────────────
    let (summary, summary_json) = match provider {
        None => {
            info!("OCR-only mode: skipping classification");
            (None, None)
        }
        Some(provider) => {
            if let Some(ref cb) = config.progress_callback {
                cb.on_classification_start(records.len());
            }

            let images = encode::encode_pages(&pages)?;
            let response = llm::request_classification(
                &provider,
                &resolved.document_name,
                &records,
                images,
                config,
            )
            .await?;

            stats.input_tokens = response.input_tokens as u64;
            stats.output_tokens = response.output_tokens as u64;
            stats.llm_duration_ms = response.duration_ms;

            // ── Step 8: Validate, persist, LLM overlays ──────────────────
            let accepted = accept_classification(
                &dir,
                &pages,
                &records,
                &response.content,
                config.progress_callback.as_ref(),
            )?;

            stats.classified_blocks = accepted.summary.block_count();
            if let Some(ref cb) = config.progress_callback {
                cb.on_classification_complete(stats.classified_blocks);
            }
            annotated_images.extend(accepted.annotated_images);
            (Some(accepted.summary), Some(accepted.summary_json))
        }
    };

    stats.total_duration_ms = total_start.elapsed().as_millis() as u64;
    info!(
        "Processing complete: {} pages, {} OCR blocks, {} classified, {}ms",
        stats.total_pages, stats.ocr_blocks, stats.classified_blocks, stats.total_duration_ms
    );

    Ok(ProcessingOutput {
        document_name: resolved.document_name,
        document_dir: dir.path().to_path_buf(),
        ocr_json,
        summary_json,
        records,
        summary,
        annotated_images,
        stats,
    })
}

/// Synchronous wrapper around [`process`].
///
/// Creates a temporary tokio runtime internally.
pub fn process_sync(
    input_path: impl AsRef<Path>,
    config: &ProcessingConfig,
) -> Result<ProcessingOutput, DocsParserError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| DocsParserError::Internal(format!("Failed to create tokio runtime: {}", e)))?
        .block_on(process(input_path, config))
}

/// A classification that passed validation and has been persisted.
#[derive(Debug, Clone)]
pub struct AcceptedClassification {
    pub summary: DocumentSummary,
    pub summary_json: PathBuf,
    pub annotated_images: Vec<PathBuf>,
}

/// Validate the model's raw answer, then write the summary JSON and the
/// LLM-pass overlays.
///
/// Nothing is written unless the answer parses and passes
/// [`DocumentSummary::validate`] for this run's records and page count.
pub fn accept_classification(
    dir: &DocumentDir,
    pages: &PageImages,
    records: &[OcrRecord],
    raw: &str,
    progress: Option<&ProgressCallback>,
) -> Result<AcceptedClassification, DocsParserError> {
    let summary = llm::parse_summary(raw, records, pages.len() as u32)?;

    let summary_json = dir.write_summary(&summary)?;
    notify_written(progress, &summary_json);

    let annotated_images = annotate_llm_pass(dir, pages, &summary, progress)?;

    Ok(AcceptedClassification {
        summary,
        summary_json,
        annotated_images,
    })
}

// ── Internal helpers ─────────────────────────────────────────────────────

/// Run OCR on the blocking pool.
///
/// The page map is moved into the task and handed back with the records so
/// it stays owned by this run.
async fn run_ocr(
    engine: Arc<dyn OcrEngine>,
    pages: PageImages,
    config: &ProcessingConfig,
) -> Result<(Vec<OcrRecord>, PageImages), DocsParserError> {
    let language = config.language.clone();
    let progress = config.progress_callback.clone();

    let (records, pages) = tokio::task::spawn_blocking(move || {
        let records = ocr::extract_records(engine.as_ref(), &pages, &language, progress.as_ref());
        (records, pages)
    })
    .await
    .map_err(|e| DocsParserError::Internal(format!("OCR task panicked: {}", e)))?;

    Ok((records?, pages))
}

fn resolve_ocr_engine(config: &ProcessingConfig) -> Arc<dyn OcrEngine> {
    match config.ocr_engine {
        Some(ref engine) => Arc::clone(engine),
        None => Arc::new(TesseractCli::default()),
    }
}

/// Resolve the LLM provider.
///
/// 1. **Pre-built provider** (`config.provider`): used as-is.
/// 2. **Named provider + model**: the API key must be present in the
///    environment; otherwise this fails before any OCR work starts.
fn resolve_provider(config: &ProcessingConfig) -> Result<Arc<dyn LLMProvider>, DocsParserError> {
    if let Some(ref provider) = config.provider {
        return Ok(Arc::clone(provider));
    }

    let name = config.provider_or_default();
    require_api_key(name, |var| std::env::var(var).ok())?;

    let model = config.model_or_default();
    debug!("Creating provider {} with model {}", name, model);
    ProviderFactory::create_llm_provider(name, model).map_err(|e| {
        DocsParserError::ProviderNotConfigured {
            provider: name.to_string(),
            hint: format!("{e}"),
        }
    })
}

fn pages_with_records(records: &[OcrRecord]) -> BTreeSet<u32> {
    records.iter().map(|r| r.page()).collect()
}

/// One overlay per page that has at least one OCR record.
fn annotate_ocr_pass(
    dir: &DocumentDir,
    pages: &PageImages,
    records: &[OcrRecord],
    progress: Option<&ProgressCallback>,
) -> Result<Vec<PathBuf>, DocsParserError> {
    let mut by_page: BTreeMap<u32, Vec<&Location>> = BTreeMap::new();
    for record in records {
        by_page.entry(record.page()).or_default().push(&record.location);
    }

    let mut written = Vec::with_capacity(by_page.len());
    for (page_num, boxes) in by_page {
        let Some(image) = pages.get(&page_num) else {
            continue;
        };
        let canvas = annotate::annotate_page(image, boxes, OCR_COLOR);
        let path = annotate::save_annotated(&canvas, dir.path(), AnnotationStage::Ocr, page_num)?;
        notify_written(progress, &path);
        written.push(path);
    }
    Ok(written)
}

/// One overlay per page that has at least one classified block; headings
/// and paragraphs get different outline colours.
fn annotate_llm_pass(
    dir: &DocumentDir,
    pages: &PageImages,
    summary: &DocumentSummary,
    progress: Option<&ProgressCallback>,
) -> Result<Vec<PathBuf>, DocsParserError> {
    let mut classified: Vec<_> = summary.pages.iter().filter(|p| !p.blocks.is_empty()).collect();
    classified.sort_by_key(|p| p.page_number);

    let mut written = Vec::with_capacity(classified.len());
    for page in classified {
        let Some(image) = pages.get(&page.page_number) else {
            continue;
        };

        let mut canvas = image.to_rgba8();
        let of_type = move |kind: ContentType| {
            page.blocks
                .iter()
                .filter(move |b| b.content_type == kind)
                .map(|b| &b.location)
        };
        annotate::draw_boxes(&mut canvas, of_type(ContentType::Paragraph), PARAGRAPH_COLOR);
        annotate::draw_boxes(&mut canvas, of_type(ContentType::Heading), HEADING_COLOR);

        let path =
            annotate::save_annotated(&canvas, dir.path(), AnnotationStage::Llm, page.page_number)?;
        notify_written(progress, &path);
        written.push(path);
    }
    Ok(written)
}

fn notify_written(progress: Option<&ProgressCallback>, path: &Path) {
    if let Some(cb) = progress {
        cb.on_artifact_written(path);
    }
}

//! Configuration for one document-processing run.
//!
//! All behaviour is controlled through [`ProcessingConfig`], built via its
//! [`ProcessingConfigBuilder`]. The LLM provider and OCR engine can be
//! injected pre-built (useful in tests); otherwise they are resolved from the
//! environment when a run starts.

use crate::error::DocsParserError;
use crate::pipeline::ocr::OcrEngine;
use crate::progress::ProgressCallback;
use edgequake_llm::LLMProvider;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

/// Model used when neither the config nor the environment names one.
pub const DEFAULT_MODEL: &str = "gpt-4.1-mini";

/// Provider used when none is named.
pub const DEFAULT_PROVIDER: &str = "openai";

/// Output root used when none is given.
pub const DEFAULT_OUTPUT_DIR: &str = "data/output";

/// Tesseract language code used when none is given.
pub const DEFAULT_LANGUAGE: &str = "eng";

/// Configuration for processing a single document.
///
/// # Example
/// ```rust
/// use docs_parser::ProcessingConfig;
///
/// let config = ProcessingConfig::builder()
///     .output_dir("out")
///     .language("deu")
///     .ocr_only(true)
///     .build()
///     .unwrap();
/// assert_eq!(config.dpi, 300);
/// ```
#[derive(Clone)]
pub struct ProcessingConfig {
    /// Root output directory. Artefacts go to `<output_dir>/<lowercased-stem>/`.
    /// Default: `data/output`.
    pub output_dir: PathBuf,

    /// OCR language code passed to the engine (`-l` for Tesseract). Default: `eng`.
    pub language: String,

    /// Rasterisation DPI for PDF pages. Range: 72–600. Default: 300.
    ///
    /// Bounding boxes are expressed in pixels of the rasterised page, so the
    /// same DPI is used for OCR, annotation and the images sent to the LLM.
    pub dpi: u32,

    /// Stop after the OCR stage: no provider, no API key, no summary.
    pub ocr_only: bool,

    /// LLM model identifier. If None, uses [`DEFAULT_MODEL`].
    pub model: Option<String>,

    /// LLM provider name (e.g. "openai", "anthropic", "gemini", "ollama").
    /// If None, uses [`DEFAULT_PROVIDER`].
    pub provider_name: Option<String>,

    /// Pre-constructed LLM provider. Takes precedence over `provider_name`.
    pub provider: Option<Arc<dyn LLMProvider>>,

    /// Pre-constructed OCR engine. Defaults to the `tesseract` binary.
    pub ocr_engine: Option<Arc<dyn OcrEngine>>,

    /// Sampling temperature for the classification call. Default: 0.0.
    pub temperature: f32,

    /// Maximum tokens the LLM may generate. Default: 16384.
    ///
    /// The summary echoes every OCR block back with its location, so the
    /// answer grows linearly with the number of recognised words.
    pub max_tokens: usize,

    /// Custom system prompt. If None, uses the built-in classification prompt.
    pub system_prompt: Option<String>,

    /// Optional progress events.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for ProcessingConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
            language: DEFAULT_LANGUAGE.to_string(),
            dpi: 300,
            ocr_only: false,
            model: None,
            provider_name: None,
            provider: None,
            ocr_engine: None,
            temperature: 0.0,
            max_tokens: 16384,
            system_prompt: None,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for ProcessingConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProcessingConfig")
            .field("output_dir", &self.output_dir)
            .field("language", &self.language)
            .field("dpi", &self.dpi)
            .field("ocr_only", &self.ocr_only)
            .field("model", &self.model)
            .field("provider_name", &self.provider_name)
            .field("provider", &self.provider.as_ref().map(|_| "<dyn LLMProvider>"))
            .field("ocr_engine", &self.ocr_engine.as_ref().map(|e| e.name().to_string()))
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("system_prompt", &self.system_prompt.as_ref().map(|p| p.len()))
            .finish()
    }
}

impl ProcessingConfig {
    /// Create a new builder for `ProcessingConfig`.
    pub fn builder() -> ProcessingConfigBuilder {
        ProcessingConfigBuilder {
            config: Self::default(),
        }
    }

    /// Effective model id.
    pub fn model_or_default(&self) -> &str {
        self.model.as_deref().unwrap_or(DEFAULT_MODEL)
    }

    /// Effective provider name.
    pub fn provider_or_default(&self) -> &str {
        self.provider_name.as_deref().unwrap_or(DEFAULT_PROVIDER)
    }
}

/// Builder for [`ProcessingConfig`].
pub struct ProcessingConfigBuilder {
    config: ProcessingConfig,
}

impl fmt::Debug for ProcessingConfigBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProcessingConfigBuilder")
            .field("config", &self.config)
            .finish()
    }
}

impl ProcessingConfigBuilder {
    pub fn output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.output_dir = dir.into();
        self
    }

    pub fn language(mut self, lang: impl Into<String>) -> Self {
        self.config.language = lang.into();
        self
    }

    pub fn dpi(mut self, dpi: u32) -> Self {
        self.config.dpi = dpi;
        self
    }

    pub fn ocr_only(mut self, v: bool) -> Self {
        self.config.ocr_only = v;
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = Some(model.into());
        self
    }

    pub fn provider_name(mut self, name: impl Into<String>) -> Self {
        self.config.provider_name = Some(name.into());
        self
    }

    pub fn provider(mut self, provider: Arc<dyn LLMProvider>) -> Self {
        self.config.provider = Some(provider);
        self
    }

    pub fn ocr_engine(mut self, engine: Arc<dyn OcrEngine>) -> Self {
        self.config.ocr_engine = Some(engine);
        self
    }

    pub fn temperature(mut self, t: f32) -> Self {
        self.config.temperature = t.clamp(0.0, 2.0);
        self
    }

    pub fn max_tokens(mut self, n: usize) -> Self {
        self.config.max_tokens = n;
        self
    }

    pub fn system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.config.system_prompt = Some(prompt.into());
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ProcessingConfig, DocsParserError> {
        let c = &self.config;
        if c.dpi < 72 || c.dpi > 600 {
            return Err(DocsParserError::InvalidConfig(format!(
                "DPI must be 72–600, got {}",
                c.dpi
            )));
        }
        if c.language.trim().is_empty() {
            return Err(DocsParserError::InvalidConfig(
                "OCR language must not be empty".into(),
            ));
        }
        if c.max_tokens == 0 {
            return Err(DocsParserError::InvalidConfig(
                "max_tokens must be ≥ 1".into(),
            ));
        }
        Ok(self.config)
    }
}

// ── API keys ─────────────────────────────────────────────────────────────

/// Environment variable holding the API key for a provider, if it needs one.
pub fn api_key_var(provider: &str) -> Option<&'static str> {
    match provider.to_ascii_lowercase().as_str() {
        "openai" => Some("OPENAI_API_KEY"),
        "anthropic" => Some("ANTHROPIC_API_KEY"),
        "gemini" => Some("GEMINI_API_KEY"),
        "mistral" => Some("MISTRAL_API_KEY"),
        "openrouter" => Some("OPENROUTER_API_KEY"),
        _ => None,
    }
}

/// Fail when the provider needs an API key and `lookup` cannot find a
/// non-empty one.
///
/// `lookup` is usually `|k| std::env::var(k).ok()`.
pub fn require_api_key<F>(provider: &str, lookup: F) -> Result<(), DocsParserError>
where
    F: Fn(&str) -> Option<String>,
{
    let Some(var) = api_key_var(provider) else {
        return Ok(());
    };
    match lookup(var) {
        Some(key) if !key.trim().is_empty() => Ok(()),
        _ => Err(DocsParserError::ProviderNotConfigured {
            provider: provider.to_string(),
            hint: format!("Set {var} in the environment or in a .env file."),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let c = ProcessingConfig::default();
        assert_eq!(c.output_dir, PathBuf::from("data/output"));
        assert_eq!(c.language, "eng");
        assert_eq!(c.dpi, 300);
        assert!(!c.ocr_only);
        assert_eq!(c.model_or_default(), DEFAULT_MODEL);
        assert_eq!(c.provider_or_default(), "openai");
    }

    #[test]
    fn builder_rejects_bad_dpi() {
        assert!(ProcessingConfig::builder().dpi(50).build().is_err());
        assert!(ProcessingConfig::builder().dpi(601).build().is_err());
        assert!(ProcessingConfig::builder().dpi(150).build().is_ok());
    }

    #[test]
    fn builder_rejects_empty_language() {
        let err = ProcessingConfig::builder().language("  ").build().unwrap_err();
        assert!(matches!(err, DocsParserError::InvalidConfig(_)));
    }

    #[test]
    fn builder_clamps_temperature() {
        let c = ProcessingConfig::builder().temperature(9.0).build().unwrap();
        assert_eq!(c.temperature, 2.0);
    }

    #[test]
    fn api_key_required_for_openai() {
        let missing = require_api_key("openai", |_| None);
        assert!(matches!(
            missing,
            Err(DocsParserError::ProviderNotConfigured { .. })
        ));
        let blank = require_api_key("openai", |_| Some("  ".into()));
        assert!(blank.is_err());
        let present = require_api_key("OpenAI", |k| {
            assert_eq!(k, "OPENAI_API_KEY");
            Some("sk-test".into())
        });
        assert!(present.is_ok());
    }

    #[test]
    fn local_providers_need_no_key() {
        assert!(require_api_key("ollama", |_| None).is_ok());
        assert!(require_api_key("lmstudio", |_| None).is_ok());
    }
}

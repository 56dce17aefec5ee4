use anyhow::{Context, Result, anyhow};
use log::{LevelFilter, warn};
use serde::{Deserialize, Serialize};
use std::default::Default;
use std::path::{Path, PathBuf};
use std::time::Duration;
use url::Url;

use crate::errors::ConfigError;
use crate::translation::{Backoff, ClientOptions, PromptSettings, RetryPolicy};

/// Application configuration module
/// This module handles the application configuration including loading,
/// environment overrides, validating and saving configuration settings.
/// Represents the application configuration
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct Config {
    /// Translation endpoint and client settings
    #[serde(default)]
    pub translation: TranslationConfig,

    /// Directory and file naming settings
    #[serde(default)]
    pub paths: PathsConfig,

    /// Page-image to text converter settings
    #[serde(default)]
    pub converter: ConverterConfig,

    /// Final typesetter settings
    #[serde(default)]
    pub renderer: RendererConfig,

    /// Final document format
    #[serde(default)]
    pub output_format: OutputFormat,

    /// Log level
    #[serde(default)]
    pub log_level: LogLevel,
}

/// Translation service configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct TranslationConfig {
    // @field: Endpoint base URL, `/chat/completions` is appended
    #[serde(default)]
    pub base_url: String,

    // @field: Bearer token
    #[serde(default)]
    pub api_key: String,

    // @field: Model name
    #[serde(default)]
    pub model: String,

    // @field: Max in-flight requests
    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: usize,

    // @field: Per-request timeout
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    // @field: Total attempts per block, first one included
    #[serde(default = "default_retry_attempts")]
    pub retry_attempts: u32,

    /// Base of the exponential backoff after HTTP 429, doubled per attempt
    #[serde(default = "default_rate_limit_backoff_base_ms")]
    pub rate_limit_backoff_base_ms: u64,

    /// Fixed pause after server errors, timeouts and transport failures
    #[serde(default = "default_transient_retry_delay_ms")]
    pub transient_retry_delay_ms: u64,

    /// Temperature parameter for text generation
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// System instruction sent with every block
    #[serde(default = "default_system_prompt")]
    pub system_prompt: String,

    /// Maximum glossary terms injected per block
    #[serde(default = "default_max_glossary_terms")]
    pub max_glossary_terms: usize,
}

impl Default for TranslationConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            api_key: String::new(),
            model: String::new(),
            max_concurrency: default_max_concurrency(),
            timeout_secs: default_timeout_secs(),
            retry_attempts: default_retry_attempts(),
            rate_limit_backoff_base_ms: default_rate_limit_backoff_base_ms(),
            transient_retry_delay_ms: default_transient_retry_delay_ms(),
            temperature: default_temperature(),
            system_prompt: default_system_prompt(),
            max_glossary_terms: default_max_glossary_terms(),
        }
    }
}

impl TranslationConfig {
    /// Retry policy built from the attempt budget and backoff settings
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.retry_attempts,
            rate_limit_backoff: Backoff::Exponential {
                base: Duration::from_millis(self.rate_limit_backoff_base_ms),
            },
            transient_backoff: Backoff::Fixed(Duration::from_millis(self.transient_retry_delay_ms)),
        }
    }

    /// Options for the translation client
    pub fn client_options(&self) -> ClientOptions {
        ClientOptions {
            max_concurrency: self.max_concurrency,
            retry: self.retry_policy(),
            prompt: PromptSettings {
                model: self.model.clone(),
                system_prompt: self.system_prompt.clone(),
                temperature: self.temperature,
            },
        }
    }
}

/// Directory and naming settings
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct PathsConfig {
    // @field: Default output root for single runs
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    // @field: Folder holding the glossary file
    #[serde(default = "default_assets_dir")]
    pub assets_dir: PathBuf,

    // @field: Glossary file name inside assets_dir, none disables the glossary
    #[serde(default = "default_glossary_filename")]
    pub glossary_filename: Option<String>,

    // @field: Checkpoint file name inside each document's work dir
    #[serde(default = "default_state_file_name")]
    pub state_file_name: String,

    // @field: Batch input folder
    #[serde(default = "default_batch_input_dir")]
    pub batch_input_dir: PathBuf,

    // @field: Batch output root
    #[serde(default = "default_batch_output_dir")]
    pub batch_output_dir: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            output_dir: default_output_dir(),
            assets_dir: default_assets_dir(),
            glossary_filename: default_glossary_filename(),
            state_file_name: default_state_file_name(),
            batch_input_dir: default_batch_input_dir(),
            batch_output_dir: default_batch_output_dir(),
        }
    }
}

impl PathsConfig {
    /// Full glossary path, if a glossary is configured
    pub fn glossary_path(&self) -> Option<PathBuf> {
        self.glossary_filename
            .as_ref()
            .filter(|name| !name.trim().is_empty())
            .map(|name| self.assets_dir.join(name))
    }
}

/// External converter configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ConverterConfig {
    /// Executable name or path
    #[serde(default = "default_converter_program")]
    pub program: String,

    /// Parse method passed with `-m`
    #[serde(default = "default_converter_method")]
    pub method: String,

    /// Kill the converter after this many seconds
    #[serde(default = "default_converter_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for ConverterConfig {
    fn default() -> Self {
        Self {
            program: default_converter_program(),
            method: default_converter_method(),
            timeout_secs: default_converter_timeout_secs(),
        }
    }
}

/// External renderer configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct RendererConfig {
    /// Executable name or path
    #[serde(default = "default_renderer_program")]
    pub program: String,

    /// LaTeX engine used for PDF output
    #[serde(default = "default_pdf_engine")]
    pub pdf_engine: String,

    /// CJK font for PDF output
    #[serde(default = "default_cjk_font")]
    pub cjk_font: String,

    /// Subtitle metadata for EPUB output
    #[serde(default)]
    pub subtitle: Option<String>,

    /// Kill the renderer after this many seconds
    #[serde(default = "default_renderer_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            program: default_renderer_program(),
            pdf_engine: default_pdf_engine(),
            cjk_font: default_cjk_font(),
            subtitle: None,
            timeout_secs: default_renderer_timeout_secs(),
        }
    }
}

/// Final document format
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Epub,
    Pdf,
}

impl OutputFormat {
    // @returns: File extension without dot
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Epub => "epub",
            Self::Pdf => "pdf",
        }
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.extension())
    }
}

impl std::str::FromStr for OutputFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "epub" => Ok(Self::Epub),
            "pdf" => Ok(Self::Pdf),
            _ => Err(anyhow!("Invalid output format: {}", s)),
        }
    }
}

/// Log verbosity level
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    pub fn to_level_filter(&self) -> LevelFilter {
        match self {
            Self::Error => LevelFilter::Error,
            Self::Warn => LevelFilter::Warn,
            Self::Info => LevelFilter::Info,
            Self::Debug => LevelFilter::Debug,
            Self::Trace => LevelFilter::Trace,
        }
    }
}

fn default_max_concurrency() -> usize {
    5
}

fn default_timeout_secs() -> u64 {
    60
}

fn default_retry_attempts() -> u32 {
    3
}

fn default_rate_limit_backoff_base_ms() -> u64 {
    1000 // 2^attempt seconds
}

fn default_transient_retry_delay_ms() -> u64 {
    1000
}

fn default_temperature() -> f32 {
    0.1
}

fn default_max_glossary_terms() -> usize {
    crate::translation::glossary::DEFAULT_MAX_TERMS
}

fn default_system_prompt() -> String {
    "【Strict Instruction】
You are a professional translator specializing in Astronomy and Astrophysics.
Translate the following English text into professional Chinese.
Rules:
1. Output ONLY the translation. Do not include explanations, notes, or \"Here is the translation\".
2. Preserve all Markdown formatting (bold, italic, links, etc.) exactly.
3. Do not translate code blocks, math formulas (LaTeX), or image paths.
4. Use the following Glossary for consistency:
    - Red Shift -> 红移
    - Event Horizon -> 事件视界
    - Accretion Disk -> 吸积盘
    - Black Hole -> 黑洞
    - Neutron Star -> 中子星
    - White Dwarf -> 白矮星
    - Supernova -> 超新星
    - Dark Matter -> 暗物质
    - Dark Energy -> 暗能量
    - Big Bang -> 大爆炸
    - General Relativity -> 广义相对论
    - Special Relativity -> 狭义相对论
"
    .to_string()
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("output")
}

fn default_assets_dir() -> PathBuf {
    PathBuf::from("assets")
}

fn default_glossary_filename() -> Option<String> {
    Some("astrodict241020_ec.txt".to_string())
}

fn default_state_file_name() -> String {
    "pipeline_state.json".to_string()
}

fn default_batch_input_dir() -> PathBuf {
    PathBuf::from("input/pipeline")
}

fn default_batch_output_dir() -> PathBuf {
    PathBuf::from("output/pipeline")
}

fn default_converter_program() -> String {
    "magic-pdf".to_string()
}

fn default_converter_method() -> String {
    "auto".to_string()
}

fn default_converter_timeout_secs() -> u64 {
    3600
}

fn default_renderer_program() -> String {
    "pandoc".to_string()
}

fn default_pdf_engine() -> String {
    "xelatex".to_string()
}

fn default_cjk_font() -> String {
    "SimSun".to_string()
}

fn default_renderer_timeout_secs() -> u64 {
    600
}

impl Config {
    /// Load configuration from a JSON file, creating it with defaults when missing
    pub fn load_or_create<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if path.exists() {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to open config file: {:?}", path))?;
            return serde_json::from_str(&content)
                .with_context(|| format!("Failed to parse config file: {:?}", path));
        }

        warn!("Config file not found at '{}', creating default config.", path.display());
        let config = Config::default();
        let config_json = serde_json::to_string_pretty(&config)
            .context("Failed to serialize default config to JSON")?;
        std::fs::write(path, config_json)
            .with_context(|| format!("Failed to write default config to file: {:?}", path))?;
        Ok(config)
    }

    /// Apply overrides from the process environment (and `.env`, once loaded)
    pub fn apply_env_overrides(&mut self) -> Result<()> {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    /// Apply overrides from any key lookup; empty values are ignored
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        if let Some(api_key) = get("LLM_API_KEY") {
            self.translation.api_key = api_key;
        }
        if let Some(base_url) = get("LLM_BASE_URL") {
            self.translation.base_url = base_url;
        }
        if let Some(model) = get("LLM_MODEL") {
            self.translation.model = model;
        }
        if let Some(value) = get("MAX_CONCURRENCY") {
            self.translation.max_concurrency = value
                .trim()
                .parse()
                .with_context(|| format!("MAX_CONCURRENCY is not a number: {}", value))?;
        }
        if let Some(value) = get("TIMEOUT_SECONDS") {
            self.translation.timeout_secs = value
                .trim()
                .parse()
                .with_context(|| format!("TIMEOUT_SECONDS is not a number: {}", value))?;
        }
        if let Some(value) = get("RETRY_ATTEMPTS") {
            self.translation.retry_attempts = value
                .trim()
                .parse()
                .with_context(|| format!("RETRY_ATTEMPTS is not a number: {}", value))?;
        }
        Ok(())
    }

    /// Validate the configuration for consistency and required values
    pub fn validate(&self) -> std::result::Result<(), ConfigError> {
        let translation = &self.translation;

        if translation.api_key.trim().is_empty() {
            return Err(ConfigError::MissingSetting { key: "translation.api_key", env: "LLM_API_KEY" });
        }
        if translation.base_url.trim().is_empty() {
            return Err(ConfigError::MissingSetting { key: "translation.base_url", env: "LLM_BASE_URL" });
        }
        if translation.model.trim().is_empty() {
            return Err(ConfigError::MissingSetting { key: "translation.model", env: "LLM_MODEL" });
        }

        let url = Url::parse(&translation.base_url).map_err(|e| ConfigError::InvalidUrl {
            url: translation.base_url.clone(),
            reason: e.to_string(),
        })?;
        if url.scheme() != "http" && url.scheme() != "https" {
            return Err(ConfigError::InvalidUrl {
                url: translation.base_url.clone(),
                reason: format!("unsupported scheme '{}'", url.scheme()),
            });
        }

        if translation.max_concurrency == 0 {
            return Err(ConfigError::InvalidValue {
                key: "translation.max_concurrency",
                reason: "must be at least 1".to_string(),
            });
        }
        if translation.retry_attempts == 0 {
            return Err(ConfigError::InvalidValue {
                key: "translation.retry_attempts",
                reason: "must be at least 1".to_string(),
            });
        }
        if translation.timeout_secs == 0 {
            return Err(ConfigError::InvalidValue {
                key: "translation.timeout_secs",
                reason: "must be at least 1".to_string(),
            });
        }

        Ok(())
    }
}

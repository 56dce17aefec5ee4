use anyhow::{Context, Result};
use async_trait::async_trait;
use log::{info, warn};
use once_cell::sync::Lazy;
use regex::Regex;
use std::ffi::OsString;
use std::fmt::Debug;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::app_config::{OutputFormat, RendererConfig};
use crate::errors::PipelineError;
use crate::external::run_tool;
use crate::file_utils::FileManager;

/// What to typeset and where
#[derive(Debug, Clone, PartialEq)]
pub struct RenderRequest {
    pub source: PathBuf,
    pub output: PathBuf,
    pub title: String,
    pub cover_image: Option<PathBuf>,
    pub format: OutputFormat,
    pub table_of_contents: bool,
}

/// Typesets a bilingual text file into the final document
#[async_trait]
pub trait DocumentRenderer: Send + Sync + Debug {
    /// Render and return the path of the written document
    async fn render(&self, request: &RenderRequest) -> Result<PathBuf>;
}

/// Lines that are certainly code or markup, not prose
static DEFINITE_CODE: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"<\s*%",
        r"%\s*>",
        r"=\s*\$",
        r"width\s*\$",
        r"align\s*\$",
        r"valign\s*\$",
        r"<corepatterns:",
        r"</corepatterns:",
        r"<region:",
        r"</region:",
        r"varepsilon",
        r"cdot",
        r"^\s*\}\s*$",
        r"^\s*while\s*\(",
        r"\\mathbf",
        r"\\eta",
        r"\\phantom",
        r"public\s+static\s+final",
    ]
    .iter()
    .map(|pattern| Regex::new(pattern).unwrap())
    .collect()
});

/// Common HTML tags; code only when adjacent to definite code
static LIKELY_CODE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^\s*</?(html|head|body|table|tr|td|th|h\d|center)").unwrap());

/// Wrap raw HTML and JSP runs in ```` ```html ```` fences so LaTeX does not choke on them.
///
/// Returns the rewritten text and the number of fences created.
pub fn sanitize_markdown(content: &str) -> (String, usize) {
    let lines: Vec<&str> = content.split('\n').collect();
    let mut is_code: Vec<bool> = lines
        .iter()
        .map(|line| DEFINITE_CODE.iter().any(|re| re.is_match(line)))
        .collect();

    let seeds: Vec<usize> = (0..lines.len()).filter(|&i| is_code[i]).collect();
    for i in seeds {
        // Grow upwards over blank lines and adjacent tags
        let mut j = i;
        while j > 0 {
            j -= 1;
            if lines[j].trim().is_empty() {
                continue;
            }
            if LIKELY_CODE.is_match(lines[j]) && !is_code[j] {
                is_code[j] = true;
            } else {
                break;
            }
        }

        let mut j = i + 1;
        while j < lines.len() {
            if lines[j].trim().is_empty() {
                j += 1;
                continue;
            }
            if LIKELY_CODE.is_match(lines[j]) && !is_code[j] {
                is_code[j] = true;
                j += 1;
            } else {
                break;
            }
        }
    }

    let mut output = Vec::with_capacity(lines.len());
    let mut fences = 0;
    let mut i = 0;
    while i < lines.len() {
        if is_code[i] {
            fences += 1;
            output.push("```html");
            while i < lines.len() && is_code[i] {
                output.push(lines[i]);
                i += 1;
            }
            output.push("```");
        } else {
            output.push(lines[i]);
            i += 1;
        }
    }

    (output.join("\n"), fences)
}

/// `pandoc` based renderer for EPUB and PDF
#[derive(Debug, Clone)]
pub struct Pandoc {
    config: RendererConfig,
}

impl Pandoc {
    pub fn new(config: RendererConfig) -> Self {
        Self { config }
    }

    /// Command line for one render; `source` is the file actually handed to pandoc
    pub fn arguments(&self, request: &RenderRequest, source: &Path) -> Vec<OsString> {
        let resource_dir = request.source.parent().unwrap_or_else(|| Path::new("."));
        let mut args: Vec<OsString> = vec![
            source.as_os_str().to_os_string(),
            "-o".into(),
            request.output.as_os_str().to_os_string(),
        ];
        if request.table_of_contents {
            args.push("--toc".into());
        }

        match request.format {
            OutputFormat::Epub => {
                args.push("--standalone".into());
                args.push("--metadata".into());
                args.push(format!("title={}", request.title).into());
                if let Some(subtitle) = &self.config.subtitle {
                    args.push("--metadata".into());
                    args.push(format!("subtitle={}", subtitle).into());
                }
                args.push("--resource-path".into());
                args.push(resource_dir.as_os_str().to_os_string());
                if let Some(cover) = request.cover_image.as_ref().filter(|c| FileManager::file_exists(c)) {
                    args.push("--epub-cover-image".into());
                    args.push(cover.as_os_str().to_os_string());
                }
            }
            OutputFormat::Pdf => {
                args.push("--metadata".into());
                args.push(format!("title={}", request.title).into());
                args.push("--resource-path".into());
                args.push(resource_dir.as_os_str().to_os_string());
                args.push(format!("--pdf-engine={}", self.config.pdf_engine).into());
                for variable in [
                    format!("CJKmainfont={}", self.config.cjk_font),
                    "geometry:margin=2.5cm".to_string(),
                    "mainfont=Times New Roman".to_string(),
                    "urlcolor=blue".to_string(),
                    "linkcolor=blue".to_string(),
                ] {
                    args.push("-V".into());
                    args.push(variable.into());
                }
            }
        }
        args
    }

    async fn run(&self, request: &RenderRequest, source: &Path) -> Result<()> {
        run_tool(
            &self.config.program,
            &self.arguments(request, source),
            Duration::from_secs(self.config.timeout_secs),
        )
        .await?;
        Ok(())
    }
}

#[async_trait]
impl DocumentRenderer for Pandoc {
    async fn render(&self, request: &RenderRequest) -> Result<PathBuf> {
        if !FileManager::file_exists(&request.source) {
            return Err(PipelineError::InputNotFound(request.source.clone()).into());
        }
        if let Some(parent) = request.output.parent() {
            FileManager::ensure_dir(parent)?;
        }

        info!("Rendering {} to {:?}", request.format, request.output);
        match request.format {
            OutputFormat::Epub => self.run(request, &request.source).await?,
            OutputFormat::Pdf => {
                let content = FileManager::read_to_string(&request.source)?;
                let (sanitized, fences) = sanitize_markdown(&content);
                info!("Sanitized Markdown: wrapped {} raw HTML runs in code fences", fences);

                let sanitized_path = FileManager::sibling_path(&request.source, "_sanitized", "md");
                FileManager::write_to_file(&sanitized_path, &sanitized)?;

                let result = self.run(request, &sanitized_path).await;
                if let Err(e) = std::fs::remove_file(&sanitized_path) {
                    warn!("Failed to remove {:?}: {}", sanitized_path, e);
                }
                result.context("PDF generation failed")?;
            }
        }

        Ok(request.output.clone())
    }
}

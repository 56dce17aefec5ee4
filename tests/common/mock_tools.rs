/*!
 * In-process doubles for the external converter and renderer
 */

use anyhow::Result;
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};

use bilingual_book::errors::PipelineError;
use bilingual_book::external::{ConvertedDocument, DocumentConverter, DocumentRenderer, RenderRequest};
use bilingual_book::pipeline::DocumentPaths;

/// Converter that writes fixed Markdown to `<work_dir>/auto/<stem>.md`
#[derive(Debug)]
pub struct MockConverter {
    markdown: String,
    // @field: Input stems that fail to convert
    failing: Mutex<HashSet<String>>,
    calls: AtomicUsize,
}

impl MockConverter {
    pub fn new() -> Self {
        Self::with_markdown(super::SAMPLE_MARKDOWN)
    }

    pub fn with_markdown(markdown: &str) -> Self {
        Self {
            markdown: markdown.to_string(),
            failing: Mutex::new(HashSet::new()),
            calls: AtomicUsize::new(0),
        }
    }

    /// Make conversion of inputs with this stem fail
    pub fn fail_on(self, stem: &str) -> Self {
        self.failing.lock().insert(stem.to_string());
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DocumentConverter for MockConverter {
    async fn convert(&self, paths: &DocumentPaths) -> Result<ConvertedDocument> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.failing.lock().contains(&paths.stem) {
            return Err(PipelineError::ExternalTool {
                tool: "mock-converter".to_string(),
                message: format!("cannot convert {}", paths.stem),
            }
            .into());
        }

        let auto_dir = paths.work_dir.join("auto");
        std::fs::create_dir_all(&auto_dir)?;
        let text_file = auto_dir.join(format!("{}.md", paths.stem));
        std::fs::write(&text_file, &self.markdown)?;
        Ok(ConvertedDocument { text_file, cover_image: None })
    }
}

/// Renderer that copies the bilingual source to the requested output
#[derive(Debug)]
pub struct MockRenderer {
    requests: Mutex<Vec<RenderRequest>>,
}

impl MockRenderer {
    pub fn new() -> Self {
        Self { requests: Mutex::new(Vec::new()) }
    }

    pub fn requests(&self) -> Vec<RenderRequest> {
        self.requests.lock().clone()
    }
}

#[async_trait]
impl DocumentRenderer for MockRenderer {
    async fn render(&self, request: &RenderRequest) -> Result<PathBuf> {
        self.requests.lock().push(request.clone());
        std::fs::copy(&request.source, &request.output)?;
        Ok(request.output.clone())
    }
}

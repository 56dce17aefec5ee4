/*!
 * Common test utilities for the bilingual-book test suite
 */

use anyhow::Result;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

use bilingual_book::app_config::Config;
use bilingual_book::pipeline::{Orchestrator, PipelineSettings};
use bilingual_book::providers::mock::MockTransport;
use bilingual_book::translation::{Backoff, ClientOptions, PromptSettings, RetryPolicy, TranslationClient};

// Re-export the mock tools module
pub mod mock_tools;

use self::mock_tools::{MockConverter, MockRenderer};

/// Small document with every block kind
pub const SAMPLE_MARKDOWN: &str = "# Black Holes\n\nA black hole bends light.\nIts event horizon hides everything.\n\n```\nprint(1)\n```\n\n$$\nE = mc^2\n$$\n\n![disk](images/disk.png)\n\nRed Shift grows with distance.\n";

/// Glossary matching `SAMPLE_MARKDOWN`
pub const SAMPLE_GLOSSARY: &str = "Black Hole\t黑洞\nEvent Horizon\t事件视界\nRed Shift\t红移\n";

/// Creates a temporary directory for test files
pub fn create_temp_dir() -> Result<TempDir> {
    Ok(TempDir::new()?)
}

/// Creates a test file with the given content in the specified directory
pub fn create_test_file(dir: &Path, filename: &str, content: &str) -> Result<PathBuf> {
    let file_path = dir.join(filename);
    if let Some(parent) = file_path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(&file_path, content)?;
    Ok(file_path)
}

/// Configuration that passes validation
pub fn test_config() -> Config {
    let mut config = Config::default();
    config.translation.api_key = "test-key".to_string();
    config.translation.base_url = "http://localhost:9/v1".to_string();
    config.translation.model = "test-model".to_string();
    config
}

/// Client options with a fixed gate size and 1 s backoff base
pub fn client_options(max_concurrency: usize, max_attempts: u32) -> ClientOptions {
    ClientOptions {
        max_concurrency,
        retry: RetryPolicy {
            max_attempts,
            rate_limit_backoff: Backoff::Exponential { base: Duration::from_secs(1) },
            transient_backoff: Backoff::Fixed(Duration::from_secs(1)),
        },
        prompt: PromptSettings {
            model: "test-model".to_string(),
            system_prompt: "Translate to Chinese.".to_string(),
            temperature: 0.1,
        },
    }
}

/// Translation client over a mock transport
pub fn mock_client(transport: Arc<MockTransport>, max_concurrency: usize) -> TranslationClient {
    TranslationClient::new(transport, client_options(max_concurrency, 3))
}

/// Doubles wired into an orchestrator, kept for assertions
pub struct TestPipeline {
    pub orchestrator: Orchestrator,
    pub transport: Arc<MockTransport>,
    pub converter: Arc<MockConverter>,
    pub renderer: Arc<MockRenderer>,
}

/// Orchestrator with a working mock transport, converter and renderer
pub fn test_pipeline(glossary_path: Option<PathBuf>) -> TestPipeline {
    test_pipeline_with(Arc::new(MockTransport::working()), Arc::new(MockConverter::new()), glossary_path)
}

pub fn test_pipeline_with(
    transport: Arc<MockTransport>,
    converter: Arc<MockConverter>,
    glossary_path: Option<PathBuf>,
) -> TestPipeline {
    let renderer = Arc::new(MockRenderer::new());
    let settings = PipelineSettings {
        glossary_path,
        max_glossary_terms: 50,
        state_file_name: "pipeline_state.json".to_string(),
        table_of_contents: true,
    };
    let orchestrator = Orchestrator::new(
        mock_client(transport.clone(), 4),
        converter.clone(),
        renderer.clone(),
        settings,
    );
    TestPipeline { orchestrator, transport, converter, renderer }
}

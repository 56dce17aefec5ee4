use anyhow::Result;
use async_trait::async_trait;
use log::info;
use std::ffi::OsString;
use std::fmt::Debug;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::app_config::ConverterConfig;
use crate::errors::PipelineError;
use crate::external::run_tool;
use crate::file_utils::FileManager;
use crate::pipeline::paths::{self, DocumentPaths};

/// Result of converting a page-image document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConvertedDocument {
    pub text_file: PathBuf,
    pub cover_image: Option<PathBuf>,
}

/// Turns a source document into a structured text file
#[async_trait]
pub trait DocumentConverter: Send + Sync + Debug {
    /// Convert `paths.input_file`; output is written under `paths.work_dir`
    async fn convert(&self, paths: &DocumentPaths) -> Result<ConvertedDocument>;
}

/// `magic-pdf` command-line converter
#[derive(Debug, Clone)]
pub struct MagicPdf {
    config: ConverterConfig,
}

impl MagicPdf {
    pub fn new(config: ConverterConfig) -> Self {
        Self { config }
    }

    // @returns: Arguments for `magic-pdf -p <input> -o <output root> -m <method>`
    pub fn arguments(&self, input: &Path, output_root: &Path) -> Vec<OsString> {
        vec![
            "-p".into(),
            input.as_os_str().to_os_string(),
            "-o".into(),
            output_root.as_os_str().to_os_string(),
            "-m".into(),
            self.config.method.clone().into(),
        ]
    }
}

#[async_trait]
impl DocumentConverter for MagicPdf {
    async fn convert(&self, paths: &DocumentPaths) -> Result<ConvertedDocument> {
        // magic-pdf creates `<root>/<stem>/<method>/<stem>.md` itself
        let output_root = paths.work_dir.parent().unwrap_or_else(|| Path::new("."));
        FileManager::ensure_dir(output_root)?;

        info!("Converting {:?} with {}", paths.input_file, self.config.program);
        run_tool(
            &self.config.program,
            &self.arguments(&paths.input_file, output_root),
            Duration::from_secs(self.config.timeout_secs),
        )
        .await?;

        let text_file = paths.find_text_file().ok_or_else(|| PipelineError::ExternalTool {
            tool: self.config.program.clone(),
            message: format!("no text output found in {:?}", paths.work_dir),
        })?;
        let cover_image = paths::find_cover(&text_file);

        Ok(ConvertedDocument { text_file, cover_image })
    }
}

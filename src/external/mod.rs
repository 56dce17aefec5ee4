/*!
 * External programs used at the edges of the pipeline.
 *
 * - `converter`: page-image document to structured text (`magic-pdf`)
 * - `renderer`: bilingual text to the final EPUB or PDF (`pandoc`)
 *
 * Both sit behind async traits so the pipeline can run with in-process doubles.
 */

use log::{debug, error};
use std::ffi::OsString;
use std::time::Duration;
use tokio::process::Command;

use crate::errors::PipelineError;

pub mod converter;
pub mod renderer;

pub use self::converter::{ConvertedDocument, DocumentConverter, MagicPdf};
pub use self::renderer::{DocumentRenderer, Pandoc, RenderRequest};

/// Run a program to completion, failing on non-zero exit or timeout
pub(crate) async fn run_tool(program: &str, args: &[OsString], timeout: Duration) -> Result<(), PipelineError> {
    let failure = |message: String| PipelineError::ExternalTool { tool: program.to_string(), message };

    debug!(
        "Running: {} {}",
        program,
        args.iter().map(|a| a.to_string_lossy()).collect::<Vec<_>>().join(" ")
    );

    let future = Command::new(program).args(args).kill_on_drop(true).output();

    let output = tokio::select! {
        result = future => {
            result.map_err(|e| failure(format!("failed to start: {}", e)))?
        },
        _ = tokio::time::sleep(timeout) => {
            return Err(failure(format!("timed out after {} seconds", timeout.as_secs())));
        }
    };

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        let stderr = stderr.trim();
        error!("{} exited with {}: {}", program, output.status, stderr);
        return Err(failure(format!("exited with {}: {}", output.status, stderr)));
    }

    Ok(())
}

/*!
 * Error types for the bilingual-book application.
 *
 * This module contains custom error types for different parts of the application,
 * using the thiserror crate for ergonomic error definitions.
 */

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur when talking to the chat-completion endpoint
#[derive(Error, Debug)]
pub enum ProviderError {
    /// Error when making an API request fails
    #[error("API request failed: {0}")]
    RequestFailed(String),

    /// Error when parsing an API response fails
    #[error("Failed to parse API response: {0}")]
    ParseError(String),

    /// Error returned by the API itself
    #[error("API responded with error: {status_code} - {message}")]
    ApiError {
        /// HTTP status code
        status_code: u16,
        /// Error message from the API
        message: String,
    },

    /// Error establishing or maintaining a connection
    #[error("Connection error: {0}")]
    ConnectionError(String),

    /// Error related to rate limiting
    #[error("Rate limit exceeded: {0}")]
    RateLimitExceeded(String),

    /// The request did not complete within the per-request timeout
    #[error("Request timed out after {0} seconds")]
    Timeout(u64),
}

/// Step-fatal errors raised by the document pipeline
#[derive(Error, Debug)]
pub enum PipelineError {
    /// The input document does not exist
    #[error("Input file not found: {0:?}")]
    InputNotFound(PathBuf),

    /// A step needs data that neither the state nor the filesystem can provide
    #[error("Step '{step}' is missing required input: {what}")]
    MissingInput {
        /// Step that needed the data
        step: String,
        /// Human readable description of the missing data
        what: String,
    },

    /// An external converter or renderer failed
    #[error("External tool '{tool}' failed: {message}")]
    ExternalTool {
        /// Program name
        tool: String,
        /// Failure description (exit status, stderr, timeout)
        message: String,
    },

    /// The state file exists but cannot be understood
    #[error("Malformed pipeline state in {path:?}: {message}")]
    MalformedState {
        /// Location of the state file
        path: PathBuf,
        /// Parse error
        message: String,
    },

    /// The state file was written by a newer version
    #[error("Unsupported pipeline state version {found} (supported up to {supported})")]
    UnsupportedStateVersion {
        /// Version found on disk
        found: u32,
        /// Highest version this build understands
        supported: u32,
    },

    /// An unknown preset name was requested
    #[error("Unknown pipeline preset: {0}")]
    UnknownPreset(String),

    /// A step range could not be parsed or is out of bounds
    #[error("Invalid step range '{0}': expected N or A-B with 0 <= A <= B <= 9")]
    InvalidStepRange(String),

    /// A step name could not be recognized
    #[error("Unknown pipeline step: {0}")]
    UnknownStep(String),
}

/// Configuration-fatal errors detected before any document is processed
#[derive(Error, Debug)]
pub enum ConfigError {
    /// A required setting is empty
    #[error("Missing required setting '{key}' (set it in the config file or via {env})")]
    MissingSetting {
        /// Config key
        key: &'static str,
        /// Environment variable that can provide it
        env: &'static str,
    },

    /// The endpoint URL is not a valid http(s) URL
    #[error("Invalid endpoint URL '{url}': {reason}")]
    InvalidUrl {
        /// The offending value
        url: String,
        /// Parse failure
        reason: String,
    },

    /// A numeric setting is out of range
    #[error("Invalid value for '{key}': {reason}")]
    InvalidValue {
        /// Config key
        key: &'static str,
        /// Why it was rejected
        reason: String,
    },
}

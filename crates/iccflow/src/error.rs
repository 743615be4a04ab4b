//! Closed error types for each subsystem boundary.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProfileError {
    #[error("I/O error loading profile: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse or create ICC profile: {0}")]
    Lcms(String),
    #[error("unsupported channel count: {0}")]
    UnsupportedChannelCount(u32),
}

/// Internal error type used while scanning a JPEG's APP markers. Never
/// escapes the extractor: any failure here degrades to `ExtractionResult::not_found()`.
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error("not a JPEG file (missing SOI marker)")]
    NotAJpeg,
    #[error("malformed marker segment")]
    Malformed,
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("unsupported channel count: {0}")]
    UnsupportedChannelCount(u32),
    #[error("codec error: {0}")]
    Codec(String),
    #[error(transparent)]
    Profile(#[from] ProfileError),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to commit output file: {0}")]
    Rename(std::io::Error),
}

#[derive(Debug, Error)]
pub enum CliError {
    #[error("rendering intent must be between 0 and 3, got {0}")]
    InvalidIntent(i64),
    #[error("JPEG quality must be between 0 and 100, got {0}")]
    InvalidQuality(i64),
}

/// Per-subsystem exit codes (see the CLI's exit-code contract).
pub const EXIT_OK: i32 = 0;
pub const EXIT_BAD_CONFIG: i32 = 1;
pub const EXIT_INPUT_INACCESSIBLE: i32 = 2;
pub const EXIT_PARTIAL_FAILURE: i32 = 3;
pub const EXIT_OUTPUT_UNCREATABLE: i32 = 4;

//! Central error types for the probe engine (thiserror-based).

use thiserror::Error;

/// Container/metadata parsing errors.
///
/// Only a handful of conditions are fatal for a whole parse: a signature
/// that matches no known container, a truncated or inconsistent top-level
/// structure, and a missing video stream in containers whose contract
/// requires one (AVI, TS). Everything else is handled by skipping the
/// affected element and leaving the corresponding result field absent.
#[derive(Error, Debug)]
pub enum ProbeError {
    #[error("Unsupported container format")]
    UnsupportedContainer,

    #[error("Truncated input in {context} at offset {offset}")]
    TruncatedInput { context: &'static str, offset: u64 },

    #[error("Invalid structure at offset {offset}: {reason}")]
    MalformedStructure { offset: u64, reason: String },

    #[error("No video track found")]
    NoVideoTrack,

    #[error("Read beyond buffer bounds: {requested} bytes at offset {offset}")]
    ReadBeyondBounds { offset: u64, requested: usize },
}

/// Convenience Result type for probe operations.
pub type ProbeResult<T> = Result<T, ProbeError>;

use std::io;
use thiserror::Error;

/// Error types for loading clip content, configuration and saved poses
///
/// The per-tick engine never produces these: unresolved names, missing
/// bridging transitions and rejected requests are reported as `None` or
/// `false` by the call that hit them.
#[derive(Error, Debug)]
pub enum AnimError {
    /// I/O error during reading or writing
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Malformed JSON document
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Malformed YAML document
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml_ng::Error),

    /// Structurally invalid manifest (duplicate names, missing skeleton, ...)
    #[error("Manifest error: {0}")]
    Manifest(String),

    /// A clip samples a bone that its skeleton does not have
    #[error("Clip '{clip}' references unknown bone '{bone}'")]
    UnknownBone { clip: String, bone: String },

    /// Sample buffer length does not match frames × bones
    #[error("Clip '{clip}' has {actual} samples, expected {expected}")]
    SampleMismatch {
        clip: String,
        expected: usize,
        actual: usize,
    },

    /// Saved pose data could not be decoded
    #[error("Corrupt pose data: {0}")]
    Corrupt(String),

    /// File extension that maps to no known document format
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),
}

/// Result type using AnimError
pub type Result<T> = std::result::Result<T, AnimError>;

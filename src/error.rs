use thiserror::Error;

/// Errors that abort an engine operation as a whole.
///
/// Problems with individual files never surface here: they are reported as
/// [`crate::diagnostics::Diagnostic`]s and the run continues.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("analysis cancelled")]
    Cancelled,

    #[error("extension override `.{extension}` names unknown language `{language}`")]
    UnsupportedLanguage { extension: String, language: String },

    #[error("cache format version {found} does not match expected {expected}")]
    CacheVersion { found: u32, expected: u32 },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("failed to encode cache: {0}")]
    Encode(#[from] bincode::error::EncodeError),

    #[error("failed to decode cache: {0}")]
    Decode(#[from] bincode::error::DecodeError),
}

impl From<tempfile::PersistError> for EngineError {
    fn from(err: tempfile::PersistError) -> Self {
        EngineError::Io(err.error)
    }
}

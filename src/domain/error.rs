use thiserror::Error;

/// Domain-level errors for the transcription core.
#[derive(Error, Debug)]
pub enum TranscriptionError {
    #[error("Unsupported language: {0}")]
    UnsupportedLanguage(String),

    #[error("Invalid audio input: {0}")]
    InvalidAudio(String),

    #[error("Speech recognition permission denied")]
    PermissionDenied,

    #[error("Model unavailable: {0}")]
    ModelUnavailable(String),

    #[error("Model download failed: {0}")]
    ModelDownloadFailed(String),

    #[error("Transcription failed: {0}")]
    TranscriptionFailed(String),

    #[error("Cancelled")]
    Cancelled,

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("IO error: {0}")]
    Io(String),
}

impl TranscriptionError {
    /// True for the clean-abort outcome. Callers discard partial state on
    /// cancellation instead of surfacing it as a failure.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, TranscriptionError::Cancelled)
    }
}

impl From<std::io::Error> for TranscriptionError {
    fn from(err: std::io::Error) -> Self {
        TranscriptionError::Io(err.to_string())
    }
}

impl From<toml::de::Error> for TranscriptionError {
    fn from(err: toml::de::Error) -> Self {
        TranscriptionError::Config(err.to_string())
    }
}

impl From<toml::ser::Error> for TranscriptionError {
    fn from(err: toml::ser::Error) -> Self {
        TranscriptionError::Serialization(err.to_string())
    }
}

impl From<serde_json::Error> for TranscriptionError {
    fn from(err: serde_json::Error) -> Self {
        TranscriptionError::Serialization(err.to_string())
    }
}

impl From<hound::Error> for TranscriptionError {
    fn from(err: hound::Error) -> Self {
        TranscriptionError::InvalidAudio(err.to_string())
    }
}

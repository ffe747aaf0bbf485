use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;

use crate::domain::TranscriptionError;
use crate::ports::engine::ProgressFn;

/// One decoded segment from the open-model transcriber.
#[derive(Debug, Clone)]
pub struct WhisperSegment {
    /// Segment text, possibly containing `<|...|>` token markup.
    pub text: String,
    /// Segment start in seconds.
    pub start_secs: f64,
}

/// Port for the open-model backend: fetches model assets and loads them into
/// reusable in-memory sessions.
#[async_trait]
pub trait WhisperRuntime: Send + Sync {
    /// Download-or-cache the model named by `model_ref`, returning its local
    /// path. A cached model returns promptly without touching the network.
    async fn fetch_model(
        &self,
        model_ref: &str,
        sha256: Option<&str>,
        progress: Option<ProgressFn>,
    ) -> Result<PathBuf, TranscriptionError>;

    /// Load a model from a local path into a session.
    ///
    /// `language` is a bare ISO 639-1 code; `None` selects auto-detection.
    async fn load_session(
        &self,
        model_path: &Path,
        language: Option<String>,
    ) -> Result<Arc<dyn WhisperSession>, TranscriptionError>;
}

/// One loaded model bound to an optional decode language.
#[async_trait]
pub trait WhisperSession: Send + Sync {
    /// Decode the whole file into per-segment text + start time.
    async fn transcribe(&self, audio: &Path) -> Result<Vec<WhisperSegment>, TranscriptionError>;

    /// Best-effort language identification; `None` when the model has no
    /// usable guess.
    async fn detect_language(&self, audio: &Path) -> Result<Option<String>, TranscriptionError>;
}

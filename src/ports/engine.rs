use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;

use crate::domain::{TranscriptionError, TranscriptionResult};

/// Fractional progress callback in `[0, 1]`.
///
/// Invoked zero or more times per preparation call; not required to be
/// monotonic, but the final invocation on success reports `1.0`.
pub type ProgressFn = Arc<dyn Fn(f64) + Send + Sync>;

/// Port for a transcription backend.
///
/// Implementations wrap the platform recognizer or the downloadable
/// open-model transcriber; callers see one contract either way.
#[async_trait]
pub trait TranscriptionEngine: Send + Sync {
    /// Best-effort guess of the spoken language.
    ///
    /// Returns a tag whenever the underlying recognizer produces any output,
    /// however low its confidence; fails only when the recognition
    /// infrastructure itself is unavailable.
    async fn detect_language(&self, audio: &Path) -> Result<String, TranscriptionError>;

    /// Full transcription in the given (already canonical) language.
    async fn transcribe(
        &self,
        audio: &Path,
        language: &str,
    ) -> Result<TranscriptionResult, TranscriptionError>;

    /// Runtime capability check: engines whose transcription requires
    /// materialized model assets return themselves here.
    fn as_model_preparing(&self) -> Option<&dyn ModelPreparingEngine> {
        None
    }
}

/// Optional capability: engines that must fetch model assets before first use.
#[async_trait]
pub trait ModelPreparingEngine: TranscriptionEngine {
    /// Resolve the model needed for `language` and ensure its assets are
    /// present locally. Safe to call when the model is already cached: the
    /// call returns promptly, reporting at most a single `1.0` progress.
    async fn prepare_model(
        &self,
        language: &str,
        progress: Option<ProgressFn>,
    ) -> Result<(), TranscriptionError>;
}

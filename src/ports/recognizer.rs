use std::path::Path;

use async_trait::async_trait;
use futures_util::stream::BoxStream;

use crate::domain::TranscriptionError;

/// One recognized chunk from a streaming recognition session.
#[derive(Debug, Clone)]
pub struct RecognizedSegment {
    /// Recognized text for this chunk.
    pub text: String,
    /// Segment start in seconds, when the recognizer attributes timing.
    pub start_secs: Option<f64>,
    /// Final segments are stable; volatile ones may still be revised.
    pub is_final: bool,
}

pub type RecognitionStream = BoxStream<'static, Result<RecognizedSegment, TranscriptionError>>;

/// Port for the platform's built-in speech recognizer.
///
/// The host application adapts its native speech facility to this trait;
/// audio container/codec support is the recognizer's concern.
#[async_trait]
pub trait NativeRecognizer: Send + Sync {
    /// Whether the user granted speech-recognition access. The core raises
    /// `PermissionDenied` before any engine call when this is false; it
    /// never prompts.
    async fn is_authorized(&self) -> bool;

    /// Locales the recognizer can serve at all. Identifiers may use
    /// underscores (`en_US`); callers normalize.
    async fn supported_locales(&self) -> Vec<String>;

    /// Locales whose language model is currently installed on-device.
    async fn installed_locales(&self) -> Vec<String>;

    /// Download and install the language model for a locale.
    async fn install_locale(&self, locale: &str) -> Result<(), TranscriptionError>;

    /// Open a streaming recognition session over an audio file.
    ///
    /// `limit_secs` lets the caller stop decoding after roughly that much
    /// audio (used by detection, which only samples the opening stretch).
    async fn recognize_file(
        &self,
        audio: &Path,
        locale: &str,
        limit_secs: Option<f64>,
    ) -> Result<RecognitionStream, TranscriptionError>;
}

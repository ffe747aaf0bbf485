use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::OnceCell;
use tracing::info;

use crate::adapters::audio;
use crate::adapters::model_manager::ModelManager;
use crate::domain::language::{self, canonicalize, DEFAULT_LANGUAGE};
use crate::domain::transcription::{format_timestamp, EngineKind};
use crate::domain::{TranscriptionError, TranscriptionResult};
use crate::ports::engine::{ModelPreparingEngine, ProgressFn, TranscriptionEngine};
use crate::ports::whisper::{WhisperRuntime, WhisperSession};

/// Open-model transcription engine.
///
/// Sessions are cached per (model path, language) so repeated calls for one
/// language do not reload the model. Concurrent requesters for one key wait
/// for the first in-flight load and share its session.
pub struct WhisperEngine {
    models: Arc<ModelManager>,
    runtime: Arc<dyn WhisperRuntime>,
    sessions: Mutex<HashMap<String, Arc<OnceCell<Arc<dyn WhisperSession>>>>>,
}

impl WhisperEngine {
    pub fn new(runtime: Arc<dyn WhisperRuntime>, models: Arc<ModelManager>) -> Self {
        Self {
            models,
            runtime,
            sessions: Mutex::new(HashMap::new()),
        }
    }

    async fn session(
        &self,
        model_path: &Path,
        language: Option<String>,
    ) -> Result<Arc<dyn WhisperSession>, TranscriptionError> {
        let key = format!(
            "{}|{}",
            model_path.display(),
            language.as_deref().unwrap_or("auto")
        );

        let cell = self
            .sessions
            .lock()
            .entry(key)
            .or_insert_with(|| Arc::new(OnceCell::new()))
            .clone();

        let session = cell
            .get_or_try_init(|| self.runtime.load_session(model_path, language))
            .await?;
        Ok(session.clone())
    }

    /// Strip `<|...|>` backend token markup; unterminated markers are kept
    /// verbatim.
    fn strip_special_tokens(text: &str) -> String {
        let mut out = String::with_capacity(text.len());
        let mut rest = text;
        while let Some(open) = rest.find("<|") {
            out.push_str(&rest[..open]);
            let tail = &rest[open + 2..];
            match tail.find("|>") {
                Some(close) => rest = &tail[close + 2..],
                None => {
                    out.push_str(&rest[open..]);
                    rest = "";
                    break;
                }
            }
        }
        out.push_str(rest);
        out.trim().to_string()
    }
}

#[async_trait]
impl TranscriptionEngine for WhisperEngine {
    async fn detect_language(&self, audio: &Path) -> Result<String, TranscriptionError> {
        // Bootstrap with the default language's model; decoding itself runs
        // unconstrained (auto-detect).
        let model_identifier = self.models.model_identifier(DEFAULT_LANGUAGE);
        let model_path = self
            .models
            .ensure_model_available(&model_identifier, None)
            .await?;
        let session = self.session(&model_path, None).await?;

        let detected = session.detect_language(audio).await?;
        Ok(detected.unwrap_or_else(|| DEFAULT_LANGUAGE.to_string()))
    }

    async fn transcribe(
        &self,
        audio: &Path,
        language: &str,
    ) -> Result<TranscriptionResult, TranscriptionError> {
        let normalized = canonicalize(language);
        let model_identifier = self.models.model_identifier(&normalized);
        let model_path = self
            .models
            .ensure_model_available(&model_identifier, None)
            .await?;

        // The model expects bare ISO 639-1 codes, not region-qualified tags.
        let base = language::base_language(&normalized).to_string();
        let session = self.session(&model_path, Some(base)).await?;

        let segments = session.transcribe(audio).await?;
        let mut lines = Vec::with_capacity(segments.len());
        for segment in segments {
            let text = Self::strip_special_tokens(&segment.text);
            if text.is_empty() {
                continue;
            }
            lines.push(format!("[{}] {}", format_timestamp(segment.start_secs), text));
        }

        let duration = audio::file_duration_secs(audio).unwrap_or(0.0);

        info!(
            language = %normalized,
            model = %model_identifier,
            lines = lines.len(),
            "whisper transcription complete"
        );

        Ok(TranscriptionResult {
            text: lines.join("\n"),
            language: normalized,
            duration_secs: duration,
            engine: EngineKind::Whisper,
        })
    }

    fn as_model_preparing(&self) -> Option<&dyn ModelPreparingEngine> {
        Some(self)
    }
}

#[async_trait]
impl ModelPreparingEngine for WhisperEngine {
    async fn prepare_model(
        &self,
        language: &str,
        progress: Option<ProgressFn>,
    ) -> Result<(), TranscriptionError> {
        let normalized = canonicalize(language);
        let model_identifier = self.models.model_identifier(&normalized);
        self.models
            .ensure_model_available(&model_identifier, progress)
            .await?;
        Ok(())
    }
}

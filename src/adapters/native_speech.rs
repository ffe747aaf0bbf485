use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use futures_util::StreamExt;
use tokio::sync::OnceCell;
use tracing::{debug, info};

use crate::adapters::audio;
use crate::domain::language::canonicalize;
use crate::domain::transcription::{format_timestamp, EngineKind};
use crate::domain::{TranscriptionError, TranscriptionResult};
use crate::ports::engine::TranscriptionEngine;
use crate::ports::recognizer::NativeRecognizer;

/// Languages assumed available until locale discovery has run.
const FALLBACK_LANGUAGES: [&str; 10] = [
    "en-US", "es-ES", "en-GB", "fr-FR", "de-DE", "it-IT", "pt-BR", "ja-JP", "ko-KR", "zh-CN",
];

/// Candidates scored during language detection.
const DETECTION_CANDIDATES: [&str; 2] = ["en-US", "es-ES"];

/// Detection only inspects the opening stretch of audio.
const DETECTION_WINDOW_SECS: f64 = 10.0;

/// Process-lifetime cache of the recognizer's supported locales.
///
/// `snapshot` answers synchronously from the cache, or from a hardcoded
/// fallback list before discovery has run; `fetch` populates the cache once
/// from the recognizer. Racing first readers all compute the same set, so
/// last-write-wins population is fine.
pub struct SupportedLanguages {
    recognizer: Arc<dyn NativeRecognizer>,
    cached: OnceCell<HashSet<String>>,
}

impl SupportedLanguages {
    pub fn new(recognizer: Arc<dyn NativeRecognizer>) -> Self {
        Self {
            recognizer,
            cached: OnceCell::new(),
        }
    }

    /// Best-effort synchronous view.
    pub fn snapshot(&self) -> HashSet<String> {
        self.cached.get().cloned().unwrap_or_else(|| {
            FALLBACK_LANGUAGES
                .iter()
                .map(|s| (*s).to_string())
                .collect()
        })
    }

    /// Synchronous membership test over the best-effort view.
    pub fn contains(&self, language: &str) -> bool {
        self.snapshot().contains(language)
    }

    /// Authoritative view, populating the cache on first use.
    pub async fn fetch(&self) -> &HashSet<String> {
        self.cached
            .get_or_init(|| async {
                let locales = self.recognizer.supported_locales().await;
                // Locale identifiers may use underscores (en_US); store the
                // hyphenated form.
                let set: HashSet<String> =
                    locales.iter().map(|l| l.replace('_', "-")).collect();
                info!(count = set.len(), "native recognizer locales discovered");
                set
            })
            .await
    }
}

/// Transcription engine backed by the platform's built-in recognizer.
///
/// Languages are either immediately usable or rejected; there is no model
/// preparation capability.
pub struct NativeSpeechEngine {
    recognizer: Arc<dyn NativeRecognizer>,
    supported: Arc<SupportedLanguages>,
}

impl NativeSpeechEngine {
    pub fn new(recognizer: Arc<dyn NativeRecognizer>) -> Self {
        let supported = Arc::new(SupportedLanguages::new(recognizer.clone()));
        Self {
            recognizer,
            supported,
        }
    }

    /// Shared handle to the supported-language cache, used by the hybrid
    /// selector's synchronous routing rule.
    pub fn supported_languages(&self) -> Arc<SupportedLanguages> {
        self.supported.clone()
    }

    async fn is_installed(&self, locale: &str) -> bool {
        self.recognizer
            .installed_locales()
            .await
            .iter()
            .any(|l| l.replace('_', "-") == locale)
    }

    /// Word count of the final segments recognized in `locale` over the
    /// detection window. Locales without an installed model score 0 —
    /// detection never triggers a download.
    async fn score_locale(
        &self,
        audio: &Path,
        locale: &str,
    ) -> Result<usize, TranscriptionError> {
        if !self.is_installed(locale).await {
            debug!(locale = locale, "locale model not installed, skipping candidate");
            return Ok(0);
        }

        let mut stream = self
            .recognizer
            .recognize_file(audio, locale, Some(DETECTION_WINDOW_SECS))
            .await?;

        let mut words = 0usize;
        while let Some(segment) = stream.next().await {
            let segment = segment?;
            if segment.is_final {
                words += segment.text.split_whitespace().count();
            }
        }
        Ok(words)
    }
}

#[async_trait]
impl TranscriptionEngine for NativeSpeechEngine {
    async fn detect_language(&self, audio: &Path) -> Result<String, TranscriptionError> {
        let mut best_language = DETECTION_CANDIDATES[0];
        let mut best_score = 0usize;

        for candidate in DETECTION_CANDIDATES {
            let score = self.score_locale(audio, candidate).await?;
            debug!(locale = candidate, score = score, "detection candidate scored");
            if score > best_score {
                best_score = score;
                best_language = candidate;
            }
        }

        Ok(best_language.to_string())
    }

    async fn transcribe(
        &self,
        audio: &Path,
        language: &str,
    ) -> Result<TranscriptionResult, TranscriptionError> {
        let normalized = canonicalize(language);

        let supported = self.supported.fetch().await;
        if !supported.contains(&normalized) {
            return Err(TranscriptionError::UnsupportedLanguage(normalized));
        }

        // Supported locales whose model is missing are installed on demand;
        // only detection must avoid implicit downloads.
        if !self.is_installed(&normalized).await {
            info!(locale = %normalized, "installing locale model before transcription");
            self.recognizer.install_locale(&normalized).await?;
        }

        let mut stream = self
            .recognizer
            .recognize_file(audio, &normalized, None)
            .await?;

        let mut lines: Vec<String> = Vec::new();
        while let Some(segment) = stream.next().await {
            let segment = segment?;
            if !segment.is_final {
                continue;
            }
            let text = segment.text.trim();
            if text.is_empty() {
                continue;
            }
            match segment.start_secs {
                Some(start) => lines.push(format!("[{}] {}", format_timestamp(start), text)),
                None => lines.push(text.to_string()),
            }
        }

        let duration = audio::file_duration_secs(audio).unwrap_or(0.0);

        info!(
            language = %normalized,
            lines = lines.len(),
            duration_secs = duration,
            "native transcription complete"
        );

        Ok(TranscriptionResult {
            text: lines.join("\n"),
            language: normalized,
            duration_secs: duration,
            engine: EngineKind::Native,
        })
    }
}

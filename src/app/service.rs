use std::path::Path;
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::adapters::model_manager::ModelManager;
use crate::adapters::native_speech::{NativeSpeechEngine, SupportedLanguages};
use crate::adapters::whisper_engine::WhisperEngine;
use crate::domain::language::{canonicalize, is_basque, DEFAULT_LANGUAGE};
use crate::domain::transcription::{EngineKind, EnginePreference};
use crate::domain::{ModelCatalog, TranscriptionError, TranscriptionResult};
use crate::ports::engine::{ProgressFn, TranscriptionEngine};
use crate::ports::recognizer::NativeRecognizer;
use crate::ports::whisper::WhisperRuntime;

/// Policy layer routing work between the native and whisper engines.
///
/// Stateless per call: every method canonicalizes its language argument
/// independently. A language routes to the whisper engine iff it is Basque
/// (tag prefix, case-insensitive) or absent from the native engine's
/// supported set; forced preferences bypass the rule.
pub struct HybridTranscriptionService {
    native: Arc<dyn TranscriptionEngine>,
    whisper: Arc<dyn TranscriptionEngine>,
    supported: Arc<SupportedLanguages>,
}

impl HybridTranscriptionService {
    pub fn new(
        native: Arc<dyn TranscriptionEngine>,
        whisper: Arc<dyn TranscriptionEngine>,
        supported: Arc<SupportedLanguages>,
    ) -> Self {
        Self {
            native,
            whisper,
            supported,
        }
    }

    /// Assemble the default engine pair over the given capability providers.
    pub fn with_providers(
        recognizer: Arc<dyn NativeRecognizer>,
        runtime: Arc<dyn WhisperRuntime>,
    ) -> Self {
        Self::with_catalog(recognizer, runtime, ModelCatalog::builtin())
    }

    /// Like `with_providers`, with a caller-supplied model catalog.
    pub fn with_catalog(
        recognizer: Arc<dyn NativeRecognizer>,
        runtime: Arc<dyn WhisperRuntime>,
        catalog: ModelCatalog,
    ) -> Self {
        let native = NativeSpeechEngine::new(recognizer);
        let supported = native.supported_languages();
        let models = Arc::new(ModelManager::new(runtime.clone(), catalog));
        let whisper = WhisperEngine::new(runtime, models);
        Self::new(Arc::new(native), Arc::new(whisper), supported)
    }

    /// Advisory language detection: tries the preferred engine, then the
    /// other, then falls back to the default language. Never fails — a
    /// detection problem must not abort the surrounding workflow.
    pub async fn detect_language(&self, audio: &Path, prefer_native: bool) -> String {
        let order = if prefer_native {
            [
                (self.native.clone(), EngineKind::Native),
                (self.whisper.clone(), EngineKind::Whisper),
            ]
        } else {
            [
                (self.whisper.clone(), EngineKind::Whisper),
                (self.native.clone(), EngineKind::Native),
            ]
        };

        for (engine, kind) in order {
            match engine.detect_language(audio).await {
                Ok(language) => {
                    let normalized = canonicalize(&language);
                    debug!(engine = %kind, language = %normalized, "language detected");
                    return normalized;
                }
                Err(e) => {
                    warn!(engine = %kind, error = %e, "language detection attempt failed");
                }
            }
        }

        debug!(
            fallback = DEFAULT_LANGUAGE,
            "both detection attempts failed, using fallback"
        );
        DEFAULT_LANGUAGE.to_string()
    }

    /// Ensure model assets exist for the language — a no-op unless the
    /// effective engine selection is the whisper engine.
    pub async fn prepare_model_if_needed(
        &self,
        language: &str,
        engine: EnginePreference,
        progress: Option<ProgressFn>,
    ) -> Result<(), TranscriptionError> {
        let normalized = canonicalize(language);
        let wanted = engine == EnginePreference::Whisper
            || (engine == EnginePreference::Auto && self.should_use_whisper(&normalized));
        if !wanted {
            return Ok(());
        }

        if let Some(preparer) = self.whisper.as_model_preparing() {
            preparer.prepare_model(&normalized, progress).await?;
        }
        Ok(())
    }

    /// Which engine a future `transcribe` call for `language` would use.
    /// Pure query over the supported-set snapshot; callers use it to label
    /// pending work or decide whether to show a download indicator.
    pub fn engine_kind(&self, language: &str, engine: EnginePreference) -> EngineKind {
        match engine {
            EnginePreference::Native => EngineKind::Native,
            EnginePreference::Whisper => EngineKind::Whisper,
            EnginePreference::Auto => {
                if self.should_use_whisper(&canonicalize(language)) {
                    EngineKind::Whisper
                } else {
                    EngineKind::Native
                }
            }
        }
    }

    /// Transcribe with the engine selected by the routing rule (or forced by
    /// the preference).
    pub async fn transcribe(
        &self,
        audio: &Path,
        language: &str,
        engine: EnginePreference,
    ) -> Result<TranscriptionResult, TranscriptionError> {
        let normalized = canonicalize(language);

        match engine {
            EnginePreference::Native => self.native.transcribe(audio, &normalized).await,
            EnginePreference::Whisper => self.whisper.transcribe(audio, &normalized).await,
            EnginePreference::Auto => {
                if self.should_use_whisper(&normalized) {
                    return self.whisper.transcribe(audio, &normalized).await;
                }
                match self.native.transcribe(audio, &normalized).await {
                    // The supported-set snapshot can lag the live capability
                    // list; a rejection reroutes instead of failing.
                    Err(TranscriptionError::UnsupportedLanguage(lang)) => {
                        info!(
                            language = %lang,
                            "native engine rejected language, retrying on whisper"
                        );
                        self.whisper.transcribe(audio, &normalized).await
                    }
                    result => result,
                }
            }
        }
    }

    fn should_use_whisper(&self, language: &str) -> bool {
        is_basque(language) || !self.supported.contains(language)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use parking_lot::Mutex;

    use crate::ports::engine::ModelPreparingEngine;

    /// Engine double with scripted behavior.
    struct FakeEngine {
        kind: EngineKind,
        detect: Result<&'static str, &'static str>,
        reject_transcribe: bool,
        transcribes: AtomicUsize,
        prepared: Mutex<Vec<String>>,
    }

    impl FakeEngine {
        fn new(kind: EngineKind) -> Arc<Self> {
            Arc::new(Self {
                kind,
                detect: Ok("en-US"),
                reject_transcribe: false,
                transcribes: AtomicUsize::new(0),
                prepared: Mutex::new(Vec::new()),
            })
        }

        fn detecting(kind: EngineKind, detect: Result<&'static str, &'static str>) -> Arc<Self> {
            Arc::new(Self {
                kind,
                detect,
                reject_transcribe: false,
                transcribes: AtomicUsize::new(0),
                prepared: Mutex::new(Vec::new()),
            })
        }

        fn rejecting(kind: EngineKind) -> Arc<Self> {
            Arc::new(Self {
                kind,
                detect: Ok("en-US"),
                reject_transcribe: true,
                transcribes: AtomicUsize::new(0),
                prepared: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl TranscriptionEngine for FakeEngine {
        async fn detect_language(&self, _audio: &Path) -> Result<String, TranscriptionError> {
            self.detect
                .map(str::to_string)
                .map_err(|e| TranscriptionError::TranscriptionFailed(e.to_string()))
        }

        async fn transcribe(
            &self,
            _audio: &Path,
            language: &str,
        ) -> Result<TranscriptionResult, TranscriptionError> {
            self.transcribes.fetch_add(1, Ordering::SeqCst);
            if self.reject_transcribe {
                return Err(TranscriptionError::UnsupportedLanguage(language.to_string()));
            }
            Ok(TranscriptionResult {
                text: format!("text from {}", self.kind),
                language: language.to_string(),
                duration_secs: 1.0,
                engine: self.kind,
            })
        }

        fn as_model_preparing(&self) -> Option<&dyn ModelPreparingEngine> {
            match self.kind {
                EngineKind::Whisper => Some(self),
                EngineKind::Native => None,
            }
        }
    }

    #[async_trait]
    impl ModelPreparingEngine for FakeEngine {
        async fn prepare_model(
            &self,
            language: &str,
            progress: Option<ProgressFn>,
        ) -> Result<(), TranscriptionError> {
            self.prepared.lock().push(language.to_string());
            if let Some(progress) = progress {
                progress(1.0);
            }
            Ok(())
        }
    }

    /// Recognizer double for the supported-language holder only.
    struct StaticRecognizer {
        supported: Vec<String>,
    }

    #[async_trait]
    impl NativeRecognizer for StaticRecognizer {
        async fn is_authorized(&self) -> bool {
            true
        }

        async fn supported_locales(&self) -> Vec<String> {
            self.supported.clone()
        }

        async fn installed_locales(&self) -> Vec<String> {
            Vec::new()
        }

        async fn install_locale(&self, _locale: &str) -> Result<(), TranscriptionError> {
            Ok(())
        }

        async fn recognize_file(
            &self,
            _audio: &Path,
            _locale: &str,
            _limit_secs: Option<f64>,
        ) -> Result<crate::ports::recognizer::RecognitionStream, TranscriptionError> {
            Err(TranscriptionError::TranscriptionFailed(
                "no recognition in this double".to_string(),
            ))
        }
    }

    fn supported_languages(locales: &[&str]) -> Arc<SupportedLanguages> {
        Arc::new(SupportedLanguages::new(Arc::new(StaticRecognizer {
            supported: locales.iter().map(|s| (*s).to_string()).collect(),
        })))
    }

    fn service(
        native: Arc<FakeEngine>,
        whisper: Arc<FakeEngine>,
    ) -> HybridTranscriptionService {
        HybridTranscriptionService::new(native, whisper, supported_languages(&[]))
    }

    #[test]
    fn test_routing_is_deterministic() {
        let svc = service(
            FakeEngine::new(EngineKind::Native),
            FakeEngine::new(EngineKind::Whisper),
        );

        for _ in 0..3 {
            // Basque always routes to whisper, any case, any region.
            assert_eq!(
                svc.engine_kind("eu", EnginePreference::Auto),
                EngineKind::Whisper
            );
            assert_eq!(
                svc.engine_kind("EU-FR", EnginePreference::Auto),
                EngineKind::Whisper
            );
            // Supported (fallback set) non-Basque routes to native.
            assert_eq!(
                svc.engine_kind("en-US", EnginePreference::Auto),
                EngineKind::Native
            );
            // Outside the supported set routes to whisper.
            assert_eq!(
                svc.engine_kind("sw-KE", EnginePreference::Auto),
                EngineKind::Whisper
            );
        }
    }

    #[test]
    fn test_forced_preference_overrides_routing() {
        let svc = service(
            FakeEngine::new(EngineKind::Native),
            FakeEngine::new(EngineKind::Whisper),
        );

        for lang in ["eu-ES", "en-US", "sw-KE"] {
            assert_eq!(
                svc.engine_kind(lang, EnginePreference::Native),
                EngineKind::Native
            );
            assert_eq!(
                svc.engine_kind(lang, EnginePreference::Whisper),
                EngineKind::Whisper
            );
        }
    }

    #[tokio::test]
    async fn test_routing_follows_discovered_supported_set() {
        let supported = supported_languages(&["en_US", "de_DE"]);
        supported.fetch().await;
        let svc = HybridTranscriptionService::new(
            FakeEngine::new(EngineKind::Native),
            FakeEngine::new(EngineKind::Whisper),
            supported,
        );

        assert_eq!(
            svc.engine_kind("de-DE", EnginePreference::Auto),
            EngineKind::Native
        );
        // fr-FR was in the fallback list but not in the discovered set.
        assert_eq!(
            svc.engine_kind("fr-FR", EnginePreference::Auto),
            EngineKind::Whisper
        );
    }

    #[tokio::test]
    async fn test_detection_never_fails() {
        // Both engines fail: the fixed default comes back instead of an error.
        let svc = service(
            FakeEngine::detecting(EngineKind::Native, Err("native down")),
            FakeEngine::detecting(EngineKind::Whisper, Err("whisper down")),
        );
        assert_eq!(
            svc.detect_language(Path::new("audio.wav"), true).await,
            DEFAULT_LANGUAGE
        );
    }

    #[tokio::test]
    async fn test_detection_prefers_requested_engine_then_other() {
        let svc = service(
            FakeEngine::detecting(EngineKind::Native, Err("native down")),
            FakeEngine::detecting(EngineKind::Whisper, Ok("eu")),
        );
        // Native preferred but failing: whisper's answer is canonicalized.
        assert_eq!(
            svc.detect_language(Path::new("audio.wav"), true).await,
            "eu-ES"
        );

        let svc = service(
            FakeEngine::detecting(EngineKind::Native, Ok("es")),
            FakeEngine::detecting(EngineKind::Whisper, Err("whisper down")),
        );
        assert_eq!(
            svc.detect_language(Path::new("audio.wav"), false).await,
            "es-ES"
        );
    }

    #[tokio::test]
    async fn test_transcribe_auto_routes_basque_to_whisper() {
        let native = FakeEngine::new(EngineKind::Native);
        let whisper = FakeEngine::new(EngineKind::Whisper);
        let svc = service(native.clone(), whisper.clone());

        let result = svc
            .transcribe(Path::new("audio.wav"), "eu", EnginePreference::Auto)
            .await
            .unwrap();

        assert_eq!(result.engine, EngineKind::Whisper);
        assert_eq!(result.language, "eu-ES");
        assert_eq!(native.transcribes.load(Ordering::SeqCst), 0);
        assert_eq!(whisper.transcribes.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_transcribe_auto_falls_back_when_native_rejects() {
        // en-US routes native by the snapshot, but the engine's own view is
        // staler still and rejects.
        let native = FakeEngine::rejecting(EngineKind::Native);
        let whisper = FakeEngine::new(EngineKind::Whisper);
        let svc = service(native.clone(), whisper.clone());

        let result = svc
            .transcribe(Path::new("audio.wav"), "en-US", EnginePreference::Auto)
            .await
            .unwrap();

        assert_eq!(result.engine, EngineKind::Whisper);
        assert_eq!(native.transcribes.load(Ordering::SeqCst), 1);
        assert_eq!(whisper.transcribes.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_transcribe_forced_native_does_not_fall_back() {
        let native = FakeEngine::rejecting(EngineKind::Native);
        let whisper = FakeEngine::new(EngineKind::Whisper);
        let svc = service(native, whisper.clone());

        let err = svc
            .transcribe(Path::new("audio.wav"), "eu-ES", EnginePreference::Native)
            .await
            .unwrap_err();
        assert!(matches!(err, TranscriptionError::UnsupportedLanguage(_)));
        assert_eq!(whisper.transcribes.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_prepare_skips_native_routes() {
        let native = FakeEngine::new(EngineKind::Native);
        let whisper = FakeEngine::new(EngineKind::Whisper);
        let svc = service(native, whisper.clone());

        svc.prepare_model_if_needed("en-US", EnginePreference::Auto, None)
            .await
            .unwrap();
        assert!(whisper.prepared.lock().is_empty());

        svc.prepare_model_if_needed("en-US", EnginePreference::Native, None)
            .await
            .unwrap();
        assert!(whisper.prepared.lock().is_empty());
    }

    #[tokio::test]
    async fn test_prepare_reaches_whisper_for_basque_and_forced() {
        let native = FakeEngine::new(EngineKind::Native);
        let whisper = FakeEngine::new(EngineKind::Whisper);
        let svc = service(native, whisper.clone());

        svc.prepare_model_if_needed("eu", EnginePreference::Auto, None)
            .await
            .unwrap();
        svc.prepare_model_if_needed("en-US", EnginePreference::Whisper, None)
            .await
            .unwrap();

        assert_eq!(
            *whisper.prepared.lock(),
            vec!["eu-ES".to_string(), "en-US".to_string()]
        );
    }
}

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::info;

use crate::app::service::HybridTranscriptionService;
use crate::domain::transcription::{EngineKind, EnginePreference};
use crate::domain::{TranscriptionError, TranscriptionResult};
use crate::ports::engine::ProgressFn;
use crate::ports::recognizer::NativeRecognizer;

/// Cooperative cancellation flag, consulted between workflow steps.
#[derive(Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    fn check(&self) -> Result<(), TranscriptionError> {
        if self.is_cancelled() {
            Err(TranscriptionError::Cancelled)
        } else {
            Ok(())
        }
    }
}

/// Workflow phases, reported to the caller as the chain advances (the host
/// app drives its progress UI from these).
#[derive(Debug, Clone, PartialEq)]
pub enum WorkflowPhase {
    DetectingLanguage,
    /// Model download progress fraction in `[0, 1]`.
    DownloadingModel(f64),
    Transcribing,
    Complete,
}

pub type PhaseFn = Arc<dyn Fn(WorkflowPhase) + Send + Sync>;

/// One transcription request.
pub struct TranscriptionRequest {
    pub audio: PathBuf,
    /// `None` auto-detects the spoken language.
    pub language: Option<String>,
    pub engine: EnginePreference,
}

impl TranscriptionRequest {
    pub fn new(audio: impl Into<PathBuf>) -> Self {
        Self {
            audio: audio.into(),
            language: None,
            engine: EnginePreference::Auto,
        }
    }

    pub fn language(mut self, language: impl Into<String>) -> Self {
        self.language = Some(language.into());
        self
    }

    pub fn engine(mut self, engine: EnginePreference) -> Self {
        self.engine = engine;
        self
    }
}

/// Caller-side chain around the hybrid service: permission check, optional
/// language detection, model preparation, transcription.
///
/// The cancellation token is consulted between steps; a trip reports the
/// distinct `Cancelled` outcome, which callers treat as a clean abort.
pub struct TranscriptionWorkflow {
    service: Arc<HybridTranscriptionService>,
    recognizer: Arc<dyn NativeRecognizer>,
}

impl TranscriptionWorkflow {
    pub fn new(
        service: Arc<HybridTranscriptionService>,
        recognizer: Arc<dyn NativeRecognizer>,
    ) -> Self {
        Self {
            service,
            recognizer,
        }
    }

    pub async fn run(
        &self,
        request: &TranscriptionRequest,
        cancel: &CancelToken,
        on_phase: Option<PhaseFn>,
    ) -> Result<TranscriptionResult, TranscriptionError> {
        cancel.check()?;

        if !self.recognizer.is_authorized().await {
            return Err(TranscriptionError::PermissionDenied);
        }

        let language = match &request.language {
            Some(language) => language.clone(),
            None => {
                report(&on_phase, WorkflowPhase::DetectingLanguage);
                self.service.detect_language(&request.audio, true).await
            }
        };
        info!(language = %language, "workflow language resolved");

        cancel.check()?;

        if self.service.engine_kind(&language, request.engine) == EngineKind::Whisper {
            let progress: Option<ProgressFn> = on_phase.clone().map(|phase| {
                Arc::new(move |fraction: f64| {
                    phase(WorkflowPhase::DownloadingModel(fraction));
                }) as ProgressFn
            });
            self.service
                .prepare_model_if_needed(&language, request.engine, progress)
                .await?;
        }

        cancel.check()?;

        report(&on_phase, WorkflowPhase::Transcribing);
        let result = self
            .service
            .transcribe(&request.audio, &language, request.engine)
            .await?;

        report(&on_phase, WorkflowPhase::Complete);
        Ok(result)
    }
}

fn report(on_phase: &Option<PhaseFn>, phase: WorkflowPhase) {
    if let Some(on_phase) = on_phase {
        on_phase(phase);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;
    use std::sync::atomic::AtomicUsize;

    use async_trait::async_trait;
    use parking_lot::Mutex;

    use crate::adapters::native_speech::SupportedLanguages;
    use crate::ports::engine::{ModelPreparingEngine, TranscriptionEngine};
    use crate::ports::recognizer::RecognitionStream;

    struct StubEngine {
        kind: EngineKind,
        transcribes: AtomicUsize,
    }

    impl StubEngine {
        fn new(kind: EngineKind) -> Arc<Self> {
            Arc::new(Self {
                kind,
                transcribes: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl TranscriptionEngine for StubEngine {
        async fn detect_language(&self, _audio: &Path) -> Result<String, TranscriptionError> {
            Ok("eu".to_string())
        }

        async fn transcribe(
            &self,
            _audio: &Path,
            language: &str,
        ) -> Result<TranscriptionResult, TranscriptionError> {
            self.transcribes.fetch_add(1, Ordering::SeqCst);
            Ok(TranscriptionResult {
                text: "kaixo".to_string(),
                language: language.to_string(),
                duration_secs: 2.0,
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
    impl ModelPreparingEngine for StubEngine {
        async fn prepare_model(
            &self,
            _language: &str,
            progress: Option<ProgressFn>,
        ) -> Result<(), TranscriptionError> {
            if let Some(progress) = progress {
                progress(0.5);
                progress(1.0);
            }
            Ok(())
        }
    }

    struct StubRecognizer {
        authorized: bool,
    }

    #[async_trait]
    impl NativeRecognizer for StubRecognizer {
        async fn is_authorized(&self) -> bool {
            self.authorized
        }

        async fn supported_locales(&self) -> Vec<String> {
            vec!["en-US".to_string()]
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
        ) -> Result<RecognitionStream, TranscriptionError> {
            Err(TranscriptionError::TranscriptionFailed(
                "no recognition in this stub".to_string(),
            ))
        }
    }

    fn workflow(authorized: bool) -> (TranscriptionWorkflow, Arc<StubEngine>) {
        let recognizer = Arc::new(StubRecognizer { authorized });
        let whisper = StubEngine::new(EngineKind::Whisper);
        let service = Arc::new(HybridTranscriptionService::new(
            StubEngine::new(EngineKind::Native),
            whisper.clone(),
            Arc::new(SupportedLanguages::new(recognizer.clone())),
        ));
        (TranscriptionWorkflow::new(service, recognizer), whisper)
    }

    #[tokio::test]
    async fn test_denied_permission_stops_before_any_engine_call() {
        let (workflow, whisper) = workflow(false);
        let request = TranscriptionRequest::new("audio.wav").language("eu-ES");

        let err = workflow
            .run(&request, &CancelToken::new(), None)
            .await
            .unwrap_err();
        assert!(matches!(err, TranscriptionError::PermissionDenied));
        assert_eq!(whisper.transcribes.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_cancelled_token_reports_clean_abort() {
        let (workflow, whisper) = workflow(true);
        let request = TranscriptionRequest::new("audio.wav").language("eu-ES");

        let cancel = CancelToken::new();
        cancel.cancel();

        let err = workflow.run(&request, &cancel, None).await.unwrap_err();
        assert!(err.is_cancelled());
        assert_eq!(whisper.transcribes.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_basque_request_runs_whisper_with_phases() {
        let (workflow, whisper) = workflow(true);
        let request = TranscriptionRequest::new("audio.wav").language("eu");

        let phases = Arc::new(Mutex::new(Vec::new()));
        let sink = phases.clone();
        let on_phase: PhaseFn = Arc::new(move |phase| sink.lock().push(phase));

        let result = workflow
            .run(&request, &CancelToken::new(), Some(on_phase))
            .await
            .unwrap();

        assert_eq!(result.engine, EngineKind::Whisper);
        assert_eq!(result.language, "eu-ES");
        assert_eq!(whisper.transcribes.load(Ordering::SeqCst), 1);

        let phases = phases.lock();
        // Explicit language: no detection phase, but download + transcribe.
        assert!(!phases.contains(&WorkflowPhase::DetectingLanguage));
        assert!(phases.contains(&WorkflowPhase::DownloadingModel(1.0)));
        assert!(phases.contains(&WorkflowPhase::Transcribing));
        assert_eq!(phases.last(), Some(&WorkflowPhase::Complete));
    }

    #[tokio::test]
    async fn test_auto_detection_resolves_language_first() {
        let (workflow, _whisper) = workflow(true);
        let request = TranscriptionRequest::new("audio.wav");

        let phases = Arc::new(Mutex::new(Vec::new()));
        let sink = phases.clone();
        let on_phase: PhaseFn = Arc::new(move |phase| sink.lock().push(phase));

        let result = workflow
            .run(&request, &CancelToken::new(), Some(on_phase))
            .await
            .unwrap();

        // The stub native engine detects "eu", canonicalized along the way.
        assert_eq!(result.language, "eu-ES");
        assert_eq!(
            phases.lock().first(),
            Some(&WorkflowPhase::DetectingLanguage)
        );
    }
}

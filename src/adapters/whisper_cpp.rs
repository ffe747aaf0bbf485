use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use futures_util::StreamExt;
use sha2::{Digest, Sha256};
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};
use url::Url;
use whisper_rs::{FullParams, SamplingStrategy, WhisperContext, WhisperContextParameters};

use crate::adapters::audio::{self, WHISPER_SAMPLE_RATE};
use crate::domain::TranscriptionError;
use crate::ports::engine::ProgressFn;
use crate::ports::whisper::{WhisperRuntime, WhisperSegment, WhisperSession};

/// Default source for ggml model files.
pub const DEFAULT_MODEL_BASE_URL: &str =
    "https://huggingface.co/ggerganov/whisper.cpp/resolve/main";

/// Language identification only needs the opening stretch of audio.
const DETECTION_WINDOW_SECS: usize = 10;

/// `WhisperRuntime` backed by whisper.cpp via whisper-rs.
///
/// Model files are fetched from the whisper.cpp Hugging Face repository into
/// `models_dir`; inference runs on blocking threads.
pub struct WhisperCppRuntime {
    client: reqwest::Client,
    models_dir: PathBuf,
    base_url: String,
    threads: u32,
}

impl WhisperCppRuntime {
    pub fn new(models_dir: PathBuf) -> Result<Self, TranscriptionError> {
        Self::with_base_url(models_dir, DEFAULT_MODEL_BASE_URL)
    }

    pub fn with_base_url(models_dir: PathBuf, base_url: &str) -> Result<Self, TranscriptionError> {
        fs::create_dir_all(&models_dir)?;

        let client = reqwest::Client::builder()
            .use_rustls_tls()
            .user_agent(format!("transcriber-core/{}", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| {
                TranscriptionError::Config(format!("failed to create HTTP client: {e}"))
            })?;

        let threads = std::thread::available_parallelism()
            .map(|p| std::cmp::max(1, p.get() as u32 - 1))
            .unwrap_or(1);

        info!(models_dir = ?models_dir, threads = threads, "whisper.cpp runtime created");

        Ok(Self {
            client,
            models_dir,
            base_url: base_url.trim_end_matches('/').to_string(),
            threads,
        })
    }

    fn model_filename(model_ref: &str) -> String {
        format!("ggml-{model_ref}.bin")
    }

    fn model_url(&self, model_ref: &str) -> Result<Url, TranscriptionError> {
        Url::parse(&format!(
            "{}/{}",
            self.base_url,
            Self::model_filename(model_ref)
        ))
        .map_err(|e| TranscriptionError::ModelDownloadFailed(e.to_string()))
    }

    async fn download(
        &self,
        url: &Url,
        target: &Path,
        progress: Option<&ProgressFn>,
    ) -> Result<(), TranscriptionError> {
        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| TranscriptionError::ModelDownloadFailed(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(TranscriptionError::ModelDownloadFailed(format!(
                "HTTP {status} for {url}"
            )));
        }

        let total = response.content_length().unwrap_or(0);

        // Stream into a temp file so a partial fetch never looks like a model.
        let temp_path = target.with_extension("part");
        let mut file = tokio::fs::File::create(&temp_path)
            .await
            .map_err(|e| TranscriptionError::ModelDownloadFailed(e.to_string()))?;

        let mut downloaded: u64 = 0;
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| TranscriptionError::ModelDownloadFailed(e.to_string()))?;
            file.write_all(&chunk)
                .await
                .map_err(|e| TranscriptionError::ModelDownloadFailed(e.to_string()))?;
            downloaded += chunk.len() as u64;
            if total > 0 {
                if let Some(progress) = progress {
                    progress(downloaded as f64 / total as f64);
                }
            }
        }

        file.flush()
            .await
            .map_err(|e| TranscriptionError::ModelDownloadFailed(e.to_string()))?;
        drop(file);

        tokio::fs::rename(&temp_path, target)
            .await
            .map_err(|e| TranscriptionError::ModelDownloadFailed(e.to_string()))?;

        info!(url = %url, size = downloaded, target = ?target, "model downloaded");
        Ok(())
    }

    fn verify_sha256(path: &Path, expected: &str) -> Result<(), TranscriptionError> {
        let mut file = fs::File::open(path)
            .map_err(|e| TranscriptionError::ModelDownloadFailed(e.to_string()))?;
        let mut hasher = Sha256::new();
        let mut buffer = [0u8; 8192];
        loop {
            let read = file
                .read(&mut buffer)
                .map_err(|e| TranscriptionError::ModelDownloadFailed(e.to_string()))?;
            if read == 0 {
                break;
            }
            hasher.update(&buffer[..read]);
        }

        let actual = format!("{:x}", hasher.finalize());
        if actual != expected.to_lowercase() {
            // A corrupt download must not be mistaken for a cached model.
            let _ = fs::remove_file(path);
            return Err(TranscriptionError::ModelDownloadFailed(format!(
                "checksum mismatch: expected {expected}, got {actual}"
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl WhisperRuntime for WhisperCppRuntime {
    async fn fetch_model(
        &self,
        model_ref: &str,
        sha256: Option<&str>,
        progress: Option<ProgressFn>,
    ) -> Result<PathBuf, TranscriptionError> {
        let target = self.models_dir.join(Self::model_filename(model_ref));

        if target.exists() {
            debug!(path = ?target, "model already cached, skipping download");
            return Ok(target);
        }

        let url = self.model_url(model_ref)?;
        info!(url = %url, target = ?target, "model not cached, downloading");
        self.download(&url, &target, progress.as_ref()).await?;

        if let Some(expected) = sha256 {
            let path = target.clone();
            let expected = expected.to_string();
            tokio::task::spawn_blocking(move || Self::verify_sha256(&path, &expected))
                .await
                .map_err(|e| {
                    TranscriptionError::ModelDownloadFailed(format!("task join error: {e}"))
                })??;
        }

        Ok(target)
    }

    async fn load_session(
        &self,
        model_path: &Path,
        language: Option<String>,
    ) -> Result<Arc<dyn WhisperSession>, TranscriptionError> {
        if !model_path.exists() {
            return Err(TranscriptionError::ModelUnavailable(
                model_path.to_string_lossy().to_string(),
            ));
        }

        let path_str = model_path.to_string_lossy().to_string();
        info!(path = %path_str, language = ?language, "loading whisper model");

        let context = tokio::task::spawn_blocking(move || {
            WhisperContext::new_with_params(&path_str, WhisperContextParameters::default())
                .map_err(|e| {
                    TranscriptionError::TranscriptionFailed(format!("failed to load model: {e}"))
                })
        })
        .await
        .map_err(|e| TranscriptionError::TranscriptionFailed(format!("task join error: {e}")))??;

        Ok(Arc::new(WhisperCppSession {
            context: Arc::new(context),
            language,
            threads: self.threads,
        }))
    }
}

/// One loaded whisper.cpp model bound to an optional decode language.
struct WhisperCppSession {
    context: Arc<WhisperContext>,
    /// Bare ISO 639-1 code; `None` decodes with language auto-detection.
    language: Option<String>,
    threads: u32,
}

#[async_trait]
impl WhisperSession for WhisperCppSession {
    async fn transcribe(&self, audio: &Path) -> Result<Vec<WhisperSegment>, TranscriptionError> {
        let samples = audio::read_mono_f32(audio)?;
        if samples.is_empty() {
            return Ok(Vec::new());
        }

        let context = self.context.clone();
        let language = self.language.clone();
        let threads = self.threads;

        tokio::task::spawn_blocking(move || {
            let mut params = FullParams::new(SamplingStrategy::Greedy { best_of: 1 });
            params.set_n_threads(threads as i32);
            params.set_print_progress(false);
            params.set_print_realtime(false);
            params.set_print_timestamps(false);
            if let Some(ref lang) = language {
                params.set_language(Some(lang.as_str()));
            }

            let mut state = context.create_state().map_err(|e| {
                TranscriptionError::TranscriptionFailed(format!(
                    "failed to create whisper state: {e}"
                ))
            })?;

            state
                .full(params, &samples)
                .map_err(|e| TranscriptionError::TranscriptionFailed(e.to_string()))?;

            let num_segments = state.full_n_segments().map_err(|e| {
                TranscriptionError::TranscriptionFailed(format!(
                    "failed to get segment count: {e}"
                ))
            })?;

            let mut segments = Vec::with_capacity(num_segments as usize);
            for i in 0..num_segments {
                let text = state
                    .full_get_segment_text(i)
                    .map_err(|e| TranscriptionError::TranscriptionFailed(e.to_string()))?;
                // Segment timestamps are reported in 10 ms ticks.
                let start = state
                    .full_get_segment_t0(i)
                    .map_err(|e| TranscriptionError::TranscriptionFailed(e.to_string()))?;
                segments.push(WhisperSegment {
                    text,
                    start_secs: start as f64 / 100.0,
                });
            }
            Ok(segments)
        })
        .await
        .map_err(|e| TranscriptionError::TranscriptionFailed(format!("task join error: {e}")))?
    }

    async fn detect_language(&self, audio: &Path) -> Result<Option<String>, TranscriptionError> {
        let mut samples = audio::read_mono_f32(audio)?;
        samples.truncate(DETECTION_WINDOW_SECS * WHISPER_SAMPLE_RATE as usize);
        if samples.is_empty() {
            return Ok(None);
        }

        let context = self.context.clone();
        let threads = self.threads;

        tokio::task::spawn_blocking(move || {
            // No language constraint: let the decoder identify it.
            let mut params = FullParams::new(SamplingStrategy::Greedy { best_of: 1 });
            params.set_n_threads(threads as i32);
            params.set_print_progress(false);
            params.set_print_realtime(false);
            params.set_print_timestamps(false);

            let mut state = context.create_state().map_err(|e| {
                TranscriptionError::TranscriptionFailed(format!(
                    "failed to create whisper state: {e}"
                ))
            })?;

            state
                .full(params, &samples)
                .map_err(|e| TranscriptionError::TranscriptionFailed(e.to_string()))?;

            let detected = state
                .full_lang_id_from_state()
                .ok()
                .and_then(|id| whisper_rs::get_lang_str(id).map(str::to_string));
            Ok(detected)
        })
        .await
        .map_err(|e| TranscriptionError::TranscriptionFailed(format!("task join error: {e}")))?
    }
}

#![forbid(unsafe_code)]

//! Hybrid speech-transcription core.
//!
//! Routes transcription between the platform's on-device recognizer and a
//! downloadable whisper model, fetching model assets on demand, and returns
//! one uniform [`TranscriptionResult`] either way.
//!
//! The host application implements the [`ports::NativeRecognizer`] port over
//! its platform speech facility; [`adapters::WhisperCppRuntime`] is the
//! bundled open-model backend. Wire both into a
//! [`HybridTranscriptionService`], or drive the full chain (permission →
//! detect → prepare → transcribe) through a [`TranscriptionWorkflow`].

pub mod adapters;
pub mod app;
pub mod domain;
pub mod infrastructure;
pub mod ports;

pub use app::service::HybridTranscriptionService;
pub use app::workflow::{
    CancelToken, TranscriptionRequest, TranscriptionWorkflow, WorkflowPhase,
};
pub use domain::error::TranscriptionError;
pub use domain::model::{ModelCatalog, ModelDescriptor};
pub use domain::transcription::{EngineKind, EnginePreference, TranscriptionResult};

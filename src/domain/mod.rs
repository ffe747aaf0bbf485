pub mod config;
pub mod error;
pub mod language;
pub mod model;
pub mod transcription;

pub use config::AppConfig;
pub use error::TranscriptionError;
pub use model::{ModelCatalog, ModelDescriptor};
pub use transcription::{EngineKind, EnginePreference, TranscriptionResult};

pub mod config;
pub mod engine;
pub mod recognizer;
pub mod whisper;

pub use config::ConfigStore;
pub use engine::{ModelPreparingEngine, ProgressFn, TranscriptionEngine};
pub use recognizer::{NativeRecognizer, RecognitionStream, RecognizedSegment};
pub use whisper::{WhisperRuntime, WhisperSegment, WhisperSession};

pub mod audio;
pub mod config_store;
pub mod model_manager;
pub mod native_speech;
pub mod whisper_cpp;
pub mod whisper_engine;

pub use config_store::TomlConfigStore;
pub use model_manager::ModelManager;
pub use native_speech::{NativeSpeechEngine, SupportedLanguages};
pub use whisper_cpp::WhisperCppRuntime;
pub use whisper_engine::WhisperEngine;

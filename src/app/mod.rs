pub mod service;
pub mod workflow;

pub use service::HybridTranscriptionService;
pub use workflow::{CancelToken, TranscriptionRequest, TranscriptionWorkflow, WorkflowPhase};

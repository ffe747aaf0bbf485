use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::OnceCell;
use tracing::{debug, info};

use crate::domain::{ModelCatalog, TranscriptionError};
use crate::ports::engine::ProgressFn;
use crate::ports::whisper::WhisperRuntime;

/// Maps languages to catalog models and materializes model assets.
///
/// Concurrent `ensure_model_available` calls for one identifier share a
/// single underlying fetch and all resolve to the same local path; completed
/// fetches are remembered so later calls return without touching the backend.
pub struct ModelManager {
    catalog: ModelCatalog,
    runtime: Arc<dyn WhisperRuntime>,
    fetched: Mutex<HashMap<String, Arc<OnceCell<PathBuf>>>>,
}

impl ModelManager {
    pub fn new(runtime: Arc<dyn WhisperRuntime>, catalog: ModelCatalog) -> Self {
        info!(
            models = catalog.models.len(),
            default_model = %catalog.default_model,
            "ModelManager initialized"
        );
        Self {
            catalog,
            runtime,
            fetched: Mutex::new(HashMap::new()),
        }
    }

    pub fn catalog(&self) -> &ModelCatalog {
        &self.catalog
    }

    /// Catalog identifier serving `language`. Pure and synchronous:
    /// canonicalize, map lookup, default fallback.
    pub fn model_identifier(&self, language: &str) -> String {
        self.catalog.model_for_language(language).to_string()
    }

    /// Fetch-or-cache the model's assets, returning their local path.
    ///
    /// Fails with `ModelUnavailable` for identifiers outside the catalog.
    pub async fn ensure_model_available(
        &self,
        model_identifier: &str,
        progress: Option<ProgressFn>,
    ) -> Result<PathBuf, TranscriptionError> {
        let descriptor = self
            .catalog
            .get(model_identifier)
            .ok_or_else(|| TranscriptionError::ModelUnavailable(model_identifier.to_string()))?
            .clone();

        let cell = self
            .fetched
            .lock()
            .entry(model_identifier.to_string())
            .or_insert_with(|| Arc::new(OnceCell::new()))
            .clone();

        // Already materialized: answer without touching the backend.
        if let Some(path) = cell.get() {
            if let Some(ref progress) = progress {
                progress(1.0);
            }
            return Ok(path.clone());
        }

        if let Some(ref progress) = progress {
            progress(0.0);
        }

        let fetch_progress = progress.clone();
        let path = cell
            .get_or_try_init(|| {
                debug!(
                    model = model_identifier,
                    model_ref = %descriptor.model_ref,
                    size_mb = descriptor.estimated_size_mb,
                    "fetching model"
                );
                self.runtime.fetch_model(
                    &descriptor.model_ref,
                    descriptor.sha256.as_deref(),
                    fetch_progress,
                )
            })
            .await?
            .clone();

        if let Some(ref progress) = progress {
            progress(1.0);
        }

        info!(model = model_identifier, path = ?path, "model available");
        Ok(path)
    }
}

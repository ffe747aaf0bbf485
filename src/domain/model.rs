use std::collections::HashMap;

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use crate::domain::language::canonicalize;

/// Embedded default model catalog.
const CATALOG_JSON: &str = include_str!("../../resources/model_catalog.json");

/// The embedded catalog ships with the binary; failing to parse it is a
/// build defect, not a runtime condition.
static BUILTIN: Lazy<ModelCatalog> = Lazy::new(|| {
    serde_json::from_str(CATALOG_JSON).expect("embedded model catalog is valid JSON")
});

/// Static catalog entry describing one downloadable model variant.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelDescriptor {
    /// Internal identifier (e.g. "whisper-medium").
    pub id: String,
    /// Human-readable name.
    pub name: String,
    /// Backend-specific model reference (ggml variant name, e.g. "medium").
    pub model_ref: String,
    /// Approximate download size in megabytes.
    pub estimated_size_mb: u64,
    /// SHA-256 checksum of the model file, when pinned.
    #[serde(default)]
    pub sha256: Option<String>,
}

/// Catalog of downloadable models plus the language → model mapping.
///
/// Defined once at startup; injectable for tests. Languages without an
/// explicit mapping fall back to `default_model`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelCatalog {
    /// Catalog version for compatibility checking.
    pub version: u32,
    /// Identifier used when a language has no explicit mapping.
    pub default_model: String,
    /// Available models.
    pub models: Vec<ModelDescriptor>,
    /// Canonical language tag → model identifier.
    pub language_models: HashMap<String, String>,
}

impl ModelCatalog {
    /// The embedded default catalog.
    pub fn builtin() -> ModelCatalog {
        BUILTIN.clone()
    }

    /// Build a catalog from parts (test/override hook).
    pub fn new(
        default_model: impl Into<String>,
        models: Vec<ModelDescriptor>,
        language_models: HashMap<String, String>,
    ) -> Self {
        Self {
            version: 1,
            default_model: default_model.into(),
            models,
            language_models,
        }
    }

    /// Find a model by identifier.
    pub fn get(&self, model_id: &str) -> Option<&ModelDescriptor> {
        self.models.iter().find(|m| m.id == model_id)
    }

    /// Identifier of the model serving `language`. Canonicalizes the tag,
    /// consults the mapping, falls back to the default model.
    pub fn model_for_language(&self, language: &str) -> &str {
        let normalized = canonicalize(language);
        self.language_models
            .get(&normalized)
            .map(String::as_str)
            .unwrap_or(&self.default_model)
    }

    /// List all model identifiers.
    pub fn model_ids(&self) -> Vec<&str> {
        self.models.iter().map(|m| m.id.as_str()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_catalog_parses() {
        let catalog = ModelCatalog::builtin();
        assert!(catalog.version >= 1);
        assert!(!catalog.models.is_empty());
        assert!(catalog.get(&catalog.default_model).is_some());
    }

    #[test]
    fn test_builtin_maps_basque_to_medium() {
        let catalog = ModelCatalog::builtin();
        assert_eq!(catalog.model_for_language("eu-ES"), "whisper-medium");
        // Bare code canonicalizes before lookup.
        assert_eq!(catalog.model_for_language("eu"), "whisper-medium");
    }

    #[test]
    fn test_unmapped_language_falls_back_to_default() {
        let catalog = ModelCatalog::builtin();
        assert_eq!(
            catalog.model_for_language("fr-FR"),
            catalog.default_model.as_str()
        );
    }

    #[test]
    fn test_custom_catalog_lookup() {
        let catalog = ModelCatalog::new(
            "tiny",
            vec![ModelDescriptor {
                id: "tiny".to_string(),
                name: "Tiny".to_string(),
                model_ref: "tiny".to_string(),
                estimated_size_mb: 75,
                sha256: None,
            }],
            HashMap::from([("de-DE".to_string(), "tiny".to_string())]),
        );
        assert_eq!(catalog.model_for_language("de_DE"), "tiny");
        assert!(catalog.get("missing").is_none());
        assert_eq!(catalog.model_ids(), vec!["tiny"]);
    }
}

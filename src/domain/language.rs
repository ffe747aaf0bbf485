//! Language tag policy.
//!
//! Tags arrive from callers, recognizers, and config in a mix of hyphenated
//! region form (`en-US`), underscore form (`en_US`), and bare two-letter
//! codes (`en`). Everything internal works on the canonical hyphenated form.

/// Tag used when detection fails on every engine and when the whisper engine
/// bootstraps its detection model.
pub const DEFAULT_LANGUAGE: &str = "eu-ES";

/// Canonicalize a language tag to hyphenated region form.
///
/// Underscores become hyphens. Three bare codes have hardcoded expansions
/// (`eu` → `eu-ES`, `es` → `es-ES`, `en` → `en-US`, compared lowercased);
/// any other tag passes through unchanged. Idempotent.
pub fn canonicalize(tag: &str) -> String {
    let normalized = tag.replace('_', "-");
    match normalized.to_lowercase().as_str() {
        "eu" => "eu-ES".to_string(),
        "es" => "es-ES".to_string(),
        "en" => "en-US".to_string(),
        _ => normalized,
    }
}

/// Bare ISO 639-1 base of a tag: everything before the first hyphen.
/// The whisper backend rejects region-qualified tags.
pub fn base_language(tag: &str) -> &str {
    tag.split('-').next().unwrap_or(tag)
}

/// Whether a tag names Basque, matched by canonical prefix, case-insensitive.
pub fn is_basque(tag: &str) -> bool {
    canonicalize(tag).to_lowercase().starts_with("eu")
}

use serde::{Deserialize, Serialize};

/// Which backend produced a result. Reporting/telemetry only; never used for
/// control flow after the fact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EngineKind {
    /// Always-available on-device recognizer.
    Native,
    /// Downloadable open-model transcriber.
    Whisper,
}

impl EngineKind {
    /// Stable identifier, used when persisting transcript records.
    pub fn as_str(&self) -> &'static str {
        match self {
            EngineKind::Native => "native",
            EngineKind::Whisper => "whisper",
        }
    }
}

impl std::fmt::Display for EngineKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Caller-supplied override of automatic engine selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnginePreference {
    #[default]
    Auto,
    Native,
    Whisper,
}

/// Immutable value produced by one successful transcribe call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscriptionResult {
    /// Transcribed text, possibly interleaved with `[h:mm:ss]` / `[mm:ss]`
    /// line prefixes.
    pub text: String,
    /// Canonical language tag actually used.
    pub language: String,
    /// Audio duration in seconds.
    pub duration_secs: f64,
    /// Backend that produced the text.
    pub engine: EngineKind,
}

/// Format a segment start for inline timestamps: `h:mm:ss` once an hour has
/// elapsed, `mm:ss` otherwise.
pub fn format_timestamp(seconds: f64) -> String {
    let total = seconds.max(0.0) as u64;
    let hours = total / 3600;
    let minutes = (total % 3600) / 60;
    let secs = total % 60;
    if hours > 0 {
        format!("{}:{:02}:{:02}", hours, minutes, secs)
    } else {
        format!("{:02}:{:02}", minutes, secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_timestamp_under_an_hour() {
        assert_eq!(format_timestamp(0.0), "00:00");
        assert_eq!(format_timestamp(59.9), "00:59");
        assert_eq!(format_timestamp(61.0), "01:01");
        assert_eq!(format_timestamp(3599.0), "59:59");
    }

    #[test]
    fn test_format_timestamp_switches_at_one_hour() {
        assert_eq!(format_timestamp(3600.0), "1:00:00");
        assert_eq!(format_timestamp(3661.0), "1:01:01");
        assert_eq!(format_timestamp(7325.0), "2:02:05");
    }

    #[test]
    fn test_engine_kind_identifiers() {
        assert_eq!(EngineKind::Native.as_str(), "native");
        assert_eq!(EngineKind::Whisper.as_str(), "whisper");
    }

    #[test]
    fn test_engine_preference_roundtrip() {
        let json = serde_json::to_string(&EnginePreference::Whisper).unwrap();
        assert_eq!(json, "\"whisper\"");
        let back: EnginePreference = serde_json::from_str(&json).unwrap();
        assert_eq!(back, EnginePreference::Whisper);
        assert_eq!(EnginePreference::default(), EnginePreference::Auto);
    }
}

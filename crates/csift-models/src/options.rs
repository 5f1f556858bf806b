//! Submission options sent alongside the media file.

use serde::{Deserialize, Serialize};

/// Default detection sensitivity threshold.
pub const DEFAULT_THRESHOLD: f32 = 0.8;

/// How flagged segments are treated in the output artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum FilterMode {
    /// Silence the flagged segment
    #[default]
    Mute,
    /// Overlay a beep tone
    Beep,
    /// Cut the segment out entirely
    Cut,
}

impl FilterMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            FilterMode::Mute => "mute",
            FilterMode::Beep => "beep",
            FilterMode::Cut => "cut",
        }
    }
}

impl std::fmt::Display for FilterMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Options for one processing submission.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmitOptions {
    /// Filter mode applied to flagged segments
    #[serde(default)]
    pub mode: FilterMode,
    /// Detection sensitivity in [0, 1]; higher flags more aggressively
    #[serde(default = "default_threshold")]
    pub threshold: f32,
    /// Languages to detect, as ISO 639-1 codes
    #[serde(default = "default_languages")]
    pub languages: Vec<String>,
}

fn default_threshold() -> f32 {
    DEFAULT_THRESHOLD
}

fn default_languages() -> Vec<String> {
    vec!["en".to_string()]
}

impl Default for SubmitOptions {
    fn default() -> Self {
        Self {
            mode: FilterMode::default(),
            threshold: DEFAULT_THRESHOLD,
            languages: default_languages(),
        }
    }
}

impl SubmitOptions {
    /// Languages as the comma-joined form the process endpoint expects.
    pub fn languages_field(&self) -> String {
        self.languages.join(",")
    }

    /// Threshold clamped to [0, 1] as a form field value.
    pub fn threshold_field(&self) -> String {
        format!("{}", self.threshold.clamp(0.0, 1.0))
    }
}

use crate::linearize::{LinearizeOptions, Separator};
use crate::reconcile::ReconcileOptions;
use crate::speech::SpeechOptions;
use crate::text_units::OffsetUnit;
use serde::Deserialize;

/// Flat narration configuration; the on-disk form is grouped in tables.
#[derive(Debug, Clone, Deserialize, serde::Serialize, PartialEq)]
pub struct NarrationConfig {
    #[serde(default = "crate::config::defaults::default_separator")]
    pub separator: Separator,
    #[serde(default = "crate::config::defaults::default_offset_unit")]
    pub offset_unit: OffsetUnit,
    #[serde(default = "crate::config::defaults::default_infer_word_length")]
    pub infer_word_length: bool,
    #[serde(default = "crate::config::defaults::default_speech_rate")]
    pub speech_rate: f32,
    #[serde(default = "crate::config::defaults::default_speech_pitch")]
    pub speech_pitch: f32,
    #[serde(default = "crate::config::defaults::default_speech_volume")]
    pub speech_volume: f32,
    #[serde(default)]
    pub voice: Option<String>,
    #[serde(default = "crate::config::defaults::default_log_level")]
    pub log_level: LogLevel,
}

impl Default for NarrationConfig {
    fn default() -> Self {
        NarrationConfig {
            separator: crate::config::defaults::default_separator(),
            offset_unit: crate::config::defaults::default_offset_unit(),
            infer_word_length: crate::config::defaults::default_infer_word_length(),
            speech_rate: crate::config::defaults::default_speech_rate(),
            speech_pitch: crate::config::defaults::default_speech_pitch(),
            speech_volume: crate::config::defaults::default_speech_volume(),
            voice: None,
            log_level: crate::config::defaults::default_log_level(),
        }
    }
}

impl NarrationConfig {
    pub fn reconcile_options(&self) -> ReconcileOptions {
        ReconcileOptions {
            linearize: LinearizeOptions {
                separator: self.separator,
                unit: self.offset_unit,
            },
            infer_word_length: self.infer_word_length,
        }
    }

    pub fn speech_options(&self) -> SpeechOptions {
        SpeechOptions {
            rate: self.speech_rate,
            pitch: self.speech_pitch,
            volume: self.speech_volume,
            voice: self.voice.clone(),
        }
        .clamped()
    }
}

/// Supported logging verbosity levels.
#[derive(Debug, Clone, Copy, Deserialize, serde::Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_filter_str())
    }
}

impl LogLevel {
    pub fn as_filter_str(self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

use super::defaults;
use super::models::{LogLevel, NarrationConfig};
use crate::linearize::Separator;
use crate::text_units::OffsetUnit;
use serde::Deserialize;

#[derive(Debug, Clone, Default, Deserialize, serde::Serialize)]
pub(super) struct ConfigTables {
    #[serde(default)]
    highlight: HighlightConfig,
    #[serde(default)]
    speech: SpeechConfig,
    #[serde(default)]
    logging: LoggingConfig,
}

impl From<ConfigTables> for NarrationConfig {
    fn from(tables: ConfigTables) -> Self {
        NarrationConfig {
            separator: tables.highlight.separator,
            offset_unit: tables.highlight.offset_unit,
            infer_word_length: tables.highlight.infer_word_length,
            speech_rate: tables.speech.rate,
            speech_pitch: tables.speech.pitch,
            speech_volume: tables.speech.volume,
            voice: tables.speech.voice,
            log_level: tables.logging.log_level,
        }
    }
}

impl From<&NarrationConfig> for ConfigTables {
    fn from(config: &NarrationConfig) -> Self {
        ConfigTables {
            highlight: HighlightConfig {
                separator: config.separator,
                offset_unit: config.offset_unit,
                infer_word_length: config.infer_word_length,
            },
            speech: SpeechConfig {
                rate: config.speech_rate,
                pitch: config.speech_pitch,
                volume: config.speech_volume,
                voice: config.voice.clone(),
            },
            logging: LoggingConfig {
                log_level: config.log_level,
            },
        }
    }
}

#[derive(Debug, Clone, Deserialize, serde::Serialize)]
struct HighlightConfig {
    #[serde(default = "defaults::default_separator")]
    separator: Separator,
    #[serde(default = "defaults::default_offset_unit")]
    offset_unit: OffsetUnit,
    #[serde(default = "defaults::default_infer_word_length")]
    infer_word_length: bool,
}

impl Default for HighlightConfig {
    fn default() -> Self {
        HighlightConfig {
            separator: defaults::default_separator(),
            offset_unit: defaults::default_offset_unit(),
            infer_word_length: defaults::default_infer_word_length(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, serde::Serialize)]
struct SpeechConfig {
    #[serde(default = "defaults::default_speech_rate")]
    rate: f32,
    #[serde(default = "defaults::default_speech_pitch")]
    pitch: f32,
    #[serde(default = "defaults::default_speech_volume")]
    volume: f32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    voice: Option<String>,
}

impl Default for SpeechConfig {
    fn default() -> Self {
        SpeechConfig {
            rate: defaults::default_speech_rate(),
            pitch: defaults::default_speech_pitch(),
            volume: defaults::default_speech_volume(),
            voice: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize, serde::Serialize)]
struct LoggingConfig {
    #[serde(default = "defaults::default_log_level")]
    log_level: LogLevel,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        LoggingConfig {
            log_level: defaults::default_log_level(),
        }
    }
}

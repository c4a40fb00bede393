use crate::linearize::Separator;
use crate::text_units::OffsetUnit;

pub(crate) fn default_separator() -> Separator {
    Separator::None
}

pub(crate) fn default_offset_unit() -> OffsetUnit {
    OffsetUnit::Utf16
}

pub(crate) fn default_infer_word_length() -> bool {
    true
}

pub(crate) fn default_speech_rate() -> f32 {
    1.0
}

pub(crate) fn default_speech_pitch() -> f32 {
    1.0
}

pub(crate) fn default_speech_volume() -> f32 {
    1.0
}

pub(crate) fn default_log_level() -> crate::config::LogLevel {
    crate::config::LogLevel::Info
}

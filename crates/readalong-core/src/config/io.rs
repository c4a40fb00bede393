use super::models::NarrationConfig;
use super::tables::ConfigTables;
use anyhow::{Context, Result};
use std::fs;
use std::path::Path;
use tracing::{debug, info, warn};

/// Parse the table-grouped TOML form.
pub fn parse_config(contents: &str) -> Result<NarrationConfig> {
    let tables: ConfigTables = toml::from_str(contents).context("Invalid config TOML")?;
    Ok(tables.into())
}

pub fn serialize_config(config: &NarrationConfig) -> Result<String> {
    toml::to_string_pretty(&ConfigTables::from(config)).context("Serializing config")
}

/// Load configuration from the given path, falling back to defaults on error.
pub fn load_config(path: &Path) -> NarrationConfig {
    let contents = match fs::read_to_string(path) {
        Ok(data) => {
            info!(path = %path.display(), "Loaded narration config");
            data
        }
        Err(err) => {
            warn!(
                path = %path.display(),
                "Falling back to default config: {err}"
            );
            return NarrationConfig::default();
        }
    };

    match parse_config(&contents) {
        Ok(cfg) => {
            debug!(?cfg, "Parsed configuration from disk");
            cfg
        }
        Err(err) => {
            warn!(path = %path.display(), "{err:#}");
            NarrationConfig::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LogLevel;
    use crate::linearize::Separator;
    use crate::text_units::OffsetUnit;

    #[test]
    fn empty_file_yields_defaults() {
        let cfg = parse_config("").unwrap();
        assert_eq!(cfg, NarrationConfig::default());
        assert_eq!(cfg.offset_unit, OffsetUnit::Utf16);
        assert_eq!(cfg.separator, Separator::None);
    }

    #[test]
    fn reads_grouped_tables() {
        let cfg = parse_config(
            r#"
            [highlight]
            separator = "space"
            offset_unit = "char"
            infer_word_length = false

            [speech]
            rate = 1.5
            voice = "en-GB"

            [logging]
            log_level = "trace"
            "#,
        )
        .unwrap();
        assert_eq!(cfg.separator, Separator::Space);
        assert_eq!(cfg.offset_unit, OffsetUnit::Char);
        assert!(!cfg.infer_word_length);
        assert!((cfg.speech_rate - 1.5).abs() < f32::EPSILON);
        assert!((cfg.speech_volume - 1.0).abs() < f32::EPSILON);
        assert_eq!(cfg.voice.as_deref(), Some("en-GB"));
        assert_eq!(cfg.log_level, LogLevel::Trace);
    }

    #[test]
    fn rejects_unknown_enum_values() {
        assert!(parse_config("[highlight]\nseparator = \"comma\"\n").is_err());
    }

    #[test]
    fn serialized_config_parses_back() {
        let cfg = NarrationConfig {
            separator: Separator::Space,
            speech_pitch: 0.5,
            ..NarrationConfig::default()
        };
        let text = serialize_config(&cfg).unwrap();
        assert!(text.contains("[highlight]"));
        assert_eq!(parse_config(&text).unwrap(), cfg);
    }

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let cfg = load_config(Path::new("/definitely/not/here/readalong.toml"));
        assert_eq!(cfg, NarrationConfig::default());
    }

    #[test]
    fn speech_options_are_clamped() {
        let cfg = NarrationConfig {
            speech_volume: 3.0,
            ..NarrationConfig::default()
        };
        assert!((cfg.speech_options().volume - 1.0).abs() < f32::EPSILON);
    }
}

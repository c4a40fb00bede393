//! Seam to the speech-synthesis collaborator.
//!
//! The engine is a black box: it is handed a string and later reports
//! progress through [`SpeechEvent`]s tagged with the utterance they belong
//! to. Nothing here blocks or waits on it.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

pub const MIN_SPEECH_RATE: f32 = 0.1;
pub const MAX_SPEECH_RATE: f32 = 10.0;
pub const MIN_SPEECH_PITCH: f32 = 0.0;
pub const MAX_SPEECH_PITCH: f32 = 2.0;
pub const MIN_SPEECH_VOLUME: f32 = 0.0;
pub const MAX_SPEECH_VOLUME: f32 = 1.0;

/// Identifies one `speak` request and every event it produces.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, TS,
)]
#[serde(transparent)]
#[ts(export)]
pub struct UtteranceId(pub u32);

impl UtteranceId {
    pub fn next(self) -> Self {
        UtteranceId(self.0.wrapping_add(1))
    }
}

impl std::fmt::Display for UtteranceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "u{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpeechOptions {
    pub rate: f32,
    pub pitch: f32,
    pub volume: f32,
    pub voice: Option<String>,
}

impl Default for SpeechOptions {
    fn default() -> Self {
        Self {
            rate: 1.0,
            pitch: 1.0,
            volume: 1.0,
            voice: None,
        }
    }
}

impl SpeechOptions {
    /// Clamp every knob into the range engines accept.
    pub fn clamped(mut self) -> Self {
        self.rate = self.rate.clamp(MIN_SPEECH_RATE, MAX_SPEECH_RATE);
        self.pitch = self.pitch.clamp(MIN_SPEECH_PITCH, MAX_SPEECH_PITCH);
        self.volume = self.volume.clamp(MIN_SPEECH_VOLUME, MAX_SPEECH_VOLUME);
        self.voice = self.voice.filter(|voice| !voice.trim().is_empty());
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BoundaryKind {
    Word,
    Sentence,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SpeechEventKind {
    Start,
    Boundary {
        kind: BoundaryKind,
        char_index: usize,
        #[serde(default)]
        char_length: usize,
    },
    End,
    Error {
        reason: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpeechEvent {
    pub utterance: UtteranceId,
    #[serde(flatten)]
    pub kind: SpeechEventKind,
}

impl SpeechEvent {
    pub fn start(utterance: UtteranceId) -> Self {
        Self {
            utterance,
            kind: SpeechEventKind::Start,
        }
    }

    pub fn word(utterance: UtteranceId, char_index: usize, char_length: usize) -> Self {
        Self {
            utterance,
            kind: SpeechEventKind::Boundary {
                kind: BoundaryKind::Word,
                char_index,
                char_length,
            },
        }
    }

    pub fn end(utterance: UtteranceId) -> Self {
        Self {
            utterance,
            kind: SpeechEventKind::End,
        }
    }

    pub fn error(utterance: UtteranceId, reason: impl Into<String>) -> Self {
        Self {
            utterance,
            kind: SpeechEventKind::Error {
                reason: reason.into(),
            },
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self.kind,
            SpeechEventKind::End | SpeechEventKind::Error { .. }
        )
    }
}

/// Fire-and-forget speech synthesis.
///
/// After `speak`, the engine reports `Start`, any number of boundaries and
/// then exactly one of `End` or `Error`, all tagged with `utterance`. After
/// `cancel` it still owes that final `End` or `Error`.
pub trait SpeechEngine {
    fn speak(&mut self, utterance: UtteranceId, text: &str, options: &SpeechOptions);

    fn cancel(&mut self, utterance: UtteranceId);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clamps_options_into_engine_ranges() {
        let opts = SpeechOptions {
            rate: 42.0,
            pitch: -1.0,
            volume: 1.5,
            voice: Some("  ".to_string()),
        }
        .clamped();
        assert!((opts.rate - MAX_SPEECH_RATE).abs() < f32::EPSILON);
        assert!((opts.pitch - MIN_SPEECH_PITCH).abs() < f32::EPSILON);
        assert!((opts.volume - MAX_SPEECH_VOLUME).abs() < f32::EPSILON);
        assert_eq!(opts.voice, None);
    }

    #[test]
    fn utterance_ids_wrap() {
        assert_eq!(UtteranceId(u32::MAX).next(), UtteranceId(0));
        assert_eq!(UtteranceId(4).next(), UtteranceId(5));
    }

    #[test]
    fn events_deserialize_from_engine_payloads() {
        let event: SpeechEvent = serde_json::from_str(
            r#"{"utterance":3,"type":"boundary","kind":"word","char_index":6}"#,
        )
        .unwrap();
        assert_eq!(event, SpeechEvent::word(UtteranceId(3), 6, 0));
        assert!(!event.is_terminal());

        let event: SpeechEvent =
            serde_json::from_str(r#"{"utterance":3,"type":"error","reason":"interrupted"}"#)
                .unwrap();
        assert!(event.is_terminal());
    }
}

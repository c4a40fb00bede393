//! Speech engine stand-in for replays: records requests and can synthesize
//! the event stream a real engine would produce for them.

use readalong_core::speech::{SpeechEngine, SpeechEvent, SpeechOptions, UtteranceId};
use readalong_core::text_units::OffsetUnit;
use serde::Serialize;
use tracing::debug;

#[derive(Debug, Clone, Serialize)]
pub struct Spoken {
    pub utterance: UtteranceId,
    pub text: String,
    pub rate: f32,
}

#[derive(Debug, Default)]
pub struct RecordingEngine {
    pub spoken: Vec<Spoken>,
    pub cancelled: Vec<UtteranceId>,
}

impl RecordingEngine {
    pub fn latest(&self) -> Option<&Spoken> {
        self.spoken.last()
    }

    /// `Start`, one word boundary per whitespace-delimited word, then `End`.
    pub fn script(spoken: &Spoken, unit: OffsetUnit) -> Vec<SpeechEvent> {
        let mut events = vec![SpeechEvent::start(spoken.utterance)];
        let mut word_start: Option<usize> = None;
        for (byte, ch) in spoken.text.char_indices() {
            match (ch.is_whitespace(), word_start) {
                (false, None) => word_start = Some(byte),
                (true, Some(start)) => {
                    events.push(word_event(spoken, unit, start, byte));
                    word_start = None;
                }
                _ => {}
            }
        }
        if let Some(start) = word_start {
            events.push(word_event(spoken, unit, start, spoken.text.len()));
        }
        events.push(SpeechEvent::end(spoken.utterance));
        events
    }
}

fn word_event(spoken: &Spoken, unit: OffsetUnit, start: usize, end: usize) -> SpeechEvent {
    let index = unit.len(&spoken.text[..start]);
    let length = unit.len(&spoken.text[start..end]);
    SpeechEvent::word(spoken.utterance, index, length)
}

impl SpeechEngine for RecordingEngine {
    fn speak(&mut self, utterance: UtteranceId, text: &str, options: &SpeechOptions) {
        debug!(%utterance, chars = text.chars().count(), "Recording speak request");
        self.spoken.push(Spoken {
            utterance,
            text: text.to_string(),
            rate: options.rate,
        });
    }

    fn cancel(&mut self, utterance: UtteranceId) {
        debug!(%utterance, "Recording cancel request");
        self.cancelled.push(utterance);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn script_reports_words_in_the_requested_unit() {
        let spoken = Spoken {
            utterance: UtteranceId(2),
            text: "😀 hi  there".to_string(),
            rate: 1.0,
        };
        let events = RecordingEngine::script(&spoken, OffsetUnit::Utf16);
        assert_eq!(
            events,
            vec![
                SpeechEvent::start(UtteranceId(2)),
                SpeechEvent::word(UtteranceId(2), 0, 2),
                SpeechEvent::word(UtteranceId(2), 3, 2),
                SpeechEvent::word(UtteranceId(2), 7, 5),
                SpeechEvent::end(UtteranceId(2)),
            ]
        );
    }
}

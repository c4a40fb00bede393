use super::{Effect, NarrationEvent, Notice, PlaybackController};
use crate::config::NarrationConfig;
use crate::document::{Document, MutationRecord, NodeId};
use crate::speech::{SpeechEngine, SpeechEvent};
use tracing::debug;

/// Drives a [`PlaybackController`] against a concrete speech engine.
///
/// Each call runs one transition, performs its effects in order and hands
/// back the notices meant for the button layer.
#[derive(Debug)]
pub struct Narrator<E: SpeechEngine> {
    controller: PlaybackController,
    engine: E,
}

impl<E: SpeechEngine> Narrator<E> {
    pub fn new(engine: E, config: &NarrationConfig) -> Self {
        Self {
            controller: PlaybackController::new(config),
            engine,
        }
    }

    pub fn controller(&self) -> &PlaybackController {
        &self.controller
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    pub fn engine_mut(&mut self) -> &mut E {
        &mut self.engine
    }

    pub fn handle<D: Document>(&mut self, doc: &mut D, event: NarrationEvent) -> Vec<Notice> {
        let effects = self.controller.transition(doc, event);
        self.apply(effects)
    }

    pub fn start_or_stop<D: Document>(&mut self, doc: &mut D, root: NodeId) -> Vec<Notice> {
        self.handle(doc, NarrationEvent::Toggle { root })
    }

    pub fn stop<D: Document>(&mut self, doc: &mut D) -> Vec<Notice> {
        self.handle(doc, NarrationEvent::Stop)
    }

    pub fn on_speech<D: Document>(&mut self, doc: &mut D, event: SpeechEvent) -> Vec<Notice> {
        self.handle(doc, NarrationEvent::Speech(event))
    }

    pub fn on_mutations<D: Document>(
        &mut self,
        doc: &mut D,
        records: Vec<MutationRecord>,
    ) -> Vec<Notice> {
        if records.is_empty() {
            return Vec::new();
        }
        self.handle(doc, NarrationEvent::StructureChanged { records })
    }

    fn apply(&mut self, effects: Vec<Effect>) -> Vec<Notice> {
        let mut notices = Vec::new();
        for effect in effects {
            match effect {
                Effect::Speak {
                    utterance,
                    text,
                    options,
                } => {
                    debug!(%utterance, rate = options.rate, "Handing text to speech engine");
                    self.engine.speak(utterance, &text, &options);
                }
                Effect::CancelSpeech { utterance } => {
                    debug!(%utterance, "Cancelling speech");
                    self.engine.cancel(utterance);
                }
                Effect::Notify(notice) => notices.push(notice),
            }
        }
        notices
    }
}

//! Playback controller: the only owner of the active narration session.
//!
//! Every input (a button toggle, a speech-engine callback, a structural
//! change reported by the host) goes through [`PlaybackController::transition`],
//! which mutates the decorated tree as needed and returns the [`Effect`]s the
//! caller must carry out. The controller itself never talks to the engine;
//! [`Narrator`] is the small driver that does.

mod narrator;
mod transitions;

pub use narrator::Narrator;

use crate::config::NarrationConfig;
use crate::document::{Document, MutationRecord, NodeId};
use crate::reconcile::ReconcileOptions;
use crate::session::NarrationSession;
use crate::speech::{SpeechEvent, SpeechOptions, UtteranceId};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// Inputs accepted by the controller.
#[derive(Debug, Clone, PartialEq)]
pub enum NarrationEvent {
    /// Start narrating `root`, or stop if it is already being narrated.
    Toggle { root: NodeId },
    /// Stop whatever is playing.
    Stop,
    Speech(SpeechEvent),
    /// Structural changes observed in the host tree since the last event.
    StructureChanged { records: Vec<MutationRecord> },
}

/// Work the caller performs after a transition, in order.
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    Speak {
        utterance: UtteranceId,
        text: String,
        options: SpeechOptions,
    },
    CancelSpeech {
        utterance: UtteranceId,
    },
    Notify(Notice),
}

/// Button-facing state of a root.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export)]
pub enum VisualState {
    Idle,
    Speaking,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(tag = "kind", rename_all = "snake_case")]
#[ts(export)]
pub enum EndReason {
    Completed,
    /// Stopped on request, either directly or by starting another root.
    Cancelled,
    /// The root or the word being decorated left the document.
    Detached,
    Failed { message: String },
}

/// Lifecycle notifications for the control-button layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(tag = "kind", rename_all = "snake_case")]
#[ts(export)]
pub enum Notice {
    Started {
        root: NodeId,
        utterance: UtteranceId,
    },
    Ended {
        root: NodeId,
        utterance: UtteranceId,
        reason: EndReason,
    },
}

impl Notice {
    pub fn root(&self) -> NodeId {
        match self {
            Notice::Started { root, .. } | Notice::Ended { root, .. } => *root,
        }
    }

    /// State the button for [`Notice::root`] should show afterwards.
    pub fn visual_state(&self) -> VisualState {
        match self {
            Notice::Started { .. } => VisualState::Speaking,
            Notice::Ended { .. } => VisualState::Idle,
        }
    }
}

#[derive(Debug, Default)]
pub struct PlaybackController {
    session: Option<NarrationSession>,
    last_utterance: UtteranceId,
    /// Utterance cancelled on request whose final engine event is still owed.
    stopping: Option<UtteranceId>,
    options: ReconcileOptions,
    speech: SpeechOptions,
}

impl PlaybackController {
    pub fn new(config: &NarrationConfig) -> Self {
        Self {
            options: config.reconcile_options(),
            speech: config.speech_options(),
            ..Self::default()
        }
    }

    pub fn transition<D: Document>(&mut self, doc: &mut D, event: NarrationEvent) -> Vec<Effect> {
        transitions::transition(self, doc, event)
    }

    /// Toggle narration for `root`.
    pub fn start_or_stop<D: Document>(&mut self, doc: &mut D, root: NodeId) -> Vec<Effect> {
        self.transition(doc, NarrationEvent::Toggle { root })
    }

    pub fn session(&self) -> Option<&NarrationSession> {
        self.session.as_ref()
    }

    pub fn active_root(&self) -> Option<NodeId> {
        self.session.as_ref().map(|session| session.root)
    }

    pub fn visual_state(&self, root: NodeId) -> VisualState {
        if self.active_root() == Some(root) {
            VisualState::Speaking
        } else {
            VisualState::Idle
        }
    }

    pub fn options(&self) -> &ReconcileOptions {
        &self.options
    }
}

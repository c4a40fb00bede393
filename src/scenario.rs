//! Scripted replays: a document tree plus the ordered host, button and
//! engine events to run against it.

use crate::engine::RecordingEngine;
use anyhow::{Context, Result, anyhow};
use readalong_core::config::NarrationConfig;
use readalong_core::controller::{Narrator, Notice, VisualState};
use readalong_core::document::{ArenaDocument, Document, NodeId, NodeSpec};
use readalong_core::reconcile::markers_in;
use readalong_core::speech::{BoundaryKind, SpeechEvent, SpeechEventKind, UtteranceId};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::Path;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Deserialize)]
pub struct Scenario {
    pub document: NodeSpec,
    #[serde(default)]
    pub steps: Vec<Step>,
}

/// Speech steps target the most recent `speak` request unless noted.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Step {
    Toggle {
        label: String,
    },
    Stop,
    Start,
    Word {
        index: usize,
        #[serde(default)]
        length: usize,
    },
    Sentence {
        index: usize,
    },
    End,
    Error {
        reason: String,
    },
    /// Replay a whole utterance word by word, ending with `End`.
    Play,
    /// Deliver an engine event verbatim, stale utterances included.
    Raw {
        event: SpeechEvent,
    },
    Detach {
        label: String,
    },
    Rerender {
        label: String,
        children: Vec<NodeSpec>,
    },
}

#[derive(Debug, Serialize)]
pub struct Report {
    pub spoken: Vec<crate::engine::Spoken>,
    pub cancelled: Vec<UtteranceId>,
    pub notices: Vec<Notice>,
    pub final_text: String,
    pub markers: usize,
    pub states: BTreeMap<String, VisualState>,
}

pub fn load_scenario(path: &Path) -> Result<Scenario> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("Failed to read scenario {}", path.display()))?;
    let scenario: Scenario = serde_json::from_str(&raw)
        .with_context(|| format!("Invalid scenario JSON in {}", path.display()))?;
    info!(
        path = %path.display(),
        steps = scenario.steps.len(),
        "Loaded scenario"
    );
    Ok(scenario)
}

struct Replay {
    doc: ArenaDocument,
    labels: HashMap<String, NodeId>,
    narrator: Narrator<RecordingEngine>,
    notices: Vec<Notice>,
    config: NarrationConfig,
}

impl Replay {
    fn node(&self, label: &str) -> Result<NodeId> {
        self.labels
            .get(label)
            .copied()
            .ok_or_else(|| anyhow!("Unknown node label `{label}`"))
    }

    fn latest_utterance(&self) -> Result<UtteranceId> {
        self.narrator
            .engine()
            .latest()
            .map(|spoken| spoken.utterance)
            .ok_or_else(|| anyhow!("No utterance has been spoken yet"))
    }

    fn record(&mut self, notices: Vec<Notice>) {
        for notice in notices {
            info!(?notice, state = ?notice.visual_state(), "Narration notice");
            self.notices.push(notice);
        }
    }

    fn speech(&mut self, event: SpeechEvent) {
        let notices = self.narrator.on_speech(&mut self.doc, event);
        self.record(notices);
        self.flush_mutations();
    }

    /// Forward tree changes the way a host observer would.
    fn flush_mutations(&mut self) {
        let records = self.doc.take_mutations();
        if records.is_empty() {
            return;
        }
        debug!(records = records.len(), "Delivering structural changes");
        let notices = self.narrator.on_mutations(&mut self.doc, records);
        self.record(notices);
        // Cleanup done in response to the records is not reported again.
        self.doc.take_mutations();
    }

    fn apply(&mut self, step: Step) -> Result<()> {
        match step {
            Step::Toggle { label } => {
                let root = self.node(&label)?;
                let notices = self.narrator.start_or_stop(&mut self.doc, root);
                if notices.is_empty() {
                    info!(%label, "Toggle produced no narration");
                }
                self.record(notices);
                self.flush_mutations();
            }
            Step::Stop => {
                let notices = self.narrator.stop(&mut self.doc);
                self.record(notices);
                self.flush_mutations();
            }
            Step::Start => self.speech(SpeechEvent::start(self.latest_utterance()?)),
            Step::Word { index, length } => {
                self.speech(SpeechEvent::word(self.latest_utterance()?, index, length));
            }
            Step::Sentence { index } => self.speech(SpeechEvent {
                utterance: self.latest_utterance()?,
                kind: SpeechEventKind::Boundary {
                    kind: BoundaryKind::Sentence,
                    char_index: index,
                    char_length: 0,
                },
            }),
            Step::End => self.speech(SpeechEvent::end(self.latest_utterance()?)),
            Step::Error { reason } => {
                self.speech(SpeechEvent::error(self.latest_utterance()?, reason));
            }
            Step::Play => {
                let spoken = self
                    .narrator
                    .engine()
                    .latest()
                    .cloned()
                    .ok_or_else(|| anyhow!("Nothing to play"))?;
                for event in RecordingEngine::script(&spoken, self.config.offset_unit) {
                    self.speech(event);
                }
            }
            Step::Raw { event } => self.speech(event),
            Step::Detach { label } => {
                let node = self.node(&label)?;
                self.doc
                    .detach(node)
                    .with_context(|| format!("Failed to detach `{label}`"))?;
                self.flush_mutations();
            }
            Step::Rerender { label, children } => {
                let node = self.node(&label)?;
                let added = self
                    .doc
                    .replace_children(node, &children)
                    .with_context(|| format!("Failed to re-render `{label}`"))?;
                self.labels.extend(added);
                self.flush_mutations();
            }
        }
        Ok(())
    }
}

pub fn run_scenario(scenario: Scenario, config: &NarrationConfig) -> Result<Report> {
    let (doc, built) =
        ArenaDocument::from_spec(&scenario.document).context("Failed to build document")?;
    let mut replay = Replay {
        doc,
        labels: built.labels,
        narrator: Narrator::new(RecordingEngine::default(), config),
        notices: Vec::new(),
        config: config.clone(),
    };

    for (idx, step) in scenario.steps.into_iter().enumerate() {
        debug!(step = idx + 1, ?step, "Applying step");
        replay
            .apply(step)
            .with_context(|| format!("Step {} failed", idx + 1))?;
    }

    let root = replay.doc.document_root();
    let markers = markers_in(&replay.doc, root).len();
    if markers > 0 && replay.narrator.controller().session().is_none() {
        warn!(markers, "Markers left behind with no active narration");
    }
    let states = replay
        .labels
        .iter()
        .map(|(label, node)| {
            (
                label.clone(),
                replay.narrator.controller().visual_state(*node),
            )
        })
        .collect();
    let engine = replay.narrator.engine();
    Ok(Report {
        spoken: engine.spoken.clone(),
        cancelled: engine.cancelled.clone(),
        notices: replay.notices,
        final_text: replay.doc.text_content(root),
        markers,
        states,
    })
}

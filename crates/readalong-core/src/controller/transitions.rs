use super::{Effect, EndReason, NarrationEvent, Notice, PlaybackController};
use crate::document::{Document, MutationRecord, NodeId};
use crate::linearize::linearize;
use crate::reconcile::{Boundary, Highlighter, Outcome, markers_in, reconcile, unwrap_marker};
use crate::session::{NarrationSession, SessionLifecycle};
use crate::speech::{BoundaryKind, SpeechEvent, SpeechEventKind};
use tracing::{debug, info, trace, warn};

pub(super) fn transition<D: Document>(
    ctl: &mut PlaybackController,
    doc: &mut D,
    event: NarrationEvent,
) -> Vec<Effect> {
    match event {
        NarrationEvent::Toggle { root } => on_toggle(ctl, doc, root),
        NarrationEvent::Stop => on_stop(ctl, doc),
        NarrationEvent::Speech(event) => on_speech(ctl, doc, event),
        NarrationEvent::StructureChanged { records } => on_structure_changed(ctl, doc, &records),
    }
}

fn on_toggle<D: Document>(ctl: &mut PlaybackController, doc: &mut D, root: NodeId) -> Vec<Effect> {
    let mut effects = Vec::new();
    if let Some(active) = ctl.active_root() {
        // The old session is fully torn down before the new text is read.
        teardown(ctl, doc, EndReason::Cancelled, true, &mut effects);
        if active == root {
            info!(%root, "Narration toggled off");
            return effects;
        }
    }
    start(ctl, doc, root, &mut effects);
    effects
}

fn on_stop<D: Document>(ctl: &mut PlaybackController, doc: &mut D) -> Vec<Effect> {
    let mut effects = Vec::new();
    if ctl.session.is_none() {
        debug!("Stop requested with no active narration");
        return effects;
    }
    teardown(ctl, doc, EndReason::Cancelled, true, &mut effects);
    effects
}

fn start<D: Document>(
    ctl: &mut PlaybackController,
    doc: &mut D,
    root: NodeId,
    effects: &mut Vec<Effect>,
) {
    if !doc.is_attached(root) {
        info!(%root, "Root is not attached; nothing to narrate");
        return;
    }
    // Highlighting replaces the leaf it splits, so a leaf cannot anchor a session.
    if doc.is_text(root) {
        info!(%root, "Root is a bare text leaf; nothing to narrate");
        return;
    }
    if let Err(err) = Highlighter::default().clear(doc, root) {
        warn!(%root, "Failed to unwrap leftover markers: {err}");
    }

    let linearized = linearize(doc, root, &ctl.options.linearize);
    if linearized.is_empty() {
        info!(%root, "Root has no narratable text; not starting");
        return;
    }

    ctl.last_utterance = ctl.last_utterance.next();
    let utterance = ctl.last_utterance;
    let text = linearized.text.clone();
    info!(
        %root,
        %utterance,
        segments = linearized.segments.len(),
        bytes = text.len(),
        "Starting narration"
    );
    ctl.session = Some(NarrationSession::new(root, utterance, linearized));
    effects.push(Effect::Speak {
        utterance,
        text,
        options: ctl.speech.clone(),
    });
    effects.push(Effect::Notify(Notice::Started { root, utterance }));
}

/// Clear the marker, drop the session and report the end. With
/// `cancel_engine` the utterance is remembered as stopping before the cancel
/// goes out, so its final engine event is absorbed quietly.
fn teardown<D: Document>(
    ctl: &mut PlaybackController,
    doc: &mut D,
    reason: EndReason,
    cancel_engine: bool,
    effects: &mut Vec<Effect>,
) {
    let Some(mut session) = ctl.session.take() else {
        return;
    };
    let root = session.root;
    let utterance = session.utterance;

    match session.highlighter.clear(doc, root) {
        Ok(removed) => trace!(%root, removed, "Cleared highlight"),
        Err(err) => warn!(%root, %utterance, "Failed to clear highlight: {err}"),
    }

    if cancel_engine {
        ctl.stopping = Some(utterance);
        effects.push(Effect::CancelSpeech { utterance });
    }
    info!(
        %root,
        %utterance,
        ?reason,
        highlights = session.highlights,
        misses = session.misses,
        "Narration ended"
    );
    effects.push(Effect::Notify(Notice::Ended {
        root,
        utterance,
        reason,
    }));
}

fn on_speech<D: Document>(
    ctl: &mut PlaybackController,
    doc: &mut D,
    event: SpeechEvent,
) -> Vec<Effect> {
    let mut effects = Vec::new();
    let current = ctl.session.as_ref().map(|session| session.utterance);
    if current != Some(event.utterance) {
        absorb_foreign(ctl, &event);
        return effects;
    }

    match event.kind {
        SpeechEventKind::Start => {
            if let Some(session) = ctl.session.as_mut() {
                session.lifecycle = SessionLifecycle::Speaking;
            }
            debug!(utterance = %event.utterance, "Speech started");
        }
        SpeechEventKind::Boundary {
            kind: BoundaryKind::Word,
            char_index,
            char_length,
        } => on_word(
            ctl,
            doc,
            Boundary {
                char_index,
                char_length,
            },
            &mut effects,
        ),
        SpeechEventKind::Boundary {
            kind: BoundaryKind::Sentence,
            char_index,
            ..
        } => trace!(char_index, "Ignoring sentence boundary"),
        SpeechEventKind::End => {
            teardown(ctl, doc, EndReason::Completed, false, &mut effects);
        }
        SpeechEventKind::Error { reason } => {
            warn!(utterance = %event.utterance, "Speech engine failed: {reason}");
            teardown(
                ctl,
                doc,
                EndReason::Failed { message: reason },
                false,
                &mut effects,
            );
        }
    }
    effects
}

/// Events for an utterance that is no longer current.
fn absorb_foreign(ctl: &mut PlaybackController, event: &SpeechEvent) {
    let utterance = event.utterance;
    if ctl.stopping != Some(utterance) {
        debug!(%utterance, kind = ?event.kind, "Ignoring stale speech event");
        return;
    }
    match &event.kind {
        SpeechEventKind::Error { reason } => {
            debug!(%utterance, %reason, "Engine confirmed requested stop");
            ctl.stopping = None;
        }
        SpeechEventKind::End => {
            debug!(%utterance, "Engine finished after requested stop");
            ctl.stopping = None;
        }
        _ => trace!(%utterance, "Ignoring event from utterance being stopped"),
    }
}

fn on_word<D: Document>(
    ctl: &mut PlaybackController,
    doc: &mut D,
    boundary: Boundary,
    effects: &mut Vec<Effect>,
) {
    let outcome = match ctl.session.as_mut() {
        Some(session) => reconcile(doc, session, boundary, &ctl.options),
        None => return,
    };
    match outcome {
        Ok(Outcome::Marked { .. }) => {
            if let Some(session) = ctl.session.as_mut() {
                session.highlights += 1;
            }
        }
        Ok(Outcome::Missed(reason)) => {
            if let Some(session) = ctl.session.as_mut() {
                session.misses += 1;
            }
            debug!(
                char_index = boundary.char_index,
                char_length = boundary.char_length,
                ?reason,
                "Word boundary not highlighted"
            );
        }
        Ok(Outcome::Detached) => {
            info!(char_index = boundary.char_index, "Narrated text left the document");
            teardown(ctl, doc, EndReason::Detached, true, effects);
        }
        Err(err) => {
            warn!(char_index = boundary.char_index, "Highlighting failed: {err}");
            teardown(
                ctl,
                doc,
                EndReason::Failed {
                    message: err.to_string(),
                },
                true,
                effects,
            );
        }
    }
}

fn on_structure_changed<D: Document>(
    ctl: &mut PlaybackController,
    doc: &mut D,
    records: &[MutationRecord],
) -> Vec<Effect> {
    let mut effects = Vec::new();
    unwrap_foreign_markers(ctl, doc, records);

    let Some(root) = ctl.active_root() else {
        return effects;
    };
    if !doc.is_attached(root) {
        info!(%root, "Narrated root left the document");
        teardown(ctl, doc, EndReason::Detached, true, &mut effects);
        return effects;
    }
    if !records.iter().any(|record| doc.contains(root, record.parent())) {
        return effects;
    }
    if let Some(session) = ctl.session.as_mut() {
        session.highlighter.forget_if_detached(doc);
        session.relinearize(doc, &ctl.options.linearize);
        debug!(
            %root,
            records = records.len(),
            segments = session.segments.len(),
            "Rebuilt segment map after host change"
        );
    }
    effects
}

/// Markers arriving inside added subtrees (e.g. a host copying decorated
/// markup) are unwrapped; only the live marker may exist.
fn unwrap_foreign_markers<D: Document>(
    ctl: &PlaybackController,
    doc: &mut D,
    records: &[MutationRecord],
) {
    let active = ctl
        .session
        .as_ref()
        .and_then(|session| session.highlighter.active_marker());
    for record in records {
        let MutationRecord::Added { node, .. } = record else {
            continue;
        };
        if !doc.is_attached(*node) {
            continue;
        }
        for marker in markers_in(doc, *node) {
            if Some(marker) == active {
                continue;
            }
            debug!(%marker, "Unwrapping marker added by the host");
            if let Err(err) = unwrap_marker(doc, marker) {
                warn!(%marker, "Failed to unwrap foreign marker: {err}");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controller::VisualState;
    use crate::document::{ArenaDocument, NodeSpec};
    use crate::reconcile::split_and_mark;
    use crate::speech::UtteranceId;

    struct Fixture {
        doc: ArenaDocument,
        first: NodeId,
        second: NodeId,
        blank: NodeId,
        ctl: PlaybackController,
    }

    fn fixture() -> Fixture {
        let spec = NodeSpec::element(
            "body",
            vec![
                NodeSpec::element(
                    "p",
                    vec![
                        NodeSpec::text("Hello "),
                        NodeSpec::element("em", vec![NodeSpec::text("brave")]),
                        NodeSpec::text(" world!"),
                    ],
                )
                .labeled("first"),
                NodeSpec::element("p", vec![NodeSpec::text("Second paragraph.")])
                    .labeled("second"),
                NodeSpec::element("p", vec![NodeSpec::text("  "), NodeSpec::text("\n")])
                    .labeled("blank"),
            ],
        );
        let (doc, built) = ArenaDocument::from_spec(&spec).unwrap();
        Fixture {
            doc,
            first: built.get("first").unwrap(),
            second: built.get("second").unwrap(),
            blank: built.get("blank").unwrap(),
            ctl: PlaybackController::default(),
        }
    }

    fn speech(
        ctl: &mut PlaybackController,
        doc: &mut ArenaDocument,
        event: SpeechEvent,
    ) -> Vec<Effect> {
        ctl.transition(doc, NarrationEvent::Speech(event))
    }

    fn current(ctl: &PlaybackController) -> UtteranceId {
        ctl.session().unwrap().utterance
    }

    #[test]
    fn toggle_starts_speaking_the_flattened_text() {
        let Fixture { mut doc, first, mut ctl, .. } = fixture();

        let effects = ctl.start_or_stop(&mut doc, first);
        let utterance = current(&ctl);
        assert_eq!(effects.len(), 2);
        assert!(matches!(
            &effects[0],
            Effect::Speak { text, utterance: u, .. } if text == "Hello brave world!" && *u == utterance
        ));
        assert_eq!(
            effects[1],
            Effect::Notify(Notice::Started {
                root: first,
                utterance
            })
        );
        assert_eq!(ctl.visual_state(first), VisualState::Speaking);

        speech(&mut ctl, &mut doc, SpeechEvent::start(utterance));
        assert_eq!(ctl.session().unwrap().lifecycle, SessionLifecycle::Speaking);
    }

    #[test]
    fn blank_or_detached_roots_do_not_start() {
        let Fixture { mut doc, first, blank, mut ctl, .. } = fixture();

        assert!(ctl.start_or_stop(&mut doc, blank).is_empty());
        assert!(ctl.session().is_none());

        doc.detach(first).unwrap();
        assert!(ctl.start_or_stop(&mut doc, first).is_empty());
        assert_eq!(ctl.visual_state(first), VisualState::Idle);
    }

    #[test]
    fn text_leaf_roots_do_not_start() {
        let Fixture { mut doc, second, mut ctl, .. } = fixture();
        let leaf = doc.children(second)[0];
        doc.take_mutations();

        assert!(ctl.start_or_stop(&mut doc, leaf).is_empty());
        assert!(ctl.session().is_none());
        assert_eq!(ctl.visual_state(leaf), VisualState::Idle);
        assert!(doc.take_mutations().is_empty());

        // Its element narrates the same text and survives consecutive words.
        let effects = ctl.start_or_stop(&mut doc, second);
        assert!(matches!(&effects[0], Effect::Speak { text, .. } if text == "Second paragraph."));
        let utterance = current(&ctl);
        for (idx, len, word) in [(0, 6, "Second"), (7, 9, "paragraph")] {
            assert!(speech(&mut ctl, &mut doc, SpeechEvent::word(utterance, idx, len)).is_empty());
            let markers = markers_in(&doc, second);
            assert_eq!(markers.len(), 1);
            assert_eq!(doc.text_content(markers[0]), word);
        }
        assert_eq!(ctl.active_root(), Some(second));
        assert_eq!(ctl.session().unwrap().highlights, 2);
    }

    #[test]
    fn word_boundaries_move_the_single_marker() {
        let Fixture { mut doc, first, mut ctl, .. } = fixture();
        ctl.start_or_stop(&mut doc, first);
        let utterance = current(&ctl);

        for (idx, len, word) in [(0, 5, "Hello"), (6, 5, "brave"), (12, 5, "world")] {
            assert!(speech(&mut ctl, &mut doc, SpeechEvent::word(utterance, idx, len)).is_empty());
            let markers = markers_in(&doc, first);
            assert_eq!(markers.len(), 1);
            assert_eq!(doc.text_content(markers[0]), word);
            assert_eq!(doc.text_content(first), "Hello brave world!");
        }
        assert_eq!(ctl.session().unwrap().highlights, 3);

        let effects = speech(&mut ctl, &mut doc, SpeechEvent::end(utterance));
        assert_eq!(
            effects,
            vec![Effect::Notify(Notice::Ended {
                root: first,
                utterance,
                reason: EndReason::Completed
            })]
        );
        assert!(markers_in(&doc, first).is_empty());
        assert!(ctl.session().is_none());
    }

    #[test]
    fn cancel_absorbs_the_engine_follow_up() {
        let Fixture { mut doc, first, mut ctl, .. } = fixture();
        ctl.start_or_stop(&mut doc, first);
        let utterance = current(&ctl);
        speech(&mut ctl, &mut doc, SpeechEvent::word(utterance, 6, 5));

        let effects = ctl.start_or_stop(&mut doc, first);
        assert_eq!(
            effects,
            vec![
                Effect::CancelSpeech { utterance },
                Effect::Notify(Notice::Ended {
                    root: first,
                    utterance,
                    reason: EndReason::Cancelled
                }),
            ]
        );
        assert!(markers_in(&doc, first).is_empty());
        assert_eq!(ctl.stopping, Some(utterance));

        let effects = speech(&mut ctl, &mut doc, SpeechEvent::error(utterance, "interrupted"));
        assert!(effects.is_empty());
        assert_eq!(ctl.stopping, None);
    }

    #[test]
    fn engine_may_confirm_a_cancel_with_end() {
        let Fixture { mut doc, first, mut ctl, .. } = fixture();
        ctl.start_or_stop(&mut doc, first);
        let utterance = current(&ctl);
        speech(&mut ctl, &mut doc, SpeechEvent::word(utterance, 0, 5));

        ctl.transition(&mut doc, NarrationEvent::Stop);
        assert_eq!(ctl.stopping, Some(utterance));

        assert!(speech(&mut ctl, &mut doc, SpeechEvent::end(utterance)).is_empty());
        assert_eq!(ctl.stopping, None);
        assert!(ctl.session().is_none());
        assert!(markers_in(&doc, first).is_empty());
        assert_eq!(doc.text_content(first), "Hello brave world!");
    }

    #[test]
    fn unsolicited_error_ends_as_failure() {
        let Fixture { mut doc, first, mut ctl, .. } = fixture();
        ctl.start_or_stop(&mut doc, first);
        let utterance = current(&ctl);
        speech(&mut ctl, &mut doc, SpeechEvent::word(utterance, 0, 5));

        let effects = speech(&mut ctl, &mut doc, SpeechEvent::error(utterance, "synthesis-failed"));
        assert_eq!(
            effects,
            vec![Effect::Notify(Notice::Ended {
                root: first,
                utterance,
                reason: EndReason::Failed {
                    message: "synthesis-failed".to_string()
                }
            })]
        );
        assert!(markers_in(&doc, first).is_empty());
    }

    #[test]
    fn switching_roots_tears_down_before_starting() {
        let Fixture { mut doc, first, second, mut ctl, .. } = fixture();
        ctl.start_or_stop(&mut doc, first);
        let old = current(&ctl);
        speech(&mut ctl, &mut doc, SpeechEvent::word(old, 12, 5));

        let effects = ctl.start_or_stop(&mut doc, second);
        let new = current(&ctl);
        assert_ne!(old, new);
        assert_eq!(effects.len(), 4);
        assert_eq!(effects[0], Effect::CancelSpeech { utterance: old });
        assert!(matches!(
            &effects[1],
            Effect::Notify(Notice::Ended { root, reason: EndReason::Cancelled, .. }) if *root == first
        ));
        assert!(matches!(&effects[2], Effect::Speak { text, .. } if text == "Second paragraph."));
        assert!(matches!(&effects[3], Effect::Notify(Notice::Started { root, .. }) if *root == second));
        assert!(markers_in(&doc, first).is_empty());

        // Late events for the old utterance change nothing.
        assert!(speech(&mut ctl, &mut doc, SpeechEvent::word(old, 0, 5)).is_empty());
        assert!(markers_in(&doc, doc.document_root()).is_empty());
        assert!(speech(&mut ctl, &mut doc, SpeechEvent::end(old)).is_empty());
        assert_eq!(ctl.active_root(), Some(second));
    }

    #[test]
    fn detached_root_ends_the_session() {
        let Fixture { mut doc, first, mut ctl, .. } = fixture();
        ctl.start_or_stop(&mut doc, first);
        let utterance = current(&ctl);
        speech(&mut ctl, &mut doc, SpeechEvent::word(utterance, 0, 5));
        doc.take_mutations();

        doc.detach(first).unwrap();
        let records = doc.take_mutations();
        let effects = ctl.transition(&mut doc, NarrationEvent::StructureChanged { records });
        assert_eq!(
            effects,
            vec![
                Effect::CancelSpeech { utterance },
                Effect::Notify(Notice::Ended {
                    root: first,
                    utterance,
                    reason: EndReason::Detached
                }),
            ]
        );
        assert!(doc.take_mutations().is_empty());
    }

    #[test]
    fn host_rerender_rebuilds_the_map() {
        let Fixture { mut doc, first, mut ctl, .. } = fixture();
        ctl.start_or_stop(&mut doc, first);
        let utterance = current(&ctl);
        doc.take_mutations();

        doc.replace_children(first, &[NodeSpec::text("Hello brave world!")])
            .unwrap();
        let records = doc.take_mutations();
        assert!(
            ctl.transition(&mut doc, NarrationEvent::StructureChanged { records })
                .is_empty()
        );
        assert_eq!(ctl.session().unwrap().segments.len(), 1);

        speech(&mut ctl, &mut doc, SpeechEvent::word(utterance, 6, 5));
        let markers = markers_in(&doc, first);
        assert_eq!(markers.len(), 1);
        assert_eq!(doc.text_content(markers[0]), "brave");
    }

    #[test]
    fn markers_added_by_the_host_are_unwrapped() {
        let Fixture { mut doc, second, mut ctl, .. } = fixture();
        let leaf = doc.children(second)[0];
        split_and_mark(&mut doc, leaf, 0, 6).unwrap();
        let records = doc.take_mutations();

        ctl.transition(&mut doc, NarrationEvent::StructureChanged { records });
        assert!(markers_in(&doc, second).is_empty());
        assert_eq!(doc.children(second).len(), 1);
        assert_eq!(doc.text_content(second), "Second paragraph.");
    }

    #[test]
    fn stop_without_session_is_a_no_op() {
        let Fixture { mut doc, mut ctl, .. } = fixture();
        assert!(ctl.transition(&mut doc, NarrationEvent::Stop).is_empty());
        assert!(doc.take_mutations().is_empty());
    }
}

//! Word-level read-along highlighting for narrated documents.
//!
//! A root node is flattened into the exact string handed to a speech engine,
//! and each word-boundary event coming back is mapped onto the live tree and
//! decorated with a single marker. [`controller::PlaybackController`] owns
//! the session; everything below it is plain functions over a [`Document`].

pub mod bindings;
pub mod config;
pub mod controller;
pub mod document;
pub mod error;
pub mod linearize;
pub mod reconcile;
pub mod resolve;
pub mod session;
pub mod speech;
pub mod text_units;

pub use controller::{
    Effect, EndReason, NarrationEvent, Narrator, Notice, PlaybackController, VisualState,
};
pub use document::{ArenaDocument, Document, MutationRecord, NodeId, NodeSpec};
pub use error::{DocumentError, DocumentResult};
pub use speech::{SpeechEngine, SpeechEvent, SpeechOptions, UtteranceId};

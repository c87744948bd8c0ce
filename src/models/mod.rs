//! Models module for the staff engine
//!
//! This module contains the pitch theory types and the semantic
//! and resolved note structures shared by the renderer and the input layer.

pub mod pitch;
pub mod key_signature;
pub mod note_entry;
pub mod note_spec;

// Re-export commonly used types
pub use pitch::{
    accidental_offset, midi_to_spelling, note_to_midi, Accidental, Letter, Pitch, PitchParseError,
    PitchSpelling, SpellingPreference,
};
pub use key_signature::{key_signature_alteration, KeySignature, KeySignatureError};
pub use note_entry::{Clef, EntryContent, NoteDuration, NoteEntry, NoteStyle, SemanticState};
pub use note_spec::{Meter, NoteSpec, Voice};

//! Staff Engine WASM API
//!
//! JavaScript-facing bindings for the staff engine.
//!
//! # Module Structure
//!
//! - `helpers`: console logging, serde conversion and host callback access
//! - `display`: `StaffDisplayHandle`, a display plus its note sequence
//! - `input`: `StaffInputHandle`, the staff input state machine
//! - `theory`: stateless pitch, key-signature and config helpers

pub mod helpers;
pub mod display;
pub mod input;
pub mod theory;

pub use display::StaffDisplayHandle;
pub use input::StaffInputHandle;
pub use theory::{
    canonicalize_key_signature, decide_displayed_accidental_js, diff_sequences_js, list_font_options_js,
    midi_to_note, note_to_midi_js, pitch_for_staff_y, read_staff_config, sort_notes_ascending_js,
};

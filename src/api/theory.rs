//! Pitch theory and configuration helpers exposed to JavaScript
//!
//! Stateless functions; none of them touch a display.

use std::collections::HashMap;
use wasm_bindgen::prelude::*;

use crate::api::helpers::{deserialize, serialize, viewport_width};
use crate::models::{midi_to_spelling, note_to_midi, Clef, KeySignature, Pitch, SpellingPreference};
use crate::renderers::layout::{closest_pitch_for_y, PitchSearch, StaffMetrics};
use crate::renderers::{decide_displayed_accidental, list_font_options, StaffConfig};
use crate::staff::{diff_sequences, sort_notes_ascending};

/// Canonical major-key token (`"f#"` → `"F#"`), or `undefined` when unsupported
#[wasm_bindgen(js_name = canonicalizeKeySignature)]
pub fn canonicalize_key_signature(token: &str) -> Option<String> {
    KeySignature::canonicalize(token).map(|key| key.as_str().to_string())
}

/// MIDI number of a spelled note, or `undefined` when unparseable
#[wasm_bindgen(js_name = noteToMidi)]
pub fn note_to_midi_js(note: &str) -> Option<i32> {
    note_to_midi(note)
}

/// Spell a MIDI number with flats (default) or sharps
#[wasm_bindgen(js_name = midiToNote)]
pub fn midi_to_note(midi: i32, prefer_sharps: Option<bool>) -> String {
    let preference = if prefer_sharps.unwrap_or(false) {
        SpellingPreference::Sharp
    } else {
        SpellingPreference::Flat
    };
    midi_to_spelling(midi, preference).to_string()
}

/// Accidental code the staff draws for `note` under `key_signature`
///
/// Returns `undefined` when nothing is drawn or the note is unparseable.
#[wasm_bindgen(js_name = decideDisplayedAccidental)]
pub fn decide_displayed_accidental_js(note: &str, key_signature: &str) -> Option<String> {
    let pitch = Pitch::parse(note)?;
    let key = KeySignature::canonicalize(key_signature).unwrap_or_default();
    decide_displayed_accidental(pitch.letter, pitch.accidental, key).map(|a| a.code().to_string())
}

/// Font catalog for settings menus
#[wasm_bindgen(js_name = listFontOptions)]
pub fn list_font_options_js() -> Result<JsValue, JsValue> {
    serialize(&list_font_options(), "Font options serialization error")
}

/// Resolve staff sizing from an element's `dataset` object
#[wasm_bindgen(js_name = readStaffConfig)]
pub fn read_staff_config(dataset: JsValue) -> Result<JsValue, JsValue> {
    let dataset: HashMap<String, String> = deserialize(dataset, "Dataset deserialization error")?;
    let config = StaffConfig::from_dataset(&dataset, viewport_width());
    serialize(&config, "Staff config serialization error")
}

/// Pitch name nearest to a pointer Y coordinate
#[wasm_bindgen(js_name = pitchForStaffY)]
pub fn pitch_for_staff_y(
    y: f64,
    clef: &str,
    metrics: JsValue,
    midi_min: Option<i32>,
    midi_max: Option<i32>,
) -> Result<Option<String>, JsValue> {
    let metrics: StaffMetrics = deserialize(metrics, "Staff metrics deserialization error")?;
    let clef: Clef = clef.parse().unwrap_or_default();
    let defaults = PitchSearch::default();
    let search = PitchSearch {
        midi_min: midi_min.unwrap_or(defaults.midi_min),
        midi_max: midi_max.unwrap_or(defaults.midi_max),
        ..defaults
    };
    Ok(closest_pitch_for_y(y, clef, metrics, search).map(|closest| closest.pitch.to_string()))
}

/// Sort note names from low to high
#[wasm_bindgen(js_name = sortNotesAscending)]
pub fn sort_notes_ascending_js(notes: JsValue) -> Result<JsValue, JsValue> {
    let notes: Vec<String> = deserialize(notes, "Notes deserialization error")?;
    serialize(&sort_notes_ascending(&notes), "Notes serialization error")
}

/// Positional insert/delete/update list between two sequences
#[wasm_bindgen(js_name = diffSequences)]
pub fn diff_sequences_js(prev: JsValue, next: JsValue) -> Result<JsValue, JsValue> {
    let prev: Vec<String> = deserialize(prev, "Sequence deserialization error")?;
    let next: Vec<String> = deserialize(next, "Sequence deserialization error")?;
    serialize(&diff_sequences(&prev, &next), "Diff serialization error")
}

//! Resolved render units handed to the drawing backend

use super::note_entry::{Clef, NoteDuration, NoteStyle};
use super::pitch::Accidental;
use serde::{Deserialize, Serialize};

/// A fully resolved note, chord or rest
///
/// For non-rests `keys`, `accidentals` and `midis` always have the same
/// length; `key_styles` is either empty or that same length too.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NoteSpec {
    pub is_rest: bool,
    pub duration: NoteDuration,
    pub dots: u8,
    pub clef: Clef,
    /// Backend keys such as `"f#/4"`
    pub keys: Vec<String>,
    /// Accidental glyph to draw per key, `None` when the key signature covers it
    pub accidentals: Vec<Option<Accidental>>,
    pub midis: Vec<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub style: Option<NoteStyle>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub key_styles: Vec<Option<NoteStyle>>,
    #[serde(default)]
    pub stemless: bool,
}

impl NoteSpec {
    /// Rest spec; carries no pitch content
    pub fn rest(duration: NoteDuration, dots: u8, clef: Clef) -> Self {
        Self {
            is_rest: true,
            duration,
            dots,
            clef,
            keys: Vec::new(),
            accidentals: Vec::new(),
            midis: Vec::new(),
            style: None,
            key_styles: Vec::new(),
            stemless: false,
        }
    }

    /// True when the parallel key/accidental/midi lists line up
    pub fn is_consistent(&self) -> bool {
        let len = self.keys.len();
        self.accidentals.len() == len
            && self.midis.len() == len
            && (self.key_styles.is_empty() || self.key_styles.len() == len)
            && (!self.is_rest || len == 0)
    }
}

/// One notational line of specs sharing a clef
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Voice {
    pub clef: Clef,
    pub note_specs: Vec<NoteSpec>,
}

impl Voice {
    pub fn new(clef: Clef, note_specs: Vec<NoteSpec>) -> Self {
        Self { clef, note_specs }
    }
}

/// Time signature
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Meter {
    pub num: u32,
    pub den: u32,
}

impl Default for Meter {
    fn default() -> Self {
        Self { num: 4, den: 4 }
    }
}

impl Meter {
    /// Falls back to 4/4 when either part is zero
    pub fn sanitized(self) -> Meter {
        if self.num == 0 || self.den == 0 {
            Meter::default()
        } else {
            self
        }
    }
}

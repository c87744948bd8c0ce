//! Pitch representation and conversion logic
//!
//! Parses spelled pitch strings such as `"F#4"`, `"Bbb3"` or `"C♮5"` and
//! converts between spellings and MIDI note numbers (C4 = 60).

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Natural note letter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Letter {
    C,
    D,
    E,
    F,
    G,
    A,
    B,
}

impl Letter {
    pub const ALL: [Letter; 7] = [
        Letter::C,
        Letter::D,
        Letter::E,
        Letter::F,
        Letter::G,
        Letter::A,
        Letter::B,
    ];

    /// Case-insensitive conversion from a letter character
    pub fn from_char(c: char) -> Option<Letter> {
        match c.to_ascii_uppercase() {
            'C' => Some(Letter::C),
            'D' => Some(Letter::D),
            'E' => Some(Letter::E),
            'F' => Some(Letter::F),
            'G' => Some(Letter::G),
            'A' => Some(Letter::A),
            'B' => Some(Letter::B),
            _ => None,
        }
    }

    /// Uppercase letter character
    pub fn as_char(&self) -> char {
        match self {
            Letter::C => 'C',
            Letter::D => 'D',
            Letter::E => 'E',
            Letter::F => 'F',
            Letter::G => 'G',
            Letter::A => 'A',
            Letter::B => 'B',
        }
    }

    /// Semitone of the natural letter above C
    pub fn semitone(&self) -> i32 {
        match self {
            Letter::C => 0,
            Letter::D => 2,
            Letter::E => 4,
            Letter::F => 5,
            Letter::G => 7,
            Letter::A => 9,
            Letter::B => 11,
        }
    }

    /// Position of the letter within the octave (C = 0 .. B = 6)
    pub fn step(&self) -> i32 {
        match self {
            Letter::C => 0,
            Letter::D => 1,
            Letter::E => 2,
            Letter::F => 3,
            Letter::G => 4,
            Letter::A => 5,
            Letter::B => 6,
        }
    }
}

impl fmt::Display for Letter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_char())
    }
}

/// Spelled accidental
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Accidental {
    DoubleFlat,
    Flat,
    Natural,
    Sharp,
    DoubleSharp,
}

impl Accidental {
    /// Parse an accidental token, accepting ASCII and Unicode glyph variants
    pub fn from_token(token: &str) -> Option<Accidental> {
        match token {
            "#" | "♯" => Some(Accidental::Sharp),
            "##" | "x" | "𝄪" | "♯♯" => Some(Accidental::DoubleSharp),
            "b" | "♭" => Some(Accidental::Flat),
            "bb" | "𝄫" | "♭♭" => Some(Accidental::DoubleFlat),
            "n" | "♮" => Some(Accidental::Natural),
            _ => None,
        }
    }

    /// Semitone offset relative to the natural letter
    pub fn offset(&self) -> i32 {
        match self {
            Accidental::DoubleFlat => -2,
            Accidental::Flat => -1,
            Accidental::Natural => 0,
            Accidental::Sharp => 1,
            Accidental::DoubleSharp => 2,
        }
    }

    /// Drawing-backend accidental code (`"#"`, `"b"`, `"n"`, `"##"`, `"bb"`)
    pub fn code(&self) -> &'static str {
        match self {
            Accidental::DoubleFlat => "bb",
            Accidental::Flat => "b",
            Accidental::Natural => "n",
            Accidental::Sharp => "#",
            Accidental::DoubleSharp => "##",
        }
    }

    /// Unicode glyph for labels
    pub fn glyph(&self) -> &'static str {
        match self {
            Accidental::DoubleFlat => "𝄫",
            Accidental::Flat => "♭",
            Accidental::Natural => "♮",
            Accidental::Sharp => "♯",
            Accidental::DoubleSharp => "𝄪",
        }
    }
}

/// Offset of an optional spelled accidental (none counts as natural)
pub fn accidental_offset(accidental: Option<Accidental>) -> i32 {
    accidental.map(|a| a.offset()).unwrap_or(0)
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PitchParseError {
    #[error("empty pitch string")]
    Empty,

    #[error("invalid note letter in '{0}'")]
    InvalidLetter(String),

    #[error("unsupported accidental '{accidental}' in '{input}'")]
    InvalidAccidental { input: String, accidental: String },

    #[error("missing or invalid octave in '{0}'")]
    InvalidOctave(String),

    #[error("octave {octave} out of range in '{input}'")]
    OctaveOutOfRange { input: String, octave: i32 },
}

/// Octaves accepted by the parser; keeps MIDI arithmetic far from overflow
pub const OCTAVE_RANGE: std::ops::RangeInclusive<i32> = -10..=20;

/// A spelled pitch: letter, optional accidental and octave
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Pitch {
    pub letter: Letter,
    pub accidental: Option<Accidental>,
    pub octave: i32,
}

impl Pitch {
    pub fn new(letter: Letter, accidental: Option<Accidental>, octave: i32) -> Self {
        Self {
            letter,
            accidental,
            octave,
        }
    }

    /// Parse a pitch string, returning `None` when it is malformed
    pub fn parse(input: &str) -> Option<Pitch> {
        input.parse().ok()
    }

    /// MIDI note number (C4 = 60)
    pub fn midi(&self) -> i32 {
        self.letter.semitone() + accidental_offset(self.accidental) + 12 * (self.octave + 1)
    }

    /// Diatonic staff position (C0 = 0, one step per letter)
    pub fn diatonic_index(&self) -> i32 {
        self.octave * 7 + self.letter.step()
    }

    /// Drawing-backend key string, e.g. `"c#/4"`
    pub fn key(&self) -> String {
        let accidental = match self.accidental {
            Some(Accidental::Natural) | None => "",
            Some(a) => a.code(),
        };
        format!(
            "{}{}/{}",
            self.letter.as_char().to_ascii_lowercase(),
            accidental,
            self.octave
        )
    }

    /// Human label with Unicode accidentals, e.g. `"F♯4"`
    pub fn label(&self) -> String {
        let glyph = match self.accidental {
            Some(Accidental::Natural) | None => "",
            Some(a) => a.glyph(),
        };
        format!("{}{}{}", self.letter, glyph, self.octave)
    }
}

impl FromStr for Pitch {
    type Err = PitchParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let mut chars = trimmed.chars();
        let first = chars.next().ok_or(PitchParseError::Empty)?;
        let letter =
            Letter::from_char(first).ok_or_else(|| PitchParseError::InvalidLetter(trimmed.to_string()))?;

        let rest = chars.as_str();
        let octave_start = rest
            .find(|c: char| c == '-' || c.is_ascii_digit())
            .ok_or_else(|| PitchParseError::InvalidOctave(trimmed.to_string()))?;
        let (accidental_token, octave_token) = rest.split_at(octave_start);

        let accidental = if accidental_token.is_empty() {
            None
        } else {
            Some(Accidental::from_token(accidental_token).ok_or_else(|| {
                PitchParseError::InvalidAccidental {
                    input: trimmed.to_string(),
                    accidental: accidental_token.to_string(),
                }
            })?)
        };

        let digits = octave_token.strip_prefix('-').unwrap_or(octave_token);
        if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
            return Err(PitchParseError::InvalidOctave(trimmed.to_string()));
        }
        let octave: i32 = octave_token
            .parse()
            .map_err(|_| PitchParseError::InvalidOctave(trimmed.to_string()))?;
        if !OCTAVE_RANGE.contains(&octave) {
            return Err(PitchParseError::OctaveOutOfRange {
                input: trimmed.to_string(),
                octave,
            });
        }

        Ok(Pitch::new(letter, accidental, octave))
    }
}

impl fmt::Display for Pitch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let accidental = match self.accidental {
            Some(Accidental::Natural) | None => "",
            Some(a) => a.code(),
        };
        write!(f, "{}{}{}", self.letter, accidental, self.octave)
    }
}

/// Convert a pitch string to its MIDI number; `None` if unparseable
pub fn note_to_midi(note: &str) -> Option<i32> {
    Pitch::parse(note).map(|p| p.midi())
}

// ============================================================================
// MIDI → spelling
// ============================================================================

/// Which enharmonic spelling to use for black keys
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SpellingPreference {
    #[default]
    Flat,
    Sharp,
}

impl FromStr for SpellingPreference {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "flat" => Ok(SpellingPreference::Flat),
            // Natural preference has no black-key spelling of its own.
            "sharp" | "natural" => Ok(SpellingPreference::Sharp),
            _ => Err(format!("Invalid spelling preference: '{}'", s)),
        }
    }
}

const SEMITONE_TO_FLAT: [(Letter, Option<Accidental>); 12] = [
    (Letter::C, None),
    (Letter::D, Some(Accidental::Flat)),
    (Letter::D, None),
    (Letter::E, Some(Accidental::Flat)),
    (Letter::E, None),
    (Letter::F, None),
    (Letter::G, Some(Accidental::Flat)),
    (Letter::G, None),
    (Letter::A, Some(Accidental::Flat)),
    (Letter::A, None),
    (Letter::B, Some(Accidental::Flat)),
    (Letter::B, None),
];

const SEMITONE_TO_SHARP: [(Letter, Option<Accidental>); 12] = [
    (Letter::C, None),
    (Letter::C, Some(Accidental::Sharp)),
    (Letter::D, None),
    (Letter::D, Some(Accidental::Sharp)),
    (Letter::E, None),
    (Letter::F, None),
    (Letter::F, Some(Accidental::Sharp)),
    (Letter::G, None),
    (Letter::G, Some(Accidental::Sharp)),
    (Letter::A, None),
    (Letter::A, Some(Accidental::Sharp)),
    (Letter::B, None),
];

/// Spelling produced from a MIDI number
pub type PitchSpelling = Pitch;

/// Spell a MIDI number using the fixed table for `preference`
pub fn midi_to_spelling(midi: i32, preference: SpellingPreference) -> PitchSpelling {
    let semitone = midi.rem_euclid(12) as usize;
    let octave = midi.div_euclid(12) - 1;
    let (letter, accidental) = match preference {
        SpellingPreference::Flat => SEMITONE_TO_FLAT[semitone],
        SpellingPreference::Sharp => SEMITONE_TO_SHARP[semitone],
    };
    Pitch::new(letter, accidental, octave)
}

//! Major-key signatures and their per-letter alterations
//!
//! Fifteen canonical keys are supported: C, the seven sharp keys and the
//! seven flat keys. Tokens coming from settings or the host UI are
//! canonicalized before use; anything unsupported falls back to C.

use super::pitch::Letter;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unsupported key signature: '{0}'")]
pub struct KeySignatureError(pub String);

/// Canonical major-key signature
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum KeySignature {
    #[default]
    C,
    G,
    D,
    A,
    E,
    B,
    #[serde(rename = "F#")]
    FSharp,
    #[serde(rename = "C#")]
    CSharp,
    F,
    Bb,
    Eb,
    Ab,
    Db,
    Gb,
    Cb,
}

const SHARP_ORDER: [Letter; 7] = [
    Letter::F,
    Letter::C,
    Letter::G,
    Letter::D,
    Letter::A,
    Letter::E,
    Letter::B,
];

const FLAT_ORDER: [Letter; 7] = [
    Letter::B,
    Letter::E,
    Letter::A,
    Letter::D,
    Letter::G,
    Letter::C,
    Letter::F,
];

impl KeySignature {
    pub const ALL: [KeySignature; 15] = [
        KeySignature::C,
        KeySignature::G,
        KeySignature::D,
        KeySignature::A,
        KeySignature::E,
        KeySignature::B,
        KeySignature::FSharp,
        KeySignature::CSharp,
        KeySignature::F,
        KeySignature::Bb,
        KeySignature::Eb,
        KeySignature::Ab,
        KeySignature::Db,
        KeySignature::Gb,
        KeySignature::Cb,
    ];

    /// Canonical spelling, e.g. `"Db"`
    pub fn as_str(&self) -> &'static str {
        match self {
            KeySignature::C => "C",
            KeySignature::G => "G",
            KeySignature::D => "D",
            KeySignature::A => "A",
            KeySignature::E => "E",
            KeySignature::B => "B",
            KeySignature::FSharp => "F#",
            KeySignature::CSharp => "C#",
            KeySignature::F => "F",
            KeySignature::Bb => "Bb",
            KeySignature::Eb => "Eb",
            KeySignature::Ab => "Ab",
            KeySignature::Db => "Db",
            KeySignature::Gb => "Gb",
            KeySignature::Cb => "Cb",
        }
    }

    /// Number of sharps (positive) or flats (negative) in the signature
    pub fn fifths(&self) -> i8 {
        match self {
            KeySignature::C => 0,
            KeySignature::G => 1,
            KeySignature::D => 2,
            KeySignature::A => 3,
            KeySignature::E => 4,
            KeySignature::B => 5,
            KeySignature::FSharp => 6,
            KeySignature::CSharp => 7,
            KeySignature::F => -1,
            KeySignature::Bb => -2,
            KeySignature::Eb => -3,
            KeySignature::Ab => -4,
            KeySignature::Db => -5,
            KeySignature::Gb => -6,
            KeySignature::Cb => -7,
        }
    }

    /// Letters altered by this signature, in signature order
    pub fn altered_letters(&self) -> &'static [Letter] {
        let fifths = self.fifths();
        if fifths >= 0 {
            &SHARP_ORDER[..fifths as usize]
        } else {
            &FLAT_ORDER[..fifths.unsigned_abs() as usize]
        }
    }

    /// Alteration implied for `letter`: +1, -1 or 0
    pub fn alteration(&self, letter: Letter) -> i32 {
        if !self.altered_letters().contains(&letter) {
            return 0;
        }
        if self.fifths() > 0 {
            1
        } else {
            -1
        }
    }

    /// Full alteration map as (letter, alteration) pairs
    pub fn alterations(&self) -> Vec<(Letter, i32)> {
        self.altered_letters()
            .iter()
            .map(|&letter| (letter, self.alteration(letter)))
            .collect()
    }

    /// Normalize a free-form key token to a canonical major key
    ///
    /// Only the first whitespace-separated word is considered. A leading
    /// letter (any case) may be followed by up to two accidental glyphs;
    /// trailing text such as a mode suffix is ignored.
    pub fn canonicalize(token: &str) -> Option<KeySignature> {
        let primary = token.split_whitespace().next()?;
        let mut chars = primary.chars();
        let letter = Letter::from_char(chars.next()?)?;

        let mut suffix = String::new();
        for c in chars.take(2) {
            match c {
                '#' | '♯' => suffix.push('#'),
                'b' | '♭' => suffix.push('b'),
                'x' | '𝄪' => suffix.push_str("##"),
                '𝄫' => suffix.push_str("bb"),
                _ => break,
            }
        }

        let canonical = format!("{}{}", letter.as_char(), suffix);
        KeySignature::ALL
            .iter()
            .copied()
            .find(|key| key.as_str() == canonical)
    }
}

impl fmt::Display for KeySignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for KeySignature {
    type Err = KeySignatureError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        KeySignature::canonicalize(s).ok_or_else(|| KeySignatureError(s.to_string()))
    }
}

/// Alteration for `letter` under a raw key token; unknown tokens count as C
pub fn key_signature_alteration(letter: Letter, token: &str) -> i32 {
    KeySignature::canonicalize(token)
        .unwrap_or_default()
        .alteration(letter)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_canonicalize_case_and_glyphs() {
        assert_eq!(KeySignature::canonicalize("gb"), Some(KeySignature::Gb));
        assert_eq!(KeySignature::canonicalize("G♭"), Some(KeySignature::Gb));
        assert_eq!(KeySignature::canonicalize("f♯"), Some(KeySignature::FSharp));
        assert_eq!(KeySignature::canonicalize("  Db major "), Some(KeySignature::Db));
        assert_eq!(KeySignature::canonicalize("Dm"), Some(KeySignature::D));
        assert_eq!(KeySignature::canonicalize("bb"), Some(KeySignature::Bb));
    }

    #[test]
    fn test_canonicalize_rejects_unsupported() {
        assert_eq!(KeySignature::canonicalize("H"), None);
        assert_eq!(KeySignature::canonicalize(""), None);
        assert_eq!(KeySignature::canonicalize("   "), None);
        assert_eq!(KeySignature::canonicalize("G#"), None);
        assert_eq!(KeySignature::canonicalize("Fx"), None);
        assert_eq!(KeySignature::canonicalize("Fbb"), None);
    }

    #[test]
    fn test_every_key_roundtrips_through_its_name() {
        for key in KeySignature::ALL {
            assert_eq!(KeySignature::canonicalize(key.as_str()), Some(key));
        }
    }

    #[test]
    fn test_alterations() {
        assert_eq!(KeySignature::D.alteration(Letter::F), 1);
        assert_eq!(KeySignature::D.alteration(Letter::C), 1);
        assert_eq!(KeySignature::D.alteration(Letter::G), 0);
        assert_eq!(KeySignature::Db.alteration(Letter::G), -1);
        assert_eq!(KeySignature::Db.alteration(Letter::C), 0);
        assert_eq!(KeySignature::Cb.alterations().len(), 7);
        assert!(KeySignature::C.alterations().is_empty());
    }

    #[test]
    fn test_unknown_token_defaults_to_c() {
        assert_eq!(key_signature_alteration(Letter::F, "H"), 0);
        assert_eq!(key_signature_alteration(Letter::B, "F"), -1);
    }
}

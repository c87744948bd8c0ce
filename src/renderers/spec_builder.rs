//! NoteEntry → NoteSpec compiler
//!
//! Resolves backend keys, MIDI numbers, styles and, most importantly, which
//! accidental glyph each notehead must show under the current key signature.

use super::theme::StaffTheme;
use crate::models::{
    accidental_offset, Accidental, Clef, EntryContent, KeySignature, Letter, NoteEntry, NoteSpec,
    Pitch, SemanticState, Voice,
};

/// Accidental glyph to draw for a spelled note under `key`
///
/// - spelled alteration equals the key's alteration: nothing to draw;
/// - spelled natural against an altered letter: a natural sign;
/// - anything else: the spelled accidental itself (doubles included).
pub fn decide_displayed_accidental(
    letter: Letter,
    spelled: Option<Accidental>,
    key: KeySignature,
) -> Option<Accidental> {
    let base = key.alteration(letter);
    let offset = accidental_offset(spelled);
    if offset == base {
        None
    } else if offset == 0 {
        Some(Accidental::Natural)
    } else {
        spelled
    }
}

/// Builds render specs for one key signature, clef and theme
#[derive(Debug, Clone, PartialEq)]
pub struct NoteSpecBuilder {
    key: KeySignature,
    clef: Clef,
    theme: StaffTheme,
}

impl NoteSpecBuilder {
    pub fn new(key: KeySignature, clef: Clef, theme: StaffTheme) -> Self {
        Self { key, clef, theme }
    }

    pub fn key(&self) -> KeySignature {
        self.key
    }

    pub fn clef(&self) -> Clef {
        self.clef
    }

    /// Compile one entry; `None` when it has no valid pitch content
    pub fn build(&self, entry: &NoteEntry) -> Option<NoteSpec> {
        let clef = entry.clef.unwrap_or(self.clef);
        let (pitch_strings, member_states): (Vec<&str>, &[Option<SemanticState>]) = match &entry.content {
            EntryContent::Rest => return Some(NoteSpec::rest(entry.duration, entry.dots, clef)),
            EntryContent::Note(note) => (vec![note.as_str()], &[]),
            EntryContent::Chord {
                notes,
                per_note_states,
            } => (notes.iter().map(String::as_str).collect(), per_note_states.as_slice()),
        };

        let mut keys = Vec::with_capacity(pitch_strings.len());
        let mut accidentals = Vec::with_capacity(pitch_strings.len());
        let mut midis = Vec::with_capacity(pitch_strings.len());
        let mut key_styles = Vec::new();

        for (index, raw) in pitch_strings.iter().enumerate() {
            let Some(pitch) = Pitch::parse(raw) else {
                log::debug!("[NoteSpecBuilder] dropping unparseable pitch '{}'", raw);
                continue;
            };
            keys.push(pitch.key());
            accidentals.push(decide_displayed_accidental(pitch.letter, pitch.accidental, self.key));
            midis.push(pitch.midi());
            if !member_states.is_empty() {
                let state = member_states.get(index).copied().flatten();
                key_styles.push(state.and_then(|s| self.theme.style_for_state(s)));
            }
        }

        if keys.is_empty() {
            return None;
        }

        Some(NoteSpec {
            is_rest: false,
            duration: entry.duration,
            dots: entry.dots,
            clef,
            keys,
            accidentals,
            midis,
            style: self.theme.resolve_style(entry.style.as_ref(), entry.state),
            key_styles,
            stemless: entry.stemless,
        })
    }

    /// Compile a sequence, silently skipping entries without a spec
    pub fn build_all(&self, entries: &[NoteEntry]) -> Vec<NoteSpec> {
        entries.iter().filter_map(|entry| self.build(entry)).collect()
    }

    /// Compile a sequence into a voice on the builder's clef
    pub fn build_voice(&self, entries: &[NoteEntry]) -> Voice {
        Voice::new(self.clef, self.build_all(entries))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{NoteDuration, NoteStyle};

    fn builder(key: KeySignature) -> NoteSpecBuilder {
        NoteSpecBuilder::new(key, Clef::Treble, StaffTheme::default())
    }

    #[test]
    fn test_d_major_examples() {
        let b = builder(KeySignature::D);
        let natural = b.build(&NoteEntry::note("F4")).unwrap();
        assert_eq!(natural.accidentals, vec![Some(Accidental::Natural)]);

        let sharp = b.build(&NoteEntry::note("F#4")).unwrap();
        assert_eq!(sharp.accidentals, vec![None]);
        assert_eq!(sharp.keys, vec!["f#/4".to_string()]);
        assert_eq!(sharp.midis, vec![66]);

        let flat = b.build(&NoteEntry::note("Fb4")).unwrap();
        assert_eq!(flat.accidentals, vec![Some(Accidental::Flat)]);
    }

    #[test]
    fn test_rule_holds_for_every_key_letter_and_spelling() {
        let spellings = [
            None,
            Some(Accidental::Natural),
            Some(Accidental::Sharp),
            Some(Accidental::Flat),
            Some(Accidental::DoubleSharp),
            Some(Accidental::DoubleFlat),
        ];
        for key in KeySignature::ALL {
            for letter in Letter::ALL {
                for spelled in spellings {
                    let shown = decide_displayed_accidental(letter, spelled, key);
                    let matches_key = accidental_offset(spelled) == key.alteration(letter);
                    assert_eq!(shown.is_none(), matches_key, "{:?} {:?} in {}", letter, spelled, key);
                }
            }
        }
    }

    #[test]
    fn test_chord_members_resolve_independently() {
        let b = builder(KeySignature::D);
        let chord = NoteEntry::chord(["F4", "F#5", "C5"]);
        let spec = b.build(&chord).unwrap();
        assert_eq!(spec.keys, vec!["f/4", "f#/5", "c/5"]);
        assert_eq!(
            spec.accidentals,
            vec![Some(Accidental::Natural), None, Some(Accidental::Natural)]
        );
        assert!(spec.is_consistent());
    }

    #[test]
    fn test_invalid_pitches_are_dropped() {
        let b = builder(KeySignature::C);
        assert!(b.build(&NoteEntry::note("H4")).is_none());
        assert!(b.build(&NoteEntry::chord(["X1", "nope"])).is_none());

        let chord = NoteEntry::chord(["C4", "bad", "G4"]).with_per_note_states(vec![
            Some(SemanticState::Correct),
            Some(SemanticState::Incorrect),
            None,
        ]);
        let spec = b.build(&chord).unwrap();
        assert_eq!(spec.midis, vec![60, 67]);
        assert_eq!(spec.key_styles.len(), 2);
        assert_eq!(spec.key_styles[1], None);

        let specs = b.build_all(&[NoteEntry::note("C4"), NoteEntry::note("??"), NoteEntry::note("D4")]);
        assert_eq!(specs.len(), 2);
    }

    #[test]
    fn test_extreme_octaves_are_dropped() {
        let b = builder(KeySignature::C);
        assert!(b.build(&NoteEntry::note("C178956970")).is_none());
        let spec = b.build(&NoteEntry::chord(["C4", "B2147483647"])).unwrap();
        assert_eq!(spec.midis, vec![60]);
    }

    #[test]
    fn test_rests_pass_through() {
        let spec = builder(KeySignature::C)
            .build(&NoteEntry::rest(NoteDuration::Half, 1))
            .unwrap();
        assert!(spec.is_rest);
        assert_eq!(spec.duration, NoteDuration::Half);
        assert_eq!(spec.dots, 1);
        assert!(spec.keys.is_empty());
    }

    #[test]
    fn test_style_resolution() {
        let b = builder(KeySignature::C);
        let state_only = b.build(&NoteEntry::note("C4").with_state(SemanticState::Incorrect)).unwrap();
        assert_eq!(state_only.style, Some(NoteStyle::solid("#F44336")));

        let explicit = b
            .build(
                &NoteEntry::note("C4")
                    .with_state(SemanticState::Incorrect)
                    .with_style(NoteStyle::solid("#000000")),
            )
            .unwrap();
        assert_eq!(explicit.style, Some(NoteStyle::solid("#000000")));

        assert_eq!(b.build(&NoteEntry::note("C4")).unwrap().style, None);
    }

    #[test]
    fn test_entry_clef_overrides_builder_clef() {
        let b = builder(KeySignature::C);
        let spec = b.build(&NoteEntry::note("C3").with_clef(Clef::Bass)).unwrap();
        assert_eq!(spec.clef, Clef::Bass);
        assert_eq!(b.build_voice(&[NoteEntry::note("C4")]).clef, Clef::Treble);
    }

    #[test]
    fn test_build_is_deterministic() {
        let b = builder(KeySignature::Eb);
        let entries = vec![NoteEntry::note("E4"), NoteEntry::chord(["Ab3", "C4"])];
        assert_eq!(b.build_all(&entries), b.build_all(&entries));
    }
}

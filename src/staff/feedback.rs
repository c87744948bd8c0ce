//! Correctness marking and answer overlays
//!
//! Melodic answers are compared position by position. Harmonic answers are
//! compared as multisets of note names (trimmed, upper-cased), so voicing
//! order never matters.

use super::sequence::{sort_notes_ascending, DictationMode, StaffSequence};
use crate::models::{NoteDuration, NoteEntry, NoteStyle, SemanticState};
use std::collections::HashMap;

fn normalize(note: &str) -> String {
    note.trim().to_uppercase()
}

fn counts<S: AsRef<str>>(notes: &[S]) -> HashMap<String, usize> {
    let mut counts = HashMap::new();
    for note in notes {
        *counts.entry(normalize(note.as_ref())).or_insert(0) += 1;
    }
    counts
}

fn state_for(correct: bool) -> SemanticState {
    if correct {
        SemanticState::Correct
    } else {
        SemanticState::Incorrect
    }
}

/// Multiset equality of two chords
pub fn compare_harmonic_sequences<S: AsRef<str>>(target: &[S], attempt: &[S]) -> bool {
    if target.len() != attempt.len() {
        return false;
    }
    let mut remaining = counts(target);
    for note in attempt {
        match remaining.get_mut(&normalize(note.as_ref())) {
            Some(count) if *count > 0 => *count -= 1,
            _ => return false,
        }
    }
    true
}

/// Per-position marks for the first `min(entry_count, target.len())` entries
///
/// Positions the user has not reached stay `None`.
pub fn comparison_states<S: AsRef<str>>(entry_count: usize, target: &[S], user: &[S]) -> Vec<Option<SemanticState>> {
    let limit = entry_count.min(target.len());
    (0..limit)
        .map(|i| {
            user.get(i)
                .map(|attempt| state_for(attempt.as_ref() == target[i].as_ref()))
        })
        .collect()
}

/// Mark each chord member against the target, consuming target matches
pub fn harmonic_note_states<S: AsRef<str>, T: AsRef<str>>(chord: &[S], target: &[T]) -> Vec<SemanticState> {
    let mut remaining = HashMap::new();
    for note in target {
        *remaining.entry(normalize(note.as_ref())).or_insert(0usize) += 1;
    }
    chord
        .iter()
        .map(|note| match remaining.get_mut(&normalize(note.as_ref())) {
            Some(count) if *count > 0 => {
                *count -= 1;
                SemanticState::Correct
            }
            _ => SemanticState::Incorrect,
        })
        .collect()
}

impl StaffSequence {
    /// Colour the current entries by comparing `user` against `target`
    ///
    /// In harmonic mode the chord gets an overall state (`is_correct` when
    /// given, otherwise a multiset comparison) plus per-member states.
    pub fn apply_comparison(&mut self, target: &[String], user: &[String], is_correct: Option<bool>) -> bool {
        if target.is_empty() {
            return false;
        }

        if self.mode() == DictationMode::Harmonic {
            let Some(existing) = self.note_entries.first() else {
                return false;
            };
            let correct = is_correct.unwrap_or_else(|| compare_harmonic_sequences(target, user));
            let spelled: Vec<String> = target.iter().map(|n| self.spell(n)).collect();
            let chord: Vec<String> = existing.pitches().into_iter().map(str::to_string).collect();
            let per_note: Vec<Option<SemanticState>> =
                harmonic_note_states(&chord, &spelled).into_iter().map(Some).collect();

            let mut entry = NoteEntry::chord(chord.clone())
                .with_duration(existing.duration, existing.dots)
                .with_state(state_for(correct))
                .with_per_note_states(per_note);
            entry.style = existing.style.clone();
            entry.clef = existing.clef;
            self.note_entries = vec![entry];
            if let Some(staff_note) = self.staff_notes.first_mut() {
                staff_note.notes = chord;
                staff_note.state = Some(state_for(correct));
            }
            return true;
        }

        let states = comparison_states(self.note_entries.len(), target, user);
        for (i, state) in states.into_iter().enumerate() {
            let Some(state) = state else { continue };
            self.note_entries[i].state = Some(state);
            if let Some(staff_note) = self.staff_notes.get_mut(i) {
                staff_note.state = Some(state);
            }
        }
        true
    }

    /// Overlay entries that reveal the correct answer
    ///
    /// Melodic: a transparent quarter rest where the user already matched,
    /// otherwise the target note. Harmonic: one whole-note chord of the
    /// target members the user's chord is missing.
    pub fn build_answer_overlay(&self, target: &[String], user: Option<&[String]>) -> Vec<NoteEntry> {
        let notes: Vec<&str> = target.iter().map(String::as_str).filter(|n| !n.is_empty()).collect();
        if notes.is_empty() {
            return Vec::new();
        }

        if self.mode() == DictationMode::Harmonic {
            let spelled: Vec<String> = notes.iter().map(|n| self.spell(n)).collect();
            let spelled_target = sort_notes_ascending(&spelled);
            let user_notes: Vec<String> = match self.note_entries.first() {
                Some(entry) => entry.pitches().into_iter().map(|n| self.spell(n)).collect(),
                None => user
                    .unwrap_or_default()
                    .iter()
                    .map(|n| self.spell(n))
                    .collect(),
            };
            let needed = counts(&spelled_target);
            let mut have = counts(&user_notes);
            let mut missing = Vec::new();
            for note in &spelled_target {
                let key = normalize(note);
                let need = needed.get(&key).copied().unwrap_or(0);
                let count = have.entry(key).or_insert(0);
                if *count < need {
                    missing.push(note.clone());
                    *count += 1;
                }
            }
            if missing.is_empty() {
                return Vec::new();
            }
            let sorted = sort_notes_ascending(&missing);
            return vec![NoteEntry::chord(sorted)
                .with_duration(NoteDuration::Whole, 0)
                .with_state(SemanticState::Answer)];
        }

        let spelled: Vec<String> = notes.iter().map(|n| self.spell(n)).collect();
        let user_spelled: Option<Vec<String>> = match user {
            Some(user) if user.len() == spelled.len() => Some(user.iter().map(|n| self.spell(n)).collect()),
            _ if self.note_entries.len() == spelled.len() => Some(
                self.note_entries
                    .iter()
                    .map(|e| e.pitches().first().map_or_else(|| "?".to_string(), |n| n.to_string()))
                    .collect(),
            ),
            _ => None,
        };

        let stemless = self.melodic_stemless();
        spelled
            .into_iter()
            .enumerate()
            .map(|(i, note)| {
                let matched = user_spelled
                    .as_ref()
                    .and_then(|u| u.get(i))
                    .is_some_and(|u| *u == note);
                if matched {
                    NoteEntry::rest(NoteDuration::Quarter, 0)
                        .with_state(SemanticState::Answer)
                        .with_style(NoteStyle::transparent())
                } else {
                    NoteEntry::note(note)
                        .with_state(SemanticState::Answer)
                        .stemless(stemless)
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::EntryContent;
    use crate::staff::sequence::InsertOptions;

    fn strings(notes: &[&str]) -> Vec<String> {
        notes.iter().map(|n| n.to_string()).collect()
    }

    #[test]
    fn test_compare_harmonic_sequences_is_a_multiset() {
        assert!(compare_harmonic_sequences(&["C4", "E4", "G4"], &["g4 ", "c4", "E4"]));
        assert!(!compare_harmonic_sequences(&["C4", "C4", "G4"], &["C4", "G4", "G4"]));
        assert!(!compare_harmonic_sequences(&["C4", "E4"], &["C4"]));
    }

    #[test]
    fn test_comparison_states_stop_at_user_length() {
        let states = comparison_states(3, &["C4", "D4", "E4", "F4"], &["C4", "E4"]);
        assert_eq!(
            states,
            vec![Some(SemanticState::Correct), Some(SemanticState::Incorrect), None]
        );
    }

    #[test]
    fn test_melodic_apply_comparison() {
        let mut seq = StaffSequence::new(DictationMode::Melodic);
        for note in ["C4", "E4"] {
            seq.insert_note(note, InsertOptions::default());
        }
        assert!(seq.apply_comparison(&strings(&["C4", "D4"]), &strings(&["C4", "E4"]), None));
        assert_eq!(seq.entries()[0].state, Some(SemanticState::Correct));
        assert_eq!(seq.entries()[1].state, Some(SemanticState::Incorrect));
        assert_eq!(seq.staff_notes()[1].state, Some(SemanticState::Incorrect));
        assert!(!seq.apply_comparison(&[], &[], None));
    }

    #[test]
    fn test_harmonic_apply_comparison_marks_members() {
        let mut seq = StaffSequence::new(DictationMode::Harmonic);
        for note in ["C4", "F4", "G4"] {
            seq.insert_note(note, InsertOptions::default());
        }
        let target = strings(&["C4", "E4", "G4"]);
        seq.apply_comparison(&target, &strings(&["C4", "F4", "G4"]), None);
        let entry = &seq.entries()[0];
        assert_eq!(entry.state, Some(SemanticState::Incorrect));
        match &entry.content {
            EntryContent::Chord { per_note_states, .. } => assert_eq!(
                per_note_states,
                &vec![
                    Some(SemanticState::Correct),
                    Some(SemanticState::Incorrect),
                    Some(SemanticState::Correct)
                ]
            ),
            other => panic!("expected chord, got {:?}", other),
        }
    }

    #[test]
    fn test_melodic_answer_overlay() {
        let seq = StaffSequence::new(DictationMode::Melodic);
        let target = strings(&["C4", "D4", "E4"]);
        let user = strings(&["C4", "F4", "E4"]);
        let overlay = seq.build_answer_overlay(&target, Some(&user));
        assert_eq!(overlay.len(), 3);
        assert!(overlay[0].is_rest());
        assert_eq!(overlay[0].style, Some(NoteStyle::transparent()));
        assert_eq!(overlay[1].content, EntryContent::Note("D4".to_string()));
        assert_eq!(overlay[1].state, Some(SemanticState::Answer));
        assert!(overlay[2].is_rest());
    }

    #[test]
    fn test_harmonic_answer_overlay_lists_missing_members() {
        let mut seq = StaffSequence::new(DictationMode::Harmonic);
        seq.insert_note("G4", InsertOptions::default());
        seq.insert_note("C4", InsertOptions::default());
        let overlay = seq.build_answer_overlay(&strings(&["G4", "E4", "C4", "Bb4"]), None);
        assert_eq!(overlay.len(), 1);
        assert_eq!(overlay[0].pitches(), vec!["E4", "Bb4"]);
        assert_eq!(overlay[0].duration, NoteDuration::Whole);
        assert_eq!(overlay[0].state, Some(SemanticState::Answer));

        let full = seq.build_answer_overlay(&strings(&["C4", "G4"]), None);
        assert!(full.is_empty());
    }
}

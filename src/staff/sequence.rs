//! Staff note sequence bookkeeping
//!
//! `StaffSequence` keeps the semantic entries handed to the display and a
//! parallel list of `StaffNote` records used for hit-testing. The two lists
//! always have the same length in melodic mode. In harmonic mode all input
//! collects into a single ascending whole-note chord.

use super::display::StaffDisplay;
use super::shared::{normalize_insert_index, reindex_staff_notes, StaffNote};
use crate::models::{Letter, NoteDuration, NoteEntry, SemanticState};
use crate::renderers::TaskHandle;
use serde::{Deserialize, Serialize};

/// Visible window used when the caller gives no limit
pub const DEFAULT_VISIBLE_LIMIT: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DictationMode {
    #[default]
    Melodic,
    Harmonic,
}

/// Maps an incoming note name to its display spelling
pub type Speller = Box<dyn Fn(&str) -> String>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct InsertOptions {
    pub index: Option<isize>,
    /// Explicit state; otherwise `draft` or `user`
    pub state: Option<SemanticState>,
    pub is_draft: bool,
}

impl InsertOptions {
    fn resolved_state(&self) -> SemanticState {
        self.state.unwrap_or(if self.is_draft {
            SemanticState::Draft
        } else {
            SemanticState::User
        })
    }
}

// ============================================================================
// Note utilities
// ============================================================================

fn wide_accidental_offset(token: &str) -> Option<i32> {
    let offset = match token {
        "" => 0,
        "#" | "♯" => 1,
        "##" | "x" | "𝄪" => 2,
        "###" => 3,
        "b" | "♭" => -1,
        "bb" | "𝄫" => -2,
        "bbb" => -3,
        _ if token.chars().count() <= 3
            && token.chars().all(|c| matches!(c, '#' | '♯' | 'x' | '𝄪' | 'b' | '♭' | '𝄫')) =>
        {
            0
        }
        _ => return None,
    };
    Some(offset)
}

/// Rough MIDI number for ordering notes; `None` when the name is unreadable
///
/// Accepts up to three accidental symbols, unlike `note_to_midi`.
pub fn estimate_midi(note: &str) -> Option<i32> {
    let trimmed = note.trim();
    let mut chars = trimmed.chars();
    let letter = Letter::from_char(chars.next()?)?;
    let rest = chars.as_str();
    let octave_start = rest.find(|c: char| c == '-' || c.is_ascii_digit())?;
    let (accidental, octave) = rest.split_at(octave_start);
    let digits = octave.strip_prefix('-').unwrap_or(octave);
    if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    let octave: i32 = octave.parse().ok()?;
    let offset = wide_accidental_offset(accidental)?;
    Some((octave + 1) * 12 + letter.semitone() + offset)
}

/// Stable ascending sort by estimated pitch; unreadable names sort first
pub fn sort_notes_ascending<S: AsRef<str>>(notes: &[S]) -> Vec<String> {
    let mut sorted: Vec<String> = notes.iter().map(|n| n.as_ref().to_string()).collect();
    sorted.sort_by_key(|n| estimate_midi(n));
    sorted
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum SequenceDiff {
    Insert { index: usize, note: String },
    Delete { index: usize },
    Update { index: usize, note: String },
}

/// Per-position differences between two sequences
pub fn diff_sequences<S: AsRef<str>>(prev: &[S], next: &[S]) -> Vec<SequenceDiff> {
    let max = prev.len().max(next.len());
    (0..max)
        .filter_map(|index| match (prev.get(index), next.get(index)) {
            (None, Some(b)) => Some(SequenceDiff::Insert {
                index,
                note: b.as_ref().to_string(),
            }),
            (Some(_), None) => Some(SequenceDiff::Delete { index }),
            (Some(a), Some(b)) if a.as_ref() != b.as_ref() => Some(SequenceDiff::Update {
                index,
                note: b.as_ref().to_string(),
            }),
            _ => None,
        })
        .collect()
}

// ============================================================================
// Sequence
// ============================================================================

pub struct StaffSequence {
    mode: DictationMode,
    stemless: bool,
    speller: Option<Speller>,
    pub(crate) note_entries: Vec<NoteEntry>,
    pub(crate) staff_notes: Vec<StaffNote>,
}

impl Default for StaffSequence {
    fn default() -> Self {
        Self::new(DictationMode::default())
    }
}

impl StaffSequence {
    pub fn new(mode: DictationMode) -> Self {
        Self {
            mode,
            stemless: false,
            speller: None,
            note_entries: Vec::new(),
            staff_notes: Vec::new(),
        }
    }

    pub fn with_speller(mut self, speller: impl Fn(&str) -> String + 'static) -> Self {
        self.speller = Some(Box::new(speller));
        self
    }

    /// Draw melodic notes without stems
    pub fn with_stemless(mut self, stemless: bool) -> Self {
        self.stemless = stemless;
        self
    }

    pub fn mode(&self) -> DictationMode {
        self.mode
    }

    /// Switching modes drops the current content
    pub fn set_mode(&mut self, mode: DictationMode) {
        if self.mode != mode {
            self.mode = mode;
            self.clear();
        }
    }

    pub fn entries(&self) -> &[NoteEntry] {
        &self.note_entries
    }

    pub fn staff_notes(&self) -> &[StaffNote] {
        &self.staff_notes
    }

    pub fn len(&self) -> usize {
        self.note_entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.note_entries.is_empty()
    }

    pub fn spell(&self, note: &str) -> String {
        match &self.speller {
            Some(speller) => speller(note),
            None => note.trim().to_string(),
        }
    }

    pub(crate) fn melodic_stemless(&self) -> bool {
        self.stemless && self.mode == DictationMode::Melodic
    }

    fn chord_entry(notes: Vec<String>, state: Option<SemanticState>) -> NoteEntry {
        let mut entry = NoteEntry::chord(notes).with_duration(NoteDuration::Whole, 0);
        entry.state = state;
        entry
    }

    fn melodic_entry(&self, notes: Vec<String>, state: SemanticState) -> NoteEntry {
        let entry = if notes.len() == 1 {
            NoteEntry::note(notes[0].clone())
        } else {
            NoteEntry::chord(notes)
        };
        entry.with_state(state).stemless(self.melodic_stemless())
    }

    /// Add one note; returns the entry index it landed in
    pub fn insert_note(&mut self, note: &str, options: InsertOptions) -> Option<usize> {
        if note.trim().is_empty() {
            return None;
        }
        let state = options.resolved_state();
        let spelled = self.spell(note);

        if self.mode == DictationMode::Harmonic {
            let mut notes: Vec<String> = self
                .note_entries
                .first()
                .map(|e| e.pitches().into_iter().map(str::to_string).collect())
                .unwrap_or_default();
            notes.push(spelled);
            let sorted = sort_notes_ascending(&notes);
            self.note_entries = vec![Self::chord_entry(sorted.clone(), Some(state))];
            self.staff_notes = vec![StaffNote::new(sorted, 0, Some(state))];
            return Some(0);
        }

        Some(self.insert_melodic(vec![spelled], state, options.index))
    }

    fn insert_melodic(&mut self, notes: Vec<String>, state: SemanticState, index: Option<isize>) -> usize {
        let target = normalize_insert_index(index, self.note_entries.len());
        let entry = self.melodic_entry(notes.clone(), state);
        self.note_entries.insert(target, entry);
        self.staff_notes
            .insert(target.min(self.staff_notes.len()), StaffNote::new(notes, target, Some(state)));
        reindex_staff_notes(&mut self.staff_notes, target + 1);
        target
    }

    /// Add notes, then drop the oldest entries beyond `max_visible`
    ///
    /// Several notes in melodic mode become one chord entry. A limit of zero
    /// is treated as one.
    pub fn show_with_limit(&mut self, notes: &[&str], max_visible: usize, options: InsertOptions) -> bool {
        let notes: Vec<&str> = notes.iter().copied().filter(|n| !n.trim().is_empty()).collect();
        if notes.is_empty() {
            return false;
        }

        if self.mode == DictationMode::Harmonic {
            for note in notes {
                self.insert_note(note, options);
            }
        } else {
            let spelled = notes.iter().map(|n| self.spell(n)).collect();
            self.insert_melodic(spelled, options.resolved_state(), options.index);
        }

        let limit = max_visible.max(1);
        if self.note_entries.len() > limit {
            let drop = self.note_entries.len() - limit;
            self.note_entries.drain(..drop);
            let staff_drop = drop.min(self.staff_notes.len());
            self.staff_notes.drain(..staff_drop);
            reindex_staff_notes(&mut self.staff_notes, 0);
        }
        true
    }

    /// Replace the note at `index`; in harmonic mode the chord's last member
    pub fn update_note_at(&mut self, index: usize, note: &str) -> bool {
        if note.trim().is_empty() {
            return false;
        }
        let spelled = self.spell(note);
        let stemless = self.melodic_stemless();
        let harmonic = self.mode == DictationMode::Harmonic;
        let Some(entry) = self.note_entries.get_mut(index) else {
            return false;
        };

        if harmonic {
            let mut notes: Vec<String> = entry.pitches().into_iter().map(str::to_string).collect();
            match notes.last_mut() {
                Some(last) => *last = spelled,
                None => notes.push(spelled),
            }
            let notes = sort_notes_ascending(&notes);
            let state = entry.state;
            *entry = Self::chord_entry(notes.clone(), state);
            if let Some(staff_note) = self.staff_notes.first_mut() {
                staff_note.notes = notes;
            }
        } else {
            let mut updated = NoteEntry::note(spelled.clone());
            updated.state = entry.state;
            updated.style = entry.style.clone();
            updated.clef = entry.clef;
            updated.duration = entry.duration;
            updated.dots = entry.dots;
            updated.stemless = entry.stemless || stemless;
            *entry = updated;
            if let Some(staff_note) = self.staff_notes.get_mut(index) {
                staff_note.notes = vec![spelled];
            }
        }
        true
    }

    /// Remove the note at `index`; harmonic mode clamps to the last chord member
    pub fn remove_note_at(&mut self, index: usize) -> bool {
        if self.mode == DictationMode::Harmonic {
            let Some(entry) = self.note_entries.first() else {
                return false;
            };
            let mut notes: Vec<String> = entry.pitches().into_iter().map(str::to_string).collect();
            if notes.is_empty() {
                return false;
            }
            let target = index.min(notes.len() - 1);
            notes.remove(target);
            if notes.is_empty() {
                self.clear();
            } else {
                let state = entry.state;
                self.note_entries = vec![Self::chord_entry(notes.clone(), state)];
                if let Some(staff_note) = self.staff_notes.first_mut() {
                    staff_note.notes = notes;
                }
            }
            return true;
        }

        if index >= self.note_entries.len() {
            return false;
        }
        self.note_entries.remove(index);
        if index < self.staff_notes.len() {
            self.staff_notes.remove(index);
        }
        reindex_staff_notes(&mut self.staff_notes, index);
        true
    }

    pub fn clear(&mut self) {
        self.note_entries.clear();
        self.staff_notes.clear();
    }

    /// Push the current entries to a display
    pub fn present(&self, display: &mut StaffDisplay) -> TaskHandle {
        display.set_sequence(self.note_entries.clone())
    }

    /// Clear the sequence and everything layered over it on the display
    pub fn clear_display(&mut self, display: &mut StaffDisplay) -> TaskHandle {
        self.clear();
        display.clear_highlight();
        display.clear_overlay();
        display.set_sequence(Vec::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::EntryContent;

    #[test]
    fn test_estimate_midi() {
        assert_eq!(estimate_midi("C4"), Some(60));
        assert_eq!(estimate_midi(" a4 "), Some(69));
        assert_eq!(estimate_midi("C###4"), Some(63));
        assert_eq!(estimate_midi("Dbbb4"), Some(59));
        assert_eq!(estimate_midi("B-1"), Some(11));
        assert_eq!(estimate_midi("H4"), None);
        assert_eq!(estimate_midi("C"), None);
        assert_eq!(estimate_midi(""), None);
    }

    #[test]
    fn test_sort_notes_ascending_is_stable() {
        let sorted = sort_notes_ascending(&["G4", "C#4", "Db4", "C4", "junk"]);
        assert_eq!(sorted, vec!["junk", "C4", "C#4", "Db4", "G4"]);
    }

    #[test]
    fn test_diff_sequences() {
        let diffs = diff_sequences(&["C4", "D4", "E4"], &["C4", "F4"]);
        assert_eq!(
            diffs,
            vec![
                SequenceDiff::Update {
                    index: 1,
                    note: "F4".to_string()
                },
                SequenceDiff::Delete { index: 2 },
            ]
        );
        let diffs = diff_sequences::<&str>(&[], &["A4"]);
        assert_eq!(
            diffs,
            vec![SequenceDiff::Insert {
                index: 0,
                note: "A4".to_string()
            }]
        );
    }

    #[test]
    fn test_melodic_insert_keeps_lists_in_step() {
        let mut seq = StaffSequence::new(DictationMode::Melodic);
        seq.insert_note("C4", InsertOptions::default());
        seq.insert_note("E4", InsertOptions::default());
        let index = seq.insert_note(
            "D4",
            InsertOptions {
                index: Some(1),
                is_draft: true,
                ..InsertOptions::default()
            },
        );
        assert_eq!(index, Some(1));
        let pitches: Vec<&str> = seq.entries().iter().flat_map(|e| e.pitches()).collect();
        assert_eq!(pitches, vec!["C4", "D4", "E4"]);
        assert_eq!(seq.entries()[1].state, Some(SemanticState::Draft));
        assert_eq!(seq.entries()[0].state, Some(SemanticState::User));
        let indices: Vec<usize> = seq.staff_notes().iter().map(|n| n.index).collect();
        assert_eq!(indices, vec![0, 1, 2]);

        assert!(seq.remove_note_at(0));
        let indices: Vec<usize> = seq.staff_notes().iter().map(|n| n.index).collect();
        assert_eq!(indices, vec![0, 1]);
        assert!(!seq.remove_note_at(5));
        assert_eq!(seq.insert_note("  ", InsertOptions::default()), None);
    }

    #[test]
    fn test_harmonic_mode_builds_one_sorted_chord() {
        let mut seq = StaffSequence::new(DictationMode::Harmonic);
        seq.insert_note("G4", InsertOptions::default());
        seq.insert_note("C4", InsertOptions::default());
        seq.insert_note("E4", InsertOptions::default());
        assert_eq!(seq.len(), 1);
        let entry = &seq.entries()[0];
        assert_eq!(entry.pitches(), vec!["C4", "E4", "G4"]);
        assert_eq!(entry.duration, NoteDuration::Whole);

        assert!(seq.update_note_at(0, "A4"));
        assert_eq!(seq.entries()[0].pitches(), vec!["C4", "E4", "A4"]);

        // A replacement below the other members moves to the bottom.
        assert!(seq.update_note_at(0, "A3"));
        assert_eq!(seq.entries()[0].pitches(), vec!["A3", "C4", "E4"]);
        assert_eq!(seq.staff_notes()[0].notes, vec!["A3", "C4", "E4"]);
        assert!(seq.update_note_at(0, "G4"));
        assert_eq!(seq.entries()[0].pitches(), vec!["A3", "C4", "G4"]);

        assert!(seq.remove_note_at(9));
        assert_eq!(seq.entries()[0].pitches(), vec!["A3", "C4"]);
        assert_eq!(seq.staff_notes()[0].notes, vec!["A3", "C4"]);
        seq.remove_note_at(0);
        seq.remove_note_at(0);
        assert!(seq.is_empty());
        assert!(seq.staff_notes().is_empty());
    }

    #[test]
    fn test_show_with_limit_drops_oldest() {
        let mut seq = StaffSequence::new(DictationMode::Melodic).with_stemless(true);
        for note in ["C4", "D4", "E4", "F4"] {
            seq.show_with_limit(&[note], 3, InsertOptions::default());
        }
        let pitches: Vec<&str> = seq.entries().iter().flat_map(|e| e.pitches()).collect();
        assert_eq!(pitches, vec!["D4", "E4", "F4"]);
        assert!(seq.entries().iter().all(|e| e.stemless));
        assert_eq!(seq.staff_notes()[0].index, 0);

        seq.show_with_limit(&["G4", "B4"], 0, InsertOptions::default());
        assert_eq!(seq.len(), 1);
        assert!(matches!(seq.entries()[0].content, EntryContent::Chord { .. }));
        assert!(!seq.show_with_limit(&[], 3, InsertOptions::default()));
    }

    #[test]
    fn test_speller_applies_to_input() {
        let mut seq = StaffSequence::new(DictationMode::Melodic).with_speller(|n| n.trim().replace("C#", "Db"));
        seq.insert_note("C#4", InsertOptions::default());
        assert_eq!(seq.entries()[0].pitches(), vec!["Db4"]);
        seq.update_note_at(0, "C#5");
        assert_eq!(seq.entries()[0].pitches(), vec!["Db5"]);
    }
}

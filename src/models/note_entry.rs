//! Semantic note entries supplied by the host
//!
//! A `NoteEntry` describes what should appear on the staff (a note, a chord
//! or a rest) together with an optional semantic state such as `correct` or
//! `draft`. Entries are compiled into render specs by the spec builder.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Semantic state of an entry, mapped to colours by the theme
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SemanticState {
    User,
    Correct,
    Incorrect,
    Draft,
    Highlight,
    Answer,
}

impl SemanticState {
    pub fn as_str(&self) -> &'static str {
        match self {
            SemanticState::User => "user",
            SemanticState::Correct => "correct",
            SemanticState::Incorrect => "incorrect",
            SemanticState::Draft => "draft",
            SemanticState::Highlight => "highlight",
            SemanticState::Answer => "answer",
        }
    }
}

impl FromStr for SemanticState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(SemanticState::User),
            "correct" => Ok(SemanticState::Correct),
            "incorrect" => Ok(SemanticState::Incorrect),
            "draft" => Ok(SemanticState::Draft),
            "highlight" => Ok(SemanticState::Highlight),
            "answer" => Ok(SemanticState::Answer),
            _ => Err(format!("Invalid semantic state: '{}'", s)),
        }
    }
}

/// Note value, serialized with the drawing backend's duration codes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum NoteDuration {
    #[serde(rename = "w")]
    Whole,
    #[serde(rename = "h")]
    Half,
    #[default]
    #[serde(rename = "q")]
    Quarter,
    #[serde(rename = "8")]
    Eighth,
    #[serde(rename = "16")]
    Sixteenth,
    #[serde(rename = "32")]
    ThirtySecond,
}

impl NoteDuration {
    pub fn code(&self) -> &'static str {
        match self {
            NoteDuration::Whole => "w",
            NoteDuration::Half => "h",
            NoteDuration::Quarter => "q",
            NoteDuration::Eighth => "8",
            NoteDuration::Sixteenth => "16",
            NoteDuration::ThirtySecond => "32",
        }
    }
}

/// Staff clef
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Clef {
    #[default]
    Treble,
    Bass,
    Alto,
    Tenor,
}

impl Clef {
    pub fn as_str(&self) -> &'static str {
        match self {
            Clef::Treble => "treble",
            Clef::Bass => "bass",
            Clef::Alto => "alto",
            Clef::Tenor => "tenor",
        }
    }
}

impl fmt::Display for Clef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Clef {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "treble" => Ok(Clef::Treble),
            "bass" => Ok(Clef::Bass),
            "alto" => Ok(Clef::Alto),
            "tenor" => Ok(Clef::Tenor),
            _ => Err(format!("Invalid clef: '{}'", s)),
        }
    }
}

/// Explicit fill/stroke override; wins over any semantic state
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NoteStyle {
    #[serde(default, skip_serializing_if = "Option::is_none", alias = "fill")]
    pub fill_style: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none", alias = "stroke")]
    pub stroke_style: Option<String>,
}

impl NoteStyle {
    /// Same colour for fill and stroke
    pub fn solid(color: &str) -> Self {
        Self {
            fill_style: Some(color.to_string()),
            stroke_style: Some(color.to_string()),
        }
    }

    /// Invisible placeholder style
    pub fn transparent() -> Self {
        Self::solid("transparent")
    }

    /// Stroke falls back to fill when only one colour is given
    pub fn normalized(&self) -> NoteStyle {
        NoteStyle {
            fill_style: self.fill_style.clone(),
            stroke_style: self.stroke_style.clone().or_else(|| self.fill_style.clone()),
        }
    }
}

/// What an entry puts on the staff
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum EntryContent {
    Note(String),
    Chord {
        notes: Vec<String>,
        per_note_states: Vec<Option<SemanticState>>,
    },
    Rest,
}

/// A semantic staff entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "RawNoteEntry", into = "RawNoteEntry")]
pub struct NoteEntry {
    pub content: EntryContent,
    pub duration: NoteDuration,
    pub dots: u8,
    pub state: Option<SemanticState>,
    pub style: Option<NoteStyle>,
    pub clef: Option<Clef>,
    pub stemless: bool,
}

impl NoteEntry {
    fn with_content(content: EntryContent) -> Self {
        Self {
            content,
            duration: NoteDuration::default(),
            dots: 0,
            state: None,
            style: None,
            clef: None,
            stemless: false,
        }
    }

    /// Single note entry
    pub fn note(pitch: impl Into<String>) -> Self {
        Self::with_content(EntryContent::Note(pitch.into()))
    }

    /// Chord entry; member order is kept as given
    pub fn chord<I, S>(notes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::with_content(EntryContent::Chord {
            notes: notes.into_iter().map(Into::into).collect(),
            per_note_states: Vec::new(),
        })
    }

    /// Rest entry
    pub fn rest(duration: NoteDuration, dots: u8) -> Self {
        Self {
            duration,
            dots,
            ..Self::with_content(EntryContent::Rest)
        }
    }

    pub fn with_state(mut self, state: SemanticState) -> Self {
        self.state = Some(state);
        self
    }

    pub fn with_style(mut self, style: NoteStyle) -> Self {
        self.style = Some(style);
        self
    }

    pub fn with_duration(mut self, duration: NoteDuration, dots: u8) -> Self {
        self.duration = duration;
        self.dots = dots;
        self
    }

    pub fn with_clef(mut self, clef: Clef) -> Self {
        self.clef = Some(clef);
        self
    }

    pub fn stemless(mut self, stemless: bool) -> Self {
        self.stemless = stemless;
        self
    }

    pub fn with_per_note_states(mut self, states: Vec<Option<SemanticState>>) -> Self {
        if let EntryContent::Chord { per_note_states, .. } = &mut self.content {
            *per_note_states = states;
        }
        self
    }

    pub fn is_rest(&self) -> bool {
        matches!(self.content, EntryContent::Rest)
    }

    /// Pitch strings carried by the entry (empty for rests)
    pub fn pitches(&self) -> Vec<&str> {
        match &self.content {
            EntryContent::Note(note) => vec![note.as_str()],
            EntryContent::Chord { notes, .. } => notes.iter().map(String::as_str).collect(),
            EntryContent::Rest => Vec::new(),
        }
    }
}

// ============================================================================
// Wire shape shared with the JavaScript host
// ============================================================================

/// Flat JS object form: `{ note }`, `{ notes, perNoteStates }` or `{ isRest }`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawNoteEntry {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    note: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    notes: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    per_note_states: Option<Vec<Option<SemanticState>>>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    is_rest: bool,
    #[serde(default)]
    duration: Option<NoteDuration>,
    #[serde(default)]
    dots: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    state: Option<SemanticState>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    style: Option<NoteStyle>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    clef: Option<Clef>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    stemless: bool,
}

impl From<RawNoteEntry> for NoteEntry {
    fn from(raw: RawNoteEntry) -> Self {
        let content = if raw.is_rest {
            EntryContent::Rest
        } else {
            match (raw.notes, raw.note) {
                // A one-note `notes` list is how the app spells a melodic entry.
                (Some(mut notes), _) if notes.len() == 1 && raw.per_note_states.is_none() => {
                    EntryContent::Note(notes.remove(0))
                }
                (Some(notes), _) if !notes.is_empty() => EntryContent::Chord {
                    notes,
                    per_note_states: raw.per_note_states.unwrap_or_default(),
                },
                (_, Some(note)) => EntryContent::Note(note),
                // No pitch content at all; the builder drops it.
                (_, None) => EntryContent::Note(String::new()),
            }
        };
        NoteEntry {
            content,
            duration: raw.duration.unwrap_or_default(),
            dots: raw.dots.unwrap_or(0),
            state: raw.state,
            style: raw.style,
            clef: raw.clef,
            stemless: raw.stemless,
        }
    }
}

impl From<NoteEntry> for RawNoteEntry {
    fn from(entry: NoteEntry) -> Self {
        let mut raw = RawNoteEntry {
            duration: Some(entry.duration),
            dots: Some(entry.dots),
            state: entry.state,
            style: entry.style,
            clef: entry.clef,
            stemless: entry.stemless,
            ..RawNoteEntry::default()
        };
        match entry.content {
            EntryContent::Note(note) => raw.note = Some(note),
            EntryContent::Chord {
                notes,
                per_note_states,
            } => {
                raw.note = notes.first().cloned();
                raw.notes = Some(notes);
                if !per_note_states.is_empty() {
                    raw.per_note_states = Some(per_note_states);
                }
            }
            EntryContent::Rest => raw.is_rest = true,
        }
        raw
    }
}

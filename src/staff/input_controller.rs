//! Staff input state machine
//!
//! Routes pointer edits on the staff into one of two host-owned sequences:
//! the free practice stack or the bounded answer stack. Each stack has its own
//! limit. The controller never leaves a stack longer than its limit and never
//! panics on bad input; malformed requests are no-ops.
//!
//! Phases change only through `set_enabled` and `set_phase`.

use super::shared::normalize_insert_index;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

pub const READY_TO_SUBMIT: &str = "Ready to submit your answer.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InputPhase {
    Disabled,
    Practice,
    Answer,
}

impl fmt::Display for InputPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            InputPhase::Disabled => "disabled",
            InputPhase::Practice => "practice",
            InputPhase::Answer => "answer",
        };
        write!(f, "{}", name)
    }
}

/// Anything other than `delete` is an insert
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InputOperation {
    Delete,
    #[default]
    #[serde(other)]
    Insert,
}

/// Pointer gesture phase reported with an input event
///
/// Only `move`, `end` and `cancel` are consumed without an edit; every other
/// phase applies like `start`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PointerPhase {
    Start,
    Move,
    End,
    Cancel,
    Commit,
    Delete,
    #[serde(other)]
    Other,
}

/// Whole, finite numbers become indices; anything else reads as absent
fn lenient_index<'de, D>(deserializer: D) -> Result<Option<isize>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(value
        .as_ref()
        .and_then(serde_json::Value::as_f64)
        .filter(|n| n.is_finite() && n.fract() == 0.0 && n.abs() <= isize::MAX as f64)
        .map(|n| n as isize))
}

/// Where and how a staff edit applies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct InputMeta {
    /// Existing note under the pointer, if any
    #[serde(deserialize_with = "lenient_index")]
    pub staff_index: Option<isize>,
    /// Requested insertion point
    #[serde(deserialize_with = "lenient_index")]
    pub insert_index: Option<isize>,
    pub operation: InputOperation,
    pub phase: Option<PointerPhase>,
}

impl InputMeta {
    pub fn insert() -> Self {
        Self::default()
    }

    pub fn insert_at(index: isize) -> Self {
        Self {
            insert_index: Some(index),
            ..Self::default()
        }
    }

    pub fn replace(index: isize) -> Self {
        Self {
            staff_index: Some(index),
            ..Self::default()
        }
    }

    pub fn delete(index: isize) -> Self {
        Self {
            staff_index: Some(index),
            operation: InputOperation::Delete,
            ..Self::default()
        }
    }

    pub fn with_phase(mut self, phase: PointerPhase) -> Self {
        self.phase = Some(phase);
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ChangeReason {
    Insert,
    Update,
    Override,
    Delete,
    Reset,
    LimitTrim,
}

/// Metadata passed with every sequence change
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeMeta {
    pub reason: ChangeReason,
    pub staff_index: Option<usize>,
    /// Set for answer changes
    pub requires_submit: Option<bool>,
}

/// Round context supplied by the host
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AnswerContext {
    pub target_length: usize,
    pub requires_submit: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnswerReadyInfo {
    pub requires_submit: bool,
    pub message: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PreviewOptions {
    pub allow_while_playing: bool,
    pub duration: Option<Duration>,
}

/// Audio preview service; fire-and-forget
pub trait PitchPreview {
    fn preview_pitch(&mut self, note: &str, options: PreviewOptions);
}

/// Staff input mode pushed to the pointer layer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StaffInputMode {
    pub enabled: bool,
    pub midi_min: Option<i32>,
    pub midi_max: Option<i32>,
}

/// Pointer layer that accepts staff input modes
pub trait StaffInputSurface {
    fn set_staff_input_mode(&mut self, mode: StaffInputMode);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EnableOptions {
    pub phase: Option<InputPhase>,
    pub midi_min: Option<i32>,
    pub midi_max: Option<i32>,
}

// ============================================================================
// Options
// ============================================================================

pub type SequenceGetter = Box<dyn Fn() -> Option<Vec<String>>>;
pub type SequenceSetter = Box<dyn FnMut(&[String])>;
pub type LimitGetter = Box<dyn Fn() -> usize>;
pub type ChangeCallback = Box<dyn FnMut(&[String], &ChangeMeta)>;

/// Host wiring; every field defaults to a no-op
pub struct StaffInputOptions {
    pub get_practice_sequence: SequenceGetter,
    pub set_practice_sequence: SequenceSetter,
    pub get_answer_sequence: SequenceGetter,
    pub set_answer_sequence: SequenceSetter,
    pub get_practice_limit: LimitGetter,
    pub get_answer_limit: LimitGetter,
    pub get_context: Box<dyn Fn() -> AnswerContext>,
    pub on_practice_change: ChangeCallback,
    pub on_answer_change: ChangeCallback,
    pub on_answer_ready: Box<dyn FnMut(&AnswerReadyInfo) -> Result<(), String>>,
    pub on_submit_state_change: Box<dyn FnMut(bool)>,
    pub on_comparison_update: Box<dyn FnMut(&[String])>,
    pub on_feedback: Box<dyn FnMut(&str)>,
    /// Used when no preview service is set
    pub on_pitch_preview: Box<dyn FnMut(&str)>,
    pub preview_service: Option<Box<dyn PitchPreview>>,
    pub surface: Option<Box<dyn StaffInputSurface>>,
}

impl Default for StaffInputOptions {
    fn default() -> Self {
        Self {
            get_practice_sequence: Box::new(|| Some(Vec::new())),
            set_practice_sequence: Box::new(|_| {}),
            get_answer_sequence: Box::new(|| Some(Vec::new())),
            set_answer_sequence: Box::new(|_| {}),
            get_practice_limit: Box::new(|| 0),
            get_answer_limit: Box::new(|| 0),
            get_context: Box::new(AnswerContext::default),
            on_practice_change: Box::new(|_, _| {}),
            on_answer_change: Box::new(|_, _| {}),
            on_answer_ready: Box::new(|_| Ok(())),
            on_submit_state_change: Box::new(|_| {}),
            on_comparison_update: Box::new(|_| {}),
            on_feedback: Box::new(|_| {}),
            on_pitch_preview: Box::new(|_| {}),
            preview_service: None,
            surface: None,
        }
    }
}

// ============================================================================
// Controller
// ============================================================================

pub struct StaffInputController {
    options: StaffInputOptions,
    phase: InputPhase,
    enabled: bool,
    practice_limit: usize,
    answer_limit: usize,
}

/// In-bounds position for a raw index
fn position_in(index: Option<isize>, len: usize) -> Option<usize> {
    index
        .and_then(|i| usize::try_from(i).ok())
        .filter(|&i| i < len)
}

impl StaffInputController {
    pub fn new(options: StaffInputOptions) -> Self {
        let practice_limit = (options.get_practice_limit)();
        let answer_limit = (options.get_answer_limit)();
        Self {
            options,
            phase: InputPhase::Practice,
            enabled: false,
            practice_limit,
            answer_limit,
        }
    }

    pub fn phase(&self) -> InputPhase {
        self.phase
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn practice_limit(&self) -> usize {
        self.practice_limit
    }

    pub fn answer_limit(&self) -> usize {
        self.answer_limit
    }

    pub fn set_phase(&mut self, phase: InputPhase) {
        log::debug!("[StaffInputController] phase {} -> {}", self.phase, phase);
        self.phase = phase;
    }

    /// Turn staff input on or off and push the mode to the pointer layer
    pub fn set_enabled(&mut self, enabled: bool, options: EnableOptions) {
        if let Some(surface) = self.options.surface.as_mut() {
            surface.set_staff_input_mode(StaffInputMode {
                enabled,
                midi_min: if enabled { options.midi_min } else { None },
                midi_max: if enabled { options.midi_max } else { None },
            });
        }

        if !enabled {
            self.enabled = false;
            self.phase = InputPhase::Disabled;
            return;
        }

        self.enabled = true;
        if let Some(phase) = options.phase {
            self.phase = phase;
        } else if self.phase == InputPhase::Disabled {
            self.phase = InputPhase::Practice;
        }
    }

    pub fn set_practice_limit(&mut self, limit: usize) {
        self.practice_limit = limit;
        self.trim_practice_to_limit();
    }

    pub fn set_answer_limit(&mut self, limit: usize) {
        self.answer_limit = limit;
        self.trim_answer_to_limit();
    }

    pub fn reset_practice_sequence(&mut self) {
        let Some(sequence) = (self.options.get_practice_sequence)() else {
            return;
        };
        if sequence.is_empty() {
            return;
        }
        self.commit_practice(Vec::new(), ChangeReason::Reset, None);
    }

    pub fn reset_answer_sequence(&mut self) {
        let Some(sequence) = (self.options.get_answer_sequence)() else {
            return;
        };
        if sequence.is_empty() {
            return;
        }
        let requires_submit = self.context().requires_submit;
        self.commit_answer(Vec::new(), ChangeReason::Reset, None, requires_submit);
        (self.options.on_submit_state_change)(false);
    }

    fn trim_practice_to_limit(&mut self) {
        if self.practice_limit == 0 {
            self.reset_practice_sequence();
            return;
        }
        let Some(mut sequence) = (self.options.get_practice_sequence)() else {
            return;
        };
        if sequence.len() <= self.practice_limit {
            return;
        }
        sequence.truncate(self.practice_limit);
        self.commit_practice(sequence, ChangeReason::LimitTrim, None);
    }

    fn trim_answer_to_limit(&mut self) {
        if self.answer_limit == 0 {
            self.reset_answer_sequence();
            return;
        }
        let Some(mut sequence) = (self.options.get_answer_sequence)() else {
            return;
        };
        if sequence.len() <= self.answer_limit {
            return;
        }
        sequence.truncate(self.answer_limit);
        let requires_submit = self.context().requires_submit;
        self.commit_answer(sequence, ChangeReason::LimitTrim, None, requires_submit);
    }

    /// Apply one staff edit; `true` when the event was consumed
    pub fn handle_staff_input(&mut self, note: Option<&str>, meta: &InputMeta) -> bool {
        if !self.enabled {
            return false;
        }
        if matches!(
            meta.phase,
            Some(PointerPhase::Move | PointerPhase::End | PointerPhase::Cancel)
        ) {
            return true;
        }
        let note = note.map(str::trim).filter(|n| !n.is_empty());
        match self.phase {
            InputPhase::Practice => self.handle_practice_input(note, meta),
            InputPhase::Answer => self.handle_answer_input(note, meta),
            InputPhase::Disabled => false,
        }
    }

    fn handle_practice_input(&mut self, note: Option<&str>, meta: &InputMeta) -> bool {
        let Some(mut sequence) = (self.options.get_practice_sequence)() else {
            return true;
        };
        let limit = if self.practice_limit > 0 {
            self.practice_limit
        } else {
            (self.options.get_practice_limit)()
        };
        if limit == 0 {
            self.reset_practice_sequence();
            return true;
        }
        if sequence.len() > limit {
            sequence.truncate(limit);
            self.commit_practice(sequence.clone(), ChangeReason::LimitTrim, None);
        }

        let staff_index = position_in(meta.staff_index, sequence.len());

        if meta.operation == InputOperation::Delete {
            let Some(index) = staff_index else {
                return true;
            };
            sequence.remove(index);
            self.commit_practice(sequence, ChangeReason::Delete, Some(index));
            return true;
        }

        let Some(note) = note else {
            return true;
        };

        if let Some(index) = staff_index {
            sequence[index] = note.to_string();
            self.commit_practice(sequence, ChangeReason::Update, Some(index));
            self.preview(note, true);
            return true;
        }

        if sequence.len() >= limit {
            let fallback = sequence.len().saturating_sub(1) as isize;
            let preferred = meta.insert_index.unwrap_or(fallback);
            let slot = normalize_insert_index(Some(preferred), limit - 1);
            sequence[slot] = note.to_string();
            self.commit_practice(sequence, ChangeReason::Override, Some(slot));
            self.preview(note, true);
            return true;
        }

        let index = normalize_insert_index(meta.insert_index, sequence.len());
        sequence.insert(index, note.to_string());
        self.commit_practice(sequence, ChangeReason::Insert, Some(index));
        self.preview(note, true);
        true
    }

    fn handle_answer_input(&mut self, note: Option<&str>, meta: &InputMeta) -> bool {
        let Some(mut sequence) = (self.options.get_answer_sequence)() else {
            return true;
        };
        let answer_limit = if self.answer_limit > 0 {
            self.answer_limit
        } else {
            (self.options.get_answer_limit)()
        };
        let context = self.context();
        let requires_submit = context.requires_submit;
        let target_length = if context.target_length > 0 {
            context.target_length
        } else {
            self.answer_limit
        };

        if answer_limit > 0 && sequence.len() > answer_limit {
            sequence.truncate(answer_limit);
            self.commit_answer(sequence.clone(), ChangeReason::LimitTrim, None, requires_submit);
        }

        let staff_index = position_in(meta.staff_index, sequence.len());

        if meta.operation == InputOperation::Delete {
            let Some(index) = staff_index else {
                return true;
            };
            sequence.remove(index);
            self.commit_answer(sequence.clone(), ChangeReason::Delete, Some(index), requires_submit);
            if requires_submit {
                (self.options.on_submit_state_change)(target_length > 0 && sequence.len() >= target_length);
            } else {
                (self.options.on_comparison_update)(&sequence);
            }
            return true;
        }

        let Some(note) = note else {
            return true;
        };

        let (reason, index) = if let Some(index) = staff_index {
            sequence[index] = note.to_string();
            (ChangeReason::Update, index)
        } else if answer_limit > 0 && sequence.len() >= answer_limit {
            let fallback = sequence.len().saturating_sub(1) as isize;
            let preferred = meta.insert_index.or(meta.staff_index).unwrap_or(fallback);
            let slot = normalize_insert_index(Some(preferred), answer_limit - 1);
            sequence[slot] = note.to_string();
            (ChangeReason::Override, slot)
        } else {
            sequence.push(note.to_string());
            (ChangeReason::Insert, sequence.len() - 1)
        };

        self.commit_answer(sequence.clone(), reason, Some(index), requires_submit);
        if !requires_submit {
            (self.options.on_comparison_update)(&sequence);
        }
        self.preview(note, false);
        self.evaluate_answer_state(&sequence, requires_submit, target_length);
        true
    }

    fn evaluate_answer_state(&mut self, sequence: &[String], requires_submit: bool, target_length: usize) {
        let ready = target_length > 0 && sequence.len() >= target_length;

        if requires_submit {
            (self.options.on_submit_state_change)(ready);
            if ready {
                self.answer_ready(AnswerReadyInfo {
                    requires_submit: true,
                    message: Some(READY_TO_SUBMIT.to_string()),
                });
            } else if target_length > 0 {
                self.progress(sequence.len(), target_length);
            }
            return;
        }

        if ready {
            self.answer_ready(AnswerReadyInfo {
                requires_submit: false,
                message: None,
            });
        } else if target_length > 0 {
            self.progress(sequence.len(), target_length);
        }
    }

    fn answer_ready(&mut self, info: AnswerReadyInfo) {
        if let Err(err) = (self.options.on_answer_ready)(&info) {
            let label = if info.requires_submit { "submit" } else { "auto-check" };
            log::warn!("[StaffInputController] staff answer ready ({}) failed: {}", label, err);
        }
    }

    fn progress(&mut self, count: usize, target_length: usize) {
        let message = format!("Note {} of {}", count, target_length);
        (self.options.on_feedback)(&message);
    }

    fn context(&self) -> AnswerContext {
        (self.options.get_context)()
    }

    fn commit_practice(&mut self, sequence: Vec<String>, reason: ChangeReason, staff_index: Option<usize>) {
        (self.options.set_practice_sequence)(&sequence);
        let meta = ChangeMeta {
            reason,
            staff_index,
            requires_submit: None,
        };
        (self.options.on_practice_change)(&sequence, &meta);
    }

    fn commit_answer(
        &mut self,
        sequence: Vec<String>,
        reason: ChangeReason,
        staff_index: Option<usize>,
        requires_submit: bool,
    ) {
        (self.options.set_answer_sequence)(&sequence);
        let meta = ChangeMeta {
            reason,
            staff_index,
            requires_submit: Some(requires_submit),
        };
        (self.options.on_answer_change)(&sequence, &meta);
    }

    fn preview(&mut self, note: &str, allow_while_playing: bool) {
        match self.options.preview_service.as_mut() {
            Some(service) => service.preview_pitch(
                note,
                PreviewOptions {
                    allow_while_playing,
                    duration: None,
                },
            ),
            None => (self.options.on_pitch_preview)(note),
        }
    }
}

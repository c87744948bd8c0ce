//! Staff module
//!
//! The display façade, the highlight timer, the input state machine and the
//! sequence bookkeeping that sits between them.

pub mod display;
pub mod feedback;
pub mod highlight;
pub mod input_controller;
pub mod sequence;
pub mod shared;

// Re-export commonly used types
pub use display::{StaffDisplay, StaffDisplayOptions, STAFF_UNAVAILABLE};
pub use feedback::{comparison_states, compare_harmonic_sequences, harmonic_note_states};
pub use highlight::{HighlightTimer, ManualScheduler, TimerId, TimerScheduler, DEFAULT_HIGHLIGHT_DURATION};
pub use input_controller::{
    AnswerContext, AnswerReadyInfo, ChangeMeta, ChangeReason, EnableOptions, InputMeta, InputOperation, InputPhase,
    PitchPreview, PointerPhase, PreviewOptions, StaffInputController, StaffInputMode, StaffInputOptions,
    StaffInputSurface,
};
pub use sequence::{
    diff_sequences, estimate_midi, sort_notes_ascending, DictationMode, InsertOptions, SequenceDiff, StaffSequence,
};
pub use shared::{normalize_insert_index, reindex_staff_notes, StaffNote};

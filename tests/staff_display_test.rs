// Display façade: voice composition, highlight timer, failure recovery, fonts

use pretty_assertions::assert_eq;
use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::time::Duration;

use staff_engine_wasm::models::{Accidental, Clef, NoteEntry, NoteStyle, SemanticState};
use staff_engine_wasm::renderers::theme::HIGHLIGHT_COLOR;
use staff_engine_wasm::renderers::{
    DrawOutcome, DrawRequest, FontError, FontId, FontLoader, NoopFontLoader, RenderError, StaffRenderer,
    StaffSizingUpdate, TaskOutcome,
};
use staff_engine_wasm::staff::{
    ManualScheduler, StaffDisplay, StaffDisplayOptions, TimerId, TimerScheduler, STAFF_UNAVAILABLE,
};

#[derive(Clone, Default)]
struct RecordingRenderer {
    requests: Rc<RefCell<Vec<DrawRequest>>>,
    fail: Rc<Cell<bool>>,
}

impl StaffRenderer for RecordingRenderer {
    fn draw(&mut self, request: &DrawRequest) -> Result<DrawOutcome, RenderError> {
        self.requests.borrow_mut().push(request.clone());
        if self.fail.get() {
            return Err(RenderError::Backend("canvas lost".to_string()));
        }
        Ok(DrawOutcome {
            base_message: Some("Ready".to_string()),
            ..DrawOutcome::default()
        })
    }
}

#[derive(Clone, Default)]
struct RecordingScheduler {
    scheduled: Rc<RefCell<Vec<(TimerId, Duration)>>>,
    cancelled: Rc<RefCell<Vec<TimerId>>>,
}

impl TimerScheduler for RecordingScheduler {
    fn schedule(&mut self, delay: Duration) -> TimerId {
        let id = self.scheduled.borrow().len() as TimerId + 1;
        self.scheduled.borrow_mut().push((id, delay));
        id
    }

    fn cancel(&mut self, id: TimerId) {
        self.cancelled.borrow_mut().push(id);
    }
}

struct FailingLoader;

impl FontLoader for FailingLoader {
    fn load_fonts(&self, stack: &[String]) -> Result<(), FontError> {
        if stack.first().map(String::as_str) == Some("Petaluma") {
            return Err(FontError::LoadFailed {
                families: stack.join(", "),
                reason: "not installed".to_string(),
            });
        }
        Ok(())
    }
}

fn display_with(options: StaffDisplayOptions) -> (StaffDisplay, RecordingRenderer) {
    let renderer = RecordingRenderer::default();
    let display = StaffDisplay::new(
        options,
        Box::new(renderer.clone()),
        Box::new(NoopFontLoader),
        Box::new(ManualScheduler::default()),
    );
    (display, renderer)
}

fn last_request(renderer: &RecordingRenderer) -> DrawRequest {
    renderer.requests.borrow().last().cloned().expect("at least one draw")
}

#[test]
fn test_set_sequence_draws_key_aware_accidentals() {
    let (mut display, renderer) = display_with(StaffDisplayOptions {
        key_signature: "d".to_string(),
        ..StaffDisplayOptions::default()
    });
    let handle = display.set_sequence(vec![
        NoteEntry::note("F#4"),
        NoteEntry::note("F4"),
        NoteEntry::note("C#5"),
        NoteEntry::note("Bb4"),
    ]);

    assert!(matches!(handle.outcome(), TaskOutcome::Rendered(_)));
    let request = last_request(&renderer);
    assert_eq!(request.key_sig.as_str(), "D");
    assert_eq!(request.voices.len(), 1);
    let accidentals: Vec<Option<Accidental>> = request.voices[0]
        .note_specs
        .iter()
        .map(|spec| spec.accidentals[0])
        .collect();
    assert_eq!(
        accidentals,
        vec![None, Some(Accidental::Natural), None, Some(Accidental::Flat)]
    );
    assert_eq!(display.status_message(), "Ready");
}

#[test]
fn test_voices_are_primary_overlay_highlight() {
    let (mut display, renderer) = display_with(StaffDisplayOptions::default());
    display.set_sequence(vec![NoteEntry::note("C4")]);
    display.set_overlay(vec![NoteEntry::note("E4").with_state(SemanticState::Answer)]);
    display.set_highlight(NoteEntry::note("G4"));

    let request = last_request(&renderer);
    assert_eq!(request.voices.len(), 3);
    assert_eq!(request.voices[0].note_specs[0].keys, vec!["c/4"]);
    assert_eq!(request.voices[1].note_specs[0].keys, vec!["e/4"]);
    let highlight = &request.voices[2].note_specs[0];
    assert_eq!(highlight.keys, vec!["g/4"]);
    assert_eq!(highlight.style, Some(NoteStyle::solid(HIGHLIGHT_COLOR)));

    display.clear_overlay();
    let request = last_request(&renderer);
    assert_eq!(request.voices.len(), 2);
}

#[test]
fn test_empty_overlay_is_not_drawn() {
    let (mut display, renderer) = display_with(StaffDisplayOptions::default());
    display.set_overlay(vec![NoteEntry::note("not a note")]);
    let request = last_request(&renderer);
    assert_eq!(request.voices.len(), 1);
    assert!(request.voices[0].note_specs.is_empty());
}

#[test]
fn test_highlight_timer_clears_only_latest() {
    let renderer = RecordingRenderer::default();
    let scheduler = RecordingScheduler::default();
    let mut display = StaffDisplay::new(
        StaffDisplayOptions::default(),
        Box::new(renderer.clone()),
        Box::new(NoopFontLoader),
        Box::new(scheduler.clone()),
    );

    display.set_highlight(NoteEntry::note("A4"));
    display.set_highlight_for(NoteEntry::note("B4"), Duration::from_millis(250));
    assert_eq!(
        *scheduler.scheduled.borrow(),
        vec![(1, Duration::from_millis(600)), (2, Duration::from_millis(250))]
    );
    assert_eq!(*scheduler.cancelled.borrow(), vec![1]);

    assert!(display.fire_timer(1).is_none());
    assert_eq!(display.highlight().map(|e| e.pitches()), Some(vec!["B4"]));

    let handle = display.fire_timer(2).expect("live timer re-renders");
    assert!(handle.is_settled());
    assert!(display.highlight().is_none());
    assert_eq!(last_request(&renderer).voices.len(), 1);
}

#[test]
fn test_render_failure_sets_status_and_queue_continues() {
    let (mut display, renderer) = display_with(StaffDisplayOptions::default());
    renderer.fail.set(true);
    let failed = display.set_sequence(vec![NoteEntry::note("C4")]);
    assert!(matches!(failed.outcome(), TaskOutcome::Failed(_)));
    assert_eq!(display.status_message(), STAFF_UNAVAILABLE);

    renderer.fail.set(false);
    let next = display.set_sequence(vec![NoteEntry::note("D4")]);
    assert!(matches!(next.outcome(), TaskOutcome::Rendered(_)));
    assert_eq!(display.status_message(), "Ready");
}

#[test]
fn test_unchanged_configuration_skips_render() {
    let (mut display, renderer) = display_with(StaffDisplayOptions::default());
    display.initialize();
    let draws = renderer.requests.borrow().len();

    assert_eq!(display.set_clef(Clef::Treble).outcome(), TaskOutcome::Skipped);
    assert_eq!(display.set_font(FontId::Bravura).outcome(), TaskOutcome::Skipped);
    assert_eq!(
        display.set_width_options(StaffSizingUpdate::default()).outcome(),
        TaskOutcome::Skipped
    );
    assert_eq!(display.update_entry(3, |_| {}).outcome(), TaskOutcome::Skipped);
    assert_eq!(renderer.requests.borrow().len(), draws);

    display.set_clef(Clef::Bass);
    assert_eq!(last_request(&renderer).clef, Clef::Bass);
}

#[test]
fn test_width_update_dropped_by_normalization_skips_render() {
    let mut options = StaffDisplayOptions::default();
    options.sizing.min_width = Some(600.0);
    let (mut display, renderer) = display_with(options);
    display.initialize();
    let draws = renderer.requests.borrow().len();

    // A max below the min is discarded, leaving the sizing as it was.
    let below_min = StaffSizingUpdate {
        max_width: Some(300.0),
        ..StaffSizingUpdate::default()
    };
    assert_eq!(display.set_width_options(below_min).outcome(), TaskOutcome::Skipped);
    assert_eq!(renderer.requests.borrow().len(), draws);

    let wider = StaffSizingUpdate {
        max_width: Some(900.0),
        ..StaffSizingUpdate::default()
    };
    assert!(matches!(display.set_width_options(wider).outcome(), TaskOutcome::Rendered(_)));
    assert_eq!(renderer.requests.borrow().len(), draws + 1);
}

#[test]
fn test_invalid_key_keeps_current() {
    let (mut display, _renderer) = display_with(StaffDisplayOptions {
        key_signature: "Bb".to_string(),
        ..StaffDisplayOptions::default()
    });
    display.set_key_signature("H major");
    assert_eq!(display.key_signature().as_str(), "Bb");
    display.set_key_signature("c#");
    assert_eq!(display.key_signature().as_str(), "C#");
}

#[test]
fn test_leland_falls_back_with_warning() {
    let (mut display, renderer) = display_with(StaffDisplayOptions {
        font_id: FontId::Leland,
        ..StaffDisplayOptions::default()
    });
    display.initialize();
    let request = last_request(&renderer);
    assert!(request.font.fallback);
    assert_eq!(request.font.stack[0], "Bravura");
    assert!(request.warnings.iter().any(|w| w.contains("Leland")));
}

#[test]
fn test_font_load_failure_uses_default_stack() {
    let renderer = RecordingRenderer::default();
    let mut display = StaffDisplay::new(
        StaffDisplayOptions {
            font_id: FontId::Petaluma,
            ..StaffDisplayOptions::default()
        },
        Box::new(renderer.clone()),
        Box::new(FailingLoader),
        Box::new(ManualScheduler::default()),
    );
    display.initialize();
    let request = last_request(&renderer);
    assert_eq!(request.font.stack[0], "Bravura");
    assert!(request.font.fallback);
    assert!(request.warnings.iter().any(|w| w.contains("Petaluma font unavailable")));
}

#[test]
fn test_update_entry_mutates_in_place() {
    let (mut display, renderer) = display_with(StaffDisplayOptions::default());
    display.set_sequence(vec![NoteEntry::note("C4"), NoteEntry::note("D4")]);
    display.update_entry(1, |entry| entry.state = Some(SemanticState::Correct));
    assert_eq!(display.entries()[1].state, Some(SemanticState::Correct));
    let spec = &last_request(&renderer).voices[0].note_specs[1];
    assert!(spec.style.is_some());
}

//! StaffDisplay bindings
//!
//! `StaffDisplayHandle` wraps a `StaffDisplay` and the `StaffSequence` that
//! feeds it. The host supplies the collaborators as plain JS functions on a
//! callbacks object:
//!
//! - `draw(request)` paints a staff and may return `{ warnings, baseMessage,
//!   width, height }`; throwing marks the render failed;
//! - `loadFonts(stack)` returns `false` or throws when the stack is missing;
//!   hosts preload font files and answer from what is already available
//!   (e.g. `document.fonts.check`);
//! - `scheduleTimer(id, delayMs)` / `cancelTimer(id)` drive the highlight
//!   timer; the host calls `fireTimer(id)` when a timer expires.
//!
//! Callbacks are synchronous. The render queue never waits on the host, so a
//! `draw` or `loadFonts` that returns a Promise is treated as a failure rather
//! than as an outcome that has not arrived yet.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;

use crate::api::helpers::{
    call_logged, deserialize, deserialize_or_default, get_function, js_error_text, serialize, to_js_error,
    viewport_width,
};
use crate::models::{Clef, Meter, NoteEntry, SemanticState};
use crate::renderers::{
    ContainerMetrics, DrawOutcome, DrawRequest, FontError, FontId, FontLoader, RenderError, StaffConfig,
    StaffRenderer, StaffSizingUpdate, StaffTheme, TaskHandle, TaskOutcome,
};
use crate::staff::{
    DictationMode, InsertOptions, StaffDisplay, StaffDisplayOptions, StaffSequence, TimerId, TimerScheduler,
};
use crate::staff::sequence::DEFAULT_VISIBLE_LIMIT;
use crate::{wasm_info, wasm_warn};

// ============================================================================
// Host-backed collaborators
// ============================================================================

struct JsStaffRenderer {
    draw: Option<js_sys::Function>,
}

impl StaffRenderer for JsStaffRenderer {
    fn draw(&mut self, request: &DrawRequest) -> Result<DrawOutcome, RenderError> {
        let Some(draw) = &self.draw else {
            return Err(RenderError::Backend("no draw callback configured".to_string()));
        };
        let payload = serde_wasm_bindgen::to_value(request).map_err(|e| RenderError::Backend(e.to_string()))?;
        let result = draw
            .call1(&JsValue::NULL, &payload)
            .map_err(|err| RenderError::Backend(js_error_text(&err)))?;
        reject_promise(&result, "draw").map_err(RenderError::Backend)?;
        if result.is_undefined() || result.is_null() {
            return Ok(DrawOutcome::default());
        }
        serde_wasm_bindgen::from_value(result).map_err(|e| RenderError::Backend(e.to_string()))
    }
}

struct JsFontLoader {
    load: Option<js_sys::Function>,
}

impl FontLoader for JsFontLoader {
    fn load_fonts(&self, stack: &[String]) -> Result<(), FontError> {
        if stack.is_empty() {
            return Err(FontError::EmptyStack);
        }
        let Some(load) = &self.load else {
            return Ok(());
        };
        let families: js_sys::Array = stack.iter().map(|f| JsValue::from_str(f)).collect();
        let failed = |reason: String| FontError::LoadFailed {
            families: stack.join(", "),
            reason,
        };
        match load.call1(&JsValue::NULL, &families) {
            Ok(value) if value.as_bool() == Some(false) => Err(failed("loader returned false".to_string())),
            Ok(value) => reject_promise(&value, "loadFonts").map_err(failed),
            Err(err) => Err(failed(js_error_text(&err))),
        }
    }
}

/// Host callbacks must answer synchronously
fn reject_promise(value: &JsValue, name: &str) -> Result<(), String> {
    if value.is_instance_of::<js_sys::Promise>() {
        log::warn!("[StaffDisplayHandle] '{}' returned a Promise; callbacks must be synchronous", name);
        return Err(format!("'{}' returned a Promise; callbacks must be synchronous", name));
    }
    Ok(())
}

struct JsTimerScheduler {
    schedule: Option<js_sys::Function>,
    cancel: Option<js_sys::Function>,
    next_id: TimerId,
}

impl TimerScheduler for JsTimerScheduler {
    fn schedule(&mut self, delay: Duration) -> TimerId {
        self.next_id = self.next_id.wrapping_add(1);
        if let Some(schedule) = &self.schedule {
            let args = [JsValue::from(self.next_id), JsValue::from_f64(delay.as_millis() as f64)];
            call_logged(schedule, "scheduleTimer", &args);
        }
        self.next_id
    }

    fn cancel(&mut self, id: TimerId) {
        if let Some(cancel) = &self.cancel {
            call_logged(cancel, "cancelTimer", &[JsValue::from(id)]);
        }
    }
}

// ============================================================================
// Task status
// ============================================================================

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct TaskStatus {
    id: u64,
    status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    note_count: Option<usize>,
}

fn task_status(handle: &TaskHandle) -> Result<JsValue, JsValue> {
    let (status, error, note_count) = match handle.outcome() {
        TaskOutcome::Pending => ("pending", None, None),
        TaskOutcome::Rendered(report) => ("rendered", None, Some(report.note_count)),
        TaskOutcome::Skipped => ("skipped", None, None),
        TaskOutcome::Failed(err) => ("failed", Some(err), None),
    };
    serialize(
        &TaskStatus {
            id: handle.id(),
            status,
            error,
            note_count,
        },
        "Task status serialization error",
    )
}

// ============================================================================
// Handle
// ============================================================================

#[wasm_bindgen]
pub struct StaffDisplayHandle {
    display: StaffDisplay,
    sequence: StaffSequence,
}

#[wasm_bindgen]
impl StaffDisplayHandle {
    /// Create a display from `StaffDisplayOptions` and a callbacks object
    ///
    /// `options.dataset`, when present, is read as the element's data
    /// attributes and overrides sizing and scale.
    #[wasm_bindgen(constructor)]
    pub fn new(options: JsValue, callbacks: JsValue) -> Result<StaffDisplayHandle, JsValue> {
        let dataset = if options.is_object() {
            js_sys::Reflect::get(&options, &JsValue::from_str("dataset")).unwrap_or(JsValue::UNDEFINED)
        } else {
            JsValue::UNDEFINED
        };
        let mut options: StaffDisplayOptions = deserialize_or_default(options, "Display options deserialization error")?;
        if !dataset.is_undefined() && !dataset.is_null() {
            let dataset: HashMap<String, String> = deserialize(dataset, "Dataset deserialization error")?;
            let config = StaffConfig::from_dataset(&dataset, viewport_width());
            options.sizing = config.sizing;
            if config.scale.is_some() {
                options.staff_scale = config.scale;
            }
        }

        let renderer = JsStaffRenderer {
            draw: get_function(&callbacks, "draw"),
        };
        let fonts = JsFontLoader {
            load: get_function(&callbacks, "loadFonts"),
        };
        let scheduler = JsTimerScheduler {
            schedule: get_function(&callbacks, "scheduleTimer"),
            cancel: get_function(&callbacks, "cancelTimer"),
            next_id: 0,
        };
        if renderer.draw.is_none() {
            wasm_warn!("StaffDisplayHandle created without a draw callback");
        }

        let display = StaffDisplay::new(options, Box::new(renderer), Box::new(fonts), Box::new(scheduler));
        wasm_info!("StaffDisplayHandle created");
        Ok(StaffDisplayHandle {
            display,
            sequence: StaffSequence::default(),
        })
    }

    pub fn initialize(&mut self) -> Result<JsValue, JsValue> {
        task_status(&self.display.initialize())
    }

    // ------------------------------------------------------------------------
    // Display content
    // ------------------------------------------------------------------------

    #[wasm_bindgen(js_name = setSequence)]
    pub fn set_sequence(&mut self, entries: JsValue) -> Result<JsValue, JsValue> {
        let entries: Vec<NoteEntry> = deserialize(entries, "Sequence deserialization error")?;
        task_status(&self.display.set_sequence(entries))
    }

    #[wasm_bindgen(js_name = setOverlay)]
    pub fn set_overlay(&mut self, entries: JsValue) -> Result<JsValue, JsValue> {
        let entries: Vec<NoteEntry> = deserialize_or_default(entries, "Overlay deserialization error")?;
        task_status(&self.display.set_overlay(entries))
    }

    #[wasm_bindgen(js_name = clearOverlay)]
    pub fn clear_overlay(&mut self) -> Result<JsValue, JsValue> {
        task_status(&self.display.clear_overlay())
    }

    /// Show one highlighted entry; `duration_ms` overrides the default
    #[wasm_bindgen(js_name = setHighlight)]
    pub fn set_highlight(&mut self, entry: JsValue, duration_ms: Option<f64>) -> Result<JsValue, JsValue> {
        let entry: NoteEntry = deserialize(entry, "Highlight deserialization error")?;
        let handle = match duration_ms.filter(|ms| ms.is_finite() && *ms > 0.0) {
            Some(ms) => self.display.set_highlight_for(entry, Duration::from_millis(ms as u64)),
            None => self.display.set_highlight(entry),
        };
        task_status(&handle)
    }

    /// Replace one primary entry
    ///
    /// `update` is either a replacement entry or a function that receives a
    /// copy of the current entry and returns the new one (`undefined` keeps
    /// it). A non-integer or out-of-range index is a no-op.
    #[wasm_bindgen(js_name = updateEntry)]
    pub fn update_entry(&mut self, index: f64, update: JsValue) -> Result<JsValue, JsValue> {
        let index = if index.is_finite() && index >= 0.0 && index.fract() == 0.0 {
            index as usize
        } else {
            usize::MAX
        };
        let Some(current) = self.display.entries().get(index).cloned() else {
            return task_status(&self.display.update_entry(index, |_| {}));
        };

        let replacement: NoteEntry = match update.dyn_ref::<js_sys::Function>() {
            Some(mutate) => {
                let copy = serialize(&current, "Entry serialization error")?;
                let result = mutate
                    .call1(&JsValue::NULL, &copy)
                    .map_err(|err| to_js_error(js_error_text(&err)))?;
                if result.is_undefined() || result.is_null() {
                    current
                } else {
                    deserialize(result, "Entry deserialization error")?
                }
            }
            None => deserialize(update, "Entry deserialization error")?,
        };
        task_status(&self.display.update_entry(index, move |entry| *entry = replacement))
    }

    #[wasm_bindgen(js_name = clearHighlight)]
    pub fn clear_highlight(&mut self) -> Result<JsValue, JsValue> {
        task_status(&self.display.clear_highlight())
    }

    /// Report a host timer expiry; `true` when it cleared the highlight
    #[wasm_bindgen(js_name = fireTimer)]
    pub fn fire_timer(&mut self, id: u32) -> bool {
        self.display.fire_timer(id).is_some()
    }

    // ------------------------------------------------------------------------
    // Configuration
    // ------------------------------------------------------------------------

    #[wasm_bindgen(js_name = setKeySignature)]
    pub fn set_key_signature(&mut self, token: &str) -> Result<JsValue, JsValue> {
        task_status(&self.display.set_key_signature(token))
    }

    #[wasm_bindgen(js_name = setClef)]
    pub fn set_clef(&mut self, clef: &str) -> Result<JsValue, JsValue> {
        let clef: Clef = clef.parse().map_err(to_js_error)?;
        task_status(&self.display.set_clef(clef))
    }

    #[wasm_bindgen(js_name = setFont)]
    pub fn set_font(&mut self, font_id: &str) -> Result<JsValue, JsValue> {
        let font_id: FontId = font_id.parse().unwrap_or_default();
        task_status(&self.display.set_font(font_id))
    }

    #[wasm_bindgen(js_name = setMeter)]
    pub fn set_meter(&mut self, num: u32, den: u32) -> Result<JsValue, JsValue> {
        task_status(&self.display.set_meter(Meter { num, den }))
    }

    #[wasm_bindgen(js_name = setTheme)]
    pub fn set_theme(&mut self, theme: JsValue) -> Result<JsValue, JsValue> {
        let theme: StaffTheme = deserialize_or_default(theme, "Theme deserialization error")?;
        task_status(&self.display.set_theme(theme))
    }

    #[wasm_bindgen(js_name = setWidthOptions)]
    pub fn set_width_options(&mut self, update: JsValue) -> Result<JsValue, JsValue> {
        let update: StaffSizingUpdate = deserialize_or_default(update, "Width options deserialization error")?;
        task_status(&self.display.set_width_options(update))
    }

    #[wasm_bindgen(js_name = setContainer)]
    pub fn set_container(&mut self, metrics: JsValue) -> Result<JsValue, JsValue> {
        let metrics: ContainerMetrics = deserialize_or_default(metrics, "Container deserialization error")?;
        task_status(&self.display.set_container(metrics))
    }

    #[wasm_bindgen(js_name = setContainerWidth)]
    pub fn set_container_width(&mut self, width: f64) -> Result<JsValue, JsValue> {
        task_status(&self.display.set_container_width(width))
    }

    // ------------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------------

    #[wasm_bindgen(js_name = getFontLabel)]
    pub fn get_font_label(&self) -> String {
        self.display.get_font_label().to_string()
    }

    #[wasm_bindgen(js_name = getStatusMessage)]
    pub fn get_status_message(&self) -> String {
        self.display.status_message()
    }

    #[wasm_bindgen(js_name = getKeySignature)]
    pub fn get_key_signature(&self) -> String {
        self.display.key_signature().as_str().to_string()
    }

    #[wasm_bindgen(js_name = getRenderState)]
    pub fn get_render_state(&self) -> Result<JsValue, JsValue> {
        let state = self
            .display
            .runtime()
            .snapshot()
            .map_err(to_js_error)?;
        serialize(&state, "Render state serialization error")
    }

    // ------------------------------------------------------------------------
    // Sequence editing
    // ------------------------------------------------------------------------

    #[wasm_bindgen(js_name = setDictationMode)]
    pub fn set_dictation_mode(&mut self, mode: &str) -> Result<JsValue, JsValue> {
        let mode = match mode {
            "harmonic" => DictationMode::Harmonic,
            _ => DictationMode::Melodic,
        };
        self.sequence.set_mode(mode);
        task_status(&self.sequence.present(&mut self.display))
    }

    #[wasm_bindgen(js_name = insertNote)]
    pub fn insert_note(&mut self, note: &str, options: JsValue) -> Result<JsValue, JsValue> {
        let options = insert_options(options)?;
        if self.sequence.insert_note(note, options).is_none() {
            return Ok(JsValue::UNDEFINED);
        }
        task_status(&self.sequence.present(&mut self.display))
    }

    /// Add one note or a chord, keeping at most `max_visible` entries
    #[wasm_bindgen(js_name = showNotesWithLimit)]
    pub fn show_notes_with_limit(
        &mut self,
        notes: JsValue,
        max_visible: Option<usize>,
        options: JsValue,
    ) -> Result<JsValue, JsValue> {
        let notes: Vec<String> = match notes.as_string() {
            Some(note) => vec![note],
            None => deserialize(notes, "Notes deserialization error")?,
        };
        let notes: Vec<&str> = notes.iter().map(String::as_str).collect();
        let options = insert_options(options)?;
        let limit = max_visible.unwrap_or(DEFAULT_VISIBLE_LIMIT);
        if !self.sequence.show_with_limit(&notes, limit, options) {
            return Ok(JsValue::UNDEFINED);
        }
        task_status(&self.sequence.present(&mut self.display))
    }

    #[wasm_bindgen(js_name = updateNoteAt)]
    pub fn update_note_at(&mut self, index: usize, note: &str) -> Result<JsValue, JsValue> {
        if !self.sequence.update_note_at(index, note) {
            return Ok(JsValue::UNDEFINED);
        }
        task_status(&self.sequence.present(&mut self.display))
    }

    #[wasm_bindgen(js_name = removeNoteAt)]
    pub fn remove_note_at(&mut self, index: usize) -> Result<JsValue, JsValue> {
        if !self.sequence.remove_note_at(index) {
            return Ok(JsValue::UNDEFINED);
        }
        task_status(&self.sequence.present(&mut self.display))
    }

    #[wasm_bindgen(js_name = clearNotes)]
    pub fn clear_notes(&mut self) -> Result<JsValue, JsValue> {
        task_status(&self.sequence.clear_display(&mut self.display))
    }

    /// Mark entered notes correct or incorrect against the target
    #[wasm_bindgen(js_name = updateComparison)]
    pub fn update_comparison(
        &mut self,
        target: JsValue,
        user: JsValue,
        is_correct: Option<bool>,
    ) -> Result<JsValue, JsValue> {
        let target: Vec<String> = deserialize_or_default(target, "Target deserialization error")?;
        let user: Vec<String> = deserialize_or_default(user, "User sequence deserialization error")?;
        if !self.sequence.apply_comparison(&target, &user, is_correct) {
            return Ok(JsValue::UNDEFINED);
        }
        task_status(&self.sequence.present(&mut self.display))
    }

    #[wasm_bindgen(js_name = showAnswerOverlay)]
    pub fn show_answer_overlay(&mut self, target: JsValue, user: JsValue) -> Result<JsValue, JsValue> {
        let target: Vec<String> = deserialize_or_default(target, "Target deserialization error")?;
        let user: Option<Vec<String>> = deserialize_or_default(user, "User sequence deserialization error")?;
        let overlay = self.sequence.build_answer_overlay(&target, user.as_deref());
        if overlay.is_empty() && target.is_empty() {
            return Ok(JsValue::UNDEFINED);
        }
        task_status(&self.display.set_overlay(overlay))
    }
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
struct RawInsertOptions {
    index: Option<isize>,
    state: Option<SemanticState>,
    is_draft: bool,
}

fn insert_options(value: JsValue) -> Result<InsertOptions, JsValue> {
    let raw: RawInsertOptions = deserialize_or_default(value, "Insert options deserialization error")?;
    Ok(InsertOptions {
        index: raw.index,
        state: raw.state,
        is_draft: raw.is_draft,
    })
}

//! StaffInputController bindings
//!
//! The host passes one callbacks object. Every member is optional; a missing
//! getter reads as an empty sequence (or zero limit) and a missing notifier
//! is skipped. Recognised members:
//!
//! `getPracticeSequence`, `setPracticeSequence`, `getAnswerSequence`,
//! `setAnswerSequence`, `getPracticeLimit`, `getAnswerLimit`, `getContext`,
//! `onPracticeChange`, `onAnswerChange`, `onAnswerReady`,
//! `onSubmitStateChange`, `onComparisonUpdate`, `onFeedback`,
//! `onPitchPreview`, `previewPitch` and `setStaffInputMode`.

use serde::Deserialize;
use wasm_bindgen::prelude::*;

use crate::api::helpers::{call_logged, deserialize_or_default, get_function, js_error_text, serialize, to_js_error};
use crate::staff::{
    AnswerContext, EnableOptions, InputMeta, InputPhase, PitchPreview, PreviewOptions, StaffInputController,
    StaffInputMode, StaffInputOptions, StaffInputSurface,
};
use crate::wasm_info;

fn string_array(values: &[String]) -> JsValue {
    values
        .iter()
        .map(|v| JsValue::from_str(v))
        .collect::<js_sys::Array>()
        .into()
}

fn to_js<T: serde::Serialize>(value: &T) -> JsValue {
    serde_wasm_bindgen::to_value(value).unwrap_or(JsValue::UNDEFINED)
}

fn sequence_getter(function: Option<js_sys::Function>, name: &'static str) -> Box<dyn Fn() -> Option<Vec<String>>> {
    Box::new(move || {
        let Some(function) = &function else {
            return Some(Vec::new());
        };
        let value = call_logged(function, name, &[])?;
        if value.is_undefined() || value.is_null() {
            return None;
        }
        serde_wasm_bindgen::from_value(value).ok()
    })
}

fn sequence_setter(function: Option<js_sys::Function>, name: &'static str) -> Box<dyn FnMut(&[String])> {
    Box::new(move |sequence| {
        if let Some(function) = &function {
            call_logged(function, name, &[string_array(sequence)]);
        }
    })
}

/// Finite positive limits truncate; anything else (negative, NaN) is 0
fn normalize_limit(value: f64) -> usize {
    if value.is_finite() && value > 0.0 {
        value.trunc() as usize
    } else {
        0
    }
}

fn limit_getter(function: Option<js_sys::Function>, name: &'static str) -> Box<dyn Fn() -> usize> {
    Box::new(move || {
        function
            .as_ref()
            .and_then(|f| call_logged(f, name, &[]))
            .and_then(|value| value.as_f64())
            .map_or(0, normalize_limit)
    })
}

struct JsPitchPreview {
    preview: js_sys::Function,
}

impl PitchPreview for JsPitchPreview {
    fn preview_pitch(&mut self, note: &str, options: PreviewOptions) {
        let opts = js_sys::Object::new();
        let _ = js_sys::Reflect::set(
            &opts,
            &JsValue::from_str("allowWhilePlaying"),
            &JsValue::from_bool(options.allow_while_playing),
        );
        if let Some(duration) = options.duration {
            let _ = js_sys::Reflect::set(
                &opts,
                &JsValue::from_str("duration"),
                &JsValue::from_f64(duration.as_secs_f64()),
            );
        }
        call_logged(&self.preview, "previewPitch", &[JsValue::from_str(note), opts.into()]);
    }
}

struct JsInputSurface {
    set_mode: js_sys::Function,
}

impl StaffInputSurface for JsInputSurface {
    fn set_staff_input_mode(&mut self, mode: StaffInputMode) {
        call_logged(&self.set_mode, "setStaffInputMode", &[to_js(&mode)]);
    }
}

fn options_from_callbacks(callbacks: &JsValue) -> StaffInputOptions {
    let get = |name: &str| get_function(callbacks, name);

    let context = get("getContext");
    let practice_change = get("onPracticeChange");
    let answer_change = get("onAnswerChange");
    let answer_ready = get("onAnswerReady");
    let submit_state = get("onSubmitStateChange");
    let comparison = get("onComparisonUpdate");
    let feedback = get("onFeedback");
    let pitch_preview = get("onPitchPreview");

    StaffInputOptions {
        get_practice_sequence: sequence_getter(get("getPracticeSequence"), "getPracticeSequence"),
        set_practice_sequence: sequence_setter(get("setPracticeSequence"), "setPracticeSequence"),
        get_answer_sequence: sequence_getter(get("getAnswerSequence"), "getAnswerSequence"),
        set_answer_sequence: sequence_setter(get("setAnswerSequence"), "setAnswerSequence"),
        get_practice_limit: limit_getter(get("getPracticeLimit"), "getPracticeLimit"),
        get_answer_limit: limit_getter(get("getAnswerLimit"), "getAnswerLimit"),
        get_context: Box::new(move || {
            context
                .as_ref()
                .and_then(|f| call_logged(f, "getContext", &[]))
                .and_then(|value| serde_wasm_bindgen::from_value::<AnswerContext>(value).ok())
                .unwrap_or_default()
        }),
        on_practice_change: Box::new(move |sequence, meta| {
            if let Some(f) = &practice_change {
                call_logged(f, "onPracticeChange", &[string_array(sequence), to_js(meta)]);
            }
        }),
        on_answer_change: Box::new(move |sequence, meta| {
            if let Some(f) = &answer_change {
                call_logged(f, "onAnswerChange", &[string_array(sequence), to_js(meta)]);
            }
        }),
        on_answer_ready: Box::new(move |info| {
            let Some(f) = &answer_ready else {
                return Ok(());
            };
            f.call1(&JsValue::NULL, &to_js(info))
                .map(|_| ())
                .map_err(|err| js_error_text(&err))
        }),
        on_submit_state_change: Box::new(move |enabled| {
            if let Some(f) = &submit_state {
                call_logged(f, "onSubmitStateChange", &[JsValue::from_bool(enabled)]);
            }
        }),
        on_comparison_update: Box::new(move |sequence| {
            if let Some(f) = &comparison {
                call_logged(f, "onComparisonUpdate", &[string_array(sequence)]);
            }
        }),
        on_feedback: Box::new(move |message| {
            if let Some(f) = &feedback {
                call_logged(f, "onFeedback", &[JsValue::from_str(message)]);
            }
        }),
        on_pitch_preview: Box::new(move |note| {
            if let Some(f) = &pitch_preview {
                call_logged(f, "onPitchPreview", &[JsValue::from_str(note)]);
            }
        }),
        preview_service: get("previewPitch")
            .map(|preview| Box::new(JsPitchPreview { preview }) as Box<dyn PitchPreview>),
        surface: get("setStaffInputMode")
            .map(|set_mode| Box::new(JsInputSurface { set_mode }) as Box<dyn StaffInputSurface>),
    }
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
struct RawEnableOptions {
    phase: Option<InputPhase>,
    midi_min: Option<i32>,
    midi_max: Option<i32>,
}

#[wasm_bindgen]
pub struct StaffInputHandle {
    controller: StaffInputController,
}

#[wasm_bindgen]
impl StaffInputHandle {
    #[wasm_bindgen(constructor)]
    pub fn new(callbacks: JsValue) -> StaffInputHandle {
        wasm_info!("StaffInputHandle created");
        StaffInputHandle {
            controller: StaffInputController::new(options_from_callbacks(&callbacks)),
        }
    }

    /// Enable or disable staff input; `options` may carry `phase`, `midiMin`, `midiMax`
    #[wasm_bindgen(js_name = setEnabled)]
    pub fn set_enabled(&mut self, enabled: bool, options: JsValue) -> Result<(), JsValue> {
        let raw: RawEnableOptions = deserialize_or_default(options, "Enable options deserialization error")?;
        self.controller.set_enabled(
            enabled,
            EnableOptions {
                phase: raw.phase,
                midi_min: raw.midi_min,
                midi_max: raw.midi_max,
            },
        );
        Ok(())
    }

    #[wasm_bindgen(js_name = setPhase)]
    pub fn set_phase(&mut self, phase: &str) -> Result<(), JsValue> {
        let phase = match phase {
            "practice" => InputPhase::Practice,
            "answer" => InputPhase::Answer,
            "disabled" => InputPhase::Disabled,
            other => return Err(to_js_error(format!("Unknown input phase: '{}'", other))),
        };
        self.controller.set_phase(phase);
        Ok(())
    }

    #[wasm_bindgen(js_name = getPhase)]
    pub fn get_phase(&self) -> String {
        self.controller.phase().to_string()
    }

    #[wasm_bindgen(js_name = isEnabled)]
    pub fn is_enabled(&self) -> bool {
        self.controller.is_enabled()
    }

    /// Non-positive or non-finite limits disable practice entry and reset it
    #[wasm_bindgen(js_name = setPracticeLimit)]
    pub fn set_practice_limit(&mut self, limit: f64) {
        self.controller.set_practice_limit(normalize_limit(limit));
    }

    #[wasm_bindgen(js_name = setAnswerLimit)]
    pub fn set_answer_limit(&mut self, limit: f64) {
        self.controller.set_answer_limit(normalize_limit(limit));
    }

    #[wasm_bindgen(js_name = resetPracticeSequence)]
    pub fn reset_practice_sequence(&mut self) {
        self.controller.reset_practice_sequence();
    }

    #[wasm_bindgen(js_name = resetAnswerSequence)]
    pub fn reset_answer_sequence(&mut self) {
        self.controller.reset_answer_sequence();
    }

    /// Route one staff edit; `true` when the controller consumed it
    #[wasm_bindgen(js_name = handleStaffInput)]
    pub fn handle_staff_input(&mut self, note: Option<String>, meta: JsValue) -> Result<bool, JsValue> {
        let meta: InputMeta = deserialize_or_default(meta, "Input meta deserialization error")?;
        Ok(self.controller.handle_staff_input(note.as_deref(), &meta))
    }

    #[wasm_bindgen(js_name = getState)]
    pub fn get_state(&self) -> Result<JsValue, JsValue> {
        #[derive(serde::Serialize)]
        #[serde(rename_all = "camelCase")]
        struct State {
            phase: InputPhase,
            enabled: bool,
            practice_limit: usize,
            answer_limit: usize,
        }
        serialize(
            &State {
                phase: self.controller.phase(),
                enabled: self.controller.is_enabled(),
                practice_limit: self.controller.practice_limit(),
                answer_limit: self.controller.answer_limit(),
            },
            "Input state serialization error",
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_limit() {
        assert_eq!(normalize_limit(4.0), 4);
        assert_eq!(normalize_limit(2.9), 2);
        assert_eq!(normalize_limit(0.5), 0);
        assert_eq!(normalize_limit(-1.0), 0);
        assert_eq!(normalize_limit(f64::NAN), 0);
        assert_eq!(normalize_limit(f64::INFINITY), 0);
    }
}

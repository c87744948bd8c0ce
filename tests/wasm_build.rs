//! WASM build test
//!
//! Checks that the bindings load in a browser and the JS-facing handles work.

#![cfg(target_arch = "wasm32")]

use staff_engine_wasm::api::*;
use wasm_bindgen::JsValue;
use wasm_bindgen_test::*;

wasm_bindgen_test_configure!(run_in_browser);

#[wasm_bindgen_test]
fn test_theory_functions() {
    assert_eq!(canonicalize_key_signature("eb").as_deref(), Some("Eb"));
    assert_eq!(note_to_midi_js("C4"), Some(60));
    assert_eq!(midi_to_note(61, Some(true)), "C#4");
}

#[wasm_bindgen_test]
fn test_font_options_serialize() {
    let options = list_font_options_js();
    assert!(options.is_ok());
    assert!(js_sys::Array::is_array(&options.unwrap()));
}

#[wasm_bindgen_test]
fn test_display_handle_without_renderer() {
    let mut display = StaffDisplayHandle::new(JsValue::UNDEFINED, JsValue::UNDEFINED).unwrap();
    assert!(display.initialize().is_ok());
    assert!(display.set_key_signature("G").is_ok());
    assert_eq!(display.get_key_signature(), "G");
}

#[wasm_bindgen_test]
fn test_input_handle_defaults() {
    let mut input = StaffInputHandle::new(js_sys::Object::new().into());
    assert!(!input.is_enabled());
    input.set_enabled(true, JsValue::UNDEFINED).unwrap();
    assert_eq!(input.get_phase(), "practice");
    assert!(input.handle_staff_input(Some("C4".to_string()), JsValue::UNDEFINED).unwrap());
}

fn callbacks(draw_body: &str, fonts_body: &str) -> JsValue {
    let callbacks = js_sys::Object::new();
    let draw = js_sys::Function::new_with_args("request", draw_body);
    let load = js_sys::Function::new_with_args("stack", fonts_body);
    js_sys::Reflect::set(&callbacks, &JsValue::from_str("draw"), &draw).unwrap();
    js_sys::Reflect::set(&callbacks, &JsValue::from_str("loadFonts"), &load).unwrap();
    callbacks.into()
}

fn field(value: &JsValue, name: &str) -> JsValue {
    js_sys::Reflect::get(value, &JsValue::from_str(name)).unwrap()
}

#[wasm_bindgen_test]
fn test_async_draw_callback_fails_the_render() {
    let mut display =
        StaffDisplayHandle::new(JsValue::UNDEFINED, callbacks("return Promise.resolve({});", "return true;")).unwrap();
    let status = display.initialize().unwrap();
    assert_eq!(field(&status, "status").as_string().as_deref(), Some("failed"));
    assert_eq!(display.get_status_message(), "Staff unavailable.");
}

#[wasm_bindgen_test]
fn test_async_font_loader_falls_back_with_warning() {
    let mut display =
        StaffDisplayHandle::new(JsValue::UNDEFINED, callbacks("return {};", "return Promise.resolve(true);")).unwrap();
    let status = display.initialize().unwrap();
    assert_eq!(field(&status, "status").as_string().as_deref(), Some("rendered"));
    let warnings = field(&display.get_render_state().unwrap(), "warnings");
    assert!(js_sys::Array::from(&warnings)
        .iter()
        .any(|w| w.as_string().unwrap_or_default().contains("font unavailable")));
}

#[wasm_bindgen_test]
fn test_update_entry_accepts_object_or_function() {
    let mut display = StaffDisplayHandle::new(JsValue::UNDEFINED, callbacks("return {};", "return true;")).unwrap();
    let entries = js_sys::JSON::parse(r#"[{"note":"C4"},{"note":"D4"}]"#).unwrap();
    display.set_sequence(entries).unwrap();

    let replacement = js_sys::JSON::parse(r#"{"note":"E4"}"#).unwrap();
    let status = display.update_entry(0.0, replacement).unwrap();
    assert_eq!(field(&status, "status").as_string().as_deref(), Some("rendered"));

    let mutate = js_sys::Function::new_with_args("entry", "return { note: entry.note === 'D4' ? 'F4' : 'B4' };");
    display.update_entry(1.0, mutate.into()).unwrap();

    let keep = js_sys::Function::new_with_args("entry", "return undefined;");
    display.update_entry(0.0, keep.into()).unwrap();

    let missing = display.update_entry(7.0, js_sys::Object::new().into()).unwrap();
    assert_eq!(field(&missing, "status").as_string().as_deref(), Some("skipped"));
    let fractional = display.update_entry(0.5, js_sys::Object::new().into()).unwrap();
    assert_eq!(field(&fractional, "status").as_string().as_deref(), Some("skipped"));

    let voices = js_sys::Array::from(&field(&display.get_render_state().unwrap(), "voices"));
    let first = voices.get(0);
    let specs = js_sys::Array::from(&field(&first, "noteSpecs"));
    let keys: Vec<String> = specs
        .iter()
        .map(|spec| js_sys::Array::from(&field(&spec, "keys")).get(0).as_string().unwrap())
        .collect();
    assert_eq!(keys, vec!["e/4".to_string(), "f/4".to_string()]);
}

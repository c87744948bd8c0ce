//! Staff Engine WASM Module
//!
//! Staff rendering and interactive note entry for the ear-training app.
//! Pitch theory and the note-spec compiler live in `models` and `renderers`,
//! the display façade and the input state machine live in `staff`, and the
//! JavaScript-facing bindings live in `api`.

pub mod models;
pub mod renderers;
pub mod staff;
pub mod utils;
pub mod api;

// Re-export commonly used types
pub use models::*;
pub use renderers::{NoteSpecBuilder, RenderRuntime, RenderState, StaffRenderer, TaskHandle, TaskOutcome};
pub use staff::{InputPhase, StaffDisplay, StaffInputController};

use wasm_bindgen::prelude::*;

// This is like the `main` function, but for WASM modules.
#[wasm_bindgen(start)]
pub fn main() {
    #[cfg(feature = "console_error_panic_hook")]
    console_error_panic_hook::set_once();

    #[cfg(feature = "console_log")]
    // Fails only if a logger is already installed.
    let _ = console_log::init_with_level(log::Level::Debug);

    log::info!("Staff engine WASM module initialized");
}

//! Renderers module for the staff engine
//!
//! This module turns semantic note entries into resolved render specs and
//! drives the drawing backend through a serialized render runtime.

pub mod errors;
pub mod theme;
pub mod fonts;
pub mod layout;
pub mod backend;
pub mod spec_builder;
pub mod runtime;

// Re-export commonly used types
pub use errors::{ConfigError, FontError, RenderError};
pub use theme::StaffTheme;
pub use fonts::{list_font_options, FontChoice, FontId, FontLoader, FontResolution, FontResolver, NoopFontLoader};
pub use layout::{
    calculate_staff_padding, closest_pitch_for_y, compute_dimensions, resolve_staff_scale, ClosestPitch,
    ContainerMetrics, Dimensions, PaddingOptions, PitchSearch, StaffConfig, StaffMetrics, StaffPadding,
    StaffSizing, StaffSizingUpdate, DEFAULT_STAFF_SCALE,
};
pub use backend::{DrawOutcome, DrawRequest, HeadlessRenderer, StaffRenderer};
pub use spec_builder::{decide_displayed_accidental, NoteSpecBuilder};
pub use runtime::{
    PendingSelection, RenderReport, RenderRuntime, RenderState, RenderStateUpdate, TaskHandle, TaskOutcome,
};

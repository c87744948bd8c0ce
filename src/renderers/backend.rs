//! Drawing backend boundary
//!
//! The engine never paints. It hands a fully resolved `DrawRequest` to a
//! `StaffRenderer` and records what comes back.

use super::errors::RenderError;
use super::fonts::FontChoice;
use super::layout::{Dimensions, StaffPadding};
use super::theme::StaffTheme;
use crate::models::{Clef, KeySignature, Meter, Voice};
use serde::{Deserialize, Serialize};

/// Everything the backend needs for one render pass
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DrawRequest {
    pub voices: Vec<Voice>,
    pub meter: Meter,
    pub key_sig: KeySignature,
    pub clef: Clef,
    pub staff_scale: f64,
    pub dimensions: Dimensions,
    pub padding: StaffPadding,
    pub font: FontChoice,
    pub theme: StaffTheme,
    pub warnings: Vec<String>,
}

/// What the backend reports after painting
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DrawOutcome {
    /// Backend-side warnings (e.g. notes that did not fit)
    pub warnings: Vec<String>,
    /// Text for the status line
    pub base_message: Option<String>,
    /// Actual drawn size, when the backend measured it
    pub width: Option<f64>,
    pub height: Option<f64>,
}

/// Paints a staff from a resolved request
pub trait StaffRenderer {
    fn draw(&mut self, request: &DrawRequest) -> Result<DrawOutcome, RenderError>;
}

/// Renderer that only remembers the last request; for headless hosts
#[derive(Debug, Default)]
pub struct HeadlessRenderer {
    pub last_request: Option<DrawRequest>,
    pub draw_count: usize,
}

impl StaffRenderer for HeadlessRenderer {
    fn draw(&mut self, request: &DrawRequest) -> Result<DrawOutcome, RenderError> {
        self.draw_count += 1;
        self.last_request = Some(request.clone());
        Ok(DrawOutcome {
            width: Some(request.dimensions.scaled_width),
            height: Some(request.dimensions.scaled_height),
            ..DrawOutcome::default()
        })
    }
}

//! Staff display façade
//!
//! `StaffDisplay` holds what should be on the staff (primary entries, an
//! optional overlay voice and an optional single highlight) and re-renders
//! through its `RenderRuntime` after every change. Specs are rebuilt from
//! the entries on every render; nothing is diffed against the last draw.
//!
//! Every mutating call returns a `TaskHandle` that settles once its render
//! has run. Calls that need no render return an already-settled handle.

use super::highlight::{HighlightTimer, TimerId, TimerScheduler, DEFAULT_HIGHLIGHT_DURATION};
use crate::models::{Clef, KeySignature, Meter, NoteEntry, SemanticState, Voice};
use crate::renderers::layout::{
    calculate_staff_padding, compute_dimensions, resolve_staff_scale, ContainerMetrics, PaddingOptions,
    StaffSizing, StaffSizingUpdate,
};
use crate::renderers::runtime::dedupe_warnings;
use crate::renderers::{
    DrawRequest, FontChoice, FontId, FontLoader, FontResolver, NoteSpecBuilder, RenderError, RenderReport,
    RenderRuntime, RenderStateUpdate, StaffRenderer, StaffTheme, TaskHandle, TaskOutcome,
};
use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

/// Status text shown when the backend fails to draw
pub const STAFF_UNAVAILABLE: &str = "Staff unavailable.";

/// Constructor configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StaffDisplayOptions {
    pub clef: Clef,
    /// Free-form key token; unsupported tokens fall back to C
    pub key_signature: String,
    pub font_id: FontId,
    pub meter: Meter,
    pub sizing: StaffSizing,
    pub staff_scale: Option<f64>,
    pub theme: StaffTheme,
    pub highlight_duration_ms: Option<u64>,
}

impl Default for StaffDisplayOptions {
    fn default() -> Self {
        Self {
            clef: Clef::Treble,
            key_signature: "C".to_string(),
            font_id: FontId::default(),
            meter: Meter::default(),
            sizing: StaffSizing::defaults(),
            staff_scale: None,
            theme: StaffTheme::default(),
            highlight_duration_ms: None,
        }
    }
}

pub struct StaffDisplay {
    runtime: Rc<RenderRuntime>,
    renderer: Rc<RefCell<Box<dyn StaffRenderer>>>,
    fonts: FontResolver,
    timer: HighlightTimer,
    status: Rc<RefCell<String>>,

    clef: Clef,
    key_signature: KeySignature,
    meter: Meter,
    theme: StaffTheme,
    sizing: StaffSizing,
    staff_scale: Option<f64>,
    font_id: FontId,
    font_choice: FontChoice,
    font_dirty: bool,
    highlight_duration: Duration,

    entries: Vec<NoteEntry>,
    overlay: Option<Vec<NoteEntry>>,
    highlight: Option<NoteEntry>,
}

impl StaffDisplay {
    pub fn new(
        options: StaffDisplayOptions,
        renderer: Box<dyn StaffRenderer>,
        font_loader: Box<dyn FontLoader>,
        scheduler: Box<dyn TimerScheduler>,
    ) -> Self {
        Self::with_runtime(
            options,
            Rc::new(RenderRuntime::default()),
            renderer,
            font_loader,
            scheduler,
        )
    }

    /// Build on a runtime shared with other components
    pub fn with_runtime(
        options: StaffDisplayOptions,
        runtime: Rc<RenderRuntime>,
        renderer: Box<dyn StaffRenderer>,
        font_loader: Box<dyn FontLoader>,
        scheduler: Box<dyn TimerScheduler>,
    ) -> Self {
        let key_signature = KeySignature::canonicalize(&options.key_signature).unwrap_or_default();
        let sizing = options.sizing.normalized();
        let meter = options.meter.sanitized();

        runtime.update(RenderStateUpdate {
            key_sig: Some(key_signature),
            primary_clef: Some(options.clef),
            meter: Some(meter),
            sizing: Some(sizing),
            staff_scale: options.staff_scale,
            ..RenderStateUpdate::default()
        });

        Self {
            runtime,
            renderer: Rc::new(RefCell::new(renderer)),
            fonts: FontResolver::new(font_loader),
            timer: HighlightTimer::new(scheduler),
            status: Rc::new(RefCell::new(String::new())),
            clef: options.clef,
            key_signature,
            meter,
            theme: options.theme,
            sizing,
            staff_scale: options.staff_scale,
            font_id: options.font_id,
            font_choice: options.font_id.choice(),
            font_dirty: true,
            highlight_duration: options
                .highlight_duration_ms
                .map(Duration::from_millis)
                .unwrap_or(DEFAULT_HIGHLIGHT_DURATION),
            entries: Vec::new(),
            overlay: None,
            highlight: None,
        }
    }

    pub fn runtime(&self) -> Rc<RenderRuntime> {
        self.runtime.clone()
    }

    // ========================================================================
    // Content
    // ========================================================================

    /// Configure the font, resolve the scale and draw the first frame
    pub fn initialize(&mut self) -> TaskHandle {
        self.font_dirty = true;
        self.render()
    }

    /// Replace the primary voice wholesale
    pub fn set_sequence(&mut self, entries: Vec<NoteEntry>) -> TaskHandle {
        self.entries = entries;
        self.render()
    }

    /// Show a second voice beside the primary one
    pub fn set_overlay(&mut self, entries: Vec<NoteEntry>) -> TaskHandle {
        self.overlay = Some(entries);
        self.render()
    }

    pub fn clear_overlay(&mut self) -> TaskHandle {
        self.overlay = None;
        self.render()
    }

    /// Show a transient highlight for the default duration
    pub fn set_highlight(&mut self, entry: NoteEntry) -> TaskHandle {
        let duration = self.highlight_duration;
        self.set_highlight_for(entry, duration)
    }

    /// Show a transient highlight, replacing any pending auto-clear
    pub fn set_highlight_for(&mut self, mut entry: NoteEntry, duration: Duration) -> TaskHandle {
        if entry.state.is_none() {
            entry.state = Some(SemanticState::Highlight);
        }
        self.highlight = Some(entry);
        let timer = self.timer.arm(duration);
        log::debug!("[StaffDisplay] highlight armed (timer {}, {:?})", timer, duration);
        self.render()
    }

    pub fn clear_highlight(&mut self) -> TaskHandle {
        self.timer.cancel();
        self.highlight = None;
        self.render()
    }

    /// Deliver a host timer expiry; stale ids are ignored
    pub fn fire_timer(&mut self, id: TimerId) -> Option<TaskHandle> {
        if !self.timer.expire(id) {
            log::debug!("[StaffDisplay] ignoring stale timer {}", id);
            return None;
        }
        self.highlight = None;
        Some(self.render())
    }

    /// Mutate one primary entry in place; out of range is a no-op
    pub fn update_entry<F>(&mut self, index: usize, mutator: F) -> TaskHandle
    where
        F: FnOnce(&mut NoteEntry),
    {
        let Some(entry) = self.entries.get_mut(index) else {
            log::debug!("[StaffDisplay] update_entry index {} out of range", index);
            return self.runtime.settled(TaskOutcome::Skipped);
        };
        mutator(entry);
        self.render()
    }

    // ========================================================================
    // Configuration
    // ========================================================================

    /// Canonicalize and apply a key; invalid or unchanged keys just re-render
    pub fn set_key_signature(&mut self, token: &str) -> TaskHandle {
        match KeySignature::canonicalize(token) {
            Some(key) if key != self.key_signature => {
                self.key_signature = key;
            }
            Some(_) => {}
            None => log::warn!("[StaffDisplay] unsupported key signature '{}'; keeping {}", token, self.key_signature),
        }
        self.render()
    }

    /// Re-renders only when the clef actually changes
    pub fn set_clef(&mut self, clef: Clef) -> TaskHandle {
        if clef == self.clef {
            return self.runtime.settled(TaskOutcome::Skipped);
        }
        self.clef = clef;
        self.render()
    }

    /// Switch fonts; the next render re-resolves the configuration
    pub fn set_font(&mut self, font_id: FontId) -> TaskHandle {
        if font_id == self.font_id {
            return self.runtime.settled(TaskOutcome::Skipped);
        }
        self.font_id = font_id;
        self.font_dirty = true;
        self.render()
    }

    pub fn set_meter(&mut self, meter: Meter) -> TaskHandle {
        self.meter = meter.sanitized();
        self.render()
    }

    pub fn set_theme(&mut self, theme: StaffTheme) -> TaskHandle {
        self.theme = theme;
        self.render()
    }

    /// Merge sizing overrides; no render when nothing changed
    pub fn set_width_options(&mut self, update: StaffSizingUpdate) -> TaskHandle {
        let mut sizing = self.sizing;
        if !sizing.apply(&update) {
            return self.runtime.settled(TaskOutcome::Skipped);
        }
        let sizing = sizing.normalized();
        if sizing == self.sizing {
            return self.runtime.settled(TaskOutcome::Skipped);
        }
        self.sizing = sizing;
        self.render()
    }

    /// Host-measured container size; re-renders when it changed
    pub fn set_container(&mut self, metrics: ContainerMetrics) -> TaskHandle {
        let current = self.runtime.snapshot().map(|state| state.container).ok();
        if current == Some(metrics) {
            return self.runtime.settled(TaskOutcome::Skipped);
        }
        self.runtime.update(RenderStateUpdate {
            container: Some(metrics),
            ..RenderStateUpdate::default()
        });
        self.render()
    }

    pub fn set_container_width(&mut self, width: f64) -> TaskHandle {
        let parent_width = self
            .runtime
            .snapshot()
            .map(|state| state.container.parent_width)
            .unwrap_or(0.0);
        self.set_container(ContainerMetrics { width, parent_width })
    }

    // ========================================================================
    // Queries
    // ========================================================================

    pub fn get_font_label(&self) -> &str {
        &self.font_choice.label
    }

    pub fn font_id(&self) -> FontId {
        self.font_id
    }

    /// Text of the status line after the last render
    pub fn status_message(&self) -> String {
        self.status.borrow().clone()
    }

    pub fn key_signature(&self) -> KeySignature {
        self.key_signature
    }

    pub fn clef(&self) -> Clef {
        self.clef
    }

    pub fn entries(&self) -> &[NoteEntry] {
        &self.entries
    }

    pub fn overlay(&self) -> Option<&[NoteEntry]> {
        self.overlay.as_deref()
    }

    pub fn highlight(&self) -> Option<&NoteEntry> {
        self.highlight.as_ref()
    }

    pub fn sizing(&self) -> StaffSizing {
        self.sizing
    }

    fn builder(&self) -> NoteSpecBuilder {
        NoteSpecBuilder::new(self.key_signature, self.clef, self.theme.clone())
    }

    /// Voices the next render will draw: primary, then overlay, then highlight
    pub fn resolve_voices(&self) -> Vec<Voice> {
        let builder = self.builder();
        let mut voices = vec![builder.build_voice(&self.entries)];

        if let Some(overlay) = &self.overlay {
            let voice = builder.build_voice(overlay);
            if !voice.note_specs.is_empty() {
                voices.push(voice);
            }
        }

        if let Some(entry) = &self.highlight {
            if let Some(mut spec) = builder.build(entry) {
                spec.style = self.theme.style_for_state(SemanticState::Highlight);
                voices.push(Voice::new(self.clef, vec![spec]));
            }
        }
        voices
    }

    // ========================================================================
    // Rendering
    // ========================================================================

    fn configure_font(&mut self) -> Vec<String> {
        let resolution = self.fonts.resolve(self.font_id);
        self.font_choice = resolution.choice;
        self.font_dirty = false;
        resolution.warnings
    }

    fn render(&mut self) -> TaskHandle {
        let font_warnings = if self.font_dirty {
            self.configure_font()
        } else {
            Vec::new()
        };
        let staff_scale = resolve_staff_scale(self.staff_scale);
        self.staff_scale = Some(staff_scale);

        self.runtime.update(RenderStateUpdate {
            key_sig: Some(self.key_signature),
            primary_clef: Some(self.clef),
            meter: Some(self.meter),
            sizing: Some(self.sizing),
            staff_scale: Some(staff_scale),
            ..RenderStateUpdate::default()
        });

        let voices = self.resolve_voices();
        let renderer = self.renderer.clone();
        let status = self.status.clone();
        let theme = self.theme.clone();
        let font = self.font_choice.clone();

        self.runtime.enqueue("draw", move |state| {
            state.voices = voices.clone();
            state.font_choice = Some(font.clone());
            if !font_warnings.is_empty() {
                state.warnings = dedupe_warnings(state.warnings.iter().cloned().chain(font_warnings));
            }

            let dimensions = compute_dimensions(state.container, staff_scale, state.staff_scale_y, &state.sizing);
            state.computed_width = Some(dimensions.base_width);
            state.computed_height = Some(dimensions.base_height);
            let padding = calculate_staff_padding(dimensions.base_width, dimensions.base_height, PaddingOptions::default());

            let request = DrawRequest {
                voices,
                meter: state.meter,
                key_sig: state.key_sig,
                clef: state.primary_clef,
                staff_scale,
                dimensions,
                padding,
                font,
                theme,
                warnings: state.warnings.clone(),
            };

            let drawn = match renderer.try_borrow_mut() {
                Ok(mut backend) => backend.draw(&request),
                Err(_) => Err(RenderError::Backend("renderer is already drawing".to_string())),
            };

            match drawn {
                Ok(outcome) => {
                    if !outcome.warnings.is_empty() {
                        state.warnings = dedupe_warnings(state.warnings.iter().cloned().chain(outcome.warnings));
                    }
                    state.base_message = outcome.base_message.clone();
                    *status.borrow_mut() = outcome.base_message.clone().unwrap_or_default();
                    Ok(Some(RenderReport {
                        voice_count: request.voices.len(),
                        note_count: request.voices.iter().map(|v| v.note_specs.len()).sum(),
                        dimensions: Some(dimensions),
                        warnings: state.warnings.clone(),
                        base_message: outcome.base_message,
                    }))
                }
                Err(err) => {
                    state.base_message = Some(STAFF_UNAVAILABLE.to_string());
                    *status.borrow_mut() = STAFF_UNAVAILABLE.to_string();
                    Err(err)
                }
            }
        })
    }
}

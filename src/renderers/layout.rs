//! Staff sizing, padding, scale and pointer geometry
//!
//! Sizing values come from the host container's data attributes and from
//! `StaffDisplay::set_width_options`. Every value is optional; unset values
//! fall back to the defaults below when dimensions are computed.

use super::errors::ConfigError;
use crate::models::{Clef, Pitch, SpellingPreference, midi_to_spelling};
use crate::utils::{parse_float_prefix, parse_positive_number, positive};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

// ============================================================================
// Defaults
// ============================================================================

pub const DEFAULT_STAFF_SCALE: f64 = 1.8;

/// Base height used by the sizing defaults
pub const DEFAULT_BASE_HEIGHT: f64 = 188.0;

/// Height used at layout time when no base height is configured
pub const LAYOUT_BASE_HEIGHT: f64 = 200.0;

pub const DEFAULT_MIN_WIDTH: f64 = 480.0;
pub const FALLBACK_WIDTH: f64 = 720.0;
pub const DEFAULT_BREAKPOINT: f64 = 900.0;

pub const DEFAULT_MIDI_MIN: i32 = 36;
pub const DEFAULT_MIDI_MAX: i32 = 96;

const RESPONSIVE_KEYS: [&str; 6] = [
    "staffScale",
    "staffScaleY",
    "staffMinWidth",
    "staffMaxWidth",
    "staffTargetWidth",
    "staffBaseHeight",
];

// ============================================================================
// Sizing
// ============================================================================

/// Width/height configuration in unscaled staff units
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StaffSizing {
    pub min_width: Option<f64>,
    pub max_width: Option<f64>,
    pub target_width: Option<f64>,
    pub base_height: Option<f64>,
}

impl StaffSizing {
    /// Sizing used when the host configures nothing
    pub fn defaults() -> Self {
        Self {
            base_height: Some(DEFAULT_BASE_HEIGHT),
            ..Self::default()
        }
    }

    /// Drop non-positive values and a max width below the min width
    pub fn normalized(self) -> Self {
        let mut sizing = StaffSizing {
            min_width: self.min_width.and_then(positive),
            max_width: self.max_width.and_then(positive),
            target_width: self.target_width.and_then(positive),
            base_height: self.base_height.and_then(positive),
        };
        if let (Some(min), Some(max)) = (sizing.min_width, sizing.max_width) {
            if max < min {
                sizing.max_width = None;
            }
        }
        sizing
    }

    /// Merge a partial update; returns `true` if any field changed
    ///
    /// A present field replaces the current value. A present non-positive
    /// value clears it.
    pub fn apply(&mut self, update: &StaffSizingUpdate) -> bool {
        let mut dirty = false;
        let fields = [
            (&mut self.min_width, update.min_width),
            (&mut self.max_width, update.max_width),
            (&mut self.target_width, update.target_width),
            (&mut self.base_height, update.base_height),
        ];
        for (current, requested) in fields {
            if let Some(raw) = requested {
                let parsed = positive(raw);
                if *current != parsed {
                    *current = parsed;
                    dirty = true;
                }
            }
        }
        dirty
    }
}

/// Partial sizing change; `None` leaves a field untouched
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StaffSizingUpdate {
    pub min_width: Option<f64>,
    pub max_width: Option<f64>,
    pub target_width: Option<f64>,
    pub base_height: Option<f64>,
}

/// Measured container widths in CSS pixels (0 when unknown)
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ContainerMetrics {
    pub width: f64,
    pub parent_width: f64,
}

/// Resolved staff dimensions
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Dimensions {
    pub base_width: f64,
    pub base_height: f64,
    pub scaled_width: f64,
    pub scaled_height: f64,
    pub scale_x: f64,
    pub scale_y: f64,
}

/// Resolve the staff's base and scaled size
///
/// Width candidates, first usable wins: target width, measured container
/// width, parent width, min width, then 720. The result is clamped to the
/// max width and then raised to the min width (480 when unset).
pub fn compute_dimensions(
    container: ContainerMetrics,
    scale_x: f64,
    scale_y: Option<f64>,
    sizing: &StaffSizing,
) -> Dimensions {
    let scale_x = positive(scale_x).unwrap_or(1.0);
    let scale_y = scale_y.and_then(positive).unwrap_or(scale_x);

    let min_width = sizing.min_width.and_then(positive).unwrap_or(DEFAULT_MIN_WIDTH);
    let measured = positive(container.width).map(|w| w / scale_x);
    let parent = positive(container.parent_width).map(|w| w / scale_x);

    let candidate = sizing
        .target_width
        .and_then(positive)
        .or(measured)
        .or(parent)
        .unwrap_or(if min_width > 0.0 { min_width } else { FALLBACK_WIDTH });

    let mut base_width = candidate;
    if let Some(max) = sizing.max_width.and_then(positive) {
        base_width = base_width.min(max);
    }
    base_width = base_width.max(min_width);

    let base_height = sizing.base_height.and_then(positive).unwrap_or(LAYOUT_BASE_HEIGHT);

    let dims = Dimensions {
        base_width,
        base_height,
        scaled_width: (base_width * scale_x).round(),
        scaled_height: (base_height * scale_y).round(),
        scale_x,
        scale_y,
    };
    log::debug!("[StaffLayout] sizing {:?} from container {:?}", dims, container);
    dims
}

/// Scale from state if set, otherwise the default
pub fn resolve_staff_scale(scale: Option<f64>) -> f64 {
    scale.and_then(positive).unwrap_or(DEFAULT_STAFF_SCALE)
}

// ============================================================================
// Padding
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PaddingOptions {
    pub horizontal_ratio: f64,
    pub vertical_ratio: f64,
    pub min_horizontal: f64,
    pub min_vertical: f64,
}

impl Default for PaddingOptions {
    fn default() -> Self {
        Self {
            horizontal_ratio: 0.02,
            vertical_ratio: 0.022,
            min_horizontal: 14.0,
            min_vertical: 4.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StaffPadding {
    pub horizontal: f64,
    pub vertical: f64,
}

pub fn calculate_staff_padding(base_width: f64, base_height: f64, options: PaddingOptions) -> StaffPadding {
    let width = positive(base_width);
    let height = positive(base_height);
    let horizontal = width
        .map(|w| (w * options.horizontal_ratio).round())
        .unwrap_or(options.min_horizontal.round())
        .max(options.min_horizontal);
    let vertical = height
        .map(|h| (h * options.vertical_ratio).round())
        .unwrap_or(options.min_vertical.round())
        .max(options.min_vertical);
    StaffPadding { horizontal, vertical }
}

// ============================================================================
// Host configuration
// ============================================================================

/// Staff configuration read from the container's data attributes
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StaffConfig {
    pub sizing: StaffSizing,
    pub scale: Option<f64>,
    pub scale_y: Option<f64>,
    pub pack: Option<f64>,
}

impl StaffConfig {
    /// Read from a dataset map, applying `Mobile`/`Desktop` overrides
    ///
    /// Malformed values are logged and treated as unset.
    pub fn from_dataset(dataset: &HashMap<String, String>, viewport_width: Option<f64>) -> StaffConfig {
        let dataset = resolve_responsive_dataset(dataset, viewport_width);
        let read = |key: &str| match read_positive(&dataset, key) {
            Ok(value) => value,
            Err(err) => {
                log::warn!("[StaffConfig] {}", err);
                None
            }
        };

        let defaults = StaffSizing::defaults();
        let sizing = StaffSizing {
            min_width: read("staffMinWidth").or(defaults.min_width),
            max_width: read("staffMaxWidth").or(defaults.max_width),
            target_width: read("staffTargetWidth").or(defaults.target_width),
            base_height: read("staffBaseHeight").or(defaults.base_height),
        }
        .normalized();

        StaffConfig {
            sizing,
            scale: read("staffScale"),
            scale_y: read("staffScaleY"),
            pack: read("staffPack"),
        }
    }

    /// Parse a JSON object of data attributes
    pub fn from_json(json: &str, viewport_width: Option<f64>) -> Result<StaffConfig, ConfigError> {
        let raw: HashMap<String, serde_json::Value> = serde_json::from_str(json)?;
        let dataset = raw
            .into_iter()
            .filter_map(|(key, value)| match value {
                serde_json::Value::String(s) => Some((key, s)),
                serde_json::Value::Number(n) => Some((key, n.to_string())),
                _ => None,
            })
            .collect();
        Ok(StaffConfig::from_dataset(&dataset, viewport_width))
    }
}

/// Present values must be positive numbers; absent or blank values are `None`
pub fn read_positive(dataset: &HashMap<String, String>, key: &str) -> Result<Option<f64>, ConfigError> {
    match dataset.get(key).map(|v| v.trim()) {
        None | Some("") => Ok(None),
        Some(value) => parse_positive_number(value).map(Some).ok_or_else(|| ConfigError::NotPositive {
            key: key.to_string(),
            value: value.to_string(),
        }),
    }
}

/// Copy `<key>Mobile` or `<key>Desktop` over `<key>` depending on the viewport
pub fn resolve_responsive_dataset(
    dataset: &HashMap<String, String>,
    viewport_width: Option<f64>,
) -> HashMap<String, String> {
    let mut resolved = dataset.clone();
    let Some(viewport) = viewport_width.and_then(positive) else {
        return resolved;
    };
    let breakpoint = dataset
        .get("staffBreakpoint")
        .and_then(|v| parse_float_prefix(v))
        .map(f64::trunc)
        .filter(|b| *b != 0.0)
        .unwrap_or(DEFAULT_BREAKPOINT);
    let suffix = if viewport <= breakpoint { "Mobile" } else { "Desktop" };

    for key in RESPONSIVE_KEYS {
        if let Some(value) = dataset.get(&format!("{}{}", key, suffix)) {
            resolved.insert(key.to_string(), value.clone());
        }
    }
    resolved
}

// ============================================================================
// Pointer geometry
// ============================================================================

/// Vertical geometry of a drawn stave
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StaffMetrics {
    /// Y of the top staff line
    pub top_y: f64,
    /// Distance between adjacent staff lines
    pub spacing: f64,
}

impl StaffMetrics {
    /// Y for a line number counted down from the top line (0) in half steps
    pub fn y_for_line(&self, line: f64) -> f64 {
        self.top_y + line * self.spacing
    }
}

/// Candidate range and tie-breaking for pointer lookups
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PitchSearch {
    pub midi_min: i32,
    pub midi_max: i32,
    pub prefer_natural: bool,
    pub spelling: SpellingPreference,
}

impl Default for PitchSearch {
    fn default() -> Self {
        Self {
            midi_min: DEFAULT_MIDI_MIN,
            midi_max: DEFAULT_MIDI_MAX,
            prefer_natural: true,
            spelling: SpellingPreference::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClosestPitch {
    pub midi: i32,
    pub pitch: Pitch,
    /// Line counted down from the top staff line
    pub line: f64,
    pub y: f64,
    pub diff: f64,
}

/// Backend line number for a pitch's letter under `clef` (bottom-up, top line = 5)
pub fn staff_line_for(pitch: &Pitch, clef: Clef) -> f64 {
    let shift = match clef {
        Clef::Treble => 0.0,
        Clef::Bass => 6.0,
        Clef::Alto => 3.0,
        Clef::Tenor => 4.0,
    };
    (pitch.octave * 7 - 28 + pitch.letter.step()) as f64 / 2.0 + shift
}

/// Nearest pitch to a pointer Y on the stave
///
/// Ties between enharmonic candidates on the same line go to the natural
/// spelling when `prefer_natural` is set, otherwise to the later candidate.
pub fn closest_pitch_for_y(
    target_y: f64,
    clef: Clef,
    metrics: StaffMetrics,
    search: PitchSearch,
) -> Option<ClosestPitch> {
    if !target_y.is_finite() || !metrics.top_y.is_finite() || !metrics.spacing.is_finite() {
        return None;
    }

    let mut best: Option<ClosestPitch> = None;
    for midi in search.midi_min..=search.midi_max {
        let pitch = midi_to_spelling(midi, search.spelling);
        let line = 5.0 - staff_line_for(&pitch, clef);
        let y = metrics.y_for_line(line);
        let diff = (y - target_y).abs();

        let replace = match &best {
            None => true,
            Some(current) if diff < current.diff - 1e-6 => true,
            Some(current) if (diff - current.diff).abs() <= 1e-6 => {
                if !search.prefer_natural {
                    true
                } else {
                    current.pitch.accidental.is_some() && pitch.accidental.is_none()
                }
            }
            Some(_) => false,
        };

        if replace {
            best = Some(ClosestPitch {
                midi,
                pitch,
                line,
                y,
                diff,
            });
            // Later candidates can only tie on an accidental, which a natural already beats.
            if diff == 0.0 && pitch.accidental.is_none() && search.prefer_natural {
                break;
            }
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dataset(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn test_dimensions_prefer_target_width() {
        let sizing = StaffSizing {
            target_width: Some(600.0),
            ..StaffSizing::default()
        };
        let dims = compute_dimensions(
            ContainerMetrics {
                width: 2000.0,
                parent_width: 0.0,
            },
            2.0,
            None,
            &sizing,
        );
        assert_eq!(dims.base_width, 600.0);
        assert_eq!(dims.scaled_width, 1200.0);
        assert_eq!(dims.base_height, LAYOUT_BASE_HEIGHT);
        assert_eq!(dims.scaled_height, 400.0);
    }

    #[test]
    fn test_dimensions_use_measured_width_and_clamp() {
        let sizing = StaffSizing {
            max_width: Some(500.0),
            ..StaffSizing::default()
        };
        let dims = compute_dimensions(
            ContainerMetrics {
                width: 1800.0,
                parent_width: 0.0,
            },
            1.8,
            None,
            &sizing,
        );
        // 1800 / 1.8 = 1000, clamped to 500
        assert_eq!(dims.base_width, 500.0);

        let narrow = compute_dimensions(
            ContainerMetrics {
                width: 180.0,
                parent_width: 0.0,
            },
            1.8,
            None,
            &StaffSizing::default(),
        );
        assert_eq!(narrow.base_width, DEFAULT_MIN_WIDTH);
    }

    #[test]
    fn test_dimensions_fall_back_to_parent_then_min() {
        let dims = compute_dimensions(
            ContainerMetrics {
                width: 0.0,
                parent_width: 1000.0,
            },
            1.0,
            Some(1.5),
            &StaffSizing::defaults(),
        );
        assert_eq!(dims.base_width, 1000.0);
        assert_eq!(dims.base_height, DEFAULT_BASE_HEIGHT);
        assert_eq!(dims.scaled_height, (DEFAULT_BASE_HEIGHT * 1.5).round());

        let unmeasured = compute_dimensions(ContainerMetrics::default(), 0.0, None, &StaffSizing::default());
        assert_eq!(unmeasured.base_width, DEFAULT_MIN_WIDTH);
        assert_eq!(unmeasured.scale_x, 1.0);
    }

    #[test]
    fn test_sizing_apply_reports_changes() {
        let mut sizing = StaffSizing::default();
        assert!(!sizing.apply(&StaffSizingUpdate::default()));
        assert!(sizing.apply(&StaffSizingUpdate {
            min_width: Some(400.0),
            ..StaffSizingUpdate::default()
        }));
        assert!(!sizing.apply(&StaffSizingUpdate {
            min_width: Some(400.0),
            ..StaffSizingUpdate::default()
        }));
        assert!(sizing.apply(&StaffSizingUpdate {
            min_width: Some(0.0),
            ..StaffSizingUpdate::default()
        }));
        assert_eq!(sizing.min_width, None);
    }

    #[test]
    fn test_padding() {
        let padding = calculate_staff_padding(1000.0, 200.0, PaddingOptions::default());
        assert_eq!(padding.horizontal, 20.0);
        assert_eq!(padding.vertical, 4.0);
        let tiny = calculate_staff_padding(0.0, 0.0, PaddingOptions::default());
        assert_eq!(tiny, StaffPadding { horizontal: 14.0, vertical: 4.0 });
    }

    #[test]
    fn test_config_from_dataset() {
        let config = StaffConfig::from_dataset(
            &dataset(&[
                ("staffScale", "1.5"),
                ("staffMinWidth", "400"),
                ("staffMaxWidth", "300"),
                ("staffPack", "0"),
            ]),
            None,
        );
        assert_eq!(config.scale, Some(1.5));
        assert_eq!(config.sizing.min_width, Some(400.0));
        assert_eq!(config.sizing.max_width, None);
        assert_eq!(config.sizing.base_height, Some(DEFAULT_BASE_HEIGHT));
        assert_eq!(config.pack, None);
    }

    #[test]
    fn test_responsive_overrides() {
        let data = dataset(&[
            ("staffScale", "1.8"),
            ("staffScaleMobile", "1.2"),
            ("staffScaleDesktop", "2.2"),
            ("staffBreakpoint", "700"),
        ]);
        assert_eq!(StaffConfig::from_dataset(&data, Some(600.0)).scale, Some(1.2));
        assert_eq!(StaffConfig::from_dataset(&data, Some(800.0)).scale, Some(2.2));
        assert_eq!(StaffConfig::from_dataset(&data, None).scale, Some(1.8));
    }

    #[test]
    fn test_config_from_json() {
        let config = StaffConfig::from_json(r#"{"staffTargetWidth": 640, "staffBaseHeight": "150"}"#, None).unwrap();
        assert_eq!(config.sizing.target_width, Some(640.0));
        assert_eq!(config.sizing.base_height, Some(150.0));
        assert!(StaffConfig::from_json("[1, 2]", None).is_err());
    }

    #[test]
    fn test_read_positive_rejects_garbage() {
        let data = dataset(&[("staffScale", "huge"), ("staffPack", "  ")]);
        assert!(matches!(
            read_positive(&data, "staffScale"),
            Err(ConfigError::NotPositive { .. })
        ));
        assert_eq!(read_positive(&data, "staffPack"), Ok(None));
        assert_eq!(read_positive(&data, "missing"), Ok(None));
    }

    #[test]
    fn test_staff_lines_per_clef() {
        let f5 = Pitch::parse("F5").unwrap();
        let e4 = Pitch::parse("E4").unwrap();
        let a3 = Pitch::parse("A3").unwrap();
        assert_eq!(staff_line_for(&f5, Clef::Treble), 5.0);
        assert_eq!(staff_line_for(&e4, Clef::Treble), 1.0);
        assert_eq!(staff_line_for(&a3, Clef::Bass), 5.0);
        assert_eq!(staff_line_for(&Pitch::parse("G4").unwrap(), Clef::Alto), 5.0);
        assert_eq!(staff_line_for(&e4, Clef::Tenor), 5.0);
    }

    #[test]
    fn test_closest_pitch_for_y() {
        let metrics = StaffMetrics {
            top_y: 40.0,
            spacing: 10.0,
        };
        // Top line of the treble staff is F5.
        let top = closest_pitch_for_y(40.0, Clef::Treble, metrics, PitchSearch::default()).unwrap();
        assert_eq!(top.pitch.to_string(), "F5");
        assert_eq!(top.midi, 77);

        // Bottom line is E4.
        let bottom = closest_pitch_for_y(81.0, Clef::Treble, metrics, PitchSearch::default()).unwrap();
        assert_eq!(bottom.pitch.to_string(), "E4");

        // The D4 space below the staff: D natural beats Db.
        let d4 = closest_pitch_for_y(85.0, Clef::Treble, metrics, PitchSearch::default()).unwrap();
        assert_eq!(d4.pitch.to_string(), "D4");

        let bass_top = closest_pitch_for_y(40.0, Clef::Bass, metrics, PitchSearch::default()).unwrap();
        assert_eq!(bass_top.pitch.to_string(), "A3");

        assert!(closest_pitch_for_y(f64::NAN, Clef::Treble, metrics, PitchSearch::default()).is_none());
    }
}

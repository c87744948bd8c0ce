//! Music font catalog and resolution
//!
//! Fonts are a closed set. Each id maps to a typed descriptor with its
//! family stack; ids the drawing backend cannot provide are flagged as
//! fallbacks and carry a warning for the status line.

use super::errors::FontError;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

/// Supported music font
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FontId {
    #[default]
    Bravura,
    Petaluma,
    Leland,
}

impl FontId {
    pub const ALL: [FontId; 3] = [FontId::Bravura, FontId::Petaluma, FontId::Leland];

    pub fn as_str(&self) -> &'static str {
        match self {
            FontId::Bravura => "bravura",
            FontId::Petaluma => "petaluma",
            FontId::Leland => "leland",
        }
    }

    /// Catalog descriptor for this font
    pub fn choice(&self) -> FontChoice {
        match self {
            FontId::Bravura => FontChoice {
                id: FontId::Bravura,
                label: "Bravura".to_string(),
                stack: vec!["Bravura".to_string(), "Academico".to_string()],
                fallback: false,
                warning: None,
            },
            FontId::Petaluma => FontChoice {
                id: FontId::Petaluma,
                label: "Petaluma".to_string(),
                stack: vec!["Petaluma".to_string(), "Petaluma Script".to_string()],
                fallback: false,
                warning: None,
            },
            FontId::Leland => FontChoice {
                id: FontId::Leland,
                label: "Leland".to_string(),
                stack: vec!["Bravura".to_string(), "Academico".to_string()],
                fallback: true,
                warning: Some(
                    "VexFlow does not bundle Leland; falling back to Bravura.".to_string(),
                ),
            },
        }
    }
}

impl fmt::Display for FontId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for FontId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "bravura" => Ok(FontId::Bravura),
            "petaluma" => Ok(FontId::Petaluma),
            "leland" => Ok(FontId::Leland),
            _ => Err(format!("Unknown music font: '{}'", s)),
        }
    }
}

/// Typed font descriptor
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FontChoice {
    pub id: FontId,
    pub label: String,
    /// Family names, most preferred first
    pub stack: Vec<String>,
    /// The requested font is not available and `stack` is a stand-in
    pub fallback: bool,
    pub warning: Option<String>,
}

/// All catalog entries, default first
pub fn list_font_options() -> Vec<FontChoice> {
    FontId::ALL.iter().map(FontId::choice).collect()
}

/// Loads a family stack into the drawing backend
pub trait FontLoader {
    fn load_fonts(&self, stack: &[String]) -> Result<(), FontError>;
}

/// Loader for hosts whose backend bundles every family
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopFontLoader;

impl FontLoader for NoopFontLoader {
    fn load_fonts(&self, stack: &[String]) -> Result<(), FontError> {
        if stack.is_empty() {
            return Err(FontError::EmptyStack);
        }
        Ok(())
    }
}

/// Outcome of configuring a font: the effective choice plus warnings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FontResolution {
    pub choice: FontChoice,
    pub warnings: Vec<String>,
}

/// Memoizes font configuration per id
pub struct FontResolver {
    loader: Box<dyn FontLoader>,
    cache: HashMap<FontId, FontResolution>,
}

impl FontResolver {
    pub fn new(loader: Box<dyn FontLoader>) -> Self {
        Self {
            loader,
            cache: HashMap::new(),
        }
    }

    /// Configure `id`, loading its stack only the first time
    pub fn resolve(&mut self, id: FontId) -> FontResolution {
        if let Some(cached) = self.cache.get(&id) {
            return cached.clone();
        }
        let resolution = self.configure(id);
        self.cache.insert(id, resolution.clone());
        resolution
    }

    /// Number of font ids configured so far
    pub fn configured_count(&self) -> usize {
        self.cache.len()
    }

    fn configure(&self, id: FontId) -> FontResolution {
        let choice = id.choice();
        let mut warnings: Vec<String> = choice.warning.iter().cloned().collect();

        match self.loader.load_fonts(&choice.stack) {
            Ok(()) => {
                log::debug!("[StaffFonts] configured {} ({:?})", choice.label, choice.stack);
                FontResolution { choice, warnings }
            }
            Err(err) => {
                log::warn!("[StaffFonts] Unable to configure font stack {:?}: {}", choice.stack, err);
                let fallback = FontId::default().choice();
                warnings.push(format!(
                    "{} font unavailable; using {}.",
                    choice.label, fallback.label
                ));
                if id != FontId::default() {
                    // Best effort; a failing default still renders with system fonts.
                    if let Err(err) = self.loader.load_fonts(&fallback.stack) {
                        log::warn!("[StaffFonts] fallback stack failed too: {}", err);
                    }
                }
                FontResolution {
                    choice: FontChoice {
                        fallback: true,
                        ..fallback
                    },
                    warnings,
                }
            }
        }
    }
}

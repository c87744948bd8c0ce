//! Error types for the render pipeline
//!
//! None of these are fatal: render failures are caught at the queue task
//! boundary, font failures degrade to the fallback stack, and configuration
//! errors fall back to defaults.

use thiserror::Error;

/// Failure raised by a queued render task or the drawing backend
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RenderError {
    /// The drawing backend refused or failed to paint
    #[error("Drawing backend failed: {0}")]
    Backend(String),

    /// Render state was unavailable to the task
    #[error("Render state unavailable: {0}")]
    StateUnavailable(String),

    /// Font setup failed in a way the fallback could not absorb
    #[error("Font configuration failed: {0}")]
    Font(#[from] FontError),
}

/// Failure loading a font family stack
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FontError {
    #[error("Font stack is empty")]
    EmptyStack,

    #[error("Failed to load font families [{families}]: {reason}")]
    LoadFailed { families: String, reason: String },
}

/// Invalid layout configuration value
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("Invalid value for '{key}': '{value}' (expected a positive number)")]
    NotPositive { key: String, value: String },

    #[error("Invalid staff configuration JSON: {0}")]
    Json(String),
}

impl From<serde_json::Error> for ConfigError {
    fn from(err: serde_json::Error) -> Self {
        ConfigError::Json(err.to_string())
    }
}

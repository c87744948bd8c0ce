//! Staff colour tokens and semantic-state styling
//!
//! The host reads its CSS custom properties and passes them in as a
//! `StaffTheme`. Unset tokens fall back to the built-in state colours.

use crate::models::{NoteStyle, SemanticState};
use serde::{Deserialize, Serialize};

pub const USER_COLOR: &str = "#2196F3";
pub const CORRECT_COLOR: &str = "#4CAF50";
pub const INCORRECT_COLOR: &str = "#F44336";
pub const HIGHLIGHT_COLOR: &str = "#FF9800";

/// Colour tokens supplied by the host stylesheet
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StaffTheme {
    pub stroke: Option<String>,
    pub fill: Option<String>,
    pub ledger: Option<String>,
    pub ledger_width: Option<f64>,
    pub accent: Option<String>,
    pub selection: Option<String>,
    pub correct: Option<String>,
    pub incorrect: Option<String>,
    pub answer: Option<String>,
    pub correction: Option<String>,
}

fn non_empty(token: &Option<String>) -> Option<&str> {
    token.as_deref().map(str::trim).filter(|t| !t.is_empty())
}

impl StaffTheme {
    /// Style for a semantic state, or `None` when the state has no colour
    pub fn style_for_state(&self, state: SemanticState) -> Option<NoteStyle> {
        let color = match state {
            SemanticState::User => Some(USER_COLOR),
            SemanticState::Correct => Some(non_empty(&self.correct).unwrap_or(CORRECT_COLOR)),
            SemanticState::Incorrect => Some(non_empty(&self.incorrect).unwrap_or(INCORRECT_COLOR)),
            SemanticState::Highlight => Some(HIGHLIGHT_COLOR),
            SemanticState::Answer => non_empty(&self.answer),
            SemanticState::Draft => None,
        };
        color.map(NoteStyle::solid)
    }

    /// Explicit style wins; otherwise the state's colour
    pub fn resolve_style(
        &self,
        style: Option<&NoteStyle>,
        state: Option<SemanticState>,
    ) -> Option<NoteStyle> {
        if let Some(style) = style {
            return Some(style.normalized());
        }
        state.and_then(|s| self.style_for_state(s))
    }

    /// Ledger-line style, if the theme sets any ledger token
    pub fn ledger_style(&self) -> Option<NoteStyle> {
        non_empty(&self.ledger).map(NoteStyle::solid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_state_colors() {
        let theme = StaffTheme::default();
        assert_eq!(
            theme.style_for_state(SemanticState::User),
            Some(NoteStyle::solid(USER_COLOR))
        );
        assert_eq!(
            theme.style_for_state(SemanticState::Highlight),
            Some(NoteStyle::solid(HIGHLIGHT_COLOR))
        );
        assert_eq!(theme.style_for_state(SemanticState::Draft), None);
        assert_eq!(theme.style_for_state(SemanticState::Answer), None);
    }

    #[test]
    fn test_theme_tokens_override_defaults() {
        let theme = StaffTheme {
            correct: Some("#00aa00".to_string()),
            answer: Some(" #ffaa00 ".to_string()),
            incorrect: Some("   ".to_string()),
            ..StaffTheme::default()
        };
        assert_eq!(
            theme.style_for_state(SemanticState::Correct),
            Some(NoteStyle::solid("#00aa00"))
        );
        assert_eq!(
            theme.style_for_state(SemanticState::Answer),
            Some(NoteStyle::solid("#ffaa00"))
        );
        assert_eq!(
            theme.style_for_state(SemanticState::Incorrect),
            Some(NoteStyle::solid(INCORRECT_COLOR))
        );
    }

    #[test]
    fn test_explicit_style_wins_over_state() {
        let theme = StaffTheme::default();
        let style = NoteStyle {
            fill_style: Some("#111111".to_string()),
            stroke_style: None,
        };
        let resolved = theme
            .resolve_style(Some(&style), Some(SemanticState::Correct))
            .unwrap();
        assert_eq!(resolved, NoteStyle::solid("#111111"));
        assert_eq!(theme.resolve_style(None, None), None);
    }
}

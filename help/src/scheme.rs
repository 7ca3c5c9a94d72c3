//! Colors applied to generated parts of the help text.

use serde::{Deserialize, Serialize};

use crate::markup::{Style, Text};

/// Style lists, in markup syntax, for each kind of generated text.
///
/// ```
/// use argbind_help::ColorScheme;
///
/// let scheme: ColorScheme = serde_json::from_str(r#"{"options": "fg(cyan)"}"#).unwrap();
/// assert_eq!(scheme.options, "fg(cyan)");
/// assert_eq!(scheme.commands, "bold");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColorScheme {
    pub commands: String,
    pub options: String,
    pub parameters: String,
}

impl Default for ColorScheme {
    fn default() -> Self {
        Self {
            commands: "bold".to_string(),
            options: "fg(yellow)".to_string(),
            parameters: "italic".to_string(),
        }
    }
}

/// A [`ColorScheme`] with its style lists parsed.
#[derive(Debug, Clone, Default)]
pub(crate) struct Styles {
    commands: Vec<Style>,
    options: Vec<Style>,
    parameters: Vec<Style>,
}

impl Styles {
    pub fn new(scheme: &ColorScheme) -> Self {
        Self {
            commands: Style::parse_list(&scheme.commands),
            options: Style::parse_list(&scheme.options),
            parameters: Style::parse_list(&scheme.parameters),
        }
    }

    pub fn command(&self, text: &str) -> Text {
        Text::styled(text, self.commands.clone())
    }

    pub fn option(&self, text: &str) -> Text {
        Text::styled(text, self.options.clone())
    }

    pub fn parameter(&self, text: &str) -> Text {
        Text::styled(text, self.parameters.clone())
    }
}

//! Parser and help configuration.
//!
//! Settings are plain serde data so they can live next to a command
//! definition on disk. Every field has a default, so a partial file only
//! overrides what it names.
//!
//! # Example YAML
//!
//! ```yaml
//! parser:
//!   abbreviated_options: true
//!   unmatched_arguments_allowed: true
//! help:
//!   width: 100
//!   sort_options: declaration
//!   ansi: off
//! ```

use std::io::{BufReader, BufWriter};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::types::CommandDef;

/// Result alias for configuration I/O.
pub type Result<T> = std::result::Result<T, ConfigError>;

/// Matching behavior.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParserConfig {
    /// Accept clustered short options (`-abc`).
    pub posix_clustered_short_options: bool,
    /// Accept unique prefixes of long option names.
    pub abbreviated_options: bool,
    /// Accept unique prefixes of subcommand names.
    pub abbreviated_subcommands: bool,
    /// Treat everything after the first positional as positional.
    pub stop_at_positional: bool,
    /// Treat everything after the first unmatched token as unmatched.
    pub stop_at_unmatched: bool,
    /// Capture unknown tokens instead of failing.
    pub unmatched_arguments_allowed: bool,
    /// Feed unknown option-like tokens to positionals.
    pub unmatched_options_as_positional: bool,
    /// Allow option-like tokens as mandatory option values.
    pub options_as_option_values: bool,
    /// Match enum variants case-insensitively.
    pub case_insensitive_enum_values: bool,
    /// End-of-options delimiter.
    pub end_of_options_delimiter: String,
    /// Separator in `name=value` tokens.
    pub separator: String,
    /// A single-valued argument may be given more than once (last wins).
    pub overwritten_options_allowed: bool,
    /// Strip one level of surrounding double quotes from values.
    pub trim_quotes: bool,
    /// Expand `@file` tokens into the file's arguments.
    pub expand_at_files: bool,
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            posix_clustered_short_options: true,
            abbreviated_options: false,
            abbreviated_subcommands: false,
            stop_at_positional: false,
            stop_at_unmatched: false,
            unmatched_arguments_allowed: false,
            unmatched_options_as_positional: false,
            options_as_option_values: false,
            case_insensitive_enum_values: true,
            end_of_options_delimiter: "--".to_string(),
            separator: "=".to_string(),
            overwritten_options_allowed: true,
            trim_quotes: false,
            expand_at_files: true,
        }
    }
}

/// Option ordering in the option list and synopsis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OptionOrder {
    /// By shortest name, dashes ignored, case-insensitive.
    #[default]
    Alphabetical,
    /// Explicit `order` first, then declaration order.
    Declaration,
    /// As stored.
    Unsorted,
}

/// Synopsis elements, in the order they are rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SynopsisElement {
    Options,
    Groups,
    Positionals,
    Subcommands,
}

/// Help sections, in the order they are rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HelpSection {
    Header,
    Synopsis,
    Description,
    Parameters,
    Options,
    Commands,
    Footer,
}

/// Whether styled output uses ANSI escape codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnsiMode {
    /// On when stdout is a terminal and `NO_COLOR` is unset.
    #[default]
    Auto,
    On,
    Off,
}

/// Headings of the help sections.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Headings {
    pub synopsis: String,
    pub parameters: String,
    pub options: String,
    pub commands: String,
}

impl Default for Headings {
    fn default() -> Self {
        Self {
            synopsis: "Usage: ".to_string(),
            parameters: String::new(),
            options: String::new(),
            commands: "Commands:".to_string(),
        }
    }
}

/// Help text layout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HelpConfig {
    /// Total width in display columns.
    pub width: usize,
    /// Cap on the long-name column.
    pub long_options_max_width: usize,
    pub sort_options: OptionOrder,
    pub synopsis_order: Vec<SynopsisElement>,
    pub sections: Vec<HelpSection>,
    /// Append `Default: x` to descriptions of arguments with a default.
    pub show_default_values: bool,
    pub ansi: AnsiMode,
    /// Marker put in front of required options.
    pub required_option_marker: Option<char>,
    pub headings: Headings,
    /// Append `[--]` to the synopsis.
    pub show_end_of_options_delimiter: bool,
}

impl Default for HelpConfig {
    fn default() -> Self {
        Self {
            width: 80,
            long_options_max_width: 20,
            sort_options: OptionOrder::default(),
            synopsis_order: vec![
                SynopsisElement::Options,
                SynopsisElement::Groups,
                SynopsisElement::Positionals,
                SynopsisElement::Subcommands,
            ],
            sections: vec![
                HelpSection::Header,
                HelpSection::Synopsis,
                HelpSection::Description,
                HelpSection::Parameters,
                HelpSection::Options,
                HelpSection::Commands,
                HelpSection::Footer,
            ],
            show_default_values: false,
            ansi: AnsiMode::default(),
            required_option_marker: None,
            headings: Headings::default(),
            show_end_of_options_delimiter: false,
        }
    }
}

/// All settings, as stored in a settings file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub parser: ParserConfig,
    pub help: HelpConfig,
}

fn is_json(path: &Path) -> bool {
    path.extension().is_some_and(|ext| ext.eq_ignore_ascii_case("json"))
}

impl Settings {
    /// Loads settings from YAML, or JSON for `.json` files.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::IoError`] if the file cannot be read, or a
    /// parse error for malformed content.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        load_file(path.as_ref())
    }

    /// Saves settings in the format chosen by the file extension.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::IoError`] if the file cannot be written.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        save_file(path.as_ref(), self)
    }
}

impl CommandDef {
    /// Loads a command definition from YAML, or JSON for `.json` files.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::IoError`] if the file cannot be read, or a
    /// parse error for malformed content.
    ///
    /// ```no_run
    /// use argbind_core::CommandDef;
    ///
    /// let def = CommandDef::load("git.yaml").unwrap();
    /// let graph = def.build().unwrap();
    /// ```
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        load_file(path.as_ref())
    }

    /// Saves the definition in the format chosen by the file extension.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::IoError`] if the file cannot be written.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        save_file(path.as_ref(), self)
    }
}

fn load_file<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let reader = BufReader::new(std::fs::File::open(path)?);
    if is_json(path) {
        Ok(serde_json::from_reader(reader)?)
    } else {
        Ok(serde_yaml::from_reader(reader)?)
    }
}

fn save_file<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let writer = BufWriter::new(std::fs::File::create(path)?);
    if is_json(path) {
        serde_json::to_writer_pretty(writer, value)?;
    } else {
        serde_yaml::to_writer(writer, value)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_settings_keep_defaults() {
        let yaml = "help:\n  width: 100\n  sort_options: declaration\n";
        let settings: Settings = serde_yaml::from_str(yaml).unwrap();

        assert_eq!(settings.help.width, 100);
        assert_eq!(settings.help.sort_options, OptionOrder::Declaration);
        assert_eq!(settings.help.long_options_max_width, 20);
        assert!(settings.parser.posix_clustered_short_options);
        assert_eq!(settings.parser.end_of_options_delimiter, "--");
    }

    #[test]
    fn test_settings_save_and_load_yaml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.yaml");

        let mut settings = Settings::default();
        settings.parser.abbreviated_options = true;
        settings.help.ansi = AnsiMode::Off;
        settings.save(&path).unwrap();

        assert_eq!(Settings::load(&path).unwrap(), settings);
    }

    #[test]
    fn test_command_def_save_and_load_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tool.json");

        let def = CommandDef::new("tool")
            .with_option(crate::OptionDef::flag(&["-v", "--verbose"]))
            .with_description("a tool");
        def.save(&path).unwrap();

        assert_eq!(CommandDef::load(&path).unwrap(), def);
    }

    #[test]
    fn test_load_missing_file_is_io_error() {
        let err = Settings::load("/nonexistent/settings.yaml").unwrap_err();
        assert!(matches!(err, ConfigError::IoError(_)));
    }
}

//! Interactive value entry.

use std::collections::VecDeque;
use std::io::{self, BufRead, IsTerminal, Write};
use std::sync::{Arc, Mutex};

use argbind_core::{ArgSpec, ParseError};
use tracing::debug;

/// Reads one value for an interactive argument.
pub trait Prompter: Send + Sync {
    fn prompt(&self, arg: &ArgSpec) -> Result<String, ParseError>;
}

impl<P: Prompter + ?Sized> Prompter for Arc<P> {
    fn prompt(&self, arg: &ArgSpec) -> Result<String, ParseError> {
        (**self).prompt(arg)
    }
}

/// Whether typed input should be shown while prompting for `arg`.
fn echoes(arg: &ArgSpec) -> bool {
    arg.interactive.as_ref().is_some_and(|i| i.echo)
}

/// Prompts on the terminal and reads one line.
///
/// Fails with [`ParseError::NoTerminal`] when stdin is not a terminal
/// instead of blocking on a pipe. Arguments without `echo` are read with
/// echo turned off through `rpassword`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TerminalPrompter;

impl Prompter for TerminalPrompter {
    fn prompt(&self, arg: &ArgSpec) -> Result<String, ParseError> {
        let stdin = io::stdin();
        if !stdin.is_terminal() {
            return Err(ParseError::NoTerminal {
                arg: arg.id,
                name: arg.display_name().to_string(),
            });
        }
        let io_error = |source| ParseError::Prompt {
            arg: arg.id,
            name: arg.display_name().to_string(),
            source,
        };

        if !echoes(arg) {
            let value = rpassword::prompt_password(arg.prompt_text()).map_err(io_error)?;
            debug!(arg = %arg.display_name(), "Read masked interactive value");
            return Ok(value);
        }

        let mut stderr = io::stderr();
        write!(stderr, "{}", arg.prompt_text()).map_err(io_error)?;
        stderr.flush().map_err(io_error)?;

        let mut line = String::new();
        stdin.lock().read_line(&mut line).map_err(io_error)?;
        debug!(arg = %arg.display_name(), "Read interactive value");
        Ok(line.trim_end_matches(['\r', '\n']).to_string())
    }
}

/// Answers prompts from a fixed queue; fails like a missing terminal once
/// the queue is exhausted. Every prompt is recorded with its echo setting.
///
/// ```
/// use argbind_parser::ScriptedPrompter;
///
/// let prompter = ScriptedPrompter::new(["hunter2"]);
/// assert_eq!(prompter.remaining(), 1);
/// assert!(prompter.asked().is_empty());
/// ```
#[derive(Debug, Default)]
pub struct ScriptedPrompter {
    answers: Mutex<VecDeque<String>>,
    asked: Mutex<Vec<(String, bool)>>,
}

impl ScriptedPrompter {
    pub fn new<I, S>(answers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            answers: Mutex::new(answers.into_iter().map(Into::into).collect()),
            asked: Mutex::new(Vec::new()),
        }
    }

    /// Prompts so far as `(argument name, echo)` pairs.
    pub fn asked(&self) -> Vec<(String, bool)> {
        self.asked.lock().map(|a| a.clone()).unwrap_or_default()
    }

    /// Number of answers not yet used.
    pub fn remaining(&self) -> usize {
        self.answers.lock().map(|a| a.len()).unwrap_or(0)
    }
}

impl Prompter for ScriptedPrompter {
    fn prompt(&self, arg: &ArgSpec) -> Result<String, ParseError> {
        if let Ok(mut asked) = self.asked.lock() {
            asked.push((arg.display_name().to_string(), echoes(arg)));
        }
        self.answers
            .lock()
            .ok()
            .and_then(|mut answers| answers.pop_front())
            .ok_or_else(|| ParseError::NoTerminal {
                arg: arg.id,
                name: arg.display_name().to_string(),
            })
    }
}

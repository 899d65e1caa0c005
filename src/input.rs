use std::error::Error;
use std::fmt;
use std::path::PathBuf;

use log::{debug, warn};
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;

#[derive(Debug, PartialEq)]
pub(crate) enum Input {
    Line(String),
    Interrupted,
    Eof,
}

#[derive(Debug)]
pub enum InputError {
    Readline(ReadlineError),
}

impl fmt::Display for InputError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InputError::Readline(e) => write!(f, "reading input failed: {}", e),
        }
    }
}

impl Error for InputError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            InputError::Readline(e) => Some(e),
        }
    }
}

impl From<ReadlineError> for InputError {
    fn from(e: ReadlineError) -> Self {
        InputError::Readline(e)
    }
}

/// Source of interactive input lines.
pub(crate) trait LineSource {
    fn read_line(&mut self, prompt: &str) -> Result<Input, InputError>;
}

/// Line editor with a recall history, optionally persisted to a file.
pub(crate) struct Editor {
    rl: DefaultEditor,
    history: Option<PathBuf>,
}

impl Editor {
    pub(crate) fn new(history: Option<PathBuf>) -> Result<Editor, InputError> {
        let mut rl = DefaultEditor::new()?;

        if let Some(path) = &history {
            match rl.load_history(path) {
                Ok(()) => debug!("loaded history from {}", path.display()),
                Err(e) => debug!("no history loaded from {}: {}", path.display(), e),
            }
        }

        Ok(Editor { rl, history })
    }

    pub(crate) fn save_history(&mut self) {
        if let Some(path) = &self.history {
            if let Err(e) = self.rl.save_history(path) {
                warn!("saving history to {} failed: {}", path.display(), e);
            }
        }
    }
}

impl LineSource for Editor {
    fn read_line(&mut self, prompt: &str) -> Result<Input, InputError> {
        match self.rl.readline(prompt) {
            Ok(line) => {
                if !line.trim().is_empty() {
                    self.rl.add_history_entry(line.as_str())?;
                }
                Ok(Input::Line(line))
            }
            Err(ReadlineError::Interrupted) => Ok(Input::Interrupted),
            Err(ReadlineError::Eof) => Ok(Input::Eof),
            Err(e) => Err(e.into()),
        }
    }
}

//! Interactive prompting for option values.

use crate::classify::PromptSpec;
use crate::{CliError, CliResult};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::io::{BufRead, Write};

/// One question put to the user.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PromptRequest {
    pub text: String,
    /// Answer used when the user enters nothing.
    pub default: Option<String>,
    pub hide_input: bool,
}

impl PromptRequest {
    /// The prompt line as shown to the user.
    pub fn render(&self) -> String {
        match &self.default {
            Some(default) if !self.hide_input => format!("{} [{}]: ", self.text, default),
            _ => format!("{}: ", self.text),
        }
    }
}

/// Source of interactive answers.
pub trait Prompter: Send + Sync {
    fn prompt(&self, request: &PromptRequest) -> CliResult<String>;
}

/// Prompts on the terminal; hidden input is read without echo.
#[derive(Clone, Copy, Debug, Default)]
pub struct TerminalPrompter;

impl Prompter for TerminalPrompter {
    fn prompt(&self, request: &PromptRequest) -> CliResult<String> {
        let line = request.render();
        let answer = if request.hide_input {
            rpassword::prompt_password(line)?
        } else {
            let mut stderr = std::io::stderr();
            stderr.write_all(line.as_bytes())?;
            stderr.flush()?;
            let mut answer = String::new();
            std::io::stdin().lock().read_line(&mut answer)?;
            answer.trim_end_matches(['\r', '\n']).to_string()
        };
        match (&request.default, answer.is_empty()) {
            (Some(default), true) => Ok(default.clone()),
            _ => Ok(answer),
        }
    }
}

/// Answers prompts from a fixed queue.
#[derive(Debug, Default)]
pub struct ScriptedPrompter {
    answers: Mutex<VecDeque<String>>,
    asked: Mutex<Vec<PromptRequest>>,
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

    /// Requests received so far.
    pub fn asked(&self) -> Vec<PromptRequest> {
        self.asked.lock().clone()
    }
}

impl Prompter for ScriptedPrompter {
    fn prompt(&self, request: &PromptRequest) -> CliResult<String> {
        self.asked.lock().push(request.clone());
        let answer = self
            .answers
            .lock()
            .pop_front()
            .ok_or_else(|| {
                CliError::user(format!("No input available for prompt '{}'", request.text))
            })?;
        match (&request.default, answer.is_empty()) {
            (Some(default), true) => Ok(default.clone()),
            _ => Ok(answer),
        }
    }
}

/// Ask for a value, repeating the question when confirmation is required.
pub fn ask(
    prompter: &dyn Prompter,
    spec: &PromptSpec,
    default: Option<String>,
) -> CliResult<String> {
    let request = PromptRequest {
        text: spec.text.clone(),
        default,
        hide_input: spec.hide_input,
    };
    let value = prompter.prompt(&request)?;
    if spec.confirmation {
        let repeat = PromptRequest {
            text: "Repeat for confirmation".to_string(),
            default: None,
            hide_input: spec.hide_input,
        };
        if prompter.prompt(&repeat)? != value {
            return Err(CliError::user("The two entered values do not match"));
        }
    }
    Ok(value)
}

use std::path::PathBuf;

use thiserror::Error;

pub const HELP: &str = "\
Type a prompt to generate a shader, or a command:
  :load PATH   run a fragment shader from a file
  :default     restore the built-in shader
  :eval EXPR   evaluate an arithmetic expression
  :show        print the active fragment shader
  :help        show this message
  :quit        close the window and exit";

/// One line of console input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsoleCommand {
    Prompt(String),
    Load(PathBuf),
    Default,
    Eval(String),
    Show,
    Help,
    Quit,
    Empty,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConsoleParseError {
    #[error("unknown command ':{0}' (try :help)")]
    Unknown(String),
    #[error(":{0} needs an argument")]
    MissingArgument(&'static str),
}

impl ConsoleCommand {
    pub fn parse(line: &str) -> Result<Self, ConsoleParseError> {
        let line = line.trim();
        if line.is_empty() {
            return Ok(Self::Empty);
        }
        let Some(command) = line.strip_prefix(':') else {
            return Ok(Self::Prompt(line.to_string()));
        };

        let (name, argument) = match command.split_once(char::is_whitespace) {
            Some((name, rest)) => (name, rest.trim()),
            None => (command, ""),
        };
        let required = |name: &'static str| {
            if argument.is_empty() {
                Err(ConsoleParseError::MissingArgument(name))
            } else {
                Ok(argument.to_string())
            }
        };

        match name {
            "load" => required("load").map(|path| Self::Load(PathBuf::from(path))),
            "default" => Ok(Self::Default),
            "eval" => required("eval").map(Self::Eval),
            "show" => Ok(Self::Show),
            "help" | "h" | "?" => Ok(Self::Help),
            "quit" | "q" | "exit" => Ok(Self::Quit),
            other => Err(ConsoleParseError::Unknown(other.to_string())),
        }
    }
}

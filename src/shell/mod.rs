use log::error;

use crate::errors::Error;

pub use self::shell::Shell;

pub mod builtins;
pub mod execute_command;
pub mod foreground;
pub mod job_control;
#[allow(clippy::module_inception)]
pub mod shell;

/// Prompt text shown before `> ` until `chprompt` changes it.
pub const DEFAULT_PROMPT: &str = "smash";

/// Policy object to control a Shell's behavior
#[derive(Debug, Copy, Clone)]
pub struct ShellConfig {
    /// Determines if `<prompt>> ` is printed before each line is read.
    display_prompt: bool,

    /// Determines if the SIGINT handler that kills the foreground process is
    /// installed.
    handle_interrupts: bool,

    /// Prompt text the shell starts with.
    initial_prompt: &'static str,
}

impl ShellConfig {
    /// Creates a shell reading commands from a terminal.
    ///
    /// # Complete List
    /// - The prompt is displayed
    /// - Ctrl-C kills the foreground process instead of the shell
    pub fn interactive() -> Self {
        Self {
            display_prompt: true,
            handle_interrupts: true,
            ..Default::default()
        }
    }

    /// Creates a shell reading commands from a pipe, a file or `-c`.
    ///
    /// # Complete List
    /// - The prompt is not displayed
    /// - Ctrl-C kills the foreground process instead of the shell
    pub fn noninteractive() -> Self {
        Self {
            display_prompt: false,
            handle_interrupts: true,
            ..Default::default()
        }
    }

    /// Starts the shell with `prompt` instead of `smash`.
    pub fn with_prompt(self, prompt: &'static str) -> Self {
        Self {
            initial_prompt: prompt,
            ..self
        }
    }

    pub fn display_prompt(&self) -> bool {
        self.display_prompt
    }

    pub fn handle_interrupts(&self) -> bool {
        self.handle_interrupts
    }

    pub fn initial_prompt(&self) -> &'static str {
        self.initial_prompt
    }
}

impl Default for ShellConfig {
    fn default() -> Self {
        Self {
            display_prompt: false,
            handle_interrupts: false,
            initial_prompt: DEFAULT_PROMPT,
        }
    }
}

/// Prints `error` to stderr the way every smash failure is reported.
pub fn report_error(error: &Error) {
    error!("{}", error);
    eprintln!("smash error: {}", error);
}

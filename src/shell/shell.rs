//! Smash - Shell Module
//!
//! The Shell owns everything that outlives a single command line: the job
//! table, the alias table, the prompt and the previous working directory.

use std::fmt;
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use std::process;

use log::{debug, error, info};
use nix::unistd::Pid;

use crate::core::alias::AliasTable;
use crate::core::parser::Command;
use crate::errors::Result;
use crate::shell::{
    execute_command, foreground, job_control::JobManager, report_error, ShellConfig,
    DEFAULT_PROMPT,
};
use crate::util::{self, unix};

/// Smash Shell
pub struct Shell {
    config: ShellConfig,
    /// Pid of the shell process itself, kept across forks.
    pid: Pid,
    prompt: String,
    aliases: AliasTable,
    job_manager: JobManager,
    /// Directory `cd -` returns to.
    last_dir: Option<PathBuf>,
}

impl Shell {
    /// Constructs a new Shell to manage running jobs and aliases.
    pub fn new(config: ShellConfig) -> Result<Shell> {
        if config.handle_interrupts() {
            foreground::install_interrupt_handler()?;
        }

        let shell = Shell {
            pid: Pid::this(),
            prompt: config.initial_prompt().to_string(),
            aliases: AliasTable::new(),
            job_manager: Default::default(),
            last_dir: None,
            config,
        };

        info!("smash started up");
        Ok(shell)
    }

    /// Runs one command line, reporting any failure on stderr.
    ///
    /// Finished background jobs are collected before the line is parsed.
    pub fn execute_command_string(&mut self, input: &str) {
        self.job_manager.garbage_collect();
        foreground::clear();

        if let Err(e) = self.try_execute_command_string(input) {
            report_error(&e);
        }
    }

    /// Parses and runs one command line.
    pub fn try_execute_command_string(&mut self, input: &str) -> Result<()> {
        let command = match Command::parse(input, &self.aliases)? {
            Some(command) => command,
            None => return Ok(()),
        };

        debug!("executing '{}'", command.raw());
        command.execute(self)
    }

    /// Runs `input` inside a forked child and exits with its status.
    ///
    /// An external command replaces the child directly. Anything else is
    /// executed by this copy of the shell.
    pub fn execute_in_child(&mut self, input: &str) -> ! {
        let command = match Command::parse(input, &self.aliases) {
            Ok(Some(command)) => command,
            Ok(None) => unix::exit_child(0),
            Err(e) => {
                report_error(&e);
                unix::exit_child(1)
            }
        };

        if command.is_external() {
            execute_command::exec_external(&command);
        }

        let code = match command.execute(self) {
            Ok(()) => 0,
            Err(e) => {
                report_error(&e);
                1
            }
        };
        unix::exit_child(code)
    }

    /// Reads lines from stdin until end of input, running each in turn.
    pub fn execute_from_stdin(&mut self) {
        let stdin = io::stdin();
        loop {
            if self.config.display_prompt() {
                print!("{}", self.prompt());
                util::flush_stdout();
            }

            let mut line = String::new();
            match stdin.lock().read_line(&mut line) {
                Ok(0) => break,
                Ok(_) => self.execute_command_string(&line),
                Err(ref e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => {
                    error!("failed to read from stdin: {}", e);
                    break;
                }
            }
        }
    }

    /// Exits the shell process. Background jobs are left alone.
    pub fn exit(&mut self, code: i32) -> ! {
        info!("smash has shut down");
        let temp_result = io::stdout().flush();
        log_if_err!(temp_result, "failed to flush stdout");
        process::exit(code);
    }

    /// The text printed before each line is read.
    pub fn prompt(&self) -> String {
        format!("{}> ", self.prompt)
    }

    pub fn set_prompt<T: Into<String>>(&mut self, prompt: T) {
        self.prompt = prompt.into();
    }

    pub fn reset_prompt(&mut self) {
        self.prompt = DEFAULT_PROMPT.to_string();
    }

    pub fn pid(&self) -> Pid {
        self.pid
    }

    /// False in a forked copy of the shell.
    pub fn is_shell_process(&self) -> bool {
        Pid::this() == self.pid
    }

    pub fn aliases(&self) -> &AliasTable {
        &self.aliases
    }

    pub fn aliases_mut(&mut self) -> &mut AliasTable {
        &mut self.aliases
    }

    pub fn job_manager(&self) -> &JobManager {
        &self.job_manager
    }

    pub fn job_manager_mut(&mut self) -> &mut JobManager {
        &mut self.job_manager
    }

    pub fn last_dir(&self) -> Option<&Path> {
        self.last_dir.as_ref().map(PathBuf::as_path)
    }

    pub fn set_last_dir(&mut self, dir: PathBuf) {
        self.last_dir = Some(dir);
    }
}

impl fmt::Debug for Shell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Shell {{ pid: {}, prompt: {:?}, aliases: {:?}, jobs: {:?}, last_dir: {:?} }}",
            self.pid, self.prompt, self.aliases, self.job_manager, self.last_dir
        )
    }
}

use std::fmt;

use chrono::{DateTime, Local};
use nix::unistd::Pid;

use crate::core::parser::Command;

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct JobId(pub u32);

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A background process tracked by the shell.
#[derive(Debug)]
pub struct JobEntry {
    id: JobId,
    pid: Pid,
    command: Command,
    stopped: bool,
    started: DateTime<Local>,
}

impl JobEntry {
    pub fn new(id: JobId, pid: Pid, command: Command, stopped: bool) -> Self {
        Self {
            id,
            pid,
            command,
            stopped,
            started: Local::now(),
        }
    }

    pub fn id(&self) -> JobId {
        self.id
    }

    pub fn pid(&self) -> Pid {
        self.pid
    }

    pub fn command(&self) -> &Command {
        &self.command
    }

    /// Text shown for this job by `jobs`, `fg` and `quit kill`.
    pub fn display(&self) -> &str {
        self.command.display()
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped
    }

    pub fn set_stopped(&mut self, stopped: bool) {
        self.stopped = stopped;
    }

    pub fn started(&self) -> DateTime<Local> {
        self.started
    }

    /// Seconds since the job was added.
    pub fn elapsed_secs(&self) -> i64 {
        Local::now()
            .signed_duration_since(self.started)
            .num_seconds()
    }
}

impl fmt::Display for JobEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.id, self.display())
    }
}

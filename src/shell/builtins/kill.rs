use std::convert::TryFrom;

use nix::sys::signal::{self, Signal};
use regex::Regex;

use crate::core::job::JobId;
use crate::shell::builtins::{parse_number, prelude::*};

lazy_static! {
    static ref SIGNAL_ARG: Regex = Regex::new(r"^-(\d+)$").unwrap();
}

pub struct Kill;

impl BuiltinCommand for Kill {
    const NAME: &'static str = Builtin::Kill.name();

    fn run(shell: &mut Shell, command: &Command, stdout: &mut dyn Write) -> Result<()> {
        let (signum, job_id) = match command.args() {
            [signal, job] => match (parse_signal(signal), parse_number(job)) {
                (Some(signum), Some(job_id)) => (signum, JobId(job_id)),
                _ => return Err(Self::error("invalid arguments")),
            },
            _ => return Err(Self::error("invalid arguments")),
        };

        let pid = shell
            .job_manager()
            .get(job_id)
            .map(|job| job.pid())
            .ok_or_else(|| Self::error(format!("job-id {} does not exist", job_id)))?;

        writeln!(stdout, "signal number {} was sent to pid {}", signum, pid)?;

        // Zero is the null signal: delivery is checked but nothing is sent.
        let signal = match signum {
            0 => None,
            n => Some(Signal::try_from(n).context("kill")?),
        };
        signal::kill(pid, signal).context("kill")?;
        Ok(())
    }
}

/// Parses a `-<signum>` argument.
fn parse_signal(arg: &str) -> Option<i32> {
    SIGNAL_ARG
        .captures(arg)
        .and_then(|captures| captures[1].parse().ok())
}

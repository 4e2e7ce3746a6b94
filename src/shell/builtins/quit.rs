use log::info;

use crate::shell::builtins::prelude::*;

pub struct Quit;

impl BuiltinCommand for Quit {
    const NAME: &'static str = Builtin::Quit.name();

    fn run(shell: &mut Shell, command: &Command, stdout: &mut dyn Write) -> Result<()> {
        if command.args().first().map(String::as_str) == Some("kill") {
            kill_jobs(shell, stdout);
        }
        shell.exit(0)
    }
}

/// Announces every live job, then kills them all. The jobs are killed even
/// when the announcement cannot be written.
fn kill_jobs(shell: &mut Shell, stdout: &mut dyn Write) {
    let temp_result = announce_jobs(shell, stdout);
    log_if_err!(temp_result, "quit: failed to list jobs");
    shell.job_manager_mut().kill_all();
}

fn announce_jobs(shell: &mut Shell, stdout: &mut dyn Write) -> Result<()> {
    let jobs = shell.job_manager_mut().list();
    info!("quit: killing {} jobs", jobs.len());
    writeln!(stdout, "smash: sending SIGKILL signal to {} jobs:", jobs.len())?;
    for job in jobs {
        writeln!(stdout, "{}: {}", job.pid(), job.display())?;
    }
    stdout.flush()?;
    Ok(())
}

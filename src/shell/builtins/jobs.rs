use log::debug;
use serde_derive::Deserialize;

use crate::core::job::JobId;
use crate::shell::builtins::{parse_number, prelude::*};

pub struct Jobs;

impl BuiltinCommand for Jobs {
    const NAME: &'static str = Builtin::Jobs.name();

    fn run(shell: &mut Shell, _command: &Command, stdout: &mut dyn Write) -> Result<()> {
        for job in shell.job_manager_mut().list() {
            writeln!(stdout, "{}", job)?;
        }

        Ok(())
    }
}

pub struct Fg;

const FG_USAGE: &str = "
Usage: fg [<job-id>]

Waits for a job, the most recent one by default.
";

#[derive(Debug, Deserialize)]
struct FgArgs {
    arg_job_id: Option<String>,
}

impl BuiltinCommand for Fg {
    const NAME: &'static str = Builtin::Fg.name();

    fn run(shell: &mut Shell, command: &Command, stdout: &mut dyn Write) -> Result<()> {
        let args: FgArgs = parse_args(FG_USAGE, Self::NAME, command.args())
            .ok_or_else(|| Self::error("invalid arguments"))?;

        let job_id = match args.arg_job_id {
            None => shell
                .job_manager()
                .last_job()
                .map(|job| job.id())
                .ok_or_else(|| Self::error("jobs list is empty"))?,
            Some(arg) => {
                let job_id = parse_number(&arg)
                    .map(JobId)
                    .ok_or_else(|| Self::error("invalid arguments"))?;
                if shell.job_manager().get(job_id).is_none() {
                    return Err(Self::error(format!("job-id {} does not exist", job_id)));
                }
                job_id
            }
        };

        debug!("fg job [{}]", job_id);
        shell.job_manager_mut().put_job_in_foreground(job_id, stdout)
    }
}

//! Smash builtins
//!
//! Commands that run inside the shell process. Each writes its output to
//! the stream it is handed so it works the same whether stdout is the
//! terminal, a pipe or a redirected file.

use std::iter;

use docopt::Docopt;
use log::debug;
use regex::Regex;
use serde::de::DeserializeOwned;

use self::prelude::*;

use self::alias::{Alias, Unalias};
use self::dirs::{Cd, ListDir, Pwd};
use self::jobs::{Fg, Jobs};
use self::kill::Kill;
use self::quit::Quit;
use self::session::{Chprompt, GetUser, ShowPid};

pub mod prelude {
    pub use std::io::Write;

    pub use crate::core::parser::{ast::Builtin, Command};
    pub use crate::errors::{Error, Result, SysResultExt};
    pub use crate::shell::shell::Shell;

    pub use super::{parse_args, BuiltinCommand};
}

mod alias;
mod dirs;
mod jobs;
mod kill;
mod quit;
mod session;

/// Represents a Smash builtin command such as cd or fg.
pub trait BuiltinCommand {
    /// The NAME of the command.
    const NAME: &'static str;

    /// Runs the command in the `shell` environment.
    fn run(shell: &mut Shell, command: &Command, stdout: &mut dyn Write) -> Result<()>;

    /// Error reported by this command.
    fn error<T: AsRef<str>>(message: T) -> Error {
        Error::builtin_command(Self::NAME, message)
    }
}

/// Runs `builtin` with `command`'s arguments.
pub fn run(
    shell: &mut Shell,
    builtin: Builtin,
    command: &Command,
    stdout: &mut dyn Write,
) -> Result<()> {
    let result = match builtin {
        Builtin::Alias => Alias::run(shell, command, stdout),
        Builtin::Cd => Cd::run(shell, command, stdout),
        Builtin::Chprompt => Chprompt::run(shell, command, stdout),
        Builtin::Fg => Fg::run(shell, command, stdout),
        Builtin::GetUser => GetUser::run(shell, command, stdout),
        Builtin::Jobs => Jobs::run(shell, command, stdout),
        Builtin::Kill => Kill::run(shell, command, stdout),
        Builtin::ListDir => ListDir::run(shell, command, stdout),
        Builtin::Pwd => Pwd::run(shell, command, stdout),
        Builtin::Quit => Quit::run(shell, command, stdout),
        Builtin::ShowPid => ShowPid::run(shell, command, stdout),
        Builtin::Unalias => Unalias::run(shell, command, stdout),
    };

    stdout.flush()?;
    result
}

/// Matches `args` against the docopt `usage` of `program`.
///
/// Returns `None` when they do not fit.
pub fn parse_args<D, S>(usage: &str, program: &str, args: &[S]) -> Option<D>
where
    D: DeserializeOwned,
    S: AsRef<str>,
{
    let argv = iter::once(program).chain(args.iter().map(|arg| arg.as_ref()));
    Docopt::new(usage)
        .and_then(|docopt| docopt.help(false).argv(argv).deserialize())
        .map_err(|e| debug!("{}: {}", program, e))
        .ok()
}

lazy_static! {
    static ref NUMBER: Regex = Regex::new(r"^\d+$").unwrap();
}

/// Parses an unsigned decimal argument such as a job id or a pid.
pub(crate) fn parse_number<T: std::str::FromStr>(arg: &str) -> Option<T> {
    if NUMBER.is_match(arg) {
        arg.parse().ok()
    } else {
        None
    }
}

//! Error module. See the [error-chain](https://crates.io/crates/error-chain) crate for details.

use std::io;

use nix::errno::Errno;

error_chain! {
    foreign_links {
        Io(io::Error);
    }

    errors {
        Syntax(line: String) {
            description("syntax error")
            display("syntax error near: '{}'", line)
        }

        BuiltinCommand(command: String, message: String) {
            description("builtin command failed")
            display("{}: {}", command, message)
        }

        Sys(call: &'static str, errno: Errno) {
            description("system call failed")
            display("{} failed: {}", call, errno.desc())
        }
    }
}

impl Error {
    pub(crate) fn syntax<T: AsRef<str>>(line: T) -> Error {
        Error::from(ErrorKind::Syntax(line.as_ref().to_string()))
    }

    pub(crate) fn builtin_command<S1, S2>(command: S1, message: S2) -> Error
    where
        S1: AsRef<str>,
        S2: AsRef<str>,
    {
        Error::from(ErrorKind::BuiltinCommand(
            command.as_ref().to_string(),
            message.as_ref().to_string(),
        ))
    }

    pub(crate) fn sys(call: &'static str, errno: Errno) -> Error {
        Error::from(ErrorKind::Sys(call, errno))
    }
}

/// Attaches the name of the failing system call to a `nix` error.
pub trait SysResultExt<T> {
    fn context(self, call: &'static str) -> Result<T>;
}

impl<T> SysResultExt<T> for nix::Result<T> {
    fn context(self, call: &'static str) -> Result<T> {
        self.map_err(|errno| Error::sys(call, errno))
    }
}

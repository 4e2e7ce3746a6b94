use std::fs;

use nix::unistd::{Gid, Group, Uid, User};

use crate::shell::builtins::{parse_number, prelude::*};

pub struct Chprompt;

impl BuiltinCommand for Chprompt {
    const NAME: &'static str = Builtin::Chprompt.name();

    fn run(shell: &mut Shell, command: &Command, _stdout: &mut dyn Write) -> Result<()> {
        match command.args().first() {
            Some(name) => shell.set_prompt(name.as_str()),
            None => shell.reset_prompt(),
        }
        Ok(())
    }
}

pub struct ShowPid;

impl BuiltinCommand for ShowPid {
    const NAME: &'static str = Builtin::ShowPid.name();

    fn run(shell: &mut Shell, _command: &Command, stdout: &mut dyn Write) -> Result<()> {
        writeln!(stdout, "smash pid is {}", shell.pid())?;
        Ok(())
    }
}

pub struct GetUser;

impl BuiltinCommand for GetUser {
    const NAME: &'static str = Builtin::GetUser.name();

    fn run(_shell: &mut Shell, command: &Command, stdout: &mut dyn Write) -> Result<()> {
        let pid: i32 = match command.args() {
            [arg] => parse_number(arg).ok_or_else(|| Self::error("invalid arguments"))?,
            [] => return Err(Self::error("invalid arguments")),
            _ => return Err(Self::error("too many arguments")),
        };

        let missing = || Self::error(format!("process {} does not exist", pid));
        let status = fs::read_to_string(format!("/proc/{}/status", pid)).map_err(|_| missing())?;
        let uid = status_field(&status, "Uid:").ok_or_else(missing)?;
        let gid = status_field(&status, "Gid:").ok_or_else(missing)?;

        let user = User::from_uid(Uid::from_raw(uid))
            .context("getpwuid")?
            .map_or_else(|| uid.to_string(), |user| user.name);
        let group = Group::from_gid(Gid::from_raw(gid))
            .context("getgrgid")?
            .map_or_else(|| gid.to_string(), |group| group.name);

        writeln!(stdout, "User: {}", user)?;
        writeln!(stdout, "Group: {}", group)?;
        Ok(())
    }
}

/// The real id on a `Uid:` or `Gid:` line of `/proc/<pid>/status`.
fn status_field(status: &str, key: &str) -> Option<u32> {
    status
        .lines()
        .find(|line| line.starts_with(key))
        .and_then(|line| line[key.len()..].split_whitespace().next())
        .and_then(|id| id.parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    use nix::unistd::{getgid, getuid, Pid};

    use crate::shell::builtins::test_util::{run, shell};

    #[test]
    fn status_fields() {
        let status = "Name:\tsleep\nUid:\t1000\t1000\t1000\t1000\nGid:\t100\t100\t100\t100\n";
        assert_eq!(status_field(status, "Uid:"), Some(1000));
        assert_eq!(status_field(status, "Gid:"), Some(100));
        assert_eq!(status_field(status, "Groups:"), None);
    }

    #[test]
    fn getuser_for_own_process() {
        let mut shell = shell();
        let user = User::from_uid(getuid())
            .unwrap()
            .map_or_else(|| getuid().to_string(), |user| user.name);
        let group = Group::from_gid(getgid())
            .unwrap()
            .map_or_else(|| getgid().to_string(), |group| group.name);

        let output = run(&mut shell, &format!("getuser {}", Pid::this())).unwrap();
        assert_eq!(output, format!("User: {}\nGroup: {}\n", user, group));
    }

    #[test]
    fn getuser_errors() {
        let mut shell = shell();
        assert_eq!(
            run(&mut shell, "getuser 999999999").unwrap_err().to_string(),
            "getuser: process 999999999 does not exist"
        );
        assert_eq!(
            run(&mut shell, "getuser 1 2").unwrap_err().to_string(),
            "getuser: too many arguments"
        );
    }

    #[test]
    fn showpid_and_chprompt() {
        let mut shell = shell();
        assert_eq!(
            run(&mut shell, "showpid").unwrap(),
            format!("smash pid is {}\n", Pid::this())
        );

        run(&mut shell, "chprompt dev").unwrap();
        assert_eq!(shell.prompt(), "dev> ");
        run(&mut shell, "chprompt").unwrap();
        assert_eq!(shell.prompt(), "smash> ");
    }
}

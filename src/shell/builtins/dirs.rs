use std::path::{Path, PathBuf};

use nix::dir::{Dir, Type};
use nix::fcntl::OFlag;
use nix::sys::stat::Mode;
use nix::unistd;
use serde_derive::Deserialize;

use crate::shell::builtins::prelude::*;

/// Arguments of `cd` and `listdir`.
#[derive(Debug, Deserialize)]
struct DirArgs {
    arg_dir: Option<String>,
}

pub struct Cd;

const CD_USAGE: &str = "
Usage: cd [<dir>]

Changes to <dir>, the home directory by default. `cd -` returns to the
previous directory.
";

impl BuiltinCommand for Cd {
    const NAME: &'static str = Builtin::Cd.name();

    fn run(shell: &mut Shell, command: &Command, _stdout: &mut dyn Write) -> Result<()> {
        let args: DirArgs = parse_args(CD_USAGE, Self::NAME, command.args())
            .ok_or_else(|| Self::error("too many arguments"))?;

        let dir = match args.arg_dir.as_deref() {
            None => ::dirs::home_dir().ok_or_else(|| Self::error("HOME not set"))?,
            Some("-") => shell
                .last_dir()
                .map(Path::to_path_buf)
                .ok_or_else(|| Self::error("OLDPWD not set"))?,
            Some(arg) => PathBuf::from(arg),
        };

        let current = unistd::getcwd().context("getcwd")?;
        unistd::chdir(dir.as_path()).context("chdir")?;
        shell.set_last_dir(current);
        Ok(())
    }
}

pub struct Pwd;

impl BuiltinCommand for Pwd {
    const NAME: &'static str = Builtin::Pwd.name();

    fn run(_shell: &mut Shell, _command: &Command, stdout: &mut dyn Write) -> Result<()> {
        let cwd = unistd::getcwd().context("getcwd")?;
        writeln!(stdout, "{}", cwd.display())?;
        Ok(())
    }
}

pub struct ListDir;

const LISTDIR_USAGE: &str = "
Usage: listdir [<dir>]

Lists <dir>, the working directory by default.
";

impl BuiltinCommand for ListDir {
    const NAME: &'static str = Builtin::ListDir.name();

    fn run(_shell: &mut Shell, command: &Command, stdout: &mut dyn Write) -> Result<()> {
        let args: DirArgs = parse_args(LISTDIR_USAGE, Self::NAME, command.args())
            .ok_or_else(|| Self::error("too many arguments"))?;
        let path = PathBuf::from(args.arg_dir.as_deref().unwrap_or("."));

        for (name, is_dir) in read_entries(&path)? {
            let kind = if is_dir { "directory" } else { "file" };
            writeln!(stdout, "{}: {}", kind, name)?;
        }
        Ok(())
    }
}

/// Entries of `path` sorted by name, without `.` and `..`.
fn read_entries(path: &Path) -> Result<Vec<(String, bool)>> {
    let mut dir = Dir::open(
        path,
        OFlag::O_RDONLY | OFlag::O_DIRECTORY,
        Mode::empty(),
    )
    .context("opendir")?;

    let mut entries = Vec::new();
    for entry in dir.iter() {
        let entry = entry.context("readdir")?;
        let name = entry.file_name().to_string_lossy().into_owned();
        if name == "." || name == ".." {
            continue;
        }
        let is_dir = match entry.file_type() {
            Some(Type::Directory) => true,
            Some(_) => false,
            None => path.join(&name).is_dir(),
        };
        entries.push((name, is_dir));
    }

    entries.sort();
    Ok(entries)
}

#[cfg(test)]
mod tests {
    use std::env;
    use std::fs::{self, File};

    use serial_test::serial;
    use tempdir::TempDir;

    use crate::shell::builtins::test_util::{run, shell};

    #[test]
    fn listdir_sorts_and_labels_entries() {
        let dir = TempDir::new("smash").unwrap();
        File::create(dir.path().join("b.txt")).unwrap();
        File::create(dir.path().join("a.txt")).unwrap();
        fs::create_dir(dir.path().join("src")).unwrap();

        let mut shell = shell();
        let output = run(&mut shell, &format!("listdir {}", dir.path().display())).unwrap();
        assert_eq!(output, "file: a.txt\nfile: b.txt\ndirectory: src\n");
    }

    #[test]
    fn listdir_errors() {
        let mut shell = shell();
        assert_eq!(
            run(&mut shell, "listdir a b").unwrap_err().to_string(),
            "listdir: too many arguments"
        );
        assert!(run(&mut shell, "listdir /no/such/dir")
            .unwrap_err()
            .to_string()
            .starts_with("opendir failed: "));
    }

    #[test]
    #[serial]
    fn cd_and_cd_back() {
        let original = env::current_dir().unwrap();
        let dir = TempDir::new("smash").unwrap();
        let target = dir.path().canonicalize().unwrap();

        let mut shell = shell();
        assert_eq!(
            run(&mut shell, "cd -").unwrap_err().to_string(),
            "cd: OLDPWD not set"
        );

        run(&mut shell, &format!("cd {}", target.display())).unwrap();
        assert_eq!(
            run(&mut shell, "pwd").unwrap(),
            format!("{}\n", target.display())
        );
        assert_eq!(shell.last_dir(), Some(original.as_path()));

        run(&mut shell, "cd -").unwrap();
        assert_eq!(env::current_dir().unwrap(), original);
    }

    #[test]
    #[serial]
    fn cd_errors() {
        let mut shell = shell();
        assert_eq!(
            run(&mut shell, "cd a b").unwrap_err().to_string(),
            "cd: too many arguments"
        );
        assert!(run(&mut shell, "cd /no/such/dir")
            .unwrap_err()
            .to_string()
            .starts_with("chdir failed: "));
        assert!(shell.last_dir().is_none());
    }
}

use std::path::PathBuf;

/// Name of the periodic-repeat command.
pub const WATCH_NAME: &str = "watch";

/// Commands that always run inside the shell process.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Builtin {
    Alias,
    Cd,
    Chprompt,
    Fg,
    GetUser,
    Jobs,
    Kill,
    ListDir,
    Pwd,
    Quit,
    ShowPid,
    Unalias,
}

const BUILTINS: [Builtin; 12] = [
    Builtin::Alias,
    Builtin::Cd,
    Builtin::Chprompt,
    Builtin::Fg,
    Builtin::GetUser,
    Builtin::Jobs,
    Builtin::Kill,
    Builtin::ListDir,
    Builtin::Pwd,
    Builtin::Quit,
    Builtin::ShowPid,
    Builtin::Unalias,
];

impl Builtin {
    pub fn from_name<T: AsRef<str>>(name: T) -> Option<Builtin> {
        let name = name.as_ref();
        BUILTINS.iter().cloned().find(|b| b.name() == name)
    }

    pub const fn name(self) -> &'static str {
        match self {
            Builtin::Alias => "alias",
            Builtin::Cd => "cd",
            Builtin::Chprompt => "chprompt",
            Builtin::Fg => "fg",
            Builtin::GetUser => "getuser",
            Builtin::Jobs => "jobs",
            Builtin::Kill => "kill",
            Builtin::ListDir => "listdir",
            Builtin::Pwd => "pwd",
            Builtin::Quit => "quit",
            Builtin::ShowPid => "showpid",
            Builtin::Unalias => "unalias",
        }
    }

    /// Builtins whose arguments may legitimately contain `|` or `>`, so the
    /// pipe/redirection scan must not look at them.
    pub fn is_operator_transparent(self) -> bool {
        match self {
            Builtin::Alias | Builtin::Unalias | Builtin::Chprompt => true,
            _ => false,
        }
    }
}

/// Returns `true` if `name` cannot be used as an alias.
pub fn is_reserved<T: AsRef<str>>(name: T) -> bool {
    let name = name.as_ref();
    name == WATCH_NAME || Builtin::from_name(name).is_some()
}

/// Which output stream of the left command feeds the pipe.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PipeSource {
    /// `|`
    Stdout,
    /// `|&`
    Stderr,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RedirectMode {
    /// `>`
    Truncate,
    /// `>>`
    Append,
}

/// The closed set of command variants. Exactly one applies to a line.
#[derive(Clone, Debug, PartialEq)]
pub enum CommandKind {
    Builtin(Builtin),
    External,
    Pipe {
        left: String,
        right: String,
        source: PipeSource,
    },
    Redirection {
        inner: String,
        path: PathBuf,
        mode: RedirectMode,
    },
    Watch {
        interval: u64,
        inner: String,
    },
}

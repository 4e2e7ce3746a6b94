//! Smash command line parser
//!
//! Turns one trimmed input line into a `Command`. Tokenization is a plain
//! whitespace split; the interesting part is deciding which variant a line
//! is, which follows a fixed precedence:
//!
//! 1. `alias`, `unalias` and `chprompt` (their arguments may contain operators)
//! 2. `|&`, then `|`
//! 3. `>>`, then `>`
//! 4. `watch`
//! 5. any other builtin
//! 6. an external program

use std::path::PathBuf;

use log::debug;

use self::ast::{Builtin, CommandKind, PipeSource, RedirectMode, WATCH_NAME};
use crate::core::alias::AliasTable;
use crate::errors::{Error, Result};
use crate::util;

pub mod ast;

/// Seconds between runs of a `watch` command when no interval is given.
pub const DEFAULT_WATCH_INTERVAL: u64 = 2;

#[derive(Clone, Debug, PartialEq)]
pub struct Command {
    /// Text that is executed: aliases expanded, background marker stripped.
    raw: String,
    /// Text as the user typed it, shown by `jobs` and `fg`.
    display: String,
    program: String,
    args: Vec<String>,
    background: bool,
    kind: CommandKind,
}

impl Command {
    /// Parses `input`, expanding its first word through `aliases`.
    ///
    /// Returns `Ok(None)` for a blank line.
    pub fn parse<T: AsRef<str>>(input: T, aliases: &AliasTable) -> Result<Option<Self>> {
        let display = input.as_ref().trim();
        if display.is_empty() {
            return Ok(None);
        }

        let expanded = aliases.expand(display);
        let (line, background) = strip_background(&expanded);
        let mut words = util::split_words(line).into_iter();
        let program = match words.next() {
            Some(program) => program,
            None => return Err(Error::syntax("&")),
        };
        let args: Vec<String> = words.collect();
        let kind = classify(line, &program, &args)?;

        let command = Command {
            raw: line.to_string(),
            display: display.to_string(),
            program,
            args,
            background,
            kind,
        };
        debug!("parsed Command: {:?}", command);
        Ok(Some(command))
    }

    pub fn raw(&self) -> &str {
        &self.raw
    }

    pub fn display(&self) -> &str {
        &self.display
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    pub fn args(&self) -> &[String] {
        &self.args
    }

    pub fn is_background(&self) -> bool {
        self.background
    }

    pub fn kind(&self) -> &CommandKind {
        &self.kind
    }

    pub fn is_external(&self) -> bool {
        self.kind == CommandKind::External
    }

    /// Text following the program name, untokenized.
    pub fn arg_text(&self) -> &str {
        self.raw[self.program.len()..].trim()
    }
}

/// Splits a trailing `&` (and the whitespace before it) off `line`.
fn strip_background(line: &str) -> (&str, bool) {
    let line = line.trim();
    if line.ends_with('&') {
        (line[..line.len() - 1].trim_end(), true)
    } else {
        (line, false)
    }
}

fn classify(line: &str, program: &str, args: &[String]) -> Result<CommandKind> {
    let builtin = Builtin::from_name(program);
    if let Some(builtin) = builtin {
        if builtin.is_operator_transparent() {
            return Ok(CommandKind::Builtin(builtin));
        }
    }

    if let Some(index) = line.find("|&") {
        return pipe(line, index, "|&", PipeSource::Stderr);
    }
    if let Some(index) = line.find('|') {
        return pipe(line, index, "|", PipeSource::Stdout);
    }
    if let Some(index) = line.find(">>") {
        return redirection(line, index, ">>", RedirectMode::Append);
    }
    if let Some(index) = line.find('>') {
        return redirection(line, index, ">", RedirectMode::Truncate);
    }

    if program == WATCH_NAME {
        return watch(args);
    }

    Ok(builtin.map_or(CommandKind::External, CommandKind::Builtin))
}

fn pipe(line: &str, index: usize, operator: &str, source: PipeSource) -> Result<CommandKind> {
    let left = line[..index].trim();
    let right = line[index + operator.len()..].trim();
    if left.is_empty() || right.is_empty() {
        return Err(Error::syntax(operator));
    }

    Ok(CommandKind::Pipe {
        left: left.to_string(),
        right: right.to_string(),
        source,
    })
}

fn redirection(line: &str, index: usize, operator: &str, mode: RedirectMode) -> Result<CommandKind> {
    let inner = line[..index].trim();
    let target = line[index + operator.len()..].trim();
    if inner.is_empty() || target.is_empty() {
        return Err(Error::syntax(operator));
    }
    if target.contains('>') || target.split_whitespace().count() > 1 {
        return Err(Error::syntax(target));
    }

    Ok(CommandKind::Redirection {
        inner: inner.to_string(),
        path: PathBuf::from(target),
        mode,
    })
}

fn watch(args: &[String]) -> Result<CommandKind> {
    let interval = args.first().and_then(|arg| {
        let digits = if arg.starts_with('-') { &arg[1..] } else { &arg[..] };
        digits.parse::<u64>().ok()
    });

    let (interval, inner_words) = match interval {
        Some(0) => return Err(Error::builtin_command(WATCH_NAME, "invalid interval")),
        Some(interval) => (interval, &args[1..]),
        None => (DEFAULT_WATCH_INTERVAL, args),
    };
    if inner_words.is_empty() {
        return Err(Error::builtin_command(WATCH_NAME, "command not specified"));
    }

    Ok(CommandKind::Watch {
        interval,
        inner: inner_words.join(" "),
    })
}

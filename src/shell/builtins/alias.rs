use log::debug;
use regex::Regex;

use crate::core::parser::ast::is_reserved;
use crate::shell::builtins::prelude::*;

lazy_static! {
    static ref DEFINITION: Regex = Regex::new(r"^([A-Za-z0-9_]+)='([^']*)'$").unwrap();
}

pub struct Alias;

impl BuiltinCommand for Alias {
    const NAME: &'static str = Builtin::Alias.name();

    fn run(shell: &mut Shell, command: &Command, stdout: &mut dyn Write) -> Result<()> {
        let definition = command.arg_text();
        if definition.is_empty() {
            for (name, value) in shell.aliases().iter() {
                writeln!(stdout, "{}='{}'", name, value)?;
            }
            return Ok(());
        }

        let captures = DEFINITION
            .captures(definition)
            .ok_or_else(|| Self::error("invalid alias format"))?;
        let (name, value) = (&captures[1], &captures[2]);

        if is_reserved(name) || !shell.aliases_mut().insert(name, value) {
            return Err(Self::error(format!(
                "{} already exists or is a reserved command",
                name
            )));
        }
        debug!("alias {}='{}'", name, value);
        Ok(())
    }
}

pub struct Unalias;

impl BuiltinCommand for Unalias {
    const NAME: &'static str = Builtin::Unalias.name();

    fn run(shell: &mut Shell, command: &Command, _stdout: &mut dyn Write) -> Result<()> {
        if command.args().is_empty() {
            return Err(Self::error("not enough arguments"));
        }

        for name in command.args() {
            if shell.aliases_mut().remove(name).is_none() {
                return Err(Self::error(format!("{} alias does not exist", name)));
            }
        }
        Ok(())
    }
}

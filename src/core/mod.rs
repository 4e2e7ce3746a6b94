//! Shell-independent data model: parsed commands, aliases and job entries.

pub mod alias;
pub mod job;
pub mod parser;

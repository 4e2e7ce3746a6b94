//! Smash - a small shell with job control

#[macro_use]
extern crate error_chain;
#[macro_use]
extern crate lazy_static;

#[macro_use]
mod util;

pub mod core;
pub mod errors;
pub mod shell;

pub use crate::shell::{Shell, ShellConfig};

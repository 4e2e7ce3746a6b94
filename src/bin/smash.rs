use std::io::{self, IsTerminal};
use std::path::PathBuf;
use std::process;

use docopt::Docopt;
use log::{debug, error, LevelFilter};
use nix::unistd::Pid;
use serde_derive::Deserialize;

use smash::errors::Error;
use smash::{Shell, ShellConfig};

const LOG_FILE_NAME: &str = ".smash_log";

const USAGE: &str = "
smash.

Usage:
    smash [options]
    smash [options] -c <command>
    smash (-h | --help)
    smash --version

Options:
    -h --help               Show this screen.
    --version               Show version.
    -c                      Run <command> and exit instead of reading from stdin.
    --log=<path>            File to write log to, defaults to ~/.smash_log
    --log-level=<level>     One of off, error, warn, info, debug, trace [default: info]
";

/// Docopts input arguments.
#[derive(Debug, Deserialize)]
struct Args {
    arg_command: Option<String>,
    flag_version: bool,
    flag_log: Option<String>,
    flag_log_level: String,
}

fn main() {
    let args: Args = Docopt::new(USAGE)
        .and_then(|d| d.deserialize())
        .unwrap_or_else(|e| e.exit());

    init_logger(args.flag_log.as_ref(), &args.flag_log_level);
    debug!("{:?}", args);

    if args.flag_version {
        println!("smash version {}", env!("CARGO_PKG_VERSION"));
    } else if let Some(ref command) = args.arg_command {
        execute_from_command_string(command);
    } else {
        execute_from_stdin();
    }
}

fn init_logger(path: Option<&String>, level: &str) {
    let level = level.parse::<LevelFilter>().unwrap_or_else(|_| {
        eprintln!("smash: invalid log level '{}', using info", level);
        LevelFilter::Info
    });
    if level == LevelFilter::Off {
        return;
    }

    let log_path = match path.map(PathBuf::from).or_else(default_log_path) {
        Some(log_path) => log_path,
        None => return,
    };
    let log_file = match fern::log_file(&log_path) {
        Ok(log_file) => log_file,
        Err(e) => {
            eprintln!("smash: unable to open log file {}: {}", log_path.display(), e);
            return;
        }
    };

    let pid = Pid::this();
    let result = fern::Dispatch::new()
        .format(move |out, message, record| {
            out.finish(format_args!(
                "{} [{}] {}: {}",
                pid,
                record.level(),
                record.target(),
                message
            ))
        })
        .level(level)
        .chain(log_file)
        .apply();
    if let Err(e) = result {
        eprintln!("smash: unable to initialize logger: {}", e);
    }
}

fn default_log_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(LOG_FILE_NAME))
}

fn execute_from_command_string(command: &str) -> ! {
    let mut shell = create_shell(ShellConfig::noninteractive());
    shell.execute_command_string(command);
    shell.exit(0)
}

fn execute_from_stdin() -> ! {
    let config = if io::stdin().is_terminal() {
        ShellConfig::interactive()
    } else {
        ShellConfig::noninteractive()
    };
    let mut shell = create_shell(config);
    shell.execute_from_stdin();
    shell.exit(0)
}

fn create_shell(config: ShellConfig) -> Shell {
    Shell::new(config).unwrap_or_else(|e| display_error_and_exit(&e))
}

fn display_error_and_exit(error: &Error) -> ! {
    error!("failed to create shell: {}", error);
    eprintln!("smash error: {}", error);
    process::exit(1);
}


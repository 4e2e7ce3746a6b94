//! Process creation for every command variant.
//!
//! Each child of the shell gets its own process group so a
//! terminal-generated SIGINT reaches only the shell, which then forwards
//! SIGKILL to the group of the registered foreground process. Processes
//! started by a `watch` process or a background pipe wrapper stay in that
//! wrapper's group.

use std::convert::Infallible;
use std::ffi::CString;
use std::io::{self, Write};
use std::os::unix::io::AsRawFd;
use std::path::Path;
use std::thread;
use std::time::Duration;

use log::{debug, warn};
use nix::errno::Errno;
use nix::fcntl::{self, OFlag};
use nix::libc;
use nix::sys::stat::Mode;
use nix::sys::wait::WaitStatus;
use nix::unistd::{self, ForkResult, Pid};

use crate::core::parser::{
    ast::{CommandKind, PipeSource, RedirectMode},
    Command,
};
use crate::errors::{Error, Result, SysResultExt};
use crate::shell::{
    builtins, foreground::ForegroundGuard, job_control::wait_for_process, report_error,
    shell::Shell,
};
use crate::util::{self, unix};

/// Interpreter that runs lines containing shell wildcards.
const WILDCARD_SHELL: &str = "/bin/sh";

/// Clears the terminal and homes the cursor before each `watch` run.
const CLEAR_SCREEN: &str = "\x1b[2J\x1b[1;1H";

impl Command {
    /// Runs this command on behalf of `shell`, blocking while it is in the
    /// foreground.
    pub fn execute(&self, shell: &mut Shell) -> Result<()> {
        match self.kind() {
            CommandKind::Builtin(builtin) => {
                if self.is_background() {
                    debug!("ignoring background marker on builtin '{}'", builtin.name());
                }
                builtins::run(shell, *builtin, self, &mut io::stdout())
            }
            CommandKind::External => run_external_command(shell, self),
            CommandKind::Pipe {
                left,
                right,
                source,
            } => run_pipe_command(shell, self, left, right, *source),
            CommandKind::Redirection { inner, path, mode } => {
                run_redirection_command(shell, self, inner, path, *mode)
            }
            CommandKind::Watch { interval, inner } => {
                run_watch_command(shell, self, *interval, inner)
            }
        }
    }
}

/// Replaces the current process image with `command`. Only returns control
/// by exiting the process.
pub fn exec_external(command: &Command) -> ! {
    match exec_program(command) {
        Ok(never) => match never {},
        Err(e) => report_error(&e),
    }
    unix::exit_child(1)
}

fn exec_program(command: &Command) -> Result<Infallible> {
    let argv: Vec<&str> = if has_wildcard(command.raw()) {
        vec![WILDCARD_SHELL, "-c", command.raw()]
    } else {
        std::iter::once(command.program())
            .chain(command.args().iter().map(String::as_str))
            .collect()
    };
    debug!("exec {:?}", argv);

    let argv = argv
        .into_iter()
        .map(CString::new)
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|_| Error::sys("execvp", Errno::EINVAL))?;
    unistd::execvp(&argv[0], &argv[..]).context("execvp")
}

fn has_wildcard(line: &str) -> bool {
    line.contains('*') || line.contains('?')
}

/// Process group a forked child is placed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ProcessGroup {
    /// A new group led by the child.
    New,
    /// The group of the process that forked it.
    Inherit,
}

impl ProcessGroup {
    /// Children of the shell process lead their own group. Anything forked
    /// from a child of the shell joins the child's group.
    fn for_children_of(shell: &Shell) -> Self {
        if shell.is_shell_process() {
            ProcessGroup::New
        } else {
            ProcessGroup::Inherit
        }
    }
}

/// Forks a child placed in `group`. `child` runs in the new process, which
/// exits with the code it returns.
fn spawn_child<F>(group: ProcessGroup, child: F) -> Result<Pid>
where
    F: FnOnce() -> i32,
{
    util::flush_stdout();
    match unsafe { unistd::fork() }.context("fork")? {
        ForkResult::Child => {
            if group == ProcessGroup::New {
                let temp_result = unistd::setpgid(Pid::from_raw(0), Pid::from_raw(0));
                if let Err(errno) = temp_result {
                    report_error(&Error::sys("setpgid", errno));
                }
            }
            let code = child();
            unix::exit_child(code)
        }
        ForkResult::Parent { child } => {
            // Set in both parent and child so the group exists before either
            // one relies on it. The parent's call loses the race once the
            // child has exec'd.
            if group == ProcessGroup::New {
                if let Err(errno) = unistd::setpgid(child, child) {
                    debug!("setpgid for pid ({}) in parent: {}", child, errno.desc());
                }
            }
            Ok(child)
        }
    }
}

/// Waits on `pid` as the foreground process. A child that stops is added
/// to the job table as a stopped job.
fn wait_in_foreground(shell: &mut Shell, command: &Command, pid: Pid) -> Result<()> {
    let status = {
        let _foreground = ForegroundGuard::register(pid);
        wait_for_process(pid)?
    };

    if let WaitStatus::Stopped(..) = status {
        let job_id = shell.job_manager_mut().add(command.clone(), pid, true);
        debug!("foreground process {} stopped, now job [{}]", pid, job_id);
    }
    Ok(())
}

/// Finishes launching `pid` for `command`: registers a job in the
/// background, otherwise waits for it.
fn finish_launch(shell: &mut Shell, command: &Command, pid: Pid) -> Result<()> {
    if command.is_background() {
        let job_id = shell.job_manager_mut().add(command.clone(), pid, false);
        debug!("started job [{}] pid {}", job_id, pid);
        Ok(())
    } else {
        wait_in_foreground(shell, command, pid)
    }
}

fn run_external_command(shell: &mut Shell, command: &Command) -> Result<()> {
    let group = ProcessGroup::for_children_of(shell);
    let pid = spawn_child(group, || exec_external(command))?;
    finish_launch(shell, command, pid)
}

fn run_pipe_command(
    shell: &mut Shell,
    command: &Command,
    left: &str,
    right: &str,
    source: PipeSource,
) -> Result<()> {
    if !command.is_background() {
        return run_pipe(shell, left, right, source);
    }

    // Both sides run under one wrapper process, which is the job. They join
    // its process group.
    let group = ProcessGroup::for_children_of(shell);
    let pid = spawn_child(group, || match run_pipe(shell, left, right, source) {
        Ok(()) => 0,
        Err(e) => {
            report_error(&e);
            1
        }
    })?;
    finish_launch(shell, command, pid)
}

/// Connects `left`'s stdout (or stderr) to `right`'s stdin and waits for
/// both. The writer is registered as foreground until it is reaped, then
/// the reader until it is too.
fn run_pipe(shell: &mut Shell, left: &str, right: &str, source: PipeSource) -> Result<()> {
    let (read_end, write_end) = unistd::pipe().context("pipe")?;
    let read_fd = read_end.as_raw_fd();
    let write_fd = write_end.as_raw_fd();
    let target_fd = match source {
        PipeSource::Stdout => libc::STDOUT_FILENO,
        PipeSource::Stderr => libc::STDERR_FILENO,
    };

    let group = ProcessGroup::for_children_of(shell);
    let writer = spawn_child(group, || {
        if let Err(e) = attach_pipe_end(write_fd, target_fd, read_fd) {
            report_error(&e);
            return 1;
        }
        shell.execute_in_child(left)
    })?;

    let reader = spawn_child(group, || {
        if let Err(e) = attach_pipe_end(read_fd, libc::STDIN_FILENO, write_fd) {
            report_error(&e);
            return 1;
        }
        shell.execute_in_child(right)
    });

    // The reader only sees end of file once every copy of the write end,
    // including ours, is closed.
    drop(read_end);
    drop(write_end);

    let reader = match reader {
        Ok(reader) => reader,
        Err(e) => {
            let temp_result = wait_for_process(writer);
            log_if_err!(temp_result, "failed to wait for pid ({})", writer);
            return Err(e);
        }
    };
    debug!("pipe writer {} reader {}", writer, reader);

    let mut foreground = ForegroundGuard::register(writer);
    let writer_status = wait_for_process(writer);
    foreground.hand_over(reader);
    let reader_status = wait_for_process(reader);
    drop(foreground);

    writer_status?;
    reader_status?;
    Ok(())
}

/// Moves `fd` onto `target` and closes both pipe descriptors.
fn attach_pipe_end(fd: i32, target: i32, other: i32) -> Result<()> {
    unistd::dup2(fd, target).context("dup2")?;
    unistd::close(fd).context("close")?;
    unistd::close(other).context("close")?;
    Ok(())
}

fn run_redirection_command(
    shell: &mut Shell,
    command: &Command,
    inner: &str,
    path: &Path,
    mode: RedirectMode,
) -> Result<()> {
    let group = ProcessGroup::for_children_of(shell);
    let pid = spawn_child(group, || match redirect_stdout(path, mode) {
        Ok(()) => shell.execute_in_child(inner),
        Err(e) => {
            report_error(&e);
            1
        }
    })?;
    finish_launch(shell, command, pid)
}

/// Points stdout at `path`, creating the file with mode 0644 if needed.
fn redirect_stdout(path: &Path, mode: RedirectMode) -> Result<()> {
    let flags = OFlag::O_WRONLY
        | OFlag::O_CREAT
        | match mode {
            RedirectMode::Truncate => OFlag::O_TRUNC,
            RedirectMode::Append => OFlag::O_APPEND,
        };
    let permissions = Mode::S_IRUSR | Mode::S_IWUSR | Mode::S_IRGRP | Mode::S_IROTH;

    let fd = fcntl::open(path, flags, permissions).context("open")?;
    unistd::dup2(fd, libc::STDOUT_FILENO).context("dup2")?;
    unistd::close(fd).context("close")?;
    Ok(())
}

fn run_watch_command(
    shell: &mut Shell,
    command: &Command,
    interval: u64,
    inner: &str,
) -> Result<()> {
    if command.is_background() {
        warn!("watch cannot run in the background, running '{}' in the foreground", inner);
    }

    // Report a malformed inner command once instead of on every tick.
    Command::parse(inner, shell.aliases())?;

    // The inner commands join the watch process's group.
    let group = ProcessGroup::for_children_of(shell);
    let pid = spawn_child(group, || watch(shell, interval, inner))?;
    wait_in_foreground(shell, command, pid)
}

/// Runs `inner` every `interval` seconds until killed.
fn watch(shell: &mut Shell, interval: u64, inner: &str) -> i32 {
    let period = Duration::from_secs(interval);
    loop {
        print!("{}", CLEAR_SCREEN);
        let temp_result = io::stdout().flush();
        log_if_err!(temp_result, "failed to flush stdout");

        shell.job_manager_mut().garbage_collect();
        match Command::parse(inner, shell.aliases()) {
            Ok(Some(command)) => {
                if let Err(e) = command.execute(shell) {
                    report_error(&e);
                }
            }
            Ok(None) => {}
            Err(e) => report_error(&e),
        }

        thread::sleep(period);
    }
}

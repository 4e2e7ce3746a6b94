//! Foreground registry and the SIGINT handler that reads it.
//!
//! The registry is a single atomic slot holding the pid the shell is
//! currently blocked on, or nothing. The shell's main flow is the only
//! writer. The handler only loads it.

use std::sync::atomic::{AtomicI32, Ordering};

use log::debug;
use nix::libc;
use nix::sys::signal::{self, SaFlags, SigAction, SigHandler, SigSet, Signal};
use nix::unistd::Pid;

use crate::errors::{Result, SysResultExt};
use crate::util::unix::{format_decimal, kill_group, write_stdout_raw, DECIMAL_BUF_LEN};

const NO_FOREGROUND: libc::pid_t = -1;

static FOREGROUND_PID: AtomicI32 = AtomicI32::new(NO_FOREGROUND);

/// The process the shell is currently waiting on, if any.
pub fn current() -> Option<Pid> {
    match FOREGROUND_PID.load(Ordering::SeqCst) {
        NO_FOREGROUND => None,
        pid => Some(Pid::from_raw(pid)),
    }
}

pub fn set(pid: Pid) {
    FOREGROUND_PID.store(pid.as_raw(), Ordering::SeqCst);
}

pub fn clear() {
    FOREGROUND_PID.store(NO_FOREGROUND, Ordering::SeqCst);
}

/// Registers a pid as foreground for as long as the guard lives.
#[derive(Debug)]
pub struct ForegroundGuard {
    pid: Pid,
}

impl ForegroundGuard {
    pub fn register(pid: Pid) -> Self {
        debug!("foreground process is now {}", pid);
        set(pid);
        ForegroundGuard { pid }
    }

    /// Moves the registration to `pid` without an unregistered gap.
    pub fn hand_over(&mut self, pid: Pid) {
        debug!("foreground process {} handed over to {}", self.pid, pid);
        set(pid);
        self.pid = pid;
    }

    pub fn pid(&self) -> Pid {
        self.pid
    }
}

impl Drop for ForegroundGuard {
    fn drop(&mut self) {
        debug!("foreground process {} released", self.pid);
        clear();
    }
}

/// Installs `handle_interrupt` for SIGINT. Interrupted system calls are
/// restarted so the prompt loop's reads are not cut short.
pub fn install_interrupt_handler() -> Result<()> {
    let action = SigAction::new(
        SigHandler::Handler(handle_interrupt),
        SaFlags::SA_RESTART,
        SigSet::empty(),
    );
    unsafe { signal::sigaction(Signal::SIGINT, &action) }.context("sigaction")?;
    debug!("installed SIGINT handler");
    Ok(())
}

/// Only async-signal-safe work happens here: raw writes to the stdout
/// descriptor, one atomic load and `kill`. The whole process group of the
/// foreground process is killed so a `watch` or pipe wrapper takes its
/// children with it.
extern "C" fn handle_interrupt(_: libc::c_int) {
    write_stdout_raw(b"smash: got ctrl-C\n");

    let pid = FOREGROUND_PID.load(Ordering::SeqCst);
    if pid <= 0 {
        return;
    }

    if kill_group(Pid::from_raw(pid), Signal::SIGKILL).is_err() {
        write_stdout_raw(b"smash error: kill failed\n");
        return;
    }

    let mut buf = [0; DECIMAL_BUF_LEN];
    write_stdout_raw(b"smash: process ");
    write_stdout_raw(format_decimal(pid, &mut buf));
    write_stdout_raw(b" was killed\n");
}

//! Helpers that are safe to call from a signal handler or a freshly forked
//! child.

use std::os::unix::io::BorrowedFd;
use std::process;

use nix::libc;
use nix::sys::signal::{self, Signal};
use nix::unistd::{self, Pid};

/// Width of the largest `i32` in decimal, including the sign.
pub const DECIMAL_BUF_LEN: usize = 11;

/// Writes `bytes` straight to the stdout descriptor, bypassing Rust's
/// buffered (and locked) `Stdout`.
pub fn write_stdout_raw(bytes: &[u8]) {
    // STDOUT_FILENO stays open for the life of the process.
    let stdout = unsafe { BorrowedFd::borrow_raw(libc::STDOUT_FILENO) };
    let _ = unistd::write(stdout, bytes);
}

/// Formats `value` in decimal into `buf` without allocating.
pub fn format_decimal(value: i32, buf: &mut [u8; DECIMAL_BUF_LEN]) -> &[u8] {
    let mut n = i64::from(value).abs();
    let mut pos = buf.len();
    loop {
        pos -= 1;
        buf[pos] = b'0' + (n % 10) as u8;
        n /= 10;
        if n == 0 {
            break;
        }
    }
    if value < 0 {
        pos -= 1;
        buf[pos] = b'-';
    }
    &buf[pos..]
}

/// Sends `sig` to the process group led by `pid`, falling back to `pid`
/// alone when it leads no group. Both calls are async-signal-safe.
pub fn kill_group(pid: Pid, sig: Signal) -> nix::Result<()> {
    signal::killpg(pid, sig).or_else(|_| signal::kill(pid, sig))
}

/// Terminates a forked child. Never returns into code meant for the parent.
pub fn exit_child(code: i32) -> ! {
    super::flush_stdout();
    process::exit(code)
}

use std::fs;
use std::io::Write;
use std::path::Path;
use std::process::{self, Child, Command, Output, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use tempdir::TempDir;

/// WorkDir represents a scratch directory in which the shell is run.
#[derive(Debug)]
pub struct WorkDir {
    dir: TempDir,
}

impl WorkDir {
    /// Creates a fresh, empty directory named after the test.
    pub fn new(name: &str) -> WorkDir {
        WorkDir {
            dir: TempDir::new(name).expect("failed to create scratch directory"),
        }
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Builds a command that runs smash in this directory with logging off.
    pub fn command(&self) -> process::Command {
        let mut cmd = Command::new(env!("CARGO_BIN_EXE_smash"));
        cmd.current_dir(self.path());
        cmd.arg("--log-level=off");
        cmd
    }

    /// Starts smash reading its commands from a pipe.
    pub fn spawn(&self) -> Child {
        self.command()
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .expect("failed to start smash")
    }

    /// Starts smash reading from a pipe with its output discarded, so no
    /// leftover process can hold the test's pipes open.
    pub fn spawn_quiet(&self) -> Child {
        self.command()
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .expect("failed to start smash")
    }

    /// Feeds `script` to smash on stdin and collects its output once it exits.
    pub fn run_script(&self, script: &str) -> Output {
        let mut child = self.spawn();
        child
            .stdin
            .take()
            .expect("stdin is piped")
            .write_all(script.as_bytes())
            .expect("failed to write script");
        child.wait_with_output().expect("failed to wait on smash")
    }

    /// Reads a file relative to this directory.
    pub fn read(&self, name: &str) -> String {
        fs::read_to_string(self.path().join(name)).expect("failed to read file")
    }
}

pub fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

pub fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}

/// Pids of live processes whose argv is exactly `argv`. Zombies are skipped.
pub fn running(argv: &[&str]) -> Vec<i32> {
    let expected: Vec<u8> = argv.iter().flat_map(|arg| arg.bytes().chain(Some(0))).collect();
    let mut pids = Vec::new();
    for entry in fs::read_dir("/proc").expect("failed to read /proc") {
        let entry = match entry {
            Ok(entry) => entry,
            Err(_) => continue,
        };
        let pid: i32 = match entry.file_name().to_string_lossy().parse() {
            Ok(pid) => pid,
            Err(_) => continue,
        };
        let cmdline = fs::read(entry.path().join("cmdline")).unwrap_or_default();
        let stat = fs::read_to_string(entry.path().join("stat")).unwrap_or_default();
        let zombie = stat.rsplit(')').next().unwrap_or("").trim_start().starts_with('Z');
        if cmdline == expected && !zombie {
            pids.push(pid);
        }
    }
    pids
}

/// Polls `running(argv)` until `done` accepts it or five seconds pass.
pub fn wait_for_processes<F>(argv: &[&str], done: F) -> Vec<i32>
where
    F: Fn(&[i32]) -> bool,
{
    let deadline = Instant::now() + Duration::from_secs(5);
    loop {
        let pids = running(argv);
        if done(&pids) || Instant::now() >= deadline {
            return pids;
        }
        thread::sleep(Duration::from_millis(20));
    }
}

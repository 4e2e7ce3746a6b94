use std::fmt;
use std::io::Write;

use log::{debug, error, info};
use nix::errno::Errno;
use nix::sys::signal::{self, Signal};
use nix::sys::wait::{self, WaitPidFlag, WaitStatus};
use nix::unistd::Pid;

use crate::core::job::{JobEntry, JobId};
use crate::core::parser::Command;
use crate::errors::{Error, Result, SysResultExt};
use crate::shell::foreground::ForegroundGuard;
use crate::shell::report_error;
use crate::util::unix;

/// The table of background jobs.
///
/// Entries are kept in insertion order, which is also ascending id order.
/// Every entry is dropped exactly once: either by `garbage_collect` when its
/// process is gone, or by one of the `remove` methods.
///
/// Only the process that created the table can wait on its jobs. A forked
/// copy, such as a builtin running on one side of a pipe, sees them as
/// siblings and keeps those entries as they were at the fork.
pub struct JobManager {
    jobs: Vec<JobEntry>,
    owner: Pid,
}

impl Default for JobManager {
    fn default() -> Self {
        JobManager::with_owner(Pid::this())
    }
}

impl JobManager {
    fn with_owner(owner: Pid) -> Self {
        JobManager {
            jobs: Vec::new(),
            owner,
        }
    }

    /// True in the process that created the table.
    pub fn is_owner(&self) -> bool {
        Pid::this() == self.owner
    }

    /// Adds a job and returns its id. Finished jobs are collected first so
    /// their ids can be reused.
    pub fn add(&mut self, command: Command, pid: Pid, stopped: bool) -> JobId {
        self.garbage_collect();
        let job_id = self.next_job_id();
        let job = JobEntry::new(job_id, pid, command, stopped);
        debug!(
            "added job [{}] pid {} at {}: {}",
            job_id,
            pid,
            job.started(),
            job.display()
        );
        self.jobs.push(job);
        job_id
    }

    /// Collects finished jobs, then returns the live ones in id order.
    pub fn list(&mut self) -> &[JobEntry] {
        self.garbage_collect();
        &self.jobs
    }

    /// Jobs as last observed, without polling their processes.
    pub fn jobs(&self) -> &[JobEntry] {
        &self.jobs
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn get(&self, job_id: JobId) -> Option<&JobEntry> {
        self.jobs.iter().find(|job| job.id() == job_id)
    }

    pub fn remove(&mut self, job_id: JobId) -> Option<JobEntry> {
        let index = self.jobs.iter().position(|job| job.id() == job_id)?;
        Some(self.jobs.remove(index))
    }

    pub fn remove_pid(&mut self, pid: Pid) -> Option<JobEntry> {
        let index = self.jobs.iter().position(|job| job.pid() == pid)?;
        Some(self.jobs.remove(index))
    }

    /// Polls every job without blocking and drops those whose process has
    /// exited. Returns the number of jobs dropped.
    pub fn garbage_collect(&mut self) -> usize {
        let owner = self.is_owner();
        let before = self.jobs.len();
        self.jobs.retain_mut(|job| poll_job(job, owner));
        before - self.jobs.len()
    }

    /// Sends SIGKILL to every job's process group and empties the table. A
    /// failed delivery is reported and the remaining jobs are still
    /// processed.
    pub fn kill_all(&mut self) {
        for job in self.jobs.drain(..) {
            match unix::kill_group(job.pid(), Signal::SIGKILL) {
                Ok(()) => {
                    info!("killed job [{}] pid {}", job.id(), job.pid());
                    let temp_result = wait::waitpid(job.pid(), None);
                    log_if_err!(temp_result, "failed to reap pid ({})", job.pid());
                }
                Err(errno) => report_error(&Error::sys("kill", errno)),
            }
        }
    }

    /// The job with the highest id.
    pub fn last_job(&self) -> Option<&JobEntry> {
        self.jobs.iter().max_by_key(|job| job.id())
    }

    /// The stopped job with the highest id.
    pub fn last_stopped_job(&self) -> Option<&JobEntry> {
        self.jobs
            .iter()
            .filter(|job| job.is_stopped())
            .max_by_key(|job| job.id())
    }

    /// Resumes a job and waits for it in the foreground.
    ///
    /// The job is removed from the table once the wait returns. If the
    /// process stopped rather than exited it is added back as a stopped job.
    pub fn put_job_in_foreground(&mut self, job_id: JobId, stdout: &mut dyn Write) -> Result<()> {
        let (pid, display) = match self.get(job_id) {
            Some(job) => (job.pid(), job.display().to_string()),
            None => {
                return Err(Error::builtin_command(
                    "fg",
                    format!("job-id {} does not exist", job_id),
                ))
            }
        };
        debug!("putting job [{}] in foreground", job_id);

        let status = {
            let _foreground = ForegroundGuard::register(pid);
            writeln!(stdout, "{} {}", display, pid)?;
            stdout.flush()?;
            signal::kill(pid, Signal::SIGCONT).context("kill")?;
            wait_for_process(pid)
        };

        let job = self.remove(job_id);
        if let (Ok(WaitStatus::Stopped(..)), Some(job)) = (&status, job) {
            let command = job.command().clone();
            self.add(command, pid, true);
        }
        status.map(|_| ())
    }

    fn next_job_id(&self) -> JobId {
        let max = self.jobs.iter().map(|job| job.id().0).max();
        JobId(max.map_or(1, |id| id + 1))
    }
}

impl fmt::Debug for JobManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{} jobs owned by {}", self.jobs.len(), self.owner)?;
        for job in &self.jobs {
            writeln!(f, "{:?}", job)?;
        }

        Ok(())
    }
}

/// Blocks until `pid` exits, is killed, or stops.
pub fn wait_for_process(pid: Pid) -> Result<WaitStatus> {
    loop {
        match wait::waitpid(pid, Some(WaitPidFlag::WUNTRACED)) {
            Err(Errno::EINTR) => continue,
            Ok(status) => {
                debug!("{:?}", status);
                return Ok(status);
            }
            Err(errno) => return Err(Error::sys("waitpid", errno)),
        }
    }
}

/// Returns `false` once the job's process is gone. Outside the `owner`
/// process a job that is not our child is kept.
fn poll_job(job: &mut JobEntry, owner: bool) -> bool {
    let flags = WaitPidFlag::WNOHANG | WaitPidFlag::WUNTRACED | WaitPidFlag::WCONTINUED;
    loop {
        match wait::waitpid(job.pid(), Some(flags)) {
            Ok(WaitStatus::StillAlive) => return true,
            Ok(WaitStatus::Exited(pid, code)) => {
                debug!(
                    "job [{}] ({}) exited with {} after {}s",
                    job.id(),
                    pid,
                    code,
                    job.elapsed_secs()
                );
                return false;
            }
            Ok(WaitStatus::Signaled(pid, signal, _)) => {
                debug!("job [{}] ({}) terminated by {:?}", job.id(), pid, signal);
                return false;
            }
            Ok(WaitStatus::Stopped(..)) => job.set_stopped(true),
            Ok(WaitStatus::Continued(..)) => job.set_stopped(false),
            Ok(_) => return true,
            Err(Errno::EINTR) => continue,
            Err(Errno::ECHILD) if owner => {
                debug!("job [{}] ({}) is no longer a child", job.id(), job.pid());
                return false;
            }
            Err(Errno::ECHILD) => return true,
            Err(errno) => {
                error!("waitpid on job [{}] failed: {}", job.id(), errno.desc());
                return true;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::process::{self, Child};
    use std::thread;
    use std::time::{Duration, Instant};

    use serial_test::serial;

    use crate::core::alias::AliasTable;
    use crate::shell::foreground;

    fn command(input: &str) -> Command {
        Command::parse(input, &AliasTable::new()).unwrap().unwrap()
    }

    fn spawn(program: &str, arg: &str) -> (Child, Pid) {
        let child = process::Command::new(program)
            .arg(arg)
            .spawn()
            .expect("failed to spawn test child");
        let pid = Pid::from_raw(child.id() as i32);
        (child, pid)
    }

    fn spawn_sleep() -> (Child, Pid) {
        spawn("sleep", "30")
    }

    /// Garbage-collects until `len` jobs are left or a deadline passes.
    fn collect_until_len(jobs: &mut JobManager, len: usize) {
        let deadline = Instant::now() + Duration::from_secs(5);
        while jobs.len() > len && Instant::now() < deadline {
            jobs.garbage_collect();
            thread::sleep(Duration::from_millis(10));
        }
    }

    #[test]
    fn ids_start_at_one_and_follow_max() {
        let mut jobs = JobManager::default();
        let (_a, pid_a) = spawn_sleep();
        let (_b, pid_b) = spawn_sleep();
        let (_c, pid_c) = spawn_sleep();

        assert_eq!(jobs.add(command("sleep 30&"), pid_a, false), JobId(1));
        assert_eq!(jobs.add(command("sleep 30&"), pid_b, false), JobId(2));
        assert!(jobs.remove(JobId(2)).is_some());
        assert_eq!(jobs.add(command("sleep 30&"), pid_c, false), JobId(2));

        assert!(jobs.remove(JobId(1)).is_some());
        let (_d, pid_d) = spawn_sleep();
        assert_eq!(jobs.add(command("sleep 30&"), pid_d, false), JobId(3));

        let ids: Vec<JobId> = jobs.jobs().iter().map(|job| job.id()).collect();
        assert_eq!(ids, vec![JobId(2), JobId(3)]);

        jobs.add(command("sleep 30&"), pid_a, false);
        jobs.add(command("sleep 30&"), pid_b, false);
        jobs.kill_all();
        assert!(jobs.is_empty());
    }

    #[test]
    fn garbage_collect_drops_exited_jobs_once() {
        let mut jobs = JobManager::default();
        let (_done, pid_done) = spawn("true", "");
        let (_alive, pid_alive) = spawn_sleep();
        jobs.add(command("true&"), pid_done, false);
        jobs.add(command("sleep 30&"), pid_alive, false);

        let deadline = Instant::now() + Duration::from_secs(5);
        while jobs.len() == 2 && Instant::now() < deadline {
            jobs.garbage_collect();
            thread::sleep(Duration::from_millis(10));
        }
        assert_eq!(jobs.len(), 1);
        assert_eq!(jobs.garbage_collect(), 0);
        assert_eq!(jobs.list()[0].pid(), pid_alive);

        jobs.kill_all();
    }

    #[test]
    fn list_skips_killed_jobs() {
        let mut jobs = JobManager::default();
        let (_child, pid) = spawn_sleep();
        let job_id = jobs.add(command("sleep 30&"), pid, false);
        signal::kill(pid, Signal::SIGKILL).unwrap();

        collect_until_len(&mut jobs, 0);
        assert!(jobs.get(job_id).is_none());
        assert!(jobs.list().is_empty());
    }

    #[test]
    fn forked_copy_keeps_jobs_it_cannot_wait_on() {
        let mut jobs = JobManager::with_owner(Pid::from_raw(1));
        assert!(!jobs.is_owner());
        let (mut sibling, sibling_pid) = spawn_sleep();
        let kept = jobs.add(command("sleep 30&"), sibling_pid, false);
        signal::kill(sibling_pid, Signal::SIGKILL).unwrap();
        sibling.wait().unwrap();

        let (_own, own_pid) = spawn_sleep();
        jobs.add(command("sleep 30 &"), own_pid, false);
        signal::kill(own_pid, Signal::SIGKILL).unwrap();

        collect_until_len(&mut jobs, 1);
        assert_eq!(jobs.garbage_collect(), 0);
        let ids: Vec<JobId> = jobs.list().iter().map(|job| job.id()).collect();
        assert_eq!(ids, vec![kept]);
    }

    #[test]
    fn remove_by_pid() {
        let mut jobs = JobManager::default();
        let (_child, pid) = spawn_sleep();
        let job_id = jobs.add(command("sleep 30&"), pid, false);

        let job = jobs.remove_pid(pid).expect("job missing");
        assert_eq!(job.id(), job_id);
        assert!(jobs.remove_pid(pid).is_none());
        assert!(jobs.remove(job_id).is_none());

        signal::kill(pid, Signal::SIGKILL).unwrap();
        wait::waitpid(pid, None).unwrap();
    }

    #[test]
    fn last_job_and_last_stopped_job() {
        let mut jobs = JobManager::default();
        assert!(jobs.last_job().is_none());
        assert!(jobs.last_stopped_job().is_none());

        let (_a, pid_a) = spawn_sleep();
        let (_b, pid_b) = spawn_sleep();
        let (_c, pid_c) = spawn_sleep();
        jobs.add(command("sleep 30&"), pid_a, false);
        assert!(jobs.last_stopped_job().is_none());

        jobs.add(command("sleep 30&"), pid_b, true);
        jobs.add(command("sleep 30&"), pid_c, false);
        assert_eq!(jobs.last_job().map(|job| job.pid()), Some(pid_c));
        assert_eq!(jobs.last_stopped_job().map(|job| job.pid()), Some(pid_b));

        jobs.kill_all();
    }

    #[test]
    fn garbage_collect_tracks_stop_and_continue() {
        let mut jobs = JobManager::default();
        let (_child, pid) = spawn_sleep();
        let job_id = jobs.add(command("sleep 30&"), pid, false);

        signal::kill(pid, Signal::SIGSTOP).unwrap();
        let deadline = Instant::now() + Duration::from_secs(5);
        while !jobs.get(job_id).unwrap().is_stopped() && Instant::now() < deadline {
            jobs.garbage_collect();
            thread::sleep(Duration::from_millis(10));
        }
        assert!(jobs.get(job_id).unwrap().is_stopped());
        assert_eq!(jobs.last_stopped_job().map(|job| job.id()), Some(job_id));

        jobs.kill_all();
        assert!(signal::kill(pid, None).is_err());
    }

    #[test]
    fn kill_all_reaps_every_job() {
        let mut jobs = JobManager::default();
        let (_a, pid_a) = spawn_sleep();
        let (_b, pid_b) = spawn_sleep();
        jobs.add(command("sleep 30&"), pid_a, false);
        jobs.add(command("sleep 30&"), pid_b, false);

        jobs.kill_all();
        assert!(jobs.is_empty());
        assert_eq!(signal::kill(pid_a, None), Err(Errno::ESRCH));
        assert_eq!(signal::kill(pid_b, None), Err(Errno::ESRCH));
    }

    #[test]
    #[serial]
    fn foreground_removes_exactly_that_job() {
        let mut jobs = JobManager::default();
        let (_keep, pid_keep) = spawn_sleep();
        let (_short, pid_short) = spawn("sleep", "0.1");
        let keep = jobs.add(command("sleep 30&"), pid_keep, false);
        let short = jobs.add(command("sleep 0.1&"), pid_short, false);

        let mut out = Vec::new();
        jobs.put_job_in_foreground(short, &mut out).unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            format!("sleep 0.1& {}\n", pid_short)
        );
        assert!(jobs.get(short).is_none());
        assert!(jobs.get(keep).is_some());
        assert_eq!(foreground::current(), None);

        jobs.kill_all();
    }

    #[test]
    fn foreground_unknown_job_fails() {
        let mut jobs = JobManager::default();
        let err = jobs
            .put_job_in_foreground(JobId(7), &mut Vec::new())
            .unwrap_err();
        assert_eq!(err.to_string(), "fg: job-id 7 does not exist");
    }
}

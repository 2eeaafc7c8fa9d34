use log::{debug, warn};
use nix::errno::Errno;
use nix::sys::signal::{self, SaFlags, SigAction, SigHandler, SigSet, SigmaskHow, Signal};
use nix::sys::wait::{self, WaitPidFlag, WaitStatus};
use nix::unistd::Pid;
use thiserror::Error;

use super::job::{Job, ProcessStatus, WaitStatusExt};

#[derive(Debug, Error)]
#[error("waiting for pid {pid} failed: {source}")]
pub struct WaitError {
    pub pid: Pid,
    pub source: Errno,
}

/// Whether the caller blocks on a freshly launched job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitPolicy {
    Foreground,
    Background,
}

impl WaitPolicy {
    pub fn for_job(job: &Job) -> Self {
        if job.background {
            WaitPolicy::Background
        } else {
            WaitPolicy::Foreground
        }
    }

    /// Blocks until every stage is reaped for foreground jobs; returns at
    /// once for background ones.
    pub fn apply(self, job: &mut Job) -> Result<(), WaitError> {
        match self {
            WaitPolicy::Foreground => wait_foreground(job),
            WaitPolicy::Background => Ok(()),
        }
    }
}

/// Reaps each of the job's own processes, in stage order. Other children of
/// this process are left alone. Returns early once a stage is stopped; the
/// rest of the job is left for [`poll`].
pub fn wait_foreground(job: &mut Job) -> Result<(), WaitError> {
    for pid in job.pids() {
        let status = loop {
            match wait::waitpid(pid, Some(WaitPidFlag::WUNTRACED)) {
                Ok(ws) => match ws.process_status() {
                    Some(status) => break status,
                    None => continue,
                },
                Err(Errno::EINTR) => continue,
                // Already collected by an asynchronous reaper.
                Err(Errno::ECHILD) => break ProcessStatus::Unknown,
                Err(source) => return Err(WaitError { pid, source }),
            }
        };
        debug!("pid {} changed state: {:?}", pid, status);
        job.set_status(pid, status);
        if let ProcessStatus::Stopped(_) = status {
            return Ok(());
        }
    }
    Ok(())
}

/// Non-blocking check of the job's processes. Returns true once all of them
/// have been reaped.
pub fn poll(job: &mut Job) -> Result<bool, WaitError> {
    for process in job.processes.iter_mut().filter(|p| !p.status.is_finished()) {
        let pid = process.pid;
        match wait::waitpid(pid, Some(WaitPidFlag::WNOHANG)) {
            Ok(ws) => {
                if let Some(status) = ws.process_status() {
                    process.status = status;
                }
            }
            Err(Errno::EINTR) => {}
            Err(Errno::ECHILD) => process.status = ProcessStatus::Unknown,
            Err(source) => return Err(WaitError { pid, source }),
        }
    }
    Ok(job.is_finished())
}

/// Background jobs of an interactive shell, numbered like `[1]`, `[2]`.
#[derive(Debug, Default)]
pub struct JobTable {
    jobs: Vec<(usize, Job)>,
}

impl JobTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, job: Job) -> usize {
        let id = self.jobs.last().map_or(1, |(id, _)| id + 1);
        self.jobs.push((id, job));
        id
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }

    /// Collects finished jobs without blocking and removes them from the
    /// table.
    pub fn reap(&mut self) -> Vec<(usize, Job)> {
        let mut done = Vec::new();
        let mut running = Vec::with_capacity(self.jobs.len());
        for (id, mut job) in self.jobs.drain(..) {
            match poll(&mut job) {
                Ok(true) => done.push((id, job)),
                Ok(false) => running.push((id, job)),
                Err(e) => {
                    warn!("dropping job [{}]: {}", id, e);
                }
            }
        }
        self.jobs = running;
        done
    }
}

/// Reaps every child that has already terminated, never blocking. One
/// SIGCHLD may stand for several deaths, so this loops until none is left.
pub fn reap_exited() -> usize {
    let mut reaped = 0;
    loop {
        match wait::waitpid(Pid::from_raw(-1), Some(WaitPidFlag::WNOHANG)) {
            Ok(WaitStatus::StillAlive) => return reaped,
            Ok(_) => reaped += 1,
            Err(Errno::EINTR) => continue,
            Err(_) => return reaped,
        }
    }
}

extern "C" fn on_sigchld(_: libc::c_int) {
    reap_exited();
}

/// Installs a SIGCHLD handler that reaps exited children as they die.
pub fn install_child_reaper() -> nix::Result<()> {
    let action = SigAction::new(
        SigHandler::Handler(on_sigchld),
        SaFlags::SA_RESTART | SaFlags::SA_NOCLDSTOP,
        SigSet::empty(),
    );
    // SAFETY: the handler only calls waitpid, which is async-signal-safe.
    unsafe { signal::sigaction(Signal::SIGCHLD, &action) }?;
    Ok(())
}

/// Keeps SIGCHLD blocked for this thread while alive, so a foreground job's
/// pids cannot be stolen by the reaper before `wait_foreground` sees them.
/// Children unblock it again in their prelude.
pub struct SigchldBlock {
    previous: SigSet,
}

impl SigchldBlock {
    pub fn new() -> nix::Result<Self> {
        let mut set = SigSet::empty();
        set.add(Signal::SIGCHLD);
        let previous = set.thread_swap_mask(SigmaskHow::SIG_BLOCK)?;
        Ok(SigchldBlock { previous })
    }
}

impl Drop for SigchldBlock {
    fn drop(&mut self) {
        if let Err(e) = self.previous.thread_set_mask() {
            warn!("cannot restore signal mask: {}", e);
        }
    }
}

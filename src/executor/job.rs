use nix::sys::signal::Signal;
use nix::sys::wait::WaitStatus;
use nix::unistd::Pid;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessStatus {
    Running,
    Exited(i32),
    Signaled(Signal),
    /// Stopped by a signal (e.g. Ctrl-Z); not finished.
    Stopped(Signal),
    /// Reaped elsewhere before this job could collect it.
    Unknown,
}

impl ProcessStatus {
    pub fn is_finished(self) -> bool {
        !matches!(self, ProcessStatus::Running | ProcessStatus::Stopped(_))
    }

    /// Shell-style status code: the exit code, or 128 + signal number.
    pub fn code(self) -> Option<i32> {
        match self {
            ProcessStatus::Exited(code) => Some(code),
            ProcessStatus::Signaled(sig) | ProcessStatus::Stopped(sig) => Some(128 + sig as i32),
            ProcessStatus::Running | ProcessStatus::Unknown => None,
        }
    }
}

pub(crate) trait WaitStatusExt {
    /// `None` for notifications that change nothing, such as a continue.
    fn process_status(self) -> Option<ProcessStatus>;
}

impl WaitStatusExt for WaitStatus {
    fn process_status(self) -> Option<ProcessStatus> {
        match self {
            WaitStatus::Exited(_, code) => Some(ProcessStatus::Exited(code)),
            WaitStatus::Signaled(_, sig, _) => Some(ProcessStatus::Signaled(sig)),
            WaitStatus::Stopped(_, sig) => Some(ProcessStatus::Stopped(sig)),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Process {
    pub pid: Pid,
    pub status: ProcessStatus,
}

/// A launched pipeline: one process per stage, in stage order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Job {
    pub pgid: Option<Pid>,
    pub processes: Vec<Process>,
    pub background: bool,
    /// Pipes created to connect the stages.
    pub pipes: usize,
}

impl Job {
    pub fn new(background: bool, pipes: usize) -> Self {
        Job {
            pgid: None,
            processes: Vec::with_capacity(pipes + 1),
            background,
            pipes,
        }
    }

    pub fn push(&mut self, pid: Pid) {
        self.processes.push(Process { pid, status: ProcessStatus::Running });
    }

    pub fn pids(&self) -> Vec<Pid> {
        self.processes.iter().map(|p| p.pid).collect()
    }

    pub fn is_finished(&self) -> bool {
        self.processes.iter().all(|p| p.status.is_finished())
    }

    /// The first stopped stage, if any.
    pub fn stopped(&self) -> Option<ProcessStatus> {
        self.processes
            .iter()
            .map(|p| p.status)
            .find(|s| matches!(s, ProcessStatus::Stopped(_)))
    }

    /// `Running` until every stage is done, then the last stage's status.
    pub fn status(&self) -> ProcessStatus {
        if !self.is_finished() {
            return ProcessStatus::Running;
        }
        self.processes
            .last()
            .map(|p| p.status)
            .unwrap_or(ProcessStatus::Exited(0))
    }

    pub(crate) fn set_status(&mut self, pid: Pid, status: ProcessStatus) -> bool {
        match self.processes.iter_mut().find(|p| p.pid == pid) {
            Some(process) => {
                process.status = status;
                true
            }
            None => false,
        }
    }
}

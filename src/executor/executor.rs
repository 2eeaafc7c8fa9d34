use std::io;
use std::os::fd::BorrowedFd;
use std::path::PathBuf;

use nix::errno::Errno;
use nix::unistd::Pid;
use thiserror::Error;

use crate::ast::Pipeline;
use super::job::Job;

#[derive(Debug, Error)]
pub enum LaunchError {
    #[error("{}: {source}", .path.display())]
    RedirectTarget {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("cannot create pipe: {0}")]
    PipeCreation(#[source] Errno),
    /// Stages forked before the failure keep running; their pids are handed
    /// back so the caller can reap them.
    #[error("fork failed: {source}")]
    Fork { source: Errno, spawned: Vec<Pid> },
    #[error("argument contains a NUL byte: {0:?}")]
    InvalidArgument(String),
    #[error("nothing to launch")]
    EmptyPipeline,
}

/// Per-launch knobs chosen by the front end.
#[derive(Debug, Clone, Copy, Default)]
pub struct LaunchOptions<'fd> {
    /// Replaces stdout and stderr of every stage before pipes and
    /// redirection are applied.
    pub output: Option<BorrowedFd<'fd>>,
    /// Put every stage into one new process group led by the first stage.
    pub process_group: bool,
    /// Terminal handed to the job's group while it runs in the foreground.
    /// Only honoured together with `process_group`.
    pub terminal: Option<BorrowedFd<'fd>>,
}

pub trait Executor {
    fn launch(&mut self, pipeline: Pipeline, options: &LaunchOptions<'_>) -> Result<Job, LaunchError>;
}

use std::ffi::CString;
use std::os::fd::AsRawFd;

use log::{debug, warn};
use nix::unistd::{self, ForkResult, Pid};

use crate::ast::{Command, Pipeline};
use crate::terminal;
use super::child::{self, StageIo};
use super::executor::{Executor, LaunchError, LaunchOptions};
use super::job::Job;
use super::pipes::PipeSet;
use super::redirect::OpenedRedirect;

/// Runs pipelines as real processes with `fork` + `execvp`.
pub struct ForkExecutor;

impl Executor for ForkExecutor {
    fn launch(&mut self, pipeline: Pipeline, options: &LaunchOptions<'_>) -> Result<Job, LaunchError> {
        if pipeline.is_empty() {
            return Err(LaunchError::EmptyPipeline);
        }

        // Everything that can fail is prepared before the first fork.
        let argvs = pipeline
            .commands
            .iter()
            .map(to_argv)
            .collect::<Result<Vec<_>, _>>()?;
        let prefixes: Vec<Vec<u8>> = pipeline
            .commands
            .iter()
            .map(|c| format!("bsh: {}: ", c.name()).into_bytes())
            .collect();
        let redirect = pipeline
            .redirection
            .as_ref()
            .map(OpenedRedirect::open)
            .transpose()?;
        let pipes = PipeSet::new(argvs.len())?;
        let pipe_fds = pipes.raw_fds();

        let terminal = match (options.process_group, pipeline.background) {
            (true, false) => options.terminal,
            _ => None,
        };
        let mut job = Job::new(pipeline.background, pipes.len());

        for (stage, argv) in argvs.iter().enumerate() {
            let io = StageIo {
                stdin: pipes.read_end(stage),
                stdout: pipes.write_end(stage),
                output: options.output.map(|fd| fd.as_raw_fd()),
                redirect: match (&redirect, stage) {
                    (Some(r), 0) => Some((r.raw_fd(), r.fds())),
                    _ => None,
                },
            };
            let group = options
                .process_group
                .then(|| job.pgid.unwrap_or(Pid::from_raw(0)));

            // SAFETY: the child only runs the prelude and `exec_stage`, which
            // never return into this function.
            match unsafe { unistd::fork() } {
                Ok(ForkResult::Child) => {
                    child::prelude(group, terminal);
                    child::exec_stage(argv, io, &pipe_fds, &prefixes[stage]);
                }
                Ok(ForkResult::Parent { child }) => {
                    if options.process_group {
                        let pgid = *job.pgid.get_or_insert(child);
                        // Also done by the child; whichever runs first wins.
                        if let Err(e) = unistd::setpgid(child, pgid) {
                            debug!("setpgid({}, {}) from parent: {}", child, pgid, e);
                        }
                    }
                    debug!("stage {} `{}` started as pid {}", stage, pipeline.commands[stage].name(), child);
                    job.push(child);
                }
                Err(errno) => {
                    warn!("fork failed at stage {}: {}", stage, errno);
                    return Err(LaunchError::Fork {
                        source: errno,
                        spawned: job.pids(),
                    });
                }
            }
        }

        if let (Some(terminal), Some(pgid)) = (terminal, job.pgid) {
            if let Err(e) = terminal::set_foreground_group(terminal, pgid) {
                warn!("cannot hand the terminal to job {}: {}", pgid, e);
            }
        }

        // Dropping the pipe set and the target closes the parent's copies,
        // so readers see end-of-file once their writers exit.
        drop(pipes);
        drop(redirect);
        Ok(job)
    }
}

fn to_argv(command: &Command) -> Result<Vec<CString>, LaunchError> {
    command
        .argv
        .iter()
        .map(|arg| CString::new(arg.as_bytes()).map_err(|_| LaunchError::InvalidArgument(arg.clone())))
        .collect()
}

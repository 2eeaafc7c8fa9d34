//! Command execution on behalf of a connected client.
//!
//! The transport is the caller's business: a session only needs a descriptor
//! to send child output and error text to. Background jobs are left to the
//! process-wide reaper from [`install_child_reaper`].

use std::fs::File;
use std::io::Write;
use std::os::fd::BorrowedFd;

use log::debug;

use crate::ast::ParseOutcome;
use crate::config::Limits;
use crate::error::ShellError;
use crate::executor::wait::{self, SigchldBlock};
use crate::executor::{Executor, ForkExecutor, Job, LaunchOptions, WaitPolicy};
use crate::parser;

pub use crate::executor::wait::{install_child_reaper, reap_exited};

/// What became of one line.
#[derive(Debug, PartialEq, Eq)]
pub enum Outcome {
    /// Blank line; nothing ran.
    Empty,
    /// The client asked to close the session.
    Exit,
    /// A foreground job, fully reaped.
    Finished(Job),
    /// A background job, still running or not.
    Started(Job),
    /// A foreground job stopped by a signal; the reaper collects it once it
    /// dies.
    Stopped(Job),
}

pub struct RemoteSession<'a, E: Executor = ForkExecutor> {
    conn: BorrowedFd<'a>,
    limits: Limits,
    executor: E,
}

impl<'a> RemoteSession<'a> {
    pub fn new(conn: BorrowedFd<'a>, limits: Limits) -> Self {
        Self::with_executor(conn, limits, ForkExecutor)
    }
}

impl<'a, E: Executor> RemoteSession<'a, E> {
    pub fn with_executor(conn: BorrowedFd<'a>, limits: Limits, executor: E) -> Self {
        RemoteSession { conn, limits, executor }
    }

    /// Runs one line with the connection as stdout and stderr. Build and
    /// launch errors are also sent to the client as `bsh: <error>`.
    pub fn run_line(&mut self, line: &str) -> Result<Outcome, ShellError> {
        match self.execute(line) {
            Err(err @ (ShellError::Build(_) | ShellError::Launch(_))) => {
                self.reply(&format!("bsh: {}\n", err))?;
                Err(err)
            }
            other => other,
        }
    }

    fn execute(&mut self, line: &str) -> Result<Outcome, ShellError> {
        let pipeline = match parser::parse(line, &self.limits)? {
            ParseOutcome::Empty => return Ok(Outcome::Empty),
            ParseOutcome::ExitRequested => return Ok(Outcome::Exit),
            ParseOutcome::Run(pipeline) => pipeline,
        };
        let options = LaunchOptions {
            output: Some(self.conn),
            ..LaunchOptions::default()
        };

        // Held until the foreground pids are collected; anything the reaper
        // would have taken meanwhile is picked up once the mask is restored.
        let _block = SigchldBlock::new()?;
        let mut job = self.executor.launch(pipeline, &options)?;
        match WaitPolicy::for_job(&job) {
            WaitPolicy::Foreground => {
                wait::wait_foreground(&mut job)?;
                if job.stopped().is_some() {
                    debug!("remote job stopped: {:?}", job.pids());
                    return Ok(Outcome::Stopped(job));
                }
                debug!("remote job finished: {:?}", job.status());
                Ok(Outcome::Finished(job))
            }
            WaitPolicy::Background => {
                debug!("remote job started in background: {:?}", job.pids());
                Ok(Outcome::Started(job))
            }
        }
    }

    fn reply(&self, text: &str) -> Result<(), ShellError> {
        let mut conn = File::from(self.conn.try_clone_to_owned()?);
        conn.write_all(text.as_bytes())?;
        Ok(())
    }
}

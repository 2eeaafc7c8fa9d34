use log::{debug, warn};

use crate::ast::ParseOutcome;
use crate::config::Config;
use crate::error::ShellError;
use crate::executor::wait::{self, JobTable};
use crate::executor::{Executor, ForkExecutor, Job, LaunchError, LaunchOptions, WaitPolicy};
use crate::parser;
use crate::prompt::ShellPrompt;
use crate::terminal::ShellTerminalState;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Control {
    Continue,
    Exit,
}

/// The interactive loop: prompt, read, build, launch, wait.
pub struct Shell<E: Executor = ForkExecutor> {
    config: Config,
    prompt: ShellPrompt,
    terminal: Option<ShellTerminalState>,
    jobs: JobTable,
    executor: E,
    last_status: i32,
}

impl Shell {
    pub fn new(config: Config, terminal: Option<ShellTerminalState>) -> Self {
        Self::with_executor(config, terminal, ForkExecutor)
    }
}

impl<E: Executor> Shell<E> {
    pub fn with_executor(config: Config, terminal: Option<ShellTerminalState>, executor: E) -> Self {
        Shell {
            prompt: ShellPrompt::new(config.prompt.clone()),
            config,
            terminal,
            jobs: JobTable::new(),
            executor,
            last_status: 0,
        }
    }

    /// Status of the last foreground job.
    pub fn last_status(&self) -> i32 {
        self.last_status
    }

    /// Runs until `exit` or end of input. The result is the process exit code.
    pub fn run(&mut self) -> i32 {
        loop {
            self.report_finished();
            if let Err(e) = self.prompt.show_prompt() {
                warn!("cannot write prompt: {}", e);
            }
            let line = match self.prompt.read_line() {
                Ok(Some(line)) => line,
                Ok(None) => {
                    // EOF (e.g. Ctrl+D)
                    println!();
                    return 0;
                }
                Err(e) => {
                    eprintln!("bsh: {}", e);
                    return 1;
                }
            };
            match self.run_line(&line) {
                Ok(Control::Continue) => {}
                Ok(Control::Exit) => return 0,
                Err(e) => eprintln!("bsh: {}", e),
            }
        }
    }

    pub fn run_line(&mut self, line: &str) -> Result<Control, ShellError> {
        let pipeline = match parser::parse(line, &self.config.limits)? {
            ParseOutcome::Empty => return Ok(Control::Continue),
            ParseOutcome::ExitRequested => return Ok(Control::Exit),
            ParseOutcome::Run(pipeline) => pipeline,
        };
        let options = LaunchOptions {
            output: None,
            process_group: self.terminal.is_some(),
            terminal: self.terminal.as_ref().map(ShellTerminalState::terminal),
        };

        let job = match self.executor.launch(pipeline, &options) {
            Ok(job) => job,
            Err(LaunchError::Fork { source, spawned }) => {
                self.adopt(spawned);
                return Err(LaunchError::Fork { source, spawned: Vec::new() }.into());
            }
            Err(e) => return Err(e.into()),
        };

        match WaitPolicy::for_job(&job) {
            WaitPolicy::Foreground => self.wait_in_foreground(job)?,
            WaitPolicy::Background => {
                let leader = job.processes.first().map(|p| p.pid);
                let id = self.jobs.push(job);
                match leader {
                    Some(pid) => println!("[{}] {}", id, pid),
                    None => println!("[{}]", id),
                }
            }
        }
        Ok(Control::Continue)
    }

    /// Waits for a foreground job, then takes the terminal back. A job
    /// stopped from the keyboard joins the background table.
    fn wait_in_foreground(&mut self, mut job: Job) -> Result<(), ShellError> {
        let waited = wait::wait_foreground(&mut job);
        if let Some(terminal) = &self.terminal {
            terminal.reclaim();
        }
        waited?;

        if let Some(stopped) = job.stopped() {
            if let Some(code) = stopped.code() {
                self.last_status = code;
            }
            let id = self.jobs.push(job);
            println!("[{}] Stopped", id);
        } else if let Some(code) = job.status().code() {
            self.last_status = code;
        }
        Ok(())
    }

    /// Announces background jobs that have finished since the last prompt.
    pub fn report_finished(&mut self) {
        for (id, job) in self.jobs.reap() {
            debug!("job [{}] done: {:?}", id, job.status());
            println!("[{}] Done", id);
        }
    }

    /// Stages forked before a failed fork keep running; track them so they
    /// are reaped with the background jobs.
    fn adopt(&mut self, spawned: Vec<nix::unistd::Pid>) {
        if spawned.is_empty() {
            return;
        }
        let mut job = Job::new(true, 0);
        for pid in spawned {
            job.push(pid);
        }
        let id = self.jobs.push(job);
        warn!("partial pipeline kept as job [{}]", id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ConfigLoader, Limits};
    use crate::executor::tests::RecordingExecutor;
    use crate::parser::BuildError;
    use nix::errno::Errno;
    use nix::unistd::Pid;
    use serial_test::serial;
    use std::time::{Duration, Instant};

    fn shell() -> Shell<RecordingExecutor> {
        Shell::with_executor(ConfigLoader::default_config(), None, RecordingExecutor::default())
    }

    #[test]
    fn test_exit_launches_nothing() {
        let mut sh = shell();
        assert_eq!(sh.run_line("exit\n").unwrap(), Control::Exit);
        assert!(sh.executor.log.is_empty());
    }

    #[test]
    fn test_blank_line_continues() {
        let mut sh = shell();
        assert_eq!(sh.run_line("\n").unwrap(), Control::Continue);
        assert_eq!(sh.run_line(" \t \n").unwrap(), Control::Continue);
        assert!(sh.executor.log.is_empty());
    }

    #[test]
    fn test_over_capacity_launches_nothing() {
        let mut sh = shell();
        let line = vec!["a"; 33].join(" ");
        let err = sh.run_line(&line).unwrap_err();
        assert!(matches!(err, ShellError::Build(BuildError::CapacityExceeded { what: _, max: 32 })));

        let line = vec!["true"; 17].join(" | ");
        assert!(sh.run_line(&line).is_err());
        assert!(sh.executor.log.is_empty());
    }

    #[test]
    fn test_configured_limits_apply() {
        let mut config = ConfigLoader::default_config();
        config.limits = Limits { max_line: 10, ..Limits::default() };
        let mut sh = Shell::with_executor(config, None, RecordingExecutor::default());
        let err = sh.run_line("echo abcdefgh\n").unwrap_err();
        assert!(matches!(err, ShellError::Build(BuildError::InputTooLong { len: 13, max: 10 })));
    }

    #[test]
    fn test_pipeline_and_background() {
        let mut sh = shell();
        sh.run_line("ls -l | wc -l\n").unwrap();
        sh.run_line("sleep 1 &\n").unwrap();
        assert_eq!(sh.executor.log, vec!["ls -l | wc -l", "sleep 1 &"]);
        assert_eq!(sh.jobs.len(), 1);
        // A recorded job has no processes, so it is already done.
        sh.report_finished();
        assert!(sh.jobs.is_empty());
    }

    struct FailingFork {
        spawned: Vec<Pid>,
    }

    impl Executor for FailingFork {
        fn launch(&mut self, _pipeline: crate::ast::Pipeline, _options: &LaunchOptions<'_>) -> Result<Job, LaunchError> {
            Err(LaunchError::Fork {
                source: Errno::EAGAIN,
                spawned: std::mem::take(&mut self.spawned),
            })
        }
    }

    #[test]
    #[serial]
    fn test_partial_fork_is_reaped_later() {
        let child = std::process::Command::new("true").spawn().unwrap();
        let pid = Pid::from_raw(child.id() as i32);
        let mut sh = Shell::with_executor(ConfigLoader::default_config(), None, FailingFork { spawned: vec![pid] });

        let err = sh.run_line("true | true").unwrap_err();
        assert!(matches!(err, ShellError::Launch(LaunchError::Fork { source: Errno::EAGAIN, .. })));
        assert_eq!(sh.jobs.len(), 1);

        let deadline = Instant::now() + Duration::from_secs(10);
        while !sh.jobs.is_empty() {
            assert!(Instant::now() < deadline, "timed out");
            sh.report_finished();
            std::thread::sleep(Duration::from_millis(10));
        }
    }

    #[test]
    #[serial]
    fn test_stopped_foreground_job_moves_to_table() {
        let pipeline = crate::ast::Pipeline {
            commands: vec![crate::ast::Command { argv: vec!["sleep".to_string(), "5".to_string()] }],
            redirection: None,
            background: false,
        };
        let job = ForkExecutor.launch(pipeline, &LaunchOptions::default()).unwrap();
        let pid = job.processes[0].pid;
        nix::sys::signal::kill(pid, nix::sys::signal::Signal::SIGSTOP).unwrap();

        let mut sh = shell();
        sh.wait_in_foreground(job).unwrap();
        assert_eq!(sh.jobs.len(), 1);
        assert_eq!(sh.last_status(), 128 + nix::sys::signal::Signal::SIGSTOP as i32);

        nix::sys::signal::kill(pid, nix::sys::signal::Signal::SIGKILL).unwrap();
        let deadline = Instant::now() + Duration::from_secs(10);
        while !sh.jobs.is_empty() {
            assert!(Instant::now() < deadline, "timed out");
            sh.report_finished();
            std::thread::sleep(Duration::from_millis(10));
        }
    }

    #[test]
    #[serial]
    fn test_foreground_status_is_recorded() {
        let mut sh = Shell::new(ConfigLoader::default_config(), None);
        sh.run_line("false\n").unwrap();
        assert_eq!(sh.last_status(), 1);
        sh.run_line("true | true\n").unwrap();
        assert_eq!(sh.last_status(), 0);
    }
}

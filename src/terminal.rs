//! Terminal ownership for the interactive shell.

use std::io::IsTerminal;
use std::os::fd::{AsRawFd, BorrowedFd};

use log::{debug, warn};
use nix::errno::Errno;
use nix::sys::signal::{self, SigHandler, Signal};
use nix::sys::termios::{self, SetArg, Termios};
use nix::unistd::{self, Pid};
use thiserror::Error;

/// Signals the interactive shell ignores while it owns the terminal.
/// `SIGCHLD` is left alone, so background statuses stay collectable.
const SHELL_IGNORED: [Signal; 5] = [
    Signal::SIGINT,
    Signal::SIGQUIT,
    Signal::SIGTSTP,
    Signal::SIGTTIN,
    Signal::SIGTTOU,
];

#[derive(Debug, Error)]
pub enum TerminalError {
    #[error("cannot reach the terminal foreground: {0}")]
    Foreground(#[source] Errno),
    #[error("cannot ignore {signal}: {source}")]
    Signal { signal: Signal, source: Errno },
    #[error("cannot create the shell process group: {0}")]
    ProcessGroup(#[source] Errno),
    #[error("cannot read terminal attributes: {0}")]
    Attributes(#[source] Errno),
}

/// Makes `pgid` the foreground process group of `terminal`.
pub fn set_foreground_group(terminal: BorrowedFd<'_>, pgid: Pid) -> nix::Result<()> {
    // SAFETY: plain ioctl on a descriptor we borrow.
    Errno::result(unsafe { libc::tcsetpgrp(terminal.as_raw_fd(), pgid.as_raw()) }).map(drop)
}

pub fn foreground_group(terminal: BorrowedFd<'_>) -> nix::Result<Pid> {
    // SAFETY: plain ioctl on a descriptor we borrow.
    Errno::result(unsafe { libc::tcgetpgrp(terminal.as_raw_fd()) }).map(Pid::from_raw)
}

/// What the interactive shell remembers about its controlling terminal.
/// Owned by the shell loop; dropping it puts the saved attributes back.
pub struct ShellTerminalState {
    terminal: BorrowedFd<'static>,
    pgid: Pid,
    tmodes: Termios,
}

impl ShellTerminalState {
    /// Takes control of the terminal on stdin. Returns `None` when stdin is
    /// not a terminal; the shell then runs without job control.
    pub fn init() -> Result<Option<Self>, TerminalError> {
        if !std::io::stdin().is_terminal() {
            return Ok(None);
        }
        // SAFETY: stdin stays open for the life of the process.
        let terminal = unsafe { BorrowedFd::borrow_raw(libc::STDIN_FILENO) };

        // Started in the background: stop until the user brings us forward.
        loop {
            let ours = unistd::getpgrp();
            if foreground_group(terminal).map_err(TerminalError::Foreground)? == ours {
                break;
            }
            signal::killpg(ours, Signal::SIGTTIN).map_err(TerminalError::Foreground)?;
        }

        for sig in SHELL_IGNORED {
            // SAFETY: SIG_IGN installs no handler code.
            unsafe { signal::signal(sig, SigHandler::SigIgn) }
                .map_err(|source| TerminalError::Signal { signal: sig, source })?;
        }

        let pgid = unistd::getpid();
        match unistd::setpgid(pgid, pgid) {
            Ok(()) => {}
            // Already a session leader, hence already a group leader.
            Err(Errno::EPERM) if unistd::getpgrp() == pgid => {}
            Err(e) => return Err(TerminalError::ProcessGroup(e)),
        }
        set_foreground_group(terminal, pgid).map_err(TerminalError::Foreground)?;
        let tmodes = termios::tcgetattr(terminal).map_err(TerminalError::Attributes)?;
        debug!("shell owns the terminal as group {}", pgid);

        Ok(Some(ShellTerminalState { terminal, pgid, tmodes }))
    }

    pub fn terminal(&self) -> BorrowedFd<'static> {
        self.terminal
    }

    /// Takes the terminal back after a foreground job and restores the
    /// attributes the job may have changed.
    pub fn reclaim(&self) {
        if let Err(e) = set_foreground_group(self.terminal, self.pgid) {
            warn!("cannot reclaim the terminal: {}", e);
        }
        self.restore_modes();
    }

    fn restore_modes(&self) {
        if let Err(e) = termios::tcsetattr(self.terminal, SetArg::TCSADRAIN, &self.tmodes) {
            warn!("cannot restore terminal attributes: {}", e);
        }
    }
}

impl Drop for ShellTerminalState {
    fn drop(&mut self) {
        self.restore_modes();
    }
}

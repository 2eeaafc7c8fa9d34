//! Code that runs in a freshly forked stage, between `fork` and `exec`.
//!
//! Nothing here logs or formats: the parent may have other threads, and
//! only async-signal-safe calls are reliable in the child.

use std::ffi::CString;
use std::os::fd::{BorrowedFd, RawFd};

use nix::errno::Errno;
use nix::sys::signal::{self, SigHandler, SigSet, Signal};
use nix::unistd::{self, Pid};

use crate::terminal;

/// Signals a stage gets back at their default disposition: the ones an
/// interactive shell ignores, plus `SIGPIPE`, which the Rust runtime ignores
/// at startup.
pub const CHILD_DEFAULT_SIGNALS: [Signal; 7] = [
    Signal::SIGINT,
    Signal::SIGQUIT,
    Signal::SIGTSTP,
    Signal::SIGTTIN,
    Signal::SIGTTOU,
    Signal::SIGCHLD,
    Signal::SIGPIPE,
];

/// Where a stage's stdin/stdout come from, as seen by the child.
#[derive(Debug, Clone, Copy, Default)]
pub struct StageIo {
    pub stdin: Option<RawFd>,
    pub stdout: Option<RawFd>,
    /// Stdout and stderr replacement for the whole job.
    pub output: Option<RawFd>,
    /// Redirection target and the descriptors it replaces.
    pub redirect: Option<(RawFd, &'static [RawFd])>,
}

/// First thing every forked stage runs.
///
/// `group` is the process group to join; `Pid::from_raw(0)` starts a new one
/// led by this process. With `terminal`, the group also takes the terminal.
pub fn prelude(group: Option<Pid>, terminal: Option<BorrowedFd<'_>>) {
    if let Some(pgid) = group {
        let _ = unistd::setpgid(Pid::from_raw(0), pgid);
        if let Some(terminal) = terminal {
            let pgid = if pgid.as_raw() == 0 { unistd::getpid() } else { pgid };
            // SIGTTOU is still ignored here, so this cannot stop us.
            let _ = terminal::set_foreground_group(terminal, pgid);
        }
    }
    for sig in CHILD_DEFAULT_SIGNALS {
        // SAFETY: restoring the default disposition installs no handler.
        let _ = unsafe { signal::signal(sig, SigHandler::SigDfl) };
    }
    let _ = SigSet::empty().thread_set_mask();
}

/// Wires the stage's descriptors and execs `argv`. Never returns: on any
/// failure the child reports on its stderr and exits.
pub fn exec_stage(argv: &[CString], io: StageIo, pipe_fds: &[RawFd], error_prefix: &[u8]) -> ! {
    for &fd in pipe_fds {
        if Some(fd) != io.stdin && Some(fd) != io.stdout {
            close_fd(fd);
        }
    }

    if let Err(errno) = wire(io) {
        fail(error_prefix, errno, 126);
    }

    let errno = match argv.first() {
        Some(program) => match unistd::execvp(program, argv) {
            Err(errno) => errno,
            Ok(never) => match never {},
        },
        None => Errno::ENOENT,
    };
    let status = if errno == Errno::ENOENT { 127 } else { 126 };
    fail(error_prefix, errno, status)
}

fn wire(io: StageIo) -> Result<(), Errno> {
    // A source already sitting on 0-2 would be clobbered by an earlier dup2.
    let output = io.output.map(lift).transpose()?;
    let stdin = io.stdin.map(lift).transpose()?;
    let stdout = io.stdout.map(lift).transpose()?;
    let redirect = io
        .redirect
        .map(|(fd, fds)| lift(fd).map(|fd| (fd, fds)))
        .transpose()?;

    if let Some(fd) = output {
        dup_onto(fd, libc::STDOUT_FILENO)?;
        dup_onto(fd, libc::STDERR_FILENO)?;
        if output != io.output {
            close_fd(fd);
        }
    }
    if let Some(read) = stdin {
        move_onto(read, &[libc::STDIN_FILENO])?;
    }
    if let Some(write) = stdout {
        move_onto(write, &[libc::STDOUT_FILENO])?;
    }
    if let Some((file, fds)) = redirect {
        move_onto(file, fds)?;
    }
    Ok(())
}

/// Moves a copy of `fd` above the standard descriptors when it sits on one.
fn lift(fd: RawFd) -> Result<RawFd, Errno> {
    if fd > libc::STDERR_FILENO {
        return Ok(fd);
    }
    // SAFETY: plain descriptor syscall.
    Errno::result(unsafe { libc::fcntl(fd, libc::F_DUPFD_CLOEXEC, libc::STDERR_FILENO + 1) })
}

/// Duplicates `src` onto every descriptor in `dsts`, then closes `src`
/// unless it is one of them.
fn move_onto(src: RawFd, dsts: &[RawFd]) -> Result<(), Errno> {
    for &dst in dsts {
        dup_onto(src, dst)?;
    }
    if !dsts.contains(&src) {
        close_fd(src);
    }
    Ok(())
}

/// Leaves `dst` open across exec as a copy of `src`.
fn dup_onto(src: RawFd, dst: RawFd) -> Result<(), Errno> {
    if src == dst {
        // dup2 would be a no-op and keep close-on-exec.
        // SAFETY: plain descriptor syscall.
        return Errno::result(unsafe { libc::fcntl(dst, libc::F_SETFD, 0) }).map(drop);
    }
    // SAFETY: plain descriptor syscall.
    Errno::result(unsafe { libc::dup2(src, dst) }).map(drop)
}

fn close_fd(fd: RawFd) {
    // SAFETY: the descriptor belongs to this process and is not used again.
    unsafe {
        libc::close(fd);
    }
}

fn fail(prefix: &[u8], errno: Errno, status: i32) -> ! {
    write_stderr(prefix);
    write_stderr(errno.desc().as_bytes());
    write_stderr(b"\n");
    // SAFETY: _exit skips atexit handlers and stdio buffers inherited from
    // the parent, which must not be flushed twice.
    unsafe { libc::_exit(status) }
}

fn write_stderr(bytes: &[u8]) {
    // SAFETY: the buffer is valid for `len` bytes.
    unsafe {
        libc::write(libc::STDERR_FILENO, bytes.as_ptr().cast(), bytes.len());
    }
}

use std::io;

use thiserror::Error;

use crate::config::ConfigError;
use crate::executor::{LaunchError, WaitError};
use crate::parser::BuildError;
use crate::terminal::TerminalError;

/// Everything a front end can run into while handling one line.
#[derive(Debug, Error)]
pub enum ShellError {
    #[error(transparent)]
    Build(#[from] BuildError),
    #[error(transparent)]
    Launch(#[from] LaunchError),
    #[error(transparent)]
    Wait(#[from] WaitError),
    #[error(transparent)]
    Terminal(#[from] TerminalError),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("signal setup failed: {0}")]
    Signal(#[from] nix::errno::Errno),
}

use std::os::fd::{AsRawFd, OwnedFd, RawFd};

use nix::fcntl::OFlag;
use nix::unistd;

use super::executor::LaunchError;

/// The `k - 1` pipes joining a `k`-stage pipeline. Pipe `i` carries stage
/// `i`'s stdout to stage `i + 1`'s stdin. Dropping the set closes every end.
#[derive(Debug)]
pub struct PipeSet {
    pipes: Vec<(OwnedFd, OwnedFd)>,
}

impl PipeSet {
    pub fn new(stages: usize) -> Result<Self, LaunchError> {
        let count = stages.saturating_sub(1);
        let mut pipes = Vec::with_capacity(count);
        for _ in 0..count {
            // Close-on-exec, so no other job's exec inherits these ends.
            let pair = unistd::pipe2(OFlag::O_CLOEXEC).map_err(LaunchError::PipeCreation)?;
            pipes.push(pair);
        }
        Ok(PipeSet { pipes })
    }

    pub fn len(&self) -> usize {
        self.pipes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pipes.is_empty()
    }

    /// Descriptor stage `stage` reads its stdin from, if any.
    pub fn read_end(&self, stage: usize) -> Option<RawFd> {
        stage
            .checked_sub(1)
            .and_then(|i| self.pipes.get(i))
            .map(|(read, _)| read.as_raw_fd())
    }

    /// Descriptor stage `stage` writes its stdout to, if any.
    pub fn write_end(&self, stage: usize) -> Option<RawFd> {
        self.pipes.get(stage).map(|(_, write)| write.as_raw_fd())
    }

    pub fn raw_fds(&self) -> Vec<RawFd> {
        self.pipes
            .iter()
            .flat_map(|(read, write)| [read.as_raw_fd(), write.as_raw_fd()])
            .collect()
    }
}

use std::fs::{File, OpenOptions};
use std::os::fd::{AsRawFd, RawFd};
use std::os::unix::fs::OpenOptionsExt;

use crate::ast::{RedirectKind, RedirectMode, Redirection};
use super::executor::LaunchError;

const CREATE_MODE: u32 = 0o644;

/// A redirection target opened in the parent, ready to be dup'd onto the
/// first stage's descriptors.
#[derive(Debug)]
pub struct OpenedRedirect {
    file: File,
    fds: &'static [RawFd],
}

impl OpenedRedirect {
    pub fn open(redirection: &Redirection) -> Result<Self, LaunchError> {
        let mut options = OpenOptions::new();
        match (redirection.kind, redirection.mode) {
            (RedirectKind::In, _) => options.read(true),
            (_, RedirectMode::Truncate) => options.write(true).create(true).truncate(true).mode(CREATE_MODE),
            (_, RedirectMode::Append) => options.append(true).create(true).mode(CREATE_MODE),
        };
        let file = options
            .open(&redirection.target)
            .map_err(|source| LaunchError::RedirectTarget {
                path: redirection.target.clone(),
                source,
            })?;
        Ok(OpenedRedirect {
            file,
            fds: redirection.fds(),
        })
    }

    pub fn raw_fd(&self) -> RawFd {
        self.file.as_raw_fd()
    }

    /// Standard descriptors replaced by the target.
    pub fn fds(&self) -> &'static [RawFd] {
        self.fds
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::io::{Read, Write};
    use std::os::unix::fs::PermissionsExt;
    use std::path::Path;

    fn redirection(kind: RedirectKind, mode: RedirectMode, target: &Path) -> Redirection {
        Redirection {
            kind,
            target: target.to_path_buf(),
            mode,
        }
    }

    #[test]
    fn test_truncate_creates_with_0644() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.txt");
        fs::write(&path, "old contents").unwrap();

        let opened = OpenedRedirect::open(&redirection(RedirectKind::Out, RedirectMode::Truncate, &path)).unwrap();
        assert_eq!(opened.fds(), &[1]);
        assert_eq!(fs::read_to_string(&path).unwrap(), "");

        let fresh = dir.path().join("fresh.txt");
        OpenedRedirect::open(&redirection(RedirectKind::ErrOut, RedirectMode::Truncate, &fresh)).unwrap();
        let mode = fs::metadata(&fresh).unwrap().permissions().mode() & 0o777;
        // The process umask can only remove bits.
        assert_eq!(mode & !0o644, 0);
        assert!(mode & 0o600 == 0o600);
    }

    #[test]
    fn test_append_keeps_contents() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("log.txt");
        fs::write(&path, "first\n").unwrap();

        let opened = OpenedRedirect::open(&redirection(RedirectKind::Out, RedirectMode::Append, &path)).unwrap();
        let mut file = &opened.file;
        file.write_all(b"second\n").unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "first\nsecond\n");
    }

    #[test]
    fn test_input_must_exist() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing.txt");
        let err = OpenedRedirect::open(&redirection(RedirectKind::In, RedirectMode::Truncate, &missing)).unwrap_err();
        assert!(matches!(err, LaunchError::RedirectTarget { .. }));
        assert!(!missing.exists());

        let present = dir.path().join("in.txt");
        fs::write(&present, "data").unwrap();
        let opened = OpenedRedirect::open(&redirection(RedirectKind::In, RedirectMode::Truncate, &present)).unwrap();
        let mut buf = String::new();
        (&opened.file).read_to_string(&mut buf).unwrap();
        assert_eq!(buf, "data");
        assert_eq!(opened.fds(), &[0]);
    }

    #[test]
    fn test_both_targets_stdout_and_stderr() {
        let dir = tempfile::tempdir().unwrap();
        let opened = OpenedRedirect::open(&redirection(
            RedirectKind::Both,
            RedirectMode::Truncate,
            &dir.path().join("all.txt"),
        ))
        .unwrap();
        assert_eq!(opened.fds(), &[1, 2]);
    }
}

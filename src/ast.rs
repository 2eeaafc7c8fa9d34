use std::path::PathBuf;

/// One pipeline stage: `argv[0]` followed by its arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    pub argv: Vec<String>,
}

impl Command {
    pub fn name(&self) -> &str {
        self.argv.first().map(String::as_str).unwrap_or("")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RedirectKind {
    In,
    Out,
    ErrOut,
    Both,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RedirectMode {
    Truncate,
    Append,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Redirection {
    pub kind: RedirectKind,
    pub target: PathBuf,
    pub mode: RedirectMode,
}

impl Redirection {
    /// Descriptors of the command that end up pointing at the target.
    pub fn fds(&self) -> &'static [i32] {
        match self.kind {
            RedirectKind::In => &[0],
            RedirectKind::Out => &[1],
            RedirectKind::ErrOut => &[2],
            RedirectKind::Both => &[1, 2],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pipeline {
    pub commands: Vec<Command>,
    pub redirection: Option<Redirection>,
    pub background: bool,
}

impl Pipeline {
    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }
}

/// What the caller should do with one input line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseOutcome {
    /// Blank line: nothing to run, prompt again.
    Empty,
    ExitRequested,
    Run(Pipeline),
}

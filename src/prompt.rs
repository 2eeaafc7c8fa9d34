use std::io::{self, BufRead, Write};

pub struct ShellPrompt {
    prompt: String,
}

impl ShellPrompt {
    pub fn new(prompt: impl Into<String>) -> Self {
        ShellPrompt { prompt: prompt.into() }
    }

    pub fn show_prompt(&self) -> io::Result<()> {
        let mut out = io::stdout().lock();
        out.write_all(self.prompt.as_bytes())?;
        out.flush()
    }

    /// Reads one line from stdin, terminator included. `None` on EOF.
    pub fn read_line(&self) -> io::Result<Option<String>> {
        read_line_from(&mut io::stdin().lock())
    }
}

pub fn read_line_from<R: BufRead>(input: &mut R) -> io::Result<Option<String>> {
    let mut buf = String::new();
    if input.read_line(&mut buf)? == 0 {
        // EOF (e.g., Ctrl-D)
        return Ok(None);
    }
    Ok(Some(buf))
}

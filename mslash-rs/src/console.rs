//! Console I/O used by running scripts.
//!
//! The interpreter never touches stdin/stdout directly; `say`, `input`,
//! `pause` and every diagnostic go through a [`Console`].

use std::collections::VecDeque;
use std::io::{self, BufRead, Write};

/// Line-oriented text I/O.
pub trait Console {
    /// Write `line` followed by a newline.
    fn write_line(&mut self, line: &str) -> io::Result<()>;

    /// Write `text` with no newline and make it visible immediately.
    fn write(&mut self, text: &str) -> io::Result<()>;

    /// Read one line without its terminator; `None` at end of input.
    fn read_line(&mut self) -> io::Result<Option<String>>;
}

/// Process stdin/stdout.
#[derive(Debug, Default, Clone, Copy)]
pub struct StdConsole;

impl Console for StdConsole {
    fn write_line(&mut self, line: &str) -> io::Result<()> {
        let mut out = io::stdout().lock();
        out.write_all(line.as_bytes())?;
        out.write_all(b"\n")
    }

    fn write(&mut self, text: &str) -> io::Result<()> {
        let mut out = io::stdout().lock();
        out.write_all(text.as_bytes())?;
        out.flush()
    }

    fn read_line(&mut self) -> io::Result<Option<String>> {
        io::stdout().flush()?;
        let mut buf = String::new();
        if io::stdin().lock().read_line(&mut buf)? == 0 {
            return Ok(None);
        }
        trim_newline(&mut buf);
        Ok(Some(buf))
    }
}

fn trim_newline(buf: &mut String) {
    if buf.ends_with('\n') {
        buf.pop();
        if buf.ends_with('\r') {
            buf.pop();
        }
    }
}

/// In-memory console: records output and serves queued input lines.
#[derive(Debug, Default, Clone)]
pub struct BufferConsole {
    output: String,
    input: VecDeque<String>,
}

impl BufferConsole {
    pub fn new() -> Self {
        Self::default()
    }

    /// A console whose `read_line` yields `lines` in order, then end of input.
    pub fn with_input<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        BufferConsole {
            output: String::new(),
            input: lines.into_iter().map(Into::into).collect(),
        }
    }

    pub fn push_input(&mut self, line: impl Into<String>) {
        self.input.push_back(line.into());
    }

    /// Everything written so far, verbatim.
    pub fn output(&self) -> &str {
        &self.output
    }

    /// Written output split into lines.
    pub fn lines(&self) -> Vec<&str> {
        self.output.lines().collect()
    }
}

impl Console for BufferConsole {
    fn write_line(&mut self, line: &str) -> io::Result<()> {
        self.output.push_str(line);
        self.output.push('\n');
        Ok(())
    }

    fn write(&mut self, text: &str) -> io::Result<()> {
        self.output.push_str(text);
        Ok(())
    }

    fn read_line(&mut self) -> io::Result<Option<String>> {
        Ok(self.input.pop_front())
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn buffer_records_lines_and_prompts() {
        let mut c = BufferConsole::new();
        c.write_line("a").unwrap();
        c.write("prompt: ").unwrap();
        c.write_line("b").unwrap();
        assert_eq!(c.output(), "a\nprompt: b\n");
        assert_eq!(c.lines(), vec!["a", "prompt: b"]);
    }

    #[test]
    fn buffer_serves_input_then_eof() {
        let mut c = BufferConsole::with_input(["x", "y"]);
        c.push_input("z");
        assert_eq!(c.read_line().unwrap().as_deref(), Some("x"));
        assert_eq!(c.read_line().unwrap().as_deref(), Some("y"));
        assert_eq!(c.read_line().unwrap().as_deref(), Some("z"));
        assert_eq!(c.read_line().unwrap(), None);
    }

    #[test]
    fn newline_trimming() {
        let mut s = "line\r\n".to_owned();
        trim_newline(&mut s);
        assert_eq!(s, "line");
        let mut s = "no newline".to_owned();
        trim_newline(&mut s);
        assert_eq!(s, "no newline");
    }
}

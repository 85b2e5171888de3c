//! Outbound display updates.

use std::io::{self, Write};

/// Receives `"<display text> <progress>"` update lines.
pub trait Relay {
    fn send(&mut self, message: &str) -> io::Result<()>;
}

/// Writes each update as a line on any writer, stdout by default.
pub struct LineRelay<W: Write = io::Stdout> {
    out: W,
}

impl LineRelay {
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

impl<W: Write> LineRelay<W> {
    pub const fn new(out: W) -> Self {
        Self { out }
    }

    #[cfg(test)]
    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> Relay for LineRelay<W> {
    fn send(&mut self, message: &str) -> io::Result<()> {
        writeln!(self.out, "{message}")?;
        self.out.flush()
    }
}

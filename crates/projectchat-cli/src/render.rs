use crossterm::style::Stylize;
use projectchat_core::SessionEvent;
use std::io::{self, Write};

/// Writes session events to a terminal as they arrive.
pub struct ConsoleRenderer<W: Write> {
    out: W,
}

impl<W: Write> ConsoleRenderer<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    pub fn banner(&mut self) -> io::Result<()> {
        writeln!(self.out, "Starting chat with Claude (type 'exit' to end)")?;
        writeln!(self.out, "----------------------------------------")?;
        self.out.flush()
    }

    pub fn prompt(&mut self) -> io::Result<()> {
        write!(self.out, "\n{} ", "You:".green().bold())?;
        self.out.flush()
    }

    pub fn render(&mut self, event: SessionEvent) -> io::Result<()> {
        match event {
            SessionEvent::ReplyStart => {
                writeln!(self.out, "\n{}", "Claude:".blue().bold())?;
            }
            SessionEvent::TextDelta(text) => {
                // No markup processing; the model's text goes out verbatim.
                write!(self.out, "{text}")?;
            }
            SessionEvent::ReplyComplete => {
                writeln!(self.out)?;
            }
            SessionEvent::Error(message) => {
                writeln!(self.out, "\n{}", format!("Error: {message}").red().bold())?;
            }
        }
        self.out.flush()
    }
}

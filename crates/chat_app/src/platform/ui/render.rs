use std::io::{self, Write};

use chat_core::{AppViewModel, MessageStatus, Role};

pub const PROMPT: &str = "> ";

/// Incremental terminal renderer.
///
/// Tracks how much of the transcript is already on screen and writes only
/// what was appended since the last frame.
pub struct Renderer<W: Write> {
    out: W,
    /// Messages fully written, including their trailing newline.
    settled: usize,
    /// Bytes of `messages[settled]` already written.
    shown: usize,
}

impl<W: Write> Renderer<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            settled: 0,
            shown: 0,
        }
    }

    pub fn prompt(&mut self) -> io::Result<()> {
        write!(self.out, "{PROMPT}")?;
        self.out.flush()
    }

    pub fn notice(&mut self, text: &str) -> io::Result<()> {
        writeln!(self.out, "[{text}]")?;
        self.out.flush()
    }

    pub fn render(&mut self, view: &AppViewModel) -> io::Result<()> {
        while let Some(message) = view.messages.get(self.settled) {
            // The terminal already echoed what the user typed.
            if message.role == Role::User {
                self.settle();
                continue;
            }

            match message.status {
                MessageStatus::Failed => {
                    if self.shown > 0 {
                        writeln!(self.out)?;
                    }
                    write!(self.out, "{}", message.content)?;
                }
                MessageStatus::Streaming | MessageStatus::Complete | MessageStatus::Cancelled => {
                    if let Some(suffix) = message.content.get(self.shown..) {
                        self.out.write_all(suffix.as_bytes())?;
                        self.shown = message.content.len();
                    }
                }
            }

            if message.status == MessageStatus::Streaming {
                break;
            }
            if message.status == MessageStatus::Cancelled {
                write!(self.out, " [cancelled]")?;
            }
            writeln!(self.out)?;
            self.settle();
            if !view.busy {
                write!(self.out, "{PROMPT}")?;
            }
        }
        self.out.flush()
    }

    fn settle(&mut self) {
        self.settled += 1;
        self.shown = 0;
    }

    #[cfg(test)]
    fn into_inner(self) -> W {
        self.out
    }
}

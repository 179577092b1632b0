use std::io::{self, Write};

use anyhow::{Context, Result};

use crate::sink::{KeystrokeSink, SpecialKey};

/// Echoes keystrokes to a terminal using ANSI cursor escapes.
///
/// Cursor moves and backspaces only render correctly while the edit stays on
/// the current line, which holds for the word-sized corrections the engine makes
/// unless a paragraph break lies in between.
pub struct TerminalSink<W: Write> {
    out: W,
}

impl TerminalSink<io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

impl<W: Write> TerminalSink<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn write(&mut self, bytes: &[u8]) -> Result<()> {
        self.out
            .write_all(bytes)
            .and_then(|_| self.out.flush())
            .context("failed to write keystroke to terminal")
    }
}

impl<W: Write> KeystrokeSink for TerminalSink<W> {
    fn emit(&mut self, c: char) -> Result<()> {
        let mut buf = [0u8; 4];
        self.write(c.encode_utf8(&mut buf).as_bytes())
    }

    fn press_special(&mut self, key: SpecialKey) -> Result<()> {
        let seq: &[u8] = match key {
            SpecialKey::Left => b"\x1b[D",
            SpecialKey::Right => b"\x1b[C",
            // Left, then delete the character under the cursor.
            SpecialKey::Backspace => b"\x1b[D\x1b[P",
        };
        self.write(seq)
    }
}

use anyhow::Result;
use serde::Serialize;

use crate::sink::{KeystrokeSink, SpecialKey};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyEvent {
    Char(char),
    Special(SpecialKey),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct KeyStats {
    pub keystrokes: usize,
    pub chars: usize,
    pub backspaces: usize,
    pub cursor_moves: usize,
}

/// In-memory text editor that records every keystroke it receives.
///
/// Applies basic cursor movement and insertion/deletion so tests and the
/// `simulate` command can check the final text of a run. It does not model
/// editor-specific behavior such as auto-indent or smart quotes.
#[derive(Debug, Default, Clone)]
pub struct EditorSink {
    buf: Vec<char>,
    cursor: usize,
    log: Vec<KeyEvent>,
}

impl EditorSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn text(&self) -> String {
        self.buf.iter().collect()
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn events(&self) -> &[KeyEvent] {
        &self.log
    }

    pub fn stats(&self) -> KeyStats {
        let mut out = KeyStats {
            keystrokes: self.log.len(),
            ..Default::default()
        };
        for event in &self.log {
            match event {
                KeyEvent::Char(_) => out.chars += 1,
                KeyEvent::Special(SpecialKey::Backspace) => out.backspaces += 1,
                KeyEvent::Special(SpecialKey::Left | SpecialKey::Right) => out.cursor_moves += 1,
            }
        }
        out
    }

    fn insert_char(&mut self, c: char) {
        self.buf.insert(self.cursor, c);
        self.cursor += 1;
    }

    fn backspace(&mut self) {
        if self.cursor == 0 {
            return;
        }
        self.cursor -= 1;
        self.buf.remove(self.cursor);
    }

    fn move_left(&mut self) {
        if self.cursor > 0 {
            self.cursor -= 1;
        }
    }

    fn move_right(&mut self) {
        if self.cursor < self.buf.len() {
            self.cursor += 1;
        }
    }
}

impl KeystrokeSink for EditorSink {
    fn emit(&mut self, c: char) -> Result<()> {
        self.log.push(KeyEvent::Char(c));
        self.insert_char(c);
        Ok(())
    }

    fn press_special(&mut self, key: SpecialKey) -> Result<()> {
        self.log.push(KeyEvent::Special(key));
        match key {
            SpecialKey::Left => self.move_left(),
            SpecialKey::Right => self.move_right(),
            SpecialKey::Backspace => self.backspace(),
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn edits_in_the_middle_of_the_buffer() {
        let mut sink = EditorSink::new();
        for c in "hello wrold".chars() {
            sink.emit(c).unwrap();
        }
        for _ in 0..2 {
            sink.press_special(SpecialKey::Left).unwrap();
        }
        for _ in 0..3 {
            sink.press_special(SpecialKey::Backspace).unwrap();
        }
        for c in "wor".chars() {
            sink.emit(c).unwrap();
        }
        sink.press_special(SpecialKey::Right).unwrap();
        sink.press_special(SpecialKey::Right).unwrap();
        sink.press_special(SpecialKey::Right).unwrap();

        assert_eq!(sink.text(), "hello world");
        assert_eq!(sink.cursor(), 11);

        let stats = sink.stats();
        assert_eq!(stats.chars, 14);
        assert_eq!(stats.backspaces, 3);
        assert_eq!(stats.cursor_moves, 5);
    }

    #[test]
    fn backspace_at_start_is_a_no_op() {
        let mut sink = EditorSink::new();
        sink.press_special(SpecialKey::Backspace).unwrap();
        sink.press_special(SpecialKey::Left).unwrap();
        assert_eq!(sink.text(), "");
        assert_eq!(sink.cursor(), 0);
    }
}

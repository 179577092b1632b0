use anyhow::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpecialKey {
    Left,
    Right,
    Backspace,
}

/// Destination for simulated keystrokes.
///
/// Implementations are driven from the engine's worker thread, one keystroke
/// at a time. An error aborts the run.
pub trait KeystrokeSink {
    fn emit(&mut self, c: char) -> Result<()>;

    fn press_special(&mut self, key: SpecialKey) -> Result<()>;
}

impl<S: KeystrokeSink + ?Sized> KeystrokeSink for Box<S> {
    fn emit(&mut self, c: char) -> Result<()> {
        (**self).emit(c)
    }

    fn press_special(&mut self, key: SpecialKey) -> Result<()> {
        (**self).press_special(key)
    }
}

impl<S: KeystrokeSink + ?Sized> KeystrokeSink for &mut S {
    fn emit(&mut self, c: char) -> Result<()> {
        (**self).emit(c)
    }

    fn press_special(&mut self, key: SpecialKey) -> Result<()> {
        (**self).press_special(key)
    }
}

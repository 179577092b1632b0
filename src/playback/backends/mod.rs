pub mod terminal;

#[cfg(feature = "x11")]
pub mod x11;

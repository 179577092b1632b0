pub mod cadence;
pub mod control;
pub mod engine;
pub mod error;
pub mod keyboard;
pub mod mistakes;
pub mod observer;
pub mod playback;
pub mod rewrite;
pub mod settings;
pub mod sim;
pub mod sink;

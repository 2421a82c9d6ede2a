//! Music playback: per guild sessions with a vote driven controller.

pub mod actions;
pub mod commands;
pub mod controller;
pub mod engine;
pub mod error;
pub mod events;
pub mod gateway;
pub mod session;
pub mod track;
pub mod vote;

#[cfg(test)]
pub(crate) mod testing;

pub use commands::music_commands;

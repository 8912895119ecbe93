//! # Speech Governor
//!
//! Segments a single model utterance into chat-like bursts (`<SPLIT>`
//! tokens, newlines, sentence-boundary packing, hard-limit chop) and paces
//! their delivery through a `Transport` with a reading/typing-style delay
//! model.

pub mod governor;

pub use governor::{GovernorConfig, SpeechGovernor};

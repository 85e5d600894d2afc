//! # scribe-channels
//!
//! Chat platform integrations for Scribe.

pub mod discord;

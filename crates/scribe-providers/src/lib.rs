//! # scribe-providers
//!
//! Text backends for Scribe: live HTTP clients and their local stand-ins.

pub mod echo;
pub mod languagetool;
pub mod moderation;
pub mod openai;

//! # scribe-core
//!
//! Core types, traits, configuration, and error handling for the Scribe bot.

pub mod command;
pub mod config;
pub mod context;
pub mod error;
pub mod message;
pub mod repair;
pub mod safety;
pub mod traits;

pub use config::shellexpand;

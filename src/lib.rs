//! Embedding of external application windows into a host panel.
//!
//! A `SessionRegistry` owns one `Session` per caller identity. Each session
//! locates (or launches) its application's top-level window, parents it to
//! the host window and keeps its bounds glued to the host content area.

pub mod commands;
pub mod config;
pub mod diagnostics;
pub mod error;
pub mod events;
pub mod services;
pub mod utils;

#[cfg(test)]
mod test_support;

pub use commands::{CommandHandler, Response};
pub use config::Config;
pub use error::{EmbedError, Result};
pub use services::{Session, SessionParams, SessionRegistry};

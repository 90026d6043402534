//! Telegram draft scanner library
//!
//! This library provides tools to:
//! - Log in to a personal Telegram account and keep the session on disk
//! - List every conversation that holds an unsent draft
//! - Squash a run of your own messages into one with `!squash N`

pub mod auth;
pub mod chat;
pub mod config;
pub mod error;
pub mod session;

// Re-export common types
pub use config::Config;
pub use error::{Error, Result};
pub use session::{get_client, SessionLock, TelegramClient};

pub mod commands;

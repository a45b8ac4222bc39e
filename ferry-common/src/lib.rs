//! Ferry Common - shared configuration and logging for the Ferry bot.

#![warn(clippy::all)]

pub mod config;
pub mod logging;

pub use config::Config;

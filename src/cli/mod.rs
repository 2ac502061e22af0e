//! CLI module for qachain
//!
//! Handles command-line argument parsing, interactive input and the
//! subcommand handlers.

pub mod args;
pub mod commands;
pub mod input;

pub use args::{Args, Commands, Verbosity};
pub use commands::run;
pub use input::InputHandler;

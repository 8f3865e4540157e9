// (c) 2025 Ross Younger
//! Command Line Interface for bookz
mod args;
mod cli_main;
pub mod styles;
pub use cli_main::cli;

// (c) 2025 Ross Younger
//! # Configuration management
//!
//! bookz obtains run-time configuration from the following sources, lowest priority first:
//! 1. Hard-wired defaults
//! 2. The user's configuration file, `bookz.toml` in the platform configuration directory
//!    * On Linux, this is `~/.config/bookz/bookz.toml`
//!    * On macOS, this is `~/Library/Application Support/bookz/bookz.toml`
//!    * On Windows, this is `%AppData%\Roaming\bookz\bookz.toml`
//! 3. Environment variables named `BOOKZ_` followed by the upper-cased option name, e.g. `BOOKZ_CHANNEL`
//! 4. Command-line options
//!
//! Run `bookz --config-files` to see which file we read, and `bookz --show-config` to see the result of the merge.
//!
//! ## File format
//!
//! The file is TOML. Keys are the `snake_case` field names of [`Configuration`].
//!
//! ```toml
//! server = "irc.example.org"
//! nickname = "reader"
//! channel = "#bookz"
//! request_style = "marker"
//! download_dir = "/home/reader/books"
//! ```

mod manager;
pub use manager::Manager;

mod prettyprint;
pub use prettyprint::DisplayAdapter;

mod structure;
pub use structure::{Configuration, ConfigurationOverrides, DEFAULT_PORT};

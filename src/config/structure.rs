// (c) 2025 Ross Younger
//! Configuration structure

use std::path::PathBuf;
use std::sync::LazyLock;
use std::time::Duration;

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::{
    catalog::RequestStyle,
    cli::styles::{info, RESET},
    util::TimeFormat,
};

/// The conventional IRC port
pub const DEFAULT_PORT: u16 = 6667;

/// The set of configurable options supported by bookz.
///
/// Every field may be set in the configuration file (as `snake_case` keys),
/// in the environment (`BOOKZ_` followed by the upper-cased key),
/// or on the command line (as `--kebab-case` options).
///
/// `server` and `nickname` have no useful defaults; they are normally given on the command line.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Configuration {
    /// IRC server host name or address
    pub server: String,
    /// IRC server port
    pub port: u16,
    /// Nickname to register with
    pub nickname: String,
    /// The channel where searches are made and from whose members items are accepted
    pub channel: String,
    /// Command that prefixes every search, e.g. `@search`
    pub search_command: String,
    /// How a catalog entry is requested
    pub request_style: RequestStyle,
    /// Where received files are written and extracted
    pub download_dir: PathBuf,
    /// Connection timeout in seconds, for the server and for each transfer
    pub connect_timeout: u16,
    /// Time stamp format for log messages
    pub time_format: TimeFormat,
}

/// Field names, in display order
pub(crate) const FIELD_NAMES: &[&str] = &[
    "server",
    "port",
    "nickname",
    "channel",
    "search_command",
    "request_style",
    "download_dir",
    "connect_timeout",
    "time_format",
];

static SYSTEM_DEFAULT_CONFIG: LazyLock<Configuration> = LazyLock::new(|| Configuration {
    server: String::new(),
    port: DEFAULT_PORT,
    nickname: String::new(),
    channel: "#bookz".into(),
    search_command: "@search".into(),
    request_style: RequestStyle::Command,
    download_dir: PathBuf::from("."),
    connect_timeout: 30,
    time_format: TimeFormat::Local,
});

impl Configuration {
    /// Returns the system default settings
    #[must_use]
    pub fn system_default() -> &'static Self {
        &SYSTEM_DEFAULT_CONFIG
    }

    /// Connection timeout, as a Duration
    #[must_use]
    pub fn connect_timeout_duration(&self) -> Duration {
        Duration::from_secs(self.connect_timeout.into())
    }

    /// Performs additional validation checks on a configuration object
    pub(crate) fn try_validate(&self) -> Result<()> {
        if self.server.trim().is_empty() {
            anyhow::bail!("No {INFO}server{RESET} was given", INFO = info());
        }
        if self.nickname.trim().is_empty() || self.nickname.contains(char::is_whitespace) {
            anyhow::bail!(
                "The {INFO}nickname{RESET} must be a single non-empty word",
                INFO = info()
            );
        }
        if self.port == 0 {
            anyhow::bail!("The {INFO}port{RESET} must not be 0", INFO = info());
        }
        if !self.channel.starts_with(['#', '&']) || self.channel.contains(char::is_whitespace) {
            anyhow::bail!(
                "The {INFO}channel{RESET} ({}) must begin with # or & and contain no spaces",
                self.channel,
                INFO = info()
            );
        }
        if self.search_command.trim().is_empty() {
            anyhow::bail!(
                "The {INFO}search command{RESET} must not be empty",
                INFO = info()
            );
        }
        Ok(())
    }

    /// Performs additional validation checks on the configuration
    pub(crate) fn validate(self) -> Result<Self> {
        self.try_validate()?;
        Ok(self)
    }
}

/// Command-line overrides for [`Configuration`].
///
/// Only options the user actually gave are serialized, so anything omitted falls through
/// to the lower-priority sources.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, clap::Args)]
pub struct ConfigurationOverrides {
    /// IRC server port [default: 6667]
    #[arg(short, long, value_name = "PORT", help_heading("Connection"))]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,

    /// Channel to search in [default: #bookz]
    #[arg(short, long, value_name = "CHANNEL", help_heading("Connection"))]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub channel: Option<String>,

    /// Connection timeout in seconds [default: 30]
    #[arg(long, value_name = "SECONDS", help_heading("Connection"))]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub connect_timeout: Option<u16>,

    /// Search command prefix [default: @search]
    #[arg(long, value_name = "COMMAND", help_heading("Searching"))]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub search_command: Option<String>,

    /// How to request a chosen item [default: command]
    #[arg(long, value_enum, value_name = "STYLE", help_heading("Searching"))]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_style: Option<RequestStyle>,

    /// Directory to receive files into [default: .]
    #[arg(long, value_name = "DIR", help_heading("Searching"))]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub download_dir: Option<PathBuf>,

    /// Time stamp format for log messages [default: local]
    #[arg(long, value_enum, value_name = "FORMAT", help_heading("Output"))]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_format: Option<TimeFormat>,
}

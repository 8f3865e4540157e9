// (c) 2025 Ross Younger
//! Command-line argument definitions

use std::ffi::OsString;

use anyhow::Context as _;
use clap::Parser;

use super::styles::CLAP_STYLES;
use crate::config::{ConfigurationOverrides, Manager};

#[derive(Debug, Parser, Clone, Default)]
#[command(
    author,
    version,
    about,
    before_help = "Searches an IRC channel for books, lists the results and fetches the one you choose.",
    after_help = "Once connected, type a search at the prompt. When the results are listed, type the number of the one you want, or type another search.\nClose standard input (Ctrl-D) to finish.",
    infer_long_args(true),
    styles = CLAP_STYLES
)]
#[allow(clippy::struct_excessive_bools)]
pub(crate) struct CliArgs {
    // MODE SELECTION ======================================================================
    /// Outputs the configuration, then exits.
    ///
    /// The output shows each setting and where its value came from.
    #[arg(long, help_heading("Configuration"), display_order(0))]
    pub show_config: bool,

    /// Outputs the path to the configuration file, then exits
    #[arg(long, help_heading("Configuration"), display_order(0))]
    pub config_files: bool,

    // CLIENT-SIDE OPTIONS =================================================================
    /// Enable detailed debug output
    ///
    /// This has the same effect as setting `RUST_LOG=bookz=debug` in the environment.
    /// If present, `RUST_LOG` overrides this option.
    #[arg(short, long, action, help_heading("Debug"), display_order(0))]
    pub debug: bool,

    /// Quiet mode
    ///
    /// Switches off progress display; logs only errors
    #[arg(short, long, action, conflicts_with("debug"), help_heading("Output"))]
    pub quiet: bool,

    /// Log to a file
    ///
    /// By default the log receives everything printed to stderr.
    /// To override this behaviour, set the environment variable `RUST_LOG_FILE_DETAIL` (same semantics as `RUST_LOG`).
    #[arg(
        short('l'),
        long,
        action,
        value_name("FILE"),
        help_heading("Output"),
        next_line_help(true)
    )]
    pub log_file: Option<String>,

    /// Persistent options which may also be set in the configuration file
    #[command(flatten)]
    pub config: ConfigurationOverrides,

    // POSITIONAL ARGUMENTS ================================================================
    /// The IRC server, as HOST or HOST:PORT
    #[arg(value_name = "SERVER")]
    pub server: Option<String>,

    /// Nickname to use on the server
    #[arg(value_name = "NICKNAME")]
    pub nickname: Option<String>,

    /// A search to run as soon as the channel is joined
    #[arg(value_name = "SEARCH", trailing_var_arg(true))]
    pub search: Vec<String>,
}

impl CliArgs {
    pub(crate) fn custom_parse<I, T>(args: I) -> Result<Self, clap::Error>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        Self::try_parse_from(args)
    }

    /// The positional search words, if any, as one query
    pub(crate) fn auto_search(&self) -> Option<String> {
        if self.search.is_empty() {
            None
        } else {
            Some(self.search.join(" "))
        }
    }
}

/// What the invocation asks us to do
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum MainMode {
    ShowConfig,
    ShowConfigFiles,
    Client,
}

impl From<&CliArgs> for MainMode {
    fn from(args: &CliArgs) -> Self {
        if args.show_config {
            MainMode::ShowConfig
        } else if args.config_files {
            MainMode::ShowConfigFiles
        } else {
            MainMode::Client
        }
    }
}

/// Splits `host`, `host:port` or `[v6addr]:port`
fn split_server(spec: &str) -> anyhow::Result<(String, Option<u16>)> {
    let (host, port) = if let Some(rest) = spec.strip_prefix('[') {
        let (host, after) = rest
            .split_once(']')
            .with_context(|| format!("unterminated address in server {spec}"))?;
        (host, after.strip_prefix(':'))
    } else if spec.matches(':').count() == 1 {
        let (host, port) = spec.rsplit_once(':').unwrap_or((spec, ""));
        (host, Some(port))
    } else {
        // a bare IPv6 address, or a plain host name
        (spec, None)
    };
    let port = port
        .map(|p| p.parse::<u16>().with_context(|| format!("invalid port in server {spec}")))
        .transpose()?;
    Ok((host.to_string(), port))
}

impl CliArgs {
    /// Applies the command line on top of whatever the manager already holds
    pub(crate) fn apply_to(&self, mgr: &mut Manager) -> anyhow::Result<()> {
        if let Some(spec) = &self.server {
            let (host, port) = split_server(spec)?;
            mgr.set("server", host);
            if let Some(port) = port {
                mgr.set("port", port);
            }
        }
        if let Some(nick) = &self.nickname {
            mgr.set("nickname", nick);
        }
        // an explicit --port beats one given with the server
        mgr.apply_overrides(&self.config);
        Ok(())
    }
}

impl TryFrom<&CliArgs> for Manager {
    type Error = anyhow::Error;

    fn try_from(args: &CliArgs) -> Result<Self, Self::Error> {
        let mut mgr = Manager::standard();
        args.apply_to(&mut mgr)?;
        Ok(mgr)
    }
}

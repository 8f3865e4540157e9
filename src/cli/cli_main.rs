// (c) 2025 Ross Younger
//! Main CLI for bookz

use std::ffi::OsString;
use std::process::ExitCode;

use anstream::{eprintln, println};
use anyhow::Result;
use indicatif::{MultiProgress, ProgressDrawTarget};

use super::args::{CliArgs, MainMode};
use crate::{
    cli::styles::{error, header, use_colours, RESET},
    client::{client_main, MAX_UPDATE_FPS},
    config::Manager,
    util::{setup_tracing, trace_level, ConsoleTraceType},
};

/// Main CLI entrypoint
///
/// Call this from `main`, passing the arguments to use.
/// Normally you will call `cli(std::env::args_os())` but you can pass in alternate arguments for CLI testing.
///
/// This function may start a tokio runtime and perform work in it.
#[must_use]
pub fn cli<I, T>(args: I) -> ExitCode
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    cli_inner(args)
        .inspect_err(|e| {
            if crate::util::tracing_is_initialised() {
                tracing::error!("{e:#}");
            } else {
                eprintln!("{ERROR}Error:{RESET} {e:#}", ERROR = error());
            }
        })
        .map_or(ExitCode::FAILURE, |success| {
            if success {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            }
        })
}

/// Inner CLI logic
///
/// # Return
/// true indicates success. false indicates a failure that has already been reported.
fn cli_inner<I, T>(args: I) -> Result<bool>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let Some(args) = parse_args(args)? else {
        return Ok(true); // help/version shown; exit
    };

    let config_manager = Manager::try_from(&args)?;
    match MainMode::from(&args) {
        MainMode::ShowConfigFiles => {
            println!("{:?}", Manager::config_files());
            Ok(true)
        }
        MainMode::ShowConfig => show_config(&config_manager),
        MainMode::Client => run_client(&config_manager, &args),
    }
}

fn parse_args<I, T>(args: I) -> Result<Option<CliArgs>>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    use clap::error::ErrorKind::{DisplayHelp, DisplayVersion};
    match CliArgs::custom_parse(args) {
        Ok(args) => Ok(Some(args)),
        Err(e) if matches!(e.kind(), DisplayHelp | DisplayVersion) => {
            e.print()?;
            Ok(None)
        }
        Err(e) => Err(e.into()),
    }
}

fn show_config_data(config_manager: &Manager) -> String {
    format!(
        "{HEADER}Configuration:{RESET}\n{}",
        config_manager.to_display_adapter(),
        HEADER = header()
    )
}

fn show_config(config_manager: &Manager) -> Result<bool> {
    println!("{}", show_config_data(config_manager));
    // Report problems after the listing, so the user can see where the bad value came from
    let _ = config_manager.configuration()?;
    Ok(true)
}

#[tokio::main(flavor = "current_thread")]
async fn run_client(config_manager: &Manager, args: &CliArgs) -> Result<bool> {
    let config = config_manager.configuration()?;
    let display =
        MultiProgress::with_draw_target(ProgressDrawTarget::stderr_with_hz(MAX_UPDATE_FPS));
    setup_tracing(
        trace_level(args.debug, args.quiet),
        ConsoleTraceType::Indicatif(display.clone()),
        args.log_file.as_ref(),
        config.time_format,
        use_colours(),
    )?; // to provoke error: set RUST_LOG=.

    client_main(&config, display, args.auto_search(), args.quiet).await
}

#[cfg(test)]
mod test {
    use super::{cli_inner, show_config_data};
    use crate::config::Manager;

    #[test]
    fn show_config() {
        let mut mgr = Manager::without_files();
        mgr.set("server", "irc.example.org");
        let data = console::strip_ansi_codes(&show_config_data(&mgr)).to_string();
        assert!(data.starts_with("Configuration:"));
        assert!(data.contains("irc.example.org"));
        assert!(data.contains("request_style"));
    }

    #[test]
    fn help_and_version_succeed() {
        assert!(cli_inner(["bookz", "--help"]).unwrap());
        assert!(cli_inner(["bookz", "--version"]).unwrap());
    }

    #[test]
    fn bad_option_fails() {
        assert!(cli_inner(["bookz", "--no-such-option"]).is_err());
    }
}

// (c) 2025 Ross Younger
//! CLI output styling
//!
//! Use these with anstream's `println!` / `eprintln!` macros, which strip styling when the
//! output is not a terminal. `RESET` returns to the default style.

#[allow(clippy::enum_glob_use)]
use anstyle::AnsiColor::*;
use anstyle::Color::Ansi;
use clap::builder::styling::Styles;
use std::borrow::Cow;

const _ERROR: anstyle::Style = anstyle::Style::new().bold().fg_color(Some(Ansi(Red)));
const _WARNING: anstyle::Style = anstyle::Style::new().bold().fg_color(Some(Ansi(Yellow)));
const _INFO: anstyle::Style = anstyle::Style::new().fg_color(Some(Ansi(Cyan)));
const _SUCCESS: anstyle::Style = anstyle::Style::new().fg_color(Some(Ansi(Green)));
const _HEADER: anstyle::Style = anstyle::Style::new()
    .underline()
    .fg_color(Some(Ansi(Yellow)));

/// Resets styling to default. This is a re-export of [`anstyle::Reset`].
pub use anstyle::Reset as RESET;

pub(crate) const CLAP_STYLES: Styles = Styles::styled()
    .usage(_HEADER)
    .header(_HEADER)
    .literal(anstyle::Style::new().bold())
    .invalid(_WARNING)
    .error(_ERROR)
    .valid(_INFO.bold().underline())
    .placeholder(_INFO);

/// Wraps a style constant in an accessor that honours the colour setting
macro_rules! wrap {
    ($func:ident, $def:ident) => {
        #[must_use]
        /// Conditional styling accessor for
        #[doc = stringify!($func)]
        /// messages
        pub fn $func() -> anstyle::Style {
            if use_colours() {
                $def
            } else {
                anstyle::Style::new()
            }
        }
    };
}

wrap!(error, _ERROR);
wrap!(warning, _WARNING);
wrap!(info, _INFO);
wrap!(success, _SUCCESS);
wrap!(header, _HEADER);

/// Are we configured to use terminal colours?
///
/// This follows `console`'s detection, which honours `CLICOLOR`, `CLICOLOR_FORCE` and `NO_COLOR`.
#[must_use]
pub fn use_colours() -> bool {
    console::colors_enabled_stderr()
}

pub(crate) fn maybe_strip_color(s: &str) -> Cow<'_, str> {
    if use_colours() {
        s.into()
    } else {
        console::strip_ansi_codes(s)
    }
}

#[cfg(test)]
mod test {
    use super::maybe_strip_color;
    use rusty_fork::rusty_fork_test;

    rusty_fork_test! {
        #[test]
        fn strips_when_colours_off() {
            console::set_colors_enabled_stderr(false);
            assert!(!super::use_colours());
            assert_eq!(maybe_strip_color("\x1b[31mred\x1b[0m"), "red");
            assert_eq!(super::error(), anstyle::Style::new());
        }

        #[test]
        fn keeps_when_colours_on() {
            console::set_colors_enabled_stderr(true);
            assert_eq!(maybe_strip_color("\x1b[31mred\x1b[0m"), "\x1b[31mred\x1b[0m");
            assert_ne!(super::success(), anstyle::Style::new());
        }
    }
}
